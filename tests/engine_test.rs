//! End-to-end engine tests against a mock HTTP upstream
//!
//! Each test stands up its own axum server on an ephemeral port and its own
//! engine, so hit counters are never shared between tests.

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Router, routing::get};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use pollkit::Engine;
use pollkit::config::Config;
use pollkit::error::Result as EngineResult;
use pollkit::native::{NativeRegistry, NativeResolver};
use pollkit::plugin::{
    ExtractRule, HttpMethod, InputMap, InputSpec, OutputSpec, PluginInstance,
    PluginTemplate, ResponseFormat, Step,
};
use pollkit::sink::{MemorySink, ValueSink};

#[derive(Default)]
struct MockState {
    price_hits: AtomicUsize,
    slow_hits: AtomicUsize,
    flaky_hits: AtomicUsize,
    fail: AtomicBool,
}

async fn price(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
) -> (StatusCode, String) {
    state.price_hits.fetch_add(1, Ordering::SeqCst);
    if state.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream down".into());
    }
    (
        StatusCode::OK,
        format!(r#"{{"price": "42000", "symbol": "{id}"}}"#),
    )
}

async fn slow(State(state): State<Arc<MockState>>) -> String {
    state.slow_hits.fetch_add(1, Ordering::SeqCst);
    sleep(Duration::from_millis(300)).await;
    r#"{"v": "1"}"#.to_string()
}

async fn flaky(State(state): State<Arc<MockState>>) -> (StatusCode, String) {
    state.flaky_hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "always broken".into())
}

async fn target(Path(n): Path<usize>) -> (StatusCode, String) {
    if n == 1 {
        (StatusCode::OK, r#"{"val": "ok"}"#.to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "target down".into())
    }
}

/// Start the mock upstream, returning its base URL.
async fn start_mock_server(state: Arc<MockState>) -> String {
    let _ = tracing_subscriber::fmt::try_init();

    let app = Router::new()
        .route("/price/{id}", get(price))
        .route("/slow", get(slow))
        .route("/flaky", get(flaky))
        .route("/target/{n}", get(target))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn step(id: &str, url: &str) -> Step {
    Step {
        id: id.into(),
        method: HttpMethod::Get,
        url: url.into(),
        body: String::new(),
        headers: BTreeMap::new(),
        proxy: String::new(),
        extract: vec![],
        transform: vec![],
        skip_if_set: String::new(),
        format: ResponseFormat::Json,
        cache_minutes: 0,
        charset: None,
    }
}

fn extract(key: &str, path: &str) -> ExtractRule {
    ExtractRule {
        key: key.into(),
        path: path.into(),
    }
}

fn output(key: &str, value: &str) -> OutputSpec {
    OutputSpec {
        key: key.into(),
        value: value.into(),
        color: None,
        unit: None,
        label: None,
        short_label: None,
    }
}

fn template(id: &str, steps: Vec<Step>, outputs: Vec<OutputSpec>) -> PluginTemplate {
    PluginTemplate {
        id: id.into(),
        inputs: vec![],
        steps,
        outputs,
        refresh_minutes: 10,
    }
}

fn instance(id: &str, template_id: &str, inputs: &[(&str, &str)]) -> PluginInstance {
    PluginInstance {
        id: id.into(),
        template_id: template_id.into(),
        inputs: inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        targets: vec![],
        refresh_minutes: None,
        enabled: true,
    }
}

fn engine_with_sink() -> (Arc<Engine>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(Engine::new(Config::default(), sink.clone()).unwrap());
    (engine, sink)
}

#[tokio::test]
async fn test_price_scenario_cache_then_error_recovery() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    let mut fetch = step("fetch", "{{base}}/price/{{id}}");
    fetch.cache_minutes = 1;
    fetch.extract = vec![extract("price", "price")];
    let mut out = output("price", "{{price}}");
    out.label = Some("{{id}} Price".into());
    let tmpl = template("ticker", vec![fetch], vec![out]);

    let btc = instance("btc", "ticker", &[("base", &base), ("id", "BTC")]);

    // First execution hits the network once.
    assert!(engine.execute_instance(&btc, &tmpl, &cancel).await);
    assert_eq!(state.price_hits.load(Ordering::SeqCst), 1);
    assert_eq!(sink.get_value("btc.price"), Some("42000".into()));
    assert_eq!(sink.get_value("Label.btc.price"), Some("BTC Price".into()));

    // Second execution inside the TTL is served from cache.
    assert!(engine.execute_instance(&btc, &tmpl, &cancel).await);
    assert_eq!(state.price_hits.load(Ordering::SeqCst), 1);
    assert_eq!(sink.get_value("btc.price"), Some("42000".into()));
    assert_eq!(engine.metrics().cache_hits, 1);

    // A different instance fingerprint forces the network; a 500 yields the
    // error sentinel, a resolved label, and a client-pool reset.
    state.fail.store(true, Ordering::SeqCst);
    let eth = instance("eth", "ticker", &[("base", &base), ("id", "ETH")]);
    assert!(!engine.execute_instance(&eth, &tmpl, &cancel).await);
    assert_eq!(sink.get_value("eth.price"), Some("Error".into()));
    assert_eq!(sink.get_value("Label.eth.price"), Some("ETH Price".into()));
    assert_eq!(engine.metrics().pool_resets, 1);

    // The cached BTC value is untouched by the ETH failure.
    assert_eq!(sink.get_value("btc.price"), Some("42000".into()));
}

#[tokio::test]
async fn test_concurrent_identical_requests_coalesce() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();

    let mut fetch = step("fetch", "{{base}}/slow");
    fetch.extract = vec![extract("v", "v")];
    let tmpl = Arc::new(template("slowpoke", vec![fetch], vec![output("v", "{{v}}")]));
    let inst = Arc::new(instance("slowpoke", "slowpoke", &[("base", &base)]));

    let mut executions = Vec::new();
    for _ in 0..5 {
        let engine = Arc::clone(&engine);
        let tmpl = Arc::clone(&tmpl);
        let inst = Arc::clone(&inst);
        executions.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            engine.execute_instance(&inst, &tmpl, &cancel).await
        }));
    }

    for execution in executions {
        assert!(execution.await.unwrap());
    }

    // All five executions shared one upstream call and saw the same body.
    assert_eq!(state.slow_hits.load(Ordering::SeqCst), 1);
    assert_eq!(engine.metrics().network_calls, 1);
    assert_eq!(sink.get_value("slowpoke.v"), Some("1".into()));
}

#[tokio::test]
async fn test_fan_out_leniency_one_of_three_targets() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    let mut fetch = step("fetch", "{{base}}/target/{{n}}");
    fetch.extract = vec![extract("val", "val")];
    let tmpl = template("multi", vec![fetch], vec![output("val", "{{val}}")]);

    let mut inst = instance("multi", "multi", &[("base", &base)]);
    for n in 0..3 {
        let mut target = InputMap::new();
        target.insert("n".into(), n.to_string());
        inst.targets.push(target);
    }

    // Only target 1 succeeds, which is enough for overall success.
    assert!(engine.execute_instance(&inst, &tmpl, &cancel).await);

    assert_eq!(sink.get_value("multi.1.val"), Some("ok".into()));
    assert_eq!(sink.get_value("multi.0.val"), Some("Error".into()));
    assert_eq!(sink.get_value("multi.2.val"), Some("Error".into()));

    let metrics = engine.metrics();
    assert_eq!(metrics.targets_succeeded, 1);
    assert_eq!(metrics.targets_failed, 2);
}

#[tokio::test]
async fn test_skip_guard_avoids_network_entirely() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    let mut fetch = step("fetch", "{{base}}/price/{{id}}");
    fetch.skip_if_set = "token".into();
    let tmpl = template("guarded", vec![fetch], vec![output("out", "{{token}}")]);
    let inst = instance(
        "guarded",
        "guarded",
        &[("base", &base), ("id", "X"), ("token", "present")],
    );

    assert!(engine.execute_instance(&inst, &tmpl, &cancel).await);
    assert_eq!(state.price_hits.load(Ordering::SeqCst), 0);
    assert_eq!(engine.metrics().network_calls, 0);
    assert_eq!(sink.get_value("guarded.out"), Some("present".into()));
}

#[tokio::test]
async fn test_failed_responses_are_never_cached() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, _sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    let mut fetch = step("fetch", "{{base}}/flaky");
    fetch.cache_minutes = 5;
    let tmpl = template("flaky", vec![fetch], vec![output("v", "{{v}}")]);
    let inst = instance("flaky", "flaky", &[("base", &base)]);

    assert!(!engine.execute_instance(&inst, &tmpl, &cancel).await);
    assert!(!engine.execute_instance(&inst, &tmpl, &cancel).await);

    // Both executions reached the upstream; nothing was cached.
    assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 2);
    assert_eq!(engine.cached_responses(), 0);
}

#[tokio::test]
async fn test_label_default_substitution_on_missing_input() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    let mut fetch = step("fetch", "{{base}}/flaky");
    fetch.extract = vec![extract("temp", "temp")];
    let mut out = output("temp", "{{temp}}");
    out.label = Some("{{city}} Weather".into());
    let mut tmpl = template("weather", vec![fetch], vec![out]);
    tmpl.inputs = vec![InputSpec {
        key: "city".into(),
        default: Some("NYC".into()),
    }];

    // The instance never set "city"; the step fails with a 500.
    let inst = instance("weather", "weather", &[("base", &base)]);
    assert!(!engine.execute_instance(&inst, &tmpl, &cancel).await);

    assert_eq!(sink.get_value("weather.temp"), Some("Error".into()));
    assert_eq!(
        sink.get_value("Label.weather.temp"),
        Some("NYC Weather".into())
    );
}

#[tokio::test]
async fn test_cancelled_execution_writes_nothing() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();

    let mut fetch = step("fetch", "{{base}}/price/{{id}}");
    fetch.extract = vec![extract("price", "price")];
    let tmpl = template("ticker", vec![fetch], vec![output("price", "{{price}}")]);
    let inst = instance("btc", "ticker", &[("base", &base), ("id", "BTC")]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(!engine.execute_instance(&inst, &tmpl, &cancel).await);
    assert!(sink.is_empty());
    assert_eq!(state.price_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disabled_instance_is_a_noop() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    let tmpl = template(
        "ticker",
        vec![step("fetch", "{{base}}/price/BTC")],
        vec![output("price", "{{price}}")],
    );
    let mut inst = instance("btc", "ticker", &[("base", &base)]);
    inst.enabled = false;

    assert!(!engine.execute_instance(&inst, &tmpl, &cancel).await);
    assert!(sink.is_empty());
    assert_eq!(state.price_hits.load(Ordering::SeqCst), 0);
}

struct QuoteResolver;

#[async_trait]
impl NativeResolver for QuoteResolver {
    async fn resolve(&self, _host: &str, args: &[(String, String)]) -> EngineResult<String> {
        let sym = args
            .iter()
            .find(|(k, _)| k == "sym")
            .map(|(_, v)| v.as_str())
            .unwrap_or("?");
        Ok(format!(r#"{{"quote": "{sym}:1.23"}}"#))
    }
}

#[tokio::test]
async fn test_native_scheme_dispatches_to_resolver() {
    let sink = Arc::new(MemorySink::new());
    let mut natives = NativeRegistry::new();
    natives.register("quote", Arc::new(QuoteResolver));
    let engine = Arc::new(
        Engine::with_natives(Config::default(), sink.clone(), natives).unwrap(),
    );
    let cancel = CancellationToken::new();

    let mut fetch = step("fetch", "native://quote?sym={{id}}");
    fetch.extract = vec![extract("quote", "quote")];
    let tmpl = template("quote", vec![fetch], vec![output("quote", "{{quote}}")]);
    let inst = instance("q1", "quote", &[("id", "BTC")]);

    assert!(engine.execute_instance(&inst, &tmpl, &cancel).await);
    assert_eq!(sink.get_value("q1.quote"), Some("BTC:1.23".into()));
    // Native dispatch bypasses the HTTP transport.
    assert_eq!(engine.metrics().network_calls, 0);
}

#[tokio::test]
async fn test_chained_steps_share_context_in_order() {
    let state = Arc::new(MockState::default());
    let base = start_mock_server(state.clone()).await;
    let (engine, sink) = engine_with_sink();
    let cancel = CancellationToken::new();

    // Step one discovers the symbol; step two uses it in its URL.
    let mut first = step("discover", "{{base}}/price/SEED");
    first.extract = vec![extract("sym", "symbol")];
    let mut second = step("quote", "{{base}}/price/{{sym}}");
    second.extract = vec![extract("price", "price")];

    let tmpl = template(
        "chained",
        vec![first, second],
        vec![output("price", "{{price}}")],
    );
    let inst = instance("chain", "chained", &[("base", &base)]);

    assert!(engine.execute_instance(&inst, &tmpl, &cancel).await);
    assert_eq!(state.price_hits.load(Ordering::SeqCst), 2);
    assert_eq!(sink.get_value("chain.price"), Some("42000".into()));
}
