//! Single HTTP fetch: method dispatch, status check, body decode

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::plugin::HttpMethod;

/// Issue one request and return the decoded body.
///
/// Non-2xx statuses are hard failures so error pages never reach extraction
/// or the cache. HEAD requests discard the body by design (existence
/// checks). The body decodes as UTF-8 unless `charset` names a fallback for
/// responses that do not declare their own.
pub async fn fetch(
    client: &Client,
    method: HttpMethod,
    url: &str,
    body: &str,
    headers: &[(String, String)],
    charset: Option<&str>,
) -> Result<String> {
    debug!(%url, ?method, "issuing request");

    let mut request = match method {
        HttpMethod::Get => client.get(url),
        HttpMethod::Head => client.head(url),
        HttpMethod::Post => {
            let mut req = client.post(url);
            if !body.is_empty() {
                req = req
                    .header(CONTENT_TYPE, "application/json; charset=utf-8")
                    .body(body.to_string());
            }
            req
        }
    };

    for (name, value) in headers {
        request = request.header(name, value);
    }

    let response = request.send().await.map_err(|e| classify(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EngineError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    if method == HttpMethod::Head {
        return Ok(String::new());
    }

    let text = response
        .text_with_charset(charset.unwrap_or("utf-8"))
        .await
        .map_err(|e| EngineError::Network(format!("failed to read body from {url}: {e}")))?;

    debug!(%url, size = text.len(), "request completed");
    Ok(text)
}

fn classify(url: &str, err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout(format!("{url}: {err}"))
    } else if err.is_builder() {
        EngineError::InvalidRequest(format!("{url}: {err}"))
    } else {
        EngineError::Network(format!("{url}: {err}"))
    }
}
