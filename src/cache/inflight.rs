//! In-flight request coalescing
//!
//! Concurrent fetches for the same fingerprint attach to one underlying
//! request instead of hitting the upstream N times. The table entry is
//! removed the moment the fetch settles, however many waiters attached.
//!
//! Waiting is cancellable per caller: abandoning a wait returns `Cancelled`
//! for that caller only, while the spawned fetch runs to completion for the
//! remaining waiters and for cache population.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{EngineError, Result};

type SharedFetch = Shared<BoxFuture<'static, Result<String>>>;

#[derive(Default)]
pub struct InflightTable {
    pending: DashMap<String, SharedFetch>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetch` for `key`, or join the fetch already in flight for it.
    ///
    /// The fetch itself is spawned without the caller's token: only the wait
    /// observes `cancel`, so one impatient caller cannot kill the response
    /// for everyone else.
    pub async fn fetch_or_join<F>(
        self: &Arc<Self>,
        key: &str,
        cancel: &CancellationToken,
        fetch: F,
    ) -> Result<String>
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        let mut settle: Option<oneshot::Sender<Result<String>>> = None;

        let shared = match self.pending.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!(fingerprint = key, "joining in-flight fetch");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = oneshot::channel::<Result<String>>();
                let shared: SharedFetch = async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(EngineError::Network(
                            "fetch task dropped before settling".into(),
                        ))
                    })
                }
                .boxed()
                .shared();
                entry.insert(shared.clone());
                settle = Some(tx);
                shared
            }
        };

        if let Some(tx) = settle {
            let table = Arc::clone(self);
            let key = key.to_string();
            tokio::spawn(async move {
                let result = fetch.await;
                // Remove before settling so no new waiter can attach to a
                // finished fetch.
                table.pending.remove(&key);
                let _ = tx.send(result);
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            result = shared => result,
        }
    }

    /// Whether a fetch for `key` is currently in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
