//! Concurrent fan-out with per-item time limits
//!
//! Every item runs on its own task under a child of the caller's cancellation
//! token. An item that exceeds the limit has its token cancelled and is
//! reported as timed out; an item that panics is reported as panicked. The
//! caller always gets back exactly one result per item, in dispatch order.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FanOutError {
    #[error("{item}: {message}")]
    Failed { item: String, message: String },

    #[error("{item}: timed out after {after:?}")]
    TimedOut { item: String, after: Duration },

    #[error("{item}: task panicked")]
    Panicked { item: String },
}

/// Outcome of one fanned-out item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// Identifier the item was dispatched under
    pub source: String,
    pub outcome: Result<String, FanOutError>,
}

impl ItemResult {
    /// The produced artifact, empty when the item failed
    pub fn artifact(&self) -> &str {
        self.outcome.as_deref().unwrap_or_default()
    }

    pub fn error(&self) -> Option<&FanOutError> {
        self.outcome.as_ref().err()
    }
}

/// All item results of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiResult {
    pub results: Vec<ItemResult>,
}

impl MultiResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Source -> artifact for every successful item; sources are expected to be unique
    pub fn artifacts(&self) -> BTreeMap<String, String> {
        self.results
            .iter()
            .filter_map(|r| {
                r.outcome
                    .as_ref()
                    .ok()
                    .map(|artifact| (r.source.clone(), artifact.clone()))
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&FanOutError> {
        self.results.iter().filter_map(ItemResult::error).collect()
    }

    /// All item errors joined into one message, `None` when every item succeeded
    pub fn combined_error(&self) -> Option<String> {
        let errors = self.errors();
        if errors.is_empty() {
            return None;
        }
        Some(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Runs `op` on every item concurrently and gathers one result per item
///
/// `op` receives the item and a token that is cancelled when the item times
/// out or the parent token is cancelled. Work it spawns should watch that
/// token; the future itself is dropped on timeout.
pub async fn fan_out<T, F, Fut>(
    label: &str,
    items: Vec<(String, T)>,
    limit: Duration,
    cancel: &CancellationToken,
    op: F,
) -> MultiResult
where
    T: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    debug!(label, count = items.len(), "Fanning out");

    let handles: Vec<(String, JoinHandle<Result<String, FanOutError>>)> = items
        .into_iter()
        .map(|(source, item)| {
            let token = cancel.child_token();
            let work = op(item, token.clone());
            let item_id = source.clone();

            let handle = tokio::spawn(async move {
                tokio::select! {
                    result = work => result.map_err(|e| FanOutError::Failed {
                        item: item_id,
                        message: format!("{:#}", e),
                    }),
                    _ = tokio::time::sleep(limit) => {
                        token.cancel();
                        Err(FanOutError::TimedOut { item: item_id, after: limit })
                    }
                }
            });
            (source, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (source, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                warn!(label, item = %source, "Fan-out task died: {}", join_error);
                Err(FanOutError::Panicked {
                    item: source.clone(),
                })
            }
        };

        if let Err(e) = &outcome {
            warn!(label, "Item failed: {}", e);
        }
        results.push(ItemResult { source, outcome });
    }

    MultiResult { results }
}
