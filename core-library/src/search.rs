//! Type-ahead search
//!
//! Each [`DebouncedSearch::submit`] replaces the pending request: the old
//! timer is cancelled and a new one scheduled. Results are published on a
//! `watch` channel; a generation counter keeps a slow, superseded response
//! from overwriting a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use core_auth::ApiClient;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};
use crate::models::SearchHit;

/// Quiet period before a query is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Shorter queries are not sent.
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub loading: bool,
}

pub struct DebouncedSearch {
    api: ApiClient,
    delay: Duration,
    state: Arc<watch::Sender<SearchState>>,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<CancellationToken>>,
}

impl DebouncedSearch {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            api,
            delay: SEARCH_DEBOUNCE,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Schedule a search for `query`. Must be called inside a tokio runtime.
    pub fn submit(&self, query: impl Into<String>) {
        let query = query.into();
        let generation = self.supersede();

        if query.chars().count() < MIN_QUERY_CHARS {
            self.state.send_replace(SearchState {
                query,
                results: Vec::new(),
                loading: false,
            });
            return;
        }

        self.state.send_modify(|state| {
            state.query = query.clone();
            state.loading = true;
        });

        let token = CancellationToken::new();
        self.set_pending(Some(token.clone()));

        let api = self.api.clone();
        let delay = self.delay;
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let results = tokio::select! {
                _ = token.cancelled() => return,
                results = fetch_hits(&api, &query) => results,
            };

            if current.load(Ordering::SeqCst) != generation {
                debug!(query = %query, "Dropping superseded search results");
                return;
            }

            let results = results.unwrap_or_else(|e| {
                warn!(error = %e, "Search failed");
                Vec::new()
            });
            state.send_replace(SearchState {
                query,
                results,
                loading: false,
            });
        });
    }

    /// Drop any pending search and go idle, keeping the last query text.
    pub fn cancel(&self) {
        self.supersede();
        self.state.send_modify(|state| state.loading = false);
    }

    /// Cancel the pending timer and start a new generation.
    fn supersede(&self) -> u64 {
        self.set_pending(None);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set_pending(&self, token: Option<CancellationToken>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = std::mem::replace(&mut *pending, token) {
            previous.cancel();
        }
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.set_pending(None);
    }
}

impl std::fmt::Debug for DebouncedSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedSearch")
            .field("delay", &self.delay)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// `GET /search?q=...`, skipping malformed hits.
pub async fn fetch_hits(api: &ApiClient, query: &str) -> Result<Vec<SearchHit>> {
    let encoded = serde_urlencoded::to_string([("q", query)])
        .map_err(|e| LibraryError::invalid("query", e.to_string()))?;
    let body: Value = api.get_json(&format!("/search?{}", encoded)).await?;

    let Value::Array(items) = body else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{respond, signed_in, MockHttpClient};

    async fn settled(rx: &mut watch::Receiver<SearchState>) -> SearchState {
        loop {
            {
                let state = rx.borrow_and_update();
                if !state.loading {
                    return state.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_keystroke_is_sent() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.ends_with("/search?q=roc"))
            .times(1)
            .returning(|_| respond(200, r#"[{"id":1,"name":"Rock Anthem"},{"bogus":true}]"#));
        http.expect_execute()
            .withf(|req| req.url.ends_with("/search?q=ro"))
            .never();

        let ctx = signed_in(http, "Listener").await;
        let search = DebouncedSearch::new(ctx.service.api().clone());
        let mut rx = search.subscribe();

        search.submit("ro");
        assert!(search.state().loading);
        search.submit("roc");

        let state = settled(&mut rx).await;
        assert_eq!(state.query, "roc");
        assert_eq!(
            state.results,
            vec![SearchHit {
                id: "1".to_string(),
                name: "Rock Anthem".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_cancels_pending() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.contains("/search"))
            .never();

        let ctx = signed_in(http, "Listener").await;
        let search = DebouncedSearch::new(ctx.service.api().clone());

        search.submit("jazz");
        search.submit("j");
        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;

        let state = search.state();
        assert!(!state.loading);
        assert!(state.results.is_empty());
        assert_eq!(state.query, "j");
    }

    #[tokio::test(start_paused = true)]
    async fn test_length_counts_spaces() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.ends_with("/search?q=+j"))
            .times(1)
            .returning(|_| respond(200, "[]"));

        let ctx = signed_in(http, "Listener").await;
        let search = DebouncedSearch::new(ctx.service.api().clone());
        let mut rx = search.subscribe();

        search.submit(" j");
        assert!(search.state().loading);
        let state = settled(&mut rx).await;
        assert_eq!(state.query, " j");
        assert!(state.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_publishes_empty_results() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.ends_with("/search?q=lo-fi+beats"))
            .times(1)
            .returning(|_| respond(503, ""));

        let ctx = signed_in(http, "Listener").await;
        let search = DebouncedSearch::new(ctx.service.api().clone());
        let mut rx = search.subscribe();

        search.submit("lo-fi beats");
        let state = settled(&mut rx).await;
        assert!(state.results.is_empty());
    }
}
