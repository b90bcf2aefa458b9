//! Shared fixtures for this crate's tests.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::SecureStore;
use core_auth::{ApiClient, SessionHandle, SessionManager};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use mockall::mock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::tracks::TrackService;

pub(crate) const BASE_URL: &str = "http://api.test/api";

mock! {
    pub HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

pub(crate) fn respond(status: u16, body: &str) -> BridgeResult<HttpResponse> {
    Ok(HttpResponse::new(status, body.to_string()))
}

#[derive(Default)]
pub(crate) struct MemorySecureStore {
    storage: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub(crate) async fn is_empty(&self) -> bool {
        self.storage.lock().await.is_empty()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.storage
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.storage.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.storage.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.storage.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.storage.lock().await.clear();
        Ok(())
    }
}

pub(crate) struct SignedIn {
    pub service: TrackService,
    pub secure: Arc<MemorySecureStore>,
    pub events: Receiver<CoreEvent>,
}

impl SignedIn {
    pub(crate) fn drain(&mut self) -> Vec<CoreEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

/// Log `ana` in with `role` through the real session manager, then hand back
/// a track service on the same session. Login events are already drained.
pub(crate) async fn signed_in(mut http: MockHttpClient, role: &str) -> SignedIn {
    let me = format!(
        r#"{{"id":1,"username":"ana","email":"ana@example.com","role":"{}"}}"#,
        role
    );
    http.expect_execute()
        .withf(|req| req.method == HttpMethod::Post && req.url == format!("{}/auth/login", BASE_URL))
        .times(1)
        .returning(|_| respond(200, r#"{"token":"tok"}"#));
    http.expect_execute()
        .withf(|req| req.method == HttpMethod::Get && req.url == format!("{}/users/me", BASE_URL))
        .times(1)
        .returning(move |_| respond(200, &me));

    let secure = Arc::new(MemorySecureStore::default());
    let bus = EventBus::new(64);
    let events = bus.subscribe();
    let session = SessionHandle::new(secure.clone(), bus, "/login");
    let api = ApiClient::new(Arc::new(http), BASE_URL, session);

    SessionManager::new(api.clone())
        .login("ana", "secret")
        .await
        .expect("fixture login");

    let mut ctx = SignedIn {
        service: TrackService::new(api),
        secure,
        events,
    };
    ctx.drain();
    ctx
}
