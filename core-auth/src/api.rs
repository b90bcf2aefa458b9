//! # REST API Client
//!
//! The single outbound path to the Audtream REST API.
//!
//! Every request gets `Accept: application/json` and the configured timeout.
//! When a session is held and the request has no `Authorization` header yet,
//! the bearer token is attached.
//!
//! Responses are mapped into [`ApiError`]:
//!
//! | Outcome                   | Result                                  |
//! |---------------------------|-----------------------------------------|
//! | transport failure         | `Network`, session untouched            |
//! | 401                       | forced logout, then `Unauthorized`      |
//! | other 4xx / 5xx           | `Status` with the server's message      |
//! | 2xx with an unusable body | `InvalidResponse`                       |
//!
//! A 401 on a request that carried no bearer token (wrong credentials on
//! login) still runs the teardown but is reported as `Status { 401, .. }`
//! so the server's message reaches the login form.

use crate::error::{ApiError, ApiResult};
use crate::session::SessionHandle;
use bridge_traits::http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::SignOutReason;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        session: SessionHandle,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            session,
        }
    }

    pub fn from_config(config: &CoreConfig, session: SessionHandle) -> Self {
        Self::new(config.http_client.clone(), config.api_base_url.clone(), session)
            .with_timeout(config.request_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Absolute URL for an API path such as `/tracks`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request skeleton with the default headers and timeout.
    pub fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.endpoint(path))
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    /// Send `request` and map the outcome.
    ///
    /// Non-2xx statuses are turned into errors here; a 401 tears the session
    /// down before returning.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, mut request: HttpRequest) -> ApiResult<HttpResponse> {
        if !request.is_authenticated() {
            if let Some(token) = self.session.token().await {
                request = request.bearer_token(token);
            }
        }
        self.dispatch(request).await
    }

    /// Like [`send`](Self::send) but never attaches the session token.
    ///
    /// Used for credential exchanges, where a 401 means the submitted
    /// credentials were wrong and the server's message must come through.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn send_anonymous(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let authenticated = request.is_authenticated();

        let response = self
            .http
            .execute_with_retry(request, self.retry.clone())
            .await
            .map_err(|e| {
                warn!(error = %e, "Request failed before a response arrived");
                ApiError::Network(e.to_string())
            })?;

        if response.is_success() {
            debug!(status = response.status, "Request succeeded");
            return Ok(response);
        }

        let message = extract_message(&response.body);

        if response.is_unauthorized() {
            warn!(authenticated, "Server rejected credentials, forcing logout");
            self.session
                .force_logout(SignOutReason::SessionExpired)
                .await;
            return Err(if authenticated {
                ApiError::Unauthorized
            } else {
                ApiError::Status {
                    status: response.status,
                    message,
                }
            });
        }

        warn!(status = response.status, "Server returned an error status");
        Err(ApiError::Status {
            status: response.status,
            message,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.send(self.request(HttpMethod::Get, path)).await?;
        decode(&response)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = with_json(self.request(HttpMethod::Post, path), body)?;
        decode(&self.send(request).await?)
    }

    /// POST a JSON body through [`send_anonymous`](Self::send_anonymous).
    pub async fn post_json_anonymous<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = with_json(self.request(HttpMethod::Post, path), body)?;
        decode(&self.send_anonymous(request).await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = with_json(self.request(HttpMethod::Put, path), body)?;
        decode(&self.send(request).await?)
    }

    /// POST without a body; the raw response is returned.
    pub async fn post_empty(&self, path: &str) -> ApiResult<HttpResponse> {
        self.send(self.request(HttpMethod::Post, path)).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> ApiResult<T> {
        let request = self.request(HttpMethod::Post, path).multipart(form);
        decode(&self.send(request).await?)
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send(self.request(HttpMethod::Delete, path)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn with_json<B: Serialize + ?Sized>(request: HttpRequest, body: &B) -> ApiResult<HttpRequest> {
    request
        .json(&body)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request: {}", e)))
}

/// Decode a JSON body.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> ApiResult<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        warn!(error = %e, "Response body did not match the expected shape");
        ApiError::InvalidResponse(e.to_string())
    })
}

/// Pull a user-facing message out of an error body.
///
/// Tried in order: a non-empty `message` field of a JSON object, a non-empty
/// JSON string, a non-empty plain-text body.
pub fn extract_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        Ok(serde_json::Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Ok(_) => None,
        Err(_) => std::str::from_utf8(body)
            .ok()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}
