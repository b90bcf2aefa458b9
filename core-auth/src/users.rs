//! Public user lookup.

use crate::api::{decode, ApiClient};
use crate::error::{AuthError, Result};
use crate::types::User;
use bridge_traits::http::HttpMethod;
use tracing::instrument;
use url::Url;

/// `GET /users/{handle}` where `handle` is a username or numeric id.
///
/// The handle is percent-encoded as a single path segment.
#[instrument(skip(api))]
pub async fn fetch_user(api: &ApiClient, handle: &str) -> Result<User> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(AuthError::InvalidInput {
            field: "handle".to_string(),
            message: "User handle cannot be empty".to_string(),
        });
    }

    let mut url = Url::parse(&api.endpoint("/users")).map_err(|e| AuthError::InvalidInput {
        field: "handle".to_string(),
        message: format!("Invalid API URL: {}", e),
    })?;
    url.path_segments_mut()
        .map_err(|_| AuthError::InvalidInput {
            field: "handle".to_string(),
            message: "API URL cannot take path segments".to_string(),
        })?
        .push(handle);

    let mut request = api.request(HttpMethod::Get, "/users");
    request.url = url.into();

    let response = api.send(request).await?;
    Ok(decode(&response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionHandle;
    use crate::session_store::tests::MockSecureStore;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use core_runtime::events::EventBus;
    use mockall::mock;
    use std::sync::Arc;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn api(http: MockHttpClient) -> ApiClient {
        let session = SessionHandle::new(Arc::new(MockSecureStore::new()), EventBus::new(4), "/login");
        ApiClient::new(Arc::new(http), "http://api.test/api", session)
    }

    #[tokio::test]
    async fn test_fetch_user_encodes_handle() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url == "http://api.test/api/users/dj%20ana%2F2")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"id":3,"username":"dj ana/2","email":"","role":"Artist"}"#,
                ))
            });

        let user = fetch_user(&api(http), " dj ana/2 ").await.unwrap();
        assert_eq!(user.id, "3");
        assert!(user.is_artist());
    }

    #[tokio::test]
    async fn test_fetch_user_not_found() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(404, r#"{"message":"User not found"}"#)));

        let err = fetch_user(&api(http), "ghost").await.unwrap_err();
        match err {
            AuthError::Api(api_err) => {
                assert_eq!(api_err.message_or("Failed to load user"), "User not found")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_user_rejects_blank_handle() {
        let mut http = MockHttpClient::new();
        http.expect_execute().never();

        assert!(matches!(
            fetch_user(&api(http), "  ").await,
            Err(AuthError::InvalidInput { .. })
        ));
    }
}
