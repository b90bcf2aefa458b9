//! Track endpoints
//!
//! [`TrackService`] wraps the `/tracks` family of calls on top of the shared
//! [`ApiClient`]. A 401 from any of them ends the session inside the client;
//! the service just reports the error.

use bridge_traits::http::{HttpMethod, MultipartForm};
use core_auth::{ApiClient, ApiError};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::{LibraryError, Result};
use crate::models::{tracks_from_json, DashboardStats, NewTrack, Track, TrackRequest};

/// A track with the extras of the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDetails {
    pub track: Track,
    /// Absent when the server had no playable URL for it.
    pub stream_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TrackService {
    api: ApiClient,
    event_bus: EventBus,
}

impl TrackService {
    pub fn new(api: ApiClient) -> Self {
        let event_bus = api.session().event_bus().clone();
        Self { api, event_bus }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// `GET /tracks`, decoded leniently.
    #[instrument(skip(self))]
    pub async fn list_tracks(&self) -> Result<Vec<Track>> {
        let body: Value = self.api.get_json("/tracks").await?;
        let tracks = tracks_from_json(body);

        info!(count = tracks.len(), "Loaded tracks");
        self.emit(LibraryEvent::TracksLoaded {
            count: tracks.len(),
        });
        Ok(tracks)
    }

    /// Upload a new track. Only artists may upload.
    #[instrument(skip(self, upload), fields(title = %upload.title))]
    pub async fn create_track(&self, upload: &NewTrack) -> Result<Track> {
        let user = self
            .api
            .session()
            .current_user()
            .await
            .ok_or_else(|| LibraryError::Forbidden("Please log in to upload tracks".to_string()))?;
        if !user.is_artist() {
            return Err(LibraryError::Forbidden(
                "Only artists can upload tracks".to_string(),
            ));
        }

        upload.validate()?;
        let form = upload_form(upload, &user.username)?;

        let body: Value = self.api.post_multipart("/tracks", form).await?;
        let track = decode_track(body)?;

        info!(track_id = %track.id, "Track uploaded");
        self.emit(LibraryEvent::TrackUploaded {
            track_id: track.id.clone(),
            title: track.title.clone(),
        });
        Ok(track)
    }

    #[instrument(skip(self, request))]
    pub async fn update_track(&self, id: &str, request: &TrackRequest) -> Result<Track> {
        let path = track_path(id, "")?;
        if request.title.trim().is_empty() {
            return Err(LibraryError::invalid("title", "Please enter a track title"));
        }

        let body: Value = self.api.put_json(&path, request).await?;
        let track = decode_track(body)?;

        self.emit(LibraryEvent::TrackUpdated {
            track_id: track.id.clone(),
        });
        Ok(track)
    }

    #[instrument(skip(self))]
    pub async fn delete_track(&self, id: &str) -> Result<()> {
        let path = track_path(id, "")?;
        self.api.delete(&path).await?;

        info!(track_id = id, "Track deleted");
        self.emit(LibraryEvent::TrackDeleted {
            track_id: id.to_string(),
        });
        Ok(())
    }

    /// `POST /tracks/{id}/like`. Returns the new like count if the server
    /// sent one.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, id: &str) -> Result<Option<u64>> {
        let path = track_path(id, "/like")?;
        let response = self.api.post_empty(&path).await?;

        let likes = match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Object(map)) => map.get("likes").and_then(Value::as_u64),
            Ok(Value::Number(n)) => n.as_u64(),
            _ => None,
        };

        self.emit(LibraryEvent::TrackLiked {
            track_id: id.to_string(),
            likes,
        });
        Ok(likes)
    }

    /// `POST /tracks/{id}/play`.
    #[instrument(skip(self))]
    pub async fn record_play(&self, id: &str) -> Result<()> {
        let path = track_path(id, "/play")?;
        self.api.post_empty(&path).await?;
        Ok(())
    }

    /// `GET /tracks/{id}/url`. The body is the URL itself, bare or as a JSON
    /// string.
    #[instrument(skip(self))]
    pub async fn stream_url(&self, id: &str) -> Result<String> {
        let path = track_path(id, "/url")?;
        let response = self.api.send(self.api.request(HttpMethod::Get, &path)).await?;

        let url = match serde_json::from_slice::<String>(&response.body) {
            Ok(url) => url,
            Err(_) => String::from_utf8_lossy(&response.body).into_owned(),
        };
        let url = url.trim();
        if url.is_empty() {
            return Err(ApiError::InvalidResponse("Empty stream URL".to_string()).into());
        }
        Ok(url.to_string())
    }

    /// `GET /users/dashboard/stats` for the signed-in artist.
    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Ok(self.api.get_json("/users/dashboard/stats").await?)
    }

    /// A track from a fresh snapshot plus its stream URL.
    #[instrument(skip(self))]
    pub async fn track_details(&self, id: &str) -> Result<TrackDetails> {
        let track = self
            .list_tracks()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Track".to_string(),
                id: id.to_string(),
            })?;

        let stream_url = match self.stream_url(id).await {
            Ok(url) => Some(url),
            Err(e) if e.is_unauthorized() => return Err(e),
            Err(e) => {
                warn!(track_id = id, error = %e, "No stream URL for track");
                None
            }
        };

        Ok(TrackDetails { track, stream_url })
    }

    fn emit(&self, event: LibraryEvent) {
        let _ = self.event_bus.emit(CoreEvent::Library(event));
    }
}

/// `/tracks/{id}{suffix}` with `id` percent-encoded as one path segment.
fn track_path(id: &str, suffix: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(LibraryError::invalid("id", "Invalid track id"));
    }

    let mut url = Url::parse("http://tracks.invalid/tracks")
        .map_err(|e| LibraryError::invalid("id", e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| LibraryError::invalid("id", "Invalid track id"))?
        .push(id);
    Ok(format!("{}{}", url.path(), suffix))
}

fn upload_form(upload: &NewTrack, uploader: &str) -> Result<MultipartForm> {
    let mut form = MultipartForm::new();

    if let Some(audio) = &upload.audio {
        form = form.file(
            "audioFile",
            audio.file_name.clone(),
            audio.mime_type.clone(),
            audio.data.clone(),
        );
    }
    if let Some(cover) = &upload.cover {
        form = form.file(
            "coverImage",
            cover.file_name.clone(),
            cover.mime_type.clone(),
            cover.data.clone(),
        );
    }

    form.json("metadata", &upload.metadata(uploader))
        .map_err(|e| LibraryError::invalid("metadata", e.to_string()))
}

/// Accept both a bare track and `{ "track": {...} }`.
fn decode_track(body: Value) -> Result<Track> {
    let body = match body {
        Value::Object(mut map) if map.get("track").is_some_and(Value::is_object) => {
            map.remove("track").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadFile;
    use crate::test_support::{respond, signed_in, MockHttpClient, BASE_URL};
    use core_auth::{AuthStatus, SESSION_EXPIRED_MESSAGE};
    use core_runtime::events::{AuthEvent, SignOutReason};

    fn path_is(req: &bridge_traits::http::HttpRequest, method: HttpMethod, path: &str) -> bool {
        req.method == method && req.url == format!("http://api.test/api{}", path)
    }

    #[tokio::test]
    async fn test_list_tracks_sends_bearer_and_emits() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                path_is(req, HttpMethod::Get, "/tracks")
                    && req.headers.get("Authorization").map(String::as_str) == Some("Bearer tok")
            })
            .times(1)
            .returning(|_| respond(200, r#"[{"id":1,"title":"Night"},{"id":2,"title":"Day"}]"#));

        let mut ctx = signed_in(http, "Listener").await;
        let tracks = ctx.service.list_tracks().await.unwrap();

        assert_eq!(tracks.len(), 2);
        assert!(ctx.drain().contains(&CoreEvent::Library(LibraryEvent::TracksLoaded { count: 2 })));
    }

    #[tokio::test]
    async fn test_malformed_track_list_is_empty() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/tracks"))
            .returning(|_| respond(200, r#"{"error":"unexpected"}"#));

        let ctx = signed_in(http, "Listener").await;
        assert!(ctx.service.list_tracks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_list_ends_session() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/tracks"))
            .times(1)
            .returning(|_| respond(401, ""));

        let mut ctx = signed_in(http, "Listener").await;
        let err = ctx.service.list_tracks().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), SESSION_EXPIRED_MESSAGE);
        assert_eq!(ctx.service.api().session().status().await, AuthStatus::LoggedOut);
        assert!(ctx.secure.is_empty().await);

        let events = ctx.drain();
        assert!(events.contains(&CoreEvent::Auth(AuthEvent::SignedOut {
            reason: SignOutReason::SessionExpired
        })));
        assert!(events.contains(&CoreEvent::Auth(AuthEvent::RedirectToLogin {
            path: "/login".to_string()
        })));
    }

    #[tokio::test]
    async fn test_delete_track() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Delete, "/tracks/7"))
            .times(1)
            .returning(|_| respond(204, ""));

        let mut ctx = signed_in(http, "Artist").await;
        ctx.service.delete_track("7").await.unwrap();

        assert!(ctx.drain().contains(&CoreEvent::Library(LibraryEvent::TrackDeleted {
            track_id: "7".to_string()
        })));
    }

    #[tokio::test]
    async fn test_delete_reports_server_message() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Delete, "/tracks/7"))
            .returning(|_| respond(403, r#"{"message":"Not your track"}"#));

        let ctx = signed_in(http, "Artist").await;
        let err = ctx.service.delete_track("7").await.unwrap_err();
        assert_eq!(err.user_message(), "Not your track");
        assert_eq!(ctx.service.api().session().status().await, AuthStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_bad_track_id_never_hits_the_network() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.contains("/tracks"))
            .never();

        let ctx = signed_in(http, "Artist").await;
        assert!(matches!(
            ctx.service.delete_track(" ").await,
            Err(LibraryError::InvalidInput { .. })
        ));
        assert!(ctx.service.record_play("\t").await.is_err());
    }

    #[tokio::test]
    async fn test_track_id_is_percent_encoded() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url == format!("{}/tracks/a%2Fb%3Fx%23y%20z/play", BASE_URL))
            .times(1)
            .returning(|_| respond(200, ""));

        let ctx = signed_in(http, "Listener").await;
        ctx.service.record_play("a/b?x#y z").await.unwrap();
    }

    fn new_track() -> NewTrack {
        NewTrack {
            title: "Night".to_string(),
            genre: "Rock".to_string(),
            duration: 200,
            audio: Some(UploadFile::new("night.mp3", "audio/mpeg", b"ID3".to_vec())),
            cover: Some(UploadFile::new("cover.png", "image/png", b"PNG".to_vec())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_track_uploads_multipart() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                let body = req
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                path_is(req, HttpMethod::Post, "/tracks")
                    && req
                        .headers
                        .get("Content-Type")
                        .is_some_and(|c| c.starts_with("multipart/form-data; boundary="))
                    && body.contains("name=\"audioFile\"; filename=\"night.mp3\"")
                    && body.contains("name=\"coverImage\"; filename=\"cover.png\"")
                    && body.contains("name=\"metadata\"")
                    && body.contains(r#""artist":"ana""#)
            })
            .times(1)
            .returning(|_| respond(201, r#"{"id":9,"title":"Night","artist":"ana","genre":"Rock"}"#));

        let mut ctx = signed_in(http, "Artist").await;
        let track = ctx.service.create_track(&new_track()).await.unwrap();

        assert_eq!(track.id, "9");
        assert!(ctx.drain().contains(&CoreEvent::Library(LibraryEvent::TrackUploaded {
            track_id: "9".to_string(),
            title: "Night".to_string()
        })));
    }

    #[tokio::test]
    async fn test_create_track_requires_artist() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Post, "/tracks"))
            .never();

        let ctx = signed_in(http, "Listener").await;
        assert!(matches!(
            ctx.service.create_track(&new_track()).await,
            Err(LibraryError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_create_track_validates_before_sending() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Post, "/tracks"))
            .never();

        let ctx = signed_in(http, "Artist").await;
        let mut upload = new_track();
        upload.audio = None;

        let err = ctx.service.create_track(&upload).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select an audio file to upload");
    }

    #[tokio::test]
    async fn test_toggle_like_with_empty_body() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Post, "/tracks/3/like"))
            .returning(|_| respond(200, ""));

        let mut ctx = signed_in(http, "Listener").await;
        assert_eq!(ctx.service.toggle_like("3").await.unwrap(), None);
        assert!(ctx.drain().contains(&CoreEvent::Library(LibraryEvent::TrackLiked {
            track_id: "3".to_string(),
            likes: None
        })));
    }

    #[tokio::test]
    async fn test_stream_url_accepts_plain_and_quoted() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/tracks/1/url"))
            .returning(|_| respond(200, "https://cdn.test/1.mp3\n"));
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/tracks/2/url"))
            .returning(|_| respond(200, r#""https://cdn.test/2.mp3""#));

        let ctx = signed_in(http, "Listener").await;
        assert_eq!(ctx.service.stream_url("1").await.unwrap(), "https://cdn.test/1.mp3");
        assert_eq!(ctx.service.stream_url("2").await.unwrap(), "https://cdn.test/2.mp3");
    }

    #[tokio::test]
    async fn test_track_details() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/tracks"))
            .returning(|_| respond(200, r#"[{"id":1,"title":"Night"}]"#));
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/tracks/1/url"))
            .returning(|_| respond(500, ""));

        let ctx = signed_in(http, "Listener").await;
        let details = ctx.service.track_details("1").await.unwrap();
        assert_eq!(details.track.title, "Night");
        assert_eq!(details.stream_url, None);

        assert!(matches!(
            ctx.service.track_details("2").await,
            Err(LibraryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| path_is(req, HttpMethod::Get, "/users/dashboard/stats"))
            .returning(|_| {
                respond(
                    200,
                    r#"{"totalTracks":2,"totalPlays":9,"totalLikes":3,"topGenre":"Rock","mostPlayedTrack":"Night","mostPlayedTrackPlays":7}"#,
                )
            });

        let ctx = signed_in(http, "Artist").await;
        let stats = ctx.service.dashboard_stats().await.unwrap();
        assert_eq!(stats.total_tracks, 2);
        assert_eq!(stats.top_genre.as_deref(), Some("Rock"));
        assert_eq!(stats.most_played_track_plays, 7);
    }
}
