use crate::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role.
///
/// The server and older clients disagree on spelling, so decoding is
/// forgiving: `Artist`/`ARTIST` (any case) is an artist, everything else
/// (`Listener`, `LISTENER`, `USER`, unknown values) is a listener.
///
/// # Examples
///
/// ```
/// use core_auth::Role;
///
/// assert_eq!(Role::from("ARTIST".to_string()), Role::Artist);
/// assert_eq!(Role::from("USER".to_string()), Role::Listener);
/// assert_eq!(Role::Artist.as_str(), "Artist");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    Listener,
    Artist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Listener => "Listener",
            Role::Artist => "Artist",
        }
    }

    pub fn is_artist(&self) -> bool {
        matches!(self, Role::Artist)
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        if raw.trim().eq_ignore_ascii_case("artist") {
            Role::Artist
        } else {
            Role::Listener
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional social profile handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default, deserialize_with = "wire::non_empty_string", skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "wire::non_empty_string", skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "wire::non_empty_string", skip_serializing_if = "Option::is_none")]
    pub spotify: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        self.twitter.is_none() && self.instagram.is_none() && self.spotify.is_none()
    }
}

/// User record as it arrives from `/users/...` or from the secure store.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(default, deserialize_with = "wire::lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    username: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    email: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, alias = "biography", deserialize_with = "wire::non_empty_string")]
    bio: Option<String>,
    #[serde(default, deserialize_with = "wire::non_empty_string")]
    location: Option<String>,
    #[serde(default, deserialize_with = "wire::non_empty_string")]
    website: Option<String>,
    #[serde(default)]
    social_links: Option<SocialLinks>,
    #[serde(default, deserialize_with = "wire::lenient_datetime")]
    created_at: Option<DateTime<Utc>>,
}

/// The signed-in user.
///
/// Always replaced wholesale; edits go through
/// [`ProfileDraft`](crate::profile::ProfileDraft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUser", rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "SocialLinks::is_empty")]
    pub social_links: SocialLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            id: raw.id,
            username: raw.username,
            email: raw.email,
            role: raw.role.map(Role::from).unwrap_or_default(),
            bio: raw.bio,
            location: raw.location,
            website: raw.website,
            social_links: raw.social_links.unwrap_or_default(),
            created_at: raw.created_at,
        }
    }
}

impl User {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            role,
            bio: None,
            location: None,
            website: None,
            social_links: SocialLinks::default(),
            created_at: None,
        }
    }

    pub fn is_artist(&self) -> bool {
        self.role.is_artist()
    }
}

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// `{ "token": "..." }` returned by login and register.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Session lifecycle as seen by the host.
///
/// ```text
/// LoggedOut --login/register--> Confirmed
/// (startup with token) Unconfirmed --refresh ok--> Confirmed
///                      Unconfirmed --refresh failed--> LoggedOut
/// Confirmed --logout / 401--> LoggedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthStatus {
    #[default]
    LoggedOut,
    /// A token was restored but the server has not validated it yet.
    Unconfirmed,
    Confirmed,
}

impl AuthStatus {
    /// `true` whenever a token is held, confirmed or not.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthStatus::LoggedOut)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStatus::LoggedOut => write!(f, "Logged Out"),
            AuthStatus::Unconfirmed => write!(f, "Unconfirmed"),
            AuthStatus::Confirmed => write!(f, "Logged In"),
        }
    }
}

/// In-memory session. A session exists only while a token exists.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
    /// Whether the server accepted the token since startup.
    pub confirmed: bool,
}

impl Session {
    pub fn status(&self) -> AuthStatus {
        if self.confirmed {
            AuthStatus::Confirmed
        } else {
            AuthStatus::Unconfirmed
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .field("confirmed", &self.confirmed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    #[test]
    fn test_role_spellings() {
        for raw in ["Artist", "ARTIST", "artist"] {
            assert_eq!(Role::from(raw.to_string()), Role::Artist);
        }
        for raw in ["Listener", "LISTENER", "USER", "ADMIN", ""] {
            assert_eq!(Role::from(raw.to_string()), Role::Listener);
        }
    }

    #[test]
    fn test_user_from_server_payload() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "username": "ana",
            "email": "ana@example.com",
            "role": "ARTIST",
            "biography": "Synth pop",
            "website": "",
            "createdAt": "2023-01-01T10:00:00"
        }))
        .unwrap();

        assert_eq!(user.id, "7");
        assert_eq!(user.role, Role::Artist);
        assert_eq!(user.bio.as_deref(), Some("Synth pop"));
        assert_eq!(user.website, None);
        assert_eq!(user.created_at.map(|d| d.year()), Some(2023));
        assert!(user.social_links.is_empty());
    }

    #[test]
    fn test_user_missing_role_is_listener() {
        let user: User = serde_json::from_value(json!({ "id": "u1", "username": "bo" })).unwrap();
        assert_eq!(user.role, Role::Listener);
        assert_eq!(user.email, "");
    }

    #[test]
    fn test_user_persisted_form_reloads() {
        let mut user = User::new("1", "ana", "ana@example.com", Role::Artist);
        user.social_links.spotify = Some("ana-music".to_string());

        let stored = serde_json::to_value(&user).unwrap();
        assert_eq!(stored["role"], "Artist");
        assert_eq!(stored["socialLinks"]["spotify"], "ana-music");
        assert!(stored.get("bio").is_none());

        let reloaded: User = serde_json::from_value(stored).unwrap();
        assert_eq!(reloaded, user);
    }

    #[test]
    fn test_requests_redact_password() {
        let request = LoginRequest {
            username: "ana".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{:?}", request).contains("hunter22"));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "username": "ana", "password": "hunter22" })
        );
    }

    #[test]
    fn test_register_request_role_wire_form() {
        let request = RegisterRequest {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "long-enough".to_string(),
            role: Role::Listener,
        };
        assert_eq!(serde_json::to_value(&request).unwrap()["role"], "Listener");
    }

    #[test]
    fn test_session_status() {
        let session = Session {
            token: "t".to_string(),
            user: None,
            confirmed: false,
        };
        assert_eq!(session.status(), AuthStatus::Unconfirmed);
        assert!(session.status().is_authenticated());
        assert!(!AuthStatus::LoggedOut.is_authenticated());
        assert!(!format!("{:?}", session).contains("\"t\""));
    }
}
