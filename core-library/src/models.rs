//! Track records and request payloads.
//!
//! Server records are loose about types. Defaulting happens here, once, so
//! the query pipeline never has to second-guess a field.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_auth::wire::{lenient_string, lenient_u32, lenient_u64, non_empty_string, parse_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};

/// Largest accepted audio upload.
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;
/// Largest accepted cover image.
pub const MAX_COVER_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    artist: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    album: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    duration: u32,
    #[serde(default, deserialize_with = "non_empty_string")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    likes: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    plays: u64,
    #[serde(default, deserialize_with = "non_empty_string")]
    cover_url: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    file_url: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    year: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    mime_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    file_size: u64,
    #[serde(default, deserialize_with = "non_empty_string")]
    username: Option<String>,
}

/// A track as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTrack", rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Length in seconds.
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub likes: u64,
    pub plays: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Uploader's username.
    #[serde(rename = "username", skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let created_at = match raw.created_at.as_deref() {
            Some(value) => {
                let parsed = parse_timestamp(value);
                if parsed.is_none() {
                    debug!(track_id = %raw.id, created_at = value, "Unparsable createdAt, sorting as epoch 0");
                }
                parsed
            }
            None => {
                debug!(track_id = %raw.id, "Track has no createdAt, sorting as epoch 0");
                None
            }
        };

        Self {
            id: raw.id,
            title: raw.title,
            artist: raw.artist,
            album: raw.album,
            genre: raw.genre,
            duration: raw.duration,
            created_at,
            description: raw.description,
            likes: raw.likes,
            plays: raw.plays,
            cover_url: raw.cover_url,
            file_url: raw.file_url,
            year: raw.year,
            mime_type: raw.mime_type,
            file_size: (raw.file_size > 0).then_some(raw.file_size),
            uploader: raw.username,
        }
    }
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            genre: None,
            duration: 0,
            created_at: None,
            description: None,
            likes: 0,
            plays: 0,
            cover_url: None,
            file_url: None,
            year: None,
            mime_type: None,
            file_size: None,
            uploader: None,
        }
    }

    /// Creation time in milliseconds, with absent dates at epoch 0.
    pub fn created_millis(&self) -> i64 {
        self.created_at.map_or(0, |d| d.timestamp_millis())
    }
}

/// Decode a track list from whatever the server sent.
///
/// Arrays decode element by element; invalid elements are skipped. An object
/// is treated as a map of tracks. Anything else is an empty list.
pub fn tracks_from_json(value: Value) -> Vec<Track> {
    let elements = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => {
            warn!(kind = json_kind(&other), "Track list is not an array, treating as empty");
            return Vec::new();
        }
    };

    elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| match serde_json::from_value::<Track>(element) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed track record");
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON body for track create (`metadata` part) and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Track> for TrackRequest {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            duration: track.duration,
            genre: track.genre.clone(),
            year: track.year.clone(),
            description: track.description.clone(),
        }
    }
}

/// A file picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn has_type(&self, prefix: &str) -> bool {
        self.mime_type
            .trim()
            .to_ascii_lowercase()
            .starts_with(prefix)
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Everything the upload form collects.
///
/// An empty `artist` is replaced by the uploader's username.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub description: String,
    pub duration: u32,
    pub audio: Option<UploadFile>,
    pub cover: Option<UploadFile>,
}

impl NewTrack {
    /// Check the form before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(LibraryError::invalid("title", "Please enter a track title"));
        }

        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| LibraryError::invalid("audioFile", "Please select an audio file to upload"))?;
        if !audio.has_type("audio/") {
            return Err(LibraryError::invalid(
                "audioFile",
                "Please select an audio file (MP3, WAV, FLAC, etc.)",
            ));
        }
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(LibraryError::invalid("audioFile", "Audio file is too large (max 50MB)"));
        }

        if let Some(cover) = &self.cover {
            if !cover.has_type("image/") {
                return Err(LibraryError::invalid(
                    "coverImage",
                    "Please select an image file (JPG, PNG, etc.)",
                ));
            }
            if cover.len() > MAX_COVER_BYTES {
                return Err(LibraryError::invalid("coverImage", "Cover image is too large (max 5MB)"));
            }
        }

        Ok(())
    }

    /// Metadata part for the upload, with `uploader` as the fallback artist.
    pub fn metadata(&self, uploader: &str) -> TrackRequest {
        let artist = self.artist.trim();
        TrackRequest {
            title: self.title.trim().to_string(),
            artist: if artist.is_empty() { uploader } else { artist }.to_string(),
            album: optional(&self.album),
            duration: self.duration,
            genre: optional(&self.genre),
            year: None,
            description: optional(&self.description),
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Per-artist dashboard figures from `GET /users/dashboard/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_tracks: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_plays: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_likes: u64,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub top_genre: Option<String>,
    /// Seconds.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub average_duration: u32,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub most_played_track: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub most_played_track_plays: u64,
}

impl DashboardStats {
    /// Plays per track, rounded. Zero without tracks.
    pub fn average_plays_per_track(&self) -> u64 {
        if self.total_tracks == 0 {
            return 0;
        }
        (self.total_plays as f64 / self.total_tracks as f64).round() as u64
    }

    /// Likes as a percentage of plays, one decimal. `None` without plays.
    pub fn like_rate_percent(&self) -> Option<f64> {
        if self.total_plays == 0 {
            return None;
        }
        let rate = self.total_likes as f64 / self.total_plays as f64 * 100.0;
        Some((rate * 10.0).round() / 10.0)
    }
}

/// One type-ahead suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}
