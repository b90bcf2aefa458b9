//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the Audtream client core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that is implemented differently per host (desktop,
//! browser shell, tests).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry; JSON and multipart bodies
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (bearer token, user record)
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Tests    | in-crate mocks      |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message.
//! HTTP status codes are not errors at this layer: a 401 or 500 is a
//! successful [`HttpResponse`](http::HttpResponse) that the caller interprets.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! behind an `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{SecureStore, SettingsStore};
