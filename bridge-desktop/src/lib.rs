//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` using the `keyring` crate
//! - `SettingsStore` using a JSON file under the user config directory
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonSettingsStore, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let settings = JsonSettingsStore::open_default("audtream").await?;
//!
//!     // Use in core configuration
//! }
//! ```

mod http;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use settings::JsonSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
