//! # Library Module
//!
//! The track library as the client sees it.
//!
//! ## Overview
//!
//! This module manages:
//! - Track records decoded leniently from the REST API
//! - The query pipeline: search, genre filter, 8 sort orders, 12-item pages
//! - Library aggregates and display formatting
//! - Track endpoints (list, upload, update, delete, like, play, stream URL)
//! - A debounced type-ahead search

pub mod browser;
pub mod error;
pub mod format;
pub mod models;
pub mod pagination;
pub mod query;
pub mod search;
pub mod stats;
pub mod tracks;

#[cfg(test)]
pub(crate) mod test_support;

pub use browser::LibraryBrowser;
pub use error::{LibraryError, Result};
pub use models::{tracks_from_json, DashboardStats, NewTrack, SearchHit, Track, TrackRequest, UploadFile};
pub use pagination::{Page, PageRequest, ITEMS_PER_PAGE};
pub use query::{compute_view, GenreFilter, LibraryQuery, TrackSort, GENRES};
pub use search::{DebouncedSearch, SearchState};
pub use stats::{GenreCount, LibraryStats};
pub use tracks::{TrackDetails, TrackService};
