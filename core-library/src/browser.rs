//! Stateful library screen.
//!
//! Holds the fetched snapshot and the current query. All filtering happens
//! locally; only `load` and `delete_track` touch the network.

use tracing::{info, warn};

use crate::error::Result;
use crate::models::Track;
use crate::pagination::Page;
use crate::query::{compute_view, filtered_page_count, GenreFilter, LibraryQuery, TrackSort};
use crate::stats::LibraryStats;
use crate::tracks::TrackService;

#[derive(Debug, Clone, Default)]
pub struct LibraryBrowser {
    tracks: Vec<Track>,
    query: LibraryQuery,
    error: Option<String>,
}

impl LibraryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Browser over an already fetched snapshot.
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            ..Self::default()
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn query(&self) -> &LibraryQuery {
        &self.query
    }

    /// Last load or delete failure, ready for display.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Replace the snapshot from the server.
    ///
    /// On failure the snapshot is emptied and the error is kept for display.
    pub async fn load(&mut self, service: &TrackService) -> Result<usize> {
        match service.list_tracks().await {
            Ok(tracks) => {
                self.tracks = tracks;
                self.error = None;
                self.clamp();
                Ok(self.tracks.len())
            }
            Err(e) => {
                warn!(error = %e, "Library load failed");
                self.tracks.clear();
                self.error = Some(format!("Failed to load tracks: {}", e.user_message()));
                self.clamp();
                Err(e)
            }
        }
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.query.set_search_term(term);
    }

    pub fn set_genre(&mut self, genre: impl Into<GenreFilter>) {
        self.query.set_genre(genre);
    }

    pub fn set_sort(&mut self, sort: TrackSort) {
        self.query.set_sort(sort);
    }

    /// Jump to `page`, kept within the pages that exist.
    pub fn set_page(&mut self, page: u32) {
        self.query.set_page(page);
        self.clamp();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.query.page().saturating_add(1));
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.query.page().saturating_sub(1));
    }

    pub fn view(&self) -> Page<Track> {
        compute_view(&self.tracks, &self.query)
    }

    /// Aggregates over the whole snapshot, ignoring filters.
    pub fn stats(&self) -> LibraryStats {
        LibraryStats::compute(&self.tracks)
    }

    /// Delete on the server, then drop the track locally.
    pub async fn delete_track(&mut self, service: &TrackService, id: &str) -> Result<()> {
        match service.delete_track(id).await {
            Ok(()) => {
                self.tracks.retain(|t| t.id != id);
                self.error = None;
                self.clamp();
                info!(track_id = id, remaining = self.tracks.len(), "Removed track from view");
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!("Failed to delete track: {}", e.user_message()));
                Err(e)
            }
        }
    }

    fn clamp(&mut self) {
        let pages = filtered_page_count(&self.tracks, &self.query);
        self.query.clamp_page(pages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{respond, signed_in, MockHttpClient};
    use bridge_traits::http::HttpMethod;

    fn numbered(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| {
                let mut track = Track::new(i.to_string(), format!("Track {}", i), "ana");
                track.genre = Some(if i % 2 == 0 { "Rock" } else { "Pop" }.to_string());
                track
            })
            .collect()
    }

    #[test]
    fn test_set_page_clamps() {
        let mut browser = LibraryBrowser::with_tracks(numbered(13));
        browser.set_page(9);
        assert_eq!(browser.query().page(), 2);
        assert_eq!(browser.view().items.len(), 1);

        browser.previous_page();
        browser.previous_page();
        assert_eq!(browser.query().page(), 1);
    }

    #[test]
    fn test_filters_reset_page() {
        let mut browser = LibraryBrowser::with_tracks(numbered(30));
        browser.set_page(3);
        browser.set_genre("Rock");
        assert_eq!(browser.query().page(), 1);

        let view = browser.view();
        assert_eq!(view.total, 15);
        assert!(view.items.iter().all(|t| t.genre.as_deref() == Some("Rock")));
    }

    #[test]
    fn test_stats_ignore_filters() {
        let mut browser = LibraryBrowser::with_tracks(numbered(4));
        browser.set_search_term("Track 1");
        assert_eq!(browser.view().total, 1);
        assert_eq!(browser.stats().track_count, 4);
        assert_eq!(browser.stats().genre_count(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_clears_snapshot() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.method == HttpMethod::Get && req.url.ends_with("/tracks"))
            .returning(|_| respond(500, r#"{"message":"Database unavailable"}"#));

        let ctx = signed_in(http, "Listener").await;
        let mut browser = LibraryBrowser::with_tracks(numbered(3));

        assert!(browser.load(&ctx.service).await.is_err());
        assert!(browser.tracks().is_empty());
        assert_eq!(
            browser.error(),
            Some("Failed to load tracks: Database unavailable")
        );
    }

    #[tokio::test]
    async fn test_delete_removes_locally_and_reclamps() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.method == HttpMethod::Delete && req.url.ends_with("/tracks/12"))
            .times(1)
            .returning(|_| respond(204, ""));
        http.expect_execute()
            .withf(|req| req.method == HttpMethod::Delete && req.url.ends_with("/tracks/0"))
            .returning(|_| respond(500, ""));

        let ctx = signed_in(http, "Artist").await;
        let mut browser = LibraryBrowser::with_tracks(numbered(13));
        browser.set_sort(TrackSort::DurationAsc);
        browser.set_page(2);

        browser.delete_track(&ctx.service, "12").await.unwrap();
        assert_eq!(browser.tracks().len(), 12);
        assert_eq!(browser.query().page(), 1);

        assert!(browser.delete_track(&ctx.service, "0").await.is_err());
        assert_eq!(browser.tracks().len(), 12);
        assert_eq!(
            browser.error(),
            Some("Failed to delete track: Server returned status 500")
        );
    }
}
