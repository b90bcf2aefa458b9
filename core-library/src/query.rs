//! Library query pipeline
//!
//! Filter, then sort, then paginate an in-memory track snapshot.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LibraryError;
use crate::models::Track;
use crate::pagination::{total_pages, Page, PageRequest, ITEMS_PER_PAGE};

/// Genres offered by the genre picker, after "All".
pub const GENRES: &[&str] = &[
    "Rock",
    "Pop",
    "Hip Hop",
    "Jazz",
    "Electronic",
    "R&B",
    "Metal",
    "Classical",
    "Country",
    "Folk",
    "Blues",
    "Reggae",
    "Punk",
    "Funk",
    "Soul",
    "Disco",
    "Techno",
    "House",
    "Trance",
    "Drum & Bass",
    "Dubstep",
    "Trap",
    "Lo-fi",
];

/// Sort order of the library view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackSort {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
    ArtistAsc,
    ArtistDesc,
    DurationAsc,
    DurationDesc,
}

impl TrackSort {
    pub const ALL: [TrackSort; 8] = [
        TrackSort::Newest,
        TrackSort::Oldest,
        TrackSort::TitleAsc,
        TrackSort::TitleDesc,
        TrackSort::ArtistAsc,
        TrackSort::ArtistDesc,
        TrackSort::DurationAsc,
        TrackSort::DurationDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackSort::Newest => "newest",
            TrackSort::Oldest => "oldest",
            TrackSort::TitleAsc => "title-asc",
            TrackSort::TitleDesc => "title-desc",
            TrackSort::ArtistAsc => "artist-asc",
            TrackSort::ArtistDesc => "artist-desc",
            TrackSort::DurationAsc => "duration-asc",
            TrackSort::DurationDesc => "duration-desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackSort::Newest => "Newest First",
            TrackSort::Oldest => "Oldest First",
            TrackSort::TitleAsc => "Title A-Z",
            TrackSort::TitleDesc => "Title Z-A",
            TrackSort::ArtistAsc => "Artist A-Z",
            TrackSort::ArtistDesc => "Artist Z-A",
            TrackSort::DurationAsc => "Shortest First",
            TrackSort::DurationDesc => "Longest First",
        }
    }

    /// Ordering of two tracks under this mode. Ties are `Equal`; callers use
    /// a stable sort.
    pub fn compare(&self, a: &Track, b: &Track) -> Ordering {
        match self {
            TrackSort::Newest => b.created_millis().cmp(&a.created_millis()),
            TrackSort::Oldest => a.created_millis().cmp(&b.created_millis()),
            TrackSort::TitleAsc => compare_text(&a.title, &b.title),
            TrackSort::TitleDesc => compare_text(&b.title, &a.title),
            TrackSort::ArtistAsc => compare_text(&a.artist, &b.artist),
            TrackSort::ArtistDesc => compare_text(&b.artist, &a.artist),
            TrackSort::DurationAsc => a.duration.cmp(&b.duration),
            TrackSort::DurationDesc => b.duration.cmp(&a.duration),
        }
    }
}

impl fmt::Display for TrackSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackSort {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackSort::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s.trim())
            .ok_or_else(|| LibraryError::invalid("sort", format!("Unknown sort order: {}", s)))
    }
}

/// Case-insensitive first, then by raw form so the order stays total.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Genre filter of the library view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum GenreFilter {
    #[default]
    All,
    Named(String),
}

impl GenreFilter {
    pub fn matches(&self, track: &Track) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Named(genre) => track.genre.as_deref() == Some(genre.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GenreFilter::All => "All",
            GenreFilter::Named(genre) => genre,
        }
    }
}

impl From<&str> for GenreFilter {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "All" {
            GenreFilter::All
        } else {
            GenreFilter::Named(value.to_string())
        }
    }
}

impl From<String> for GenreFilter {
    fn from(value: String) -> Self {
        GenreFilter::from(value.as_str())
    }
}

impl fmt::Display for GenreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search, genre, sort and page of one library view.
///
/// Changing the search term, genre or sort goes back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryQuery {
    search_term: String,
    genre: GenreFilter,
    sort: TrackSort,
    page: u32,
}

impl Default for LibraryQuery {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            genre: GenreFilter::All,
            sort: TrackSort::default(),
            page: 1,
        }
    }
}

impl LibraryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.set_search_term(term);
        self
    }

    pub fn with_genre(mut self, genre: impl Into<GenreFilter>) -> Self {
        self.set_genre(genre);
        self
    }

    pub fn with_sort(mut self, sort: TrackSort) -> Self {
        self.set_sort(sort);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.set_page(page);
        self
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn genre(&self) -> &GenreFilter {
        &self.genre
    }

    pub fn sort(&self) -> TrackSort {
        self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        ITEMS_PER_PAGE
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term != self.search_term {
            self.search_term = term;
            self.page = 1;
        }
    }

    pub fn set_genre(&mut self, genre: impl Into<GenreFilter>) {
        let genre = genre.into();
        if genre != self.genre {
            self.genre = genre;
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: TrackSort) {
        if sort != self.sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    /// Set the page; 0 becomes 1.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Pull the page back into `1..=max(total_pages, 1)`.
    pub fn clamp_page(&mut self, total_pages: u32) {
        self.page = self.page.clamp(1, total_pages.max(1));
    }

    /// Search and genre filter, without sorting.
    pub fn matches(&self, track: &Track) -> bool {
        matches_search(track, &self.search_term) && self.genre.matches(track)
    }
}

fn matches_search(track: &Track, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();

    [
        Some(track.title.as_str()),
        Some(track.artist.as_str()),
        track.album.as_deref(),
        track.genre.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// The filtered and sorted tracks, before pagination.
pub fn filter_and_sort<'a>(tracks: &'a [Track], query: &LibraryQuery) -> Vec<&'a Track> {
    let mut filtered: Vec<&Track> = tracks.iter().filter(|t| query.matches(t)).collect();
    // `sort_by` is stable.
    filtered.sort_by(|a, b| query.sort.compare(a, b));
    filtered
}

/// One rendered page of the library.
pub fn compute_view(tracks: &[Track], query: &LibraryQuery) -> Page<Track> {
    let filtered = filter_and_sort(tracks, query);
    Page::paginate(
        filtered.into_iter().cloned().collect(),
        PageRequest::new(query.page, ITEMS_PER_PAGE),
    )
}

/// Pages the query would produce, for clamping.
pub fn filtered_page_count(tracks: &[Track], query: &LibraryQuery) -> u32 {
    let count = tracks.iter().filter(|t| query.matches(t)).count();
    total_pages(count as u64, ITEMS_PER_PAGE)
}
