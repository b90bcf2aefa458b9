//! Aggregates over the whole, unfiltered library snapshot.

use serde::Serialize;

use crate::models::Track;

/// How many times a genre occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub track_count: usize,
    /// Distinct non-empty genres, in first-seen order.
    pub genres: Vec<String>,
    /// Seconds.
    pub total_duration: u64,
    pub total_likes: u64,
    pub total_plays: u64,
    /// Three most frequent genres; ties go to the one seen first.
    pub top_genres: Vec<GenreCount>,
}

impl LibraryStats {
    pub fn compute(tracks: &[Track]) -> Self {
        let mut counts: Vec<GenreCount> = Vec::new();
        let mut stats = LibraryStats {
            track_count: tracks.len(),
            ..Default::default()
        };

        for track in tracks {
            stats.total_duration += u64::from(track.duration);
            stats.total_likes = stats.total_likes.saturating_add(track.likes);
            stats.total_plays = stats.total_plays.saturating_add(track.plays);

            let Some(genre) = track.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) else {
                continue;
            };
            match counts.iter_mut().find(|c| c.genre == genre) {
                Some(entry) => entry.count += 1,
                None => counts.push(GenreCount {
                    genre: genre.to_string(),
                    count: 1,
                }),
            }
        }

        stats.genres = counts.iter().map(|c| c.genre.clone()).collect();
        // Stable, so equal counts stay in first-seen order.
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(3);
        stats.top_genres = counts;
        stats
    }

    pub fn genre_count(&self) -> usize {
        self.genres.len()
    }

    /// Mean length in whole seconds, zero for an empty library.
    pub fn average_duration(&self) -> u64 {
        match self.track_count {
            0 => 0,
            n => self.total_duration / n as u64,
        }
    }
}
