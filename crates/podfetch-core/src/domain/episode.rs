//! Episode and podcast domain types.
//!
//! These types represent library entries handed to the download subsystem,
//! independent of any infrastructure concerns (feed parsing, persistence).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A podcast episode as known to the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Stable episode identifier.
    pub id: String,
    /// Owning podcast.
    pub podcast_id: String,
    /// Episode title.
    pub title: String,
    /// Enclosure URL.
    pub audio_url: String,
    /// Publish date from the feed.
    pub published_at: DateTime<Utc>,
    /// Enclosure length in bytes, when the feed reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosure_length: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────
    // User state
    // ─────────────────────────────────────────────────────────────────────
    /// Last playback position in seconds.
    #[serde(default)]
    pub playback_position_secs: f64,
    /// Whether the episode has been played to the end.
    #[serde(default)]
    pub is_played: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub is_archived: bool,
    /// User rating, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// The user downloaded this episode explicitly (not through auto-download).
    #[serde(default)]
    pub user_downloaded: bool,
}

impl Episode {
    /// Create an episode with no user state.
    pub fn new(
        id: impl Into<String>,
        podcast_id: impl Into<String>,
        title: impl Into<String>,
        audio_url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            podcast_id: podcast_id.into(),
            title: title.into(),
            audio_url: audio_url.into(),
            published_at,
            enclosure_length: None,
            playback_position_secs: 0.0,
            is_played: false,
            is_favorite: false,
            is_bookmarked: false,
            is_archived: false,
            rating: None,
            user_downloaded: false,
        }
    }

    /// Set the enclosure length.
    #[must_use]
    pub const fn with_enclosure_length(mut self, length: Option<u64>) -> Self {
        self.enclosure_length = length;
        self
    }

    /// Playback started but not finished.
    #[must_use]
    pub fn has_playback_progress(&self) -> bool {
        self.playback_position_secs > 0.0 && !self.is_played
    }

    /// Whether the episode carries user state that exempts it from
    /// policy-driven deletion.
    ///
    /// A fully played episode does not count as "in progress"; the other
    /// markers (favourite, bookmark, archive, rating, manual download) always
    /// preserve.
    #[must_use]
    pub fn has_preserved_state(&self) -> bool {
        self.has_playback_progress()
            || self.is_favorite
            || self.is_bookmarked
            || self.is_archived
            || self.rating.is_some()
            || self.user_downloaded
    }
}

/// A podcast subscription entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: String,
    pub title: String,
    /// Whether the user follows this podcast.
    #[serde(default)]
    pub is_subscribed: bool,
}

impl Podcast {
    /// Create a podcast entry.
    pub fn new(id: impl Into<String>, title: impl Into<String>, is_subscribed: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_subscribed,
        }
    }
}
