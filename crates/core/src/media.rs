//! Media server data model.
//!
//! These types are what a media server client hands to the collector each
//! polling cycle. They are plain values: the collector never talks back to the
//! server through them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Episode,
    Track,
    Unknown,
}

impl MediaKind {
    /// Parse an upstream type string. Anything unrecognised is `Unknown`.
    pub fn parse(kind: &str) -> Self {
        match kind {
            "movie" => Self::Movie,
            "episode" => Self::Episode,
            "track" => Self::Track,
            _ => Self::Unknown,
        }
    }

    /// Label reported in the `media_type` field.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Episode => "TV Shows",
            Self::Track => "Music",
            Self::Unknown => "Unknown",
        }
    }
}

/// The item a session is playing, with the fields its kind actually has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaItem {
    Movie {
        title: String,
        year: Option<u32>,
        index: Option<String>,
    },
    Episode {
        title: String,
        /// Grandparent title.
        show_title: Option<String>,
        /// Parent title.
        season_title: Option<String>,
        /// Parent index.
        season_index: Option<String>,
        /// Episode number.
        index: Option<String>,
    },
    Track {
        title: String,
        /// Grandparent title.
        artist: Option<String>,
        /// Parent title.
        album: Option<String>,
        /// Track number.
        index: Option<String>,
    },
    Unknown {
        /// Upstream type string.
        raw_kind: String,
        title: String,
    },
}

impl MediaItem {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Movie { .. } => MediaKind::Movie,
            Self::Episode { .. } => MediaKind::Episode,
            Self::Track { .. } => MediaKind::Track,
            Self::Unknown { .. } => MediaKind::Unknown,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Movie { title, .. }
            | Self::Episode { title, .. }
            | Self::Track { title, .. }
            | Self::Unknown { title, .. } => title,
        }
    }

    pub fn grandparent_title(&self) -> Option<&str> {
        match self {
            Self::Episode { show_title, .. } => show_title.as_deref(),
            Self::Track { artist, .. } => artist.as_deref(),
            _ => None,
        }
    }

    pub fn parent_title(&self) -> Option<&str> {
        match self {
            Self::Episode { season_title, .. } => season_title.as_deref(),
            Self::Track { album, .. } => album.as_deref(),
            _ => None,
        }
    }

    pub fn parent_index(&self) -> Option<&str> {
        match self {
            Self::Episode { season_index, .. } => season_index.as_deref(),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<&str> {
        match self {
            Self::Movie { index, .. } | Self::Episode { index, .. } | Self::Track { index, .. } => {
                index.as_deref()
            }
            Self::Unknown { .. } => None,
        }
    }
}

/// The media part associated with a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub container: Option<String>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
    pub video_resolution: Option<String>,
    /// Bitrate in kbps
    pub bitrate: Option<u64>,
    /// Total length in milliseconds
    pub duration_ms: Option<u64>,
}

/// Per-stream decision reported by a transcode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamDecision {
    Transcode,
    Copy,
    Direct,
}

impl StreamDecision {
    pub fn parse(decision: &str) -> Self {
        match decision {
            "transcode" => Self::Transcode,
            "copy" => Self::Copy,
            _ => Self::Direct,
        }
    }
}

/// Present only while the server is processing the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodeDescriptor {
    pub audio_decision: Option<StreamDecision>,
    pub video_decision: Option<StreamDecision>,
}

/// Playback state reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Playing,
    Paused,
    Buffering,
    Unknown,
}

impl PlayerState {
    pub fn parse(state: &str) -> Self {
        match state {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "buffering" => Self::Buffering,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Buffering => "buffering",
            Self::Unknown => "unknown",
        }
    }
}

/// The client device playing a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub title: String,
    pub platform: String,
    pub address: String,
    /// `None` when the server did not report a state at all.
    pub state: Option<PlayerState>,
}

/// One active playback session as reported by a media server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSession {
    pub session_key: String,
    pub item: MediaItem,
    /// Playback position in milliseconds
    pub view_offset_ms: Option<u64>,
    pub media: MediaDescriptor,
    pub transcode: Option<TranscodeDescriptor>,
    pub player: Player,
    pub username: String,
}

impl RawSession {
    pub fn kind(&self) -> MediaKind {
        self.item.kind()
    }
}

/// A library section on a media server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySection {
    /// Server-side identifier used in follow-up queries
    pub key: String,
    pub title: String,
    /// Section type, e.g. `movie`, `show`, `artist`
    pub kind: String,
}

impl LibrarySection {
    pub fn is_show(&self) -> bool {
        self.kind == "show"
    }
}

/// Child counts for one show in a `show` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowSummary {
    pub title: String,
    pub seasons: u64,
    pub episodes: u64,
}

/// An item from a section's recently-added list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentItem {
    /// Upstream type string, e.g. `movie`, `episode`, `album`
    pub kind: String,
    pub title: String,
    pub grandparent_title: Option<String>,
    pub added_at: DateTime<Utc>,
}
