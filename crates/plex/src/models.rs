//! Plex JSON API response models.
//!
//! Everything is wrapped in a `MediaContainer`. Only the fields the
//! collector reads are modelled; everything else is ignored.

use chrono::{DateTime, TimeZone, Utc};
use collector_core::{
    LibrarySection, MediaDescriptor, MediaItem, MediaKind, Player, PlayerState, RawSession,
    RecentItem, ShowSummary, StreamDecision, TranscodeDescriptor,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

/// Container of `Metadata` entries (sessions, section items, recent items).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataContainer {
    #[serde(default)]
    pub size: u64,
    pub total_size: Option<u64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Metadata>,
}

impl MetadataContainer {
    /// Total matching items, falling back to the page size.
    pub fn count(&self) -> u64 {
        self.total_size.unwrap_or(self.size)
    }
}

/// Container of `Directory` entries (library sections).
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryContainer {
    #[serde(rename = "Directory", default)]
    pub directory: Vec<Directory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Directory {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl From<Directory> for LibrarySection {
    fn from(d: Directory) -> Self {
        LibrarySection {
            key: d.key,
            title: d.title,
            kind: d.kind,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    pub grandparent_title: Option<String>,
    pub parent_title: Option<String>,
    pub parent_index: Option<i64>,
    pub index: Option<i64>,
    pub year: Option<u32>,
    pub session_key: Option<String>,
    pub view_offset: Option<u64>,
    pub duration: Option<u64>,
    /// Unix seconds
    pub added_at: Option<i64>,
    /// Seasons, for shows
    pub child_count: Option<u64>,
    /// Episodes, for shows
    pub leaf_count: Option<u64>,
    #[serde(rename = "Media", default)]
    pub media: Vec<Media>,
    #[serde(rename = "TranscodeSession")]
    pub transcode_session: Option<TranscodeSession>,
    #[serde(rename = "Player")]
    pub player: Option<PlayerInfo>,
    #[serde(rename = "User")]
    pub user: Option<User>,
    #[serde(rename = "Session")]
    pub session: Option<SessionInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub container: Option<String>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
    pub video_resolution: Option<String>,
    pub bitrate: Option<u64>,
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeSession {
    pub audio_decision: Option<String>,
    pub video_decision: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub address: String,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionInfo {
    pub id: Option<String>,
}

/// plex.tv sign-in response.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub user: SignInUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInUser {
    pub auth_token: Option<String>,
}

impl Metadata {
    fn media_item(&self) -> MediaItem {
        let index = self.index.map(|i| i.to_string());
        let title = self.title.clone();

        match MediaKind::parse(&self.kind) {
            MediaKind::Movie => MediaItem::Movie {
                title,
                year: self.year,
                index,
            },
            MediaKind::Episode => MediaItem::Episode {
                title,
                show_title: self.grandparent_title.clone(),
                season_title: self.parent_title.clone(),
                season_index: self.parent_index.map(|i| i.to_string()),
                index,
            },
            MediaKind::Track => MediaItem::Track {
                title,
                artist: self.grandparent_title.clone(),
                album: self.parent_title.clone(),
                index,
            },
            MediaKind::Unknown => MediaItem::Unknown {
                raw_kind: self.kind.clone(),
                title,
            },
        }
    }

    /// Converts a `/status/sessions` entry.
    ///
    /// The playback session id identifies the session; `sessionKey` is used
    /// when no `Session` element is present. `None` when neither exists.
    ///
    /// `sessionKey` is a small per-server counter, so two servers can report
    /// the same fallback key. The aggregator flags such keys each cycle.
    pub fn into_session(self) -> Option<RawSession> {
        let session_key = self
            .session
            .as_ref()
            .and_then(|s| s.id.clone())
            .or_else(|| self.session_key.clone())?;

        let item = self.media_item();
        let media = self.media.first().cloned().unwrap_or_default();
        let player = self.player.unwrap_or_default();

        Some(RawSession {
            session_key,
            item,
            view_offset_ms: self.view_offset,
            media: MediaDescriptor {
                container: media.container,
                audio_codec: media.audio_codec,
                video_codec: media.video_codec,
                video_resolution: media.video_resolution,
                bitrate: media.bitrate,
                duration_ms: media.duration.or(self.duration),
            },
            transcode: self.transcode_session.map(|t| TranscodeDescriptor {
                audio_decision: t.audio_decision.as_deref().map(StreamDecision::parse),
                video_decision: t.video_decision.as_deref().map(StreamDecision::parse),
            }),
            player: Player {
                title: player.title,
                platform: player.platform,
                address: player.address,
                state: player.state.as_deref().map(PlayerState::parse),
            },
            username: self.user.map(|u| u.title).unwrap_or_default(),
        })
    }

    pub fn into_show_summary(self) -> ShowSummary {
        ShowSummary {
            title: self.title,
            seasons: self.child_count.unwrap_or(0),
            episodes: self.leaf_count.unwrap_or(0),
        }
    }

    /// Converts a recently-added entry. `None` without a valid `addedAt`.
    pub fn into_recent_item(self) -> Option<RecentItem> {
        let added_at: DateTime<Utc> = Utc.timestamp_opt(self.added_at?, 0).single()?;
        Some(RecentItem {
            kind: self.kind,
            title: self.title,
            grandparent_title: self.grandparent_title,
            added_at,
        })
    }
}
