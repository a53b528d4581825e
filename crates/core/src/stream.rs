//! Per-session stream metrics extraction.
//!
//! Turns one [`RawSession`] into a flat metrics record plus transcode
//! increments. Pure: no state, no I/O, never fails.

use serde::Serialize;

use crate::media::{MediaItem, RawSession, StreamDecision, TranscodeDescriptor};
use crate::point::Point;

/// How a stream reaches the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TranscodeType {
    /// No transcode session at all.
    DirectPlay,
    /// Transcode session present, this stream passed through.
    DirectStream,
    /// Transcode session present, this stream re-encoded.
    Transcoding,
}

impl TranscodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectPlay => "DirectPlay",
            Self::DirectStream => "DirectStream",
            Self::Transcoding => "Transcoding",
        }
    }

    pub fn is_transcoding(&self) -> bool {
        matches!(self, Self::Transcoding)
    }

    /// Resolve one side of a transcode descriptor.
    ///
    /// A missing descriptor means the file is played as-is. Inside a present
    /// descriptor, only an explicit `transcode` decision counts as
    /// transcoding.
    pub fn resolve(
        transcode: Option<&TranscodeDescriptor>,
        decision: impl Fn(&TranscodeDescriptor) -> Option<StreamDecision>,
    ) -> Self {
        match transcode {
            None => Self::DirectPlay,
            Some(t) => match decision(t) {
                Some(StreamDecision::Transcode) => Self::Transcoding,
                _ => Self::DirectStream,
            },
        }
    }
}

/// Normalized metrics for one session in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedStreamMetrics {
    pub full_title: String,
    pub title: String,
    pub grandparent_title: String,
    pub parent_title: String,
    pub parent_index: String,
    pub index: String,
    pub year: String,
    pub resolution: String,
    pub container: String,
    pub audio_codec: String,
    pub video_codec: String,
    pub length_ms: u64,
    pub position_ms: u64,
    /// 0.0–1.0, rounded to 4 decimals
    pub position_percent: f64,
    /// `None` for unknown media kinds
    pub transcode_audio: Option<TranscodeType>,
    pub transcode_video: Option<TranscodeType>,
    pub transcode_summary: String,
}

impl NormalizedStreamMetrics {
    /// Flatten the record into point fields.
    pub fn write_fields(&self, point: Point) -> Point {
        let transcode_label = |t: Option<TranscodeType>| t.map(|t| t.as_str()).unwrap_or("");

        point
            .field("full_title", self.full_title.as_str())
            .field("title", self.title.as_str())
            .field("grandparent_title", self.grandparent_title.as_str())
            .field("parent_title", self.parent_title.as_str())
            .field("parent_index", self.parent_index.as_str())
            .field("index", self.index.as_str())
            .field("year", self.year.as_str())
            .field("resolution", self.resolution.as_str())
            .field("container", self.container.as_str())
            .field("audio_codec", self.audio_codec.as_str())
            .field("video_codec", self.video_codec.as_str())
            .field("length_ms", self.length_ms)
            .field("position_ms", self.position_ms)
            .field("position_percent", self.position_percent)
            .field("transcode_audio", transcode_label(self.transcode_audio))
            .field("transcode_video", transcode_label(self.transcode_video))
            .field("transcode_summary", self.transcode_summary.as_str())
    }
}

/// Output of [`extract`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedStream {
    pub metrics: NormalizedStreamMetrics,
    pub video_transcodes: u32,
    pub audio_transcodes: u32,
}

/// Fraction of the item played, rounded half away from zero to 4 decimals.
///
/// Zero unless both position and length are positive. Capped at 1.0 since
/// the media part can be shorter than the item's reported offset.
pub fn position_percent(position_ms: u64, length_ms: u64) -> f64 {
    if position_ms == 0 || length_ms == 0 {
        return 0.0;
    }
    let ratio = position_ms as f64 / length_ms as f64;
    ((ratio * 10_000.0).round() / 10_000.0).min(1.0)
}

/// Extract normalized metrics from a session.
pub fn extract(session: &RawSession) -> ExtractedStream {
    let item = &session.item;
    if let MediaItem::Unknown { .. } = item {
        return ExtractedStream::default();
    }

    let media = &session.media;
    let transcode = session.transcode.as_ref();

    let title = item.title().to_string();
    let grandparent_title = item.grandparent_title().unwrap_or_default().to_string();
    let full_title = if grandparent_title.is_empty() {
        title.clone()
    } else {
        format!("{} - {}", grandparent_title, title)
    };

    let resolution = match item {
        MediaItem::Track { .. } => media
            .bitrate
            .map(|kbps| format!("{}Kbps", kbps))
            .unwrap_or_default(),
        _ => media.video_resolution.clone().unwrap_or_default(),
    };

    let transcode_audio = TranscodeType::resolve(transcode, |t| t.audio_decision);
    let transcode_video = TranscodeType::resolve(transcode, |t| t.video_decision);

    let yes_no = |t: TranscodeType| if t.is_transcoding() { "Yes" } else { "No" };
    let transcode_summary = format!(
        "A: {} V: {}",
        yes_no(transcode_audio),
        yes_no(transcode_video)
    );

    let year = match item {
        MediaItem::Movie { year: Some(y), .. } => y.to_string(),
        _ => String::new(),
    };

    let length_ms = media.duration_ms.unwrap_or(0);
    let position_ms = session.view_offset_ms.unwrap_or(0);

    ExtractedStream {
        metrics: NormalizedStreamMetrics {
            full_title,
            title,
            grandparent_title,
            parent_title: item.parent_title().unwrap_or_default().to_string(),
            parent_index: item.parent_index().unwrap_or_default().to_string(),
            index: item.index().unwrap_or_default().to_string(),
            year,
            resolution,
            container: media.container.clone().unwrap_or_default(),
            audio_codec: media.audio_codec.clone().unwrap_or_default(),
            video_codec: media.video_codec.clone().unwrap_or_default(),
            length_ms,
            position_ms,
            position_percent: position_percent(position_ms, length_ms),
            transcode_audio: Some(transcode_audio),
            transcode_video: Some(transcode_video),
            transcode_summary,
        },
        video_transcodes: u32::from(transcode_video.is_transcoding()),
        audio_transcodes: u32::from(transcode_audio.is_transcoding()),
    }
}
