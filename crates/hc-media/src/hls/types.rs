//! HLS playlist types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stream variant in a multivariant playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// Average bandwidth in bits per second, if known.
    pub average_bandwidth: Option<u64>,
    /// Optional resolution as (width, height).
    pub resolution: Option<(u32, u32)>,
    /// Codec string (e.g. "avc1.42c01e").
    pub codecs: String,
    /// Optional frame rate.
    pub frame_rate: Option<f64>,
    /// URI to the media playlist for this variant.
    pub uri: String,
}

/// An HLS multivariant (master) playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultivariantPlaylist {
    /// Emit `#EXT-X-INDEPENDENT-SEGMENTS`.
    pub independent_segments: bool,
    /// Stream variants ordered by bandwidth.
    pub variants: Vec<Variant>,
}

/// A partial segment (LL-HLS).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part duration in seconds.
    pub duration: f64,
    pub uri: String,
    /// Whether the part starts with a keyframe.
    pub independent: bool,
}

/// A single segment in a media playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Segment duration in seconds.
    pub duration: f64,
    /// URI for this segment.
    pub uri: String,
    /// Wall-clock time of the first sample.
    pub program_date_time: Option<DateTime<Utc>>,
    /// Partial segments that make up this segment. Empty outside LL-HLS or
    /// once the segment is old enough that parts are no longer advertised.
    pub parts: Vec<Part>,
}

/// `#EXT-X-SERVER-CONTROL` attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerControl {
    pub can_block_reload: bool,
    /// Recommended distance from the live edge for LL playback, in seconds.
    pub part_hold_back: Option<f64>,
}

/// `#EXT-X-PRELOAD-HINT` for the next part that is being produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadHint {
    pub uri: String,
}

/// An HLS media playlist describing a sequence of segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPlaylist {
    /// `#EXT-X-VERSION` value.
    pub version: u32,
    /// Maximum segment duration in integer seconds (rounded up).
    pub target_duration: u32,
    /// Sequence number of the first segment.
    pub media_sequence: u64,
    /// Optional URI for the initialization segment (`#EXT-X-MAP`).
    pub init_segment_uri: Option<String>,
    pub server_control: Option<ServerControl>,
    /// Part target duration in seconds (`#EXT-X-PART-INF`).
    pub part_target: Option<f64>,
    /// Ordered list of complete segments.
    pub segments: Vec<Segment>,
    /// Parts of the segment currently being produced.
    pub trailing_parts: Vec<Part>,
    pub preload_hint: Option<PreloadHint>,
    /// Whether the playlist is complete. If true, `#EXT-X-ENDLIST` is emitted.
    pub ended: bool,
}
