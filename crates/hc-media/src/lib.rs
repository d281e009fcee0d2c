//! hc-media: H.264 framing, fragmented MP4 serialization, HLS playlist
//! generation, and live segmentation.
//!
//! Everything in this crate is pure: no file or network I/O. The server crate
//! decides where the produced bytes go.
//!
//! # Modules
//!
//! - [`h264`] - Annex-B splitting, NAL classification, avcC construction
//! - [`fmp4`] - Fragmented MP4 (ISO BMFF) serialization: init segments and fragments
//! - [`hls`] - HLS playlist generation: multivariant and media playlists (M3U8)
//! - [`segmenter`] - Turns timestamped access units into segments and parts

pub mod fmp4;
pub mod h264;
pub mod hls;
pub mod segmenter;

// Re-export commonly used items at the crate root.
pub use fmp4::{write_init_segment, write_media_segment, SampleInfo, TrackConfig};
pub use hls::{
    generate_media_playlist, generate_multivariant_playlist, MediaPlaylist, MultivariantPlaylist,
    Part, PreloadHint, Segment, ServerControl, Variant,
};
pub use segmenter::{
    AccessUnit, InitSegment, PartReady, SegmentReady, Segmenter, SegmenterConfig, SegmenterEvent,
    TIMESCALE,
};
