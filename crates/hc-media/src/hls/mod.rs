//! HLS playlist generation.
//!
//! This module generates M3U8 playlists for live HLS streaming: the
//! multivariant playlist advertising the stream, and the media playlist with
//! a sliding window of segments, optional LL-HLS partial segments and
//! preload hints.

mod generator;
mod types;

pub use generator::{generate_media_playlist, generate_multivariant_playlist};
pub use types::{
    MediaPlaylist, MultivariantPlaylist, Part, PreloadHint, Segment, ServerControl, Variant,
};
