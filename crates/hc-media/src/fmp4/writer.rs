//! High-level fMP4 writer functions.
//!
//! Provides `write_init_segment` and `write_media_segment` for generating
//! fragmented MP4 data suitable for HLS streaming.

use super::boxes::{
    self, TrunSample, NON_SYNC_SAMPLE_FLAGS, SYNC_SAMPLE_FLAGS, TRUN_SAMPLE_SIZE,
};
use serde::{Deserialize, Serialize};

/// Configuration for the video track in an fMP4 init segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Track ID (1-based).
    pub track_id: u32,
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// AVCDecoderConfigurationRecord bytes.
    pub codec_private: Vec<u8>,
}

/// Information about a single sample (frame) in a media segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleInfo {
    /// Sample data in AVCC (length-prefixed) layout.
    pub data: Vec<u8>,
    /// Sample duration in timescale units.
    pub duration: u32,
    /// Whether this sample is a keyframe (sync sample).
    pub is_keyframe: bool,
    /// Composition time offset (signed, for B-frames).
    pub composition_offset: i32,
}

/// Generate an fMP4 initialization segment (ftyp + moov).
///
/// The init segment describes the track structure and codec configuration.
/// It must be sent before any media segments.
pub fn write_init_segment(config: &TrackConfig) -> Vec<u8> {
    let ftyp = boxes::write_ftyp();
    let mvhd = boxes::write_mvhd(config.timescale, config.track_id + 1);
    let trak = boxes::write_video_trak(
        config.track_id,
        config.timescale,
        config.width,
        config.height,
        &config.codec_private,
    );
    let mvex = boxes::write_mvex(config.track_id);
    let moov = boxes::write_container_box(b"moov", &[&mvhd, &trak, &mvex]);

    let mut result = Vec::with_capacity(ftyp.len() + moov.len());
    result.extend_from_slice(&ftyp);
    result.extend_from_slice(&moov);
    result
}

/// Generate an fMP4 media fragment (moof + mdat) for track 1.
///
/// # Arguments
/// * `seq` - Fragment sequence number (1-based, incrementing).
/// * `decode_time` - Base media decode time for this fragment in timescale units.
/// * `samples` - Samples in decode order, including raw data.
pub fn write_media_segment(seq: u32, decode_time: u64, samples: &[SampleInfo]) -> Vec<u8> {
    let track_id = 1u32;

    let mfhd = boxes::write_mfhd(seq);
    let tfhd = boxes::write_tfhd(track_id);
    let tfdt = boxes::write_tfdt(decode_time);

    let trun_samples: Vec<TrunSample> = samples
        .iter()
        .map(|s| TrunSample {
            duration: s.duration,
            size: s.data.len() as u32,
            flags: if s.is_keyframe {
                SYNC_SAMPLE_FLAGS
            } else {
                NON_SYNC_SAMPLE_FLAGS
            },
            composition_time_offset: s.composition_offset,
        })
        .collect();

    // data_offset points from the start of moof to the first mdat payload
    // byte, so the moof size must be known before trun is written.
    let trun_box_size = 8 + 12 + trun_samples.len() * TRUN_SAMPLE_SIZE;
    let traf_size = 8 + tfhd.len() + tfdt.len() + trun_box_size;
    let moof_size = 8 + mfhd.len() + traf_size;

    let total_data_size: u64 = samples.iter().map(|s| s.data.len() as u64).sum();
    let mdat_hdr = boxes::write_mdat_header(total_data_size);
    let data_offset = (moof_size + mdat_hdr.len()) as i32;

    let trun = boxes::write_trun(&trun_samples, data_offset);
    let traf = boxes::write_container_box(b"traf", &[&tfhd, &tfdt, &trun]);
    let moof = boxes::write_container_box(b"moof", &[&mfhd, &traf]);
    debug_assert_eq!(moof.len(), moof_size);

    let mut result = Vec::with_capacity(moof.len() + mdat_hdr.len() + total_data_size as usize);
    result.extend_from_slice(&moof);
    result.extend_from_slice(&mdat_hdr);
    for sample in samples {
        result.extend_from_slice(&sample.data);
    }
    result
}
