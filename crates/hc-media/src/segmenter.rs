//! Live segmentation of H.264 access units into fMP4 segments and parts.
//!
//! [`Segmenter`] is a pure state machine: it is fed timestamped access units
//! and returns the init segment, partial segments and complete segments that
//! became available. Writing them anywhere is the caller's job.
//!
//! Sample durations are only known once the next sample arrives, so one
//! access unit is always held back. DTS equals PTS (no B-frame reordering).

use std::time::Duration;

use chrono::{DateTime, Utc};
use hc_core::config::{MuxerConfig, MuxerVariant};
use hc_core::{Error, Result};

use crate::fmp4::{write_init_segment, write_media_segment, SampleInfo, TrackConfig};
use crate::h264::{self, NalUnitType};

/// Media timescale for the video track (90 kHz).
pub const TIMESCALE: u32 = 90_000;

/// Duration assumed for the final sample when no previous duration is known.
const FALLBACK_SAMPLE_TICKS: u32 = TIMESCALE / 30;

pub(crate) fn duration_to_ticks(d: Duration) -> u64 {
    (d.as_nanos() * TIMESCALE as u128 / 1_000_000_000) as u64
}

pub(crate) fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos((ticks as u128 * 1_000_000_000 / TIMESCALE as u128) as u64)
}

/// Segmenter settings, usually derived from [`MuxerConfig`].
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub variant: MuxerVariant,
    pub segment_duration: Duration,
    pub part_duration: Duration,
    pub width: u32,
    pub height: u32,
}

impl From<&MuxerConfig> for SegmenterConfig {
    fn from(config: &MuxerConfig) -> Self {
        Self {
            variant: config.variant,
            segment_duration: config.segment_duration(),
            part_duration: config.part_duration(),
            width: config.width,
            height: config.height,
        }
    }
}

/// One H.264 access unit with its timing.
#[derive(Debug, Clone)]
pub struct AccessUnit {
    /// Wall-clock time the frame was captured.
    pub ntp: DateTime<Utc>,
    /// Presentation timestamp relative to the start of the stream.
    pub pts: Duration,
    /// Raw NAL units or Annex-B buffers.
    pub nalus: Vec<Vec<u8>>,
}

/// The fMP4 initialization segment, produced once on the first keyframe.
#[derive(Debug, Clone)]
pub struct InitSegment {
    pub data: Vec<u8>,
    /// RFC 6381 codec string.
    pub codecs: String,
    pub width: u32,
    pub height: u32,
}

/// A completed LL-HLS partial segment.
#[derive(Debug, Clone)]
pub struct PartReady {
    /// Media sequence number of the segment this part belongs to.
    pub segment_id: u64,
    /// Position of the part within its segment.
    pub index: usize,
    pub independent: bool,
    pub duration: Duration,
    pub data: Vec<u8>,
}

/// A completed media segment.
#[derive(Debug, Clone)]
pub struct SegmentReady {
    /// Media sequence number.
    pub id: u64,
    /// Wall-clock time of the first sample.
    pub ntp: DateTime<Utc>,
    pub duration: Duration,
    pub data: Vec<u8>,
    /// Number of parts the segment was published as (0 outside LL-HLS).
    pub part_count: usize,
}

/// Output of [`Segmenter::push`] and [`Segmenter::finish`], in production order.
#[derive(Debug, Clone)]
pub enum SegmenterEvent {
    Init(InitSegment),
    Part(PartReady),
    Segment(SegmentReady),
}

struct PendingSample {
    dts: u64,
    data: Vec<u8>,
    is_keyframe: bool,
}

struct OpenSegment {
    id: u64,
    start_dts: u64,
    ntp: DateTime<Utc>,
    /// Fragments already emitted as parts.
    data: Vec<u8>,
    part_count: usize,
    /// Samples not yet written to a fragment.
    samples: Vec<SampleInfo>,
    samples_start_dts: u64,
    samples_independent: bool,
}

/// Turns access units into init segment, parts and segments.
pub struct Segmenter {
    config: SegmenterConfig,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    initialized: bool,
    pending: Option<PendingSample>,
    last_dts: Option<u64>,
    last_duration: u32,
    current: Option<OpenSegment>,
    next_segment_id: u64,
    next_fragment_seq: u32,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            sps: None,
            pps: None,
            initialized: false,
            pending: None,
            last_dts: None,
            last_duration: 0,
            current: None,
            next_segment_id: 0,
            next_fragment_seq: 1,
        }
    }

    /// True until the first keyframe with known parameter sets was accepted.
    pub fn waiting_for_keyframe(&self) -> bool {
        !self.initialized
    }

    /// Media sequence number of the segment currently being filled.
    pub fn open_segment_id(&self) -> Option<u64> {
        self.current.as_ref().map(|s| s.id)
    }

    fn is_low_latency(&self) -> bool {
        self.config.variant == MuxerVariant::LowLatency
    }

    /// Feed one access unit.
    ///
    /// Units preceding the first usable keyframe are dropped without error.
    pub fn push(&mut self, au: AccessUnit) -> Result<Vec<SegmenterEvent>> {
        let nalus = h264::normalize_access_unit(&au.nalus);
        if nalus.is_empty() {
            return Err(Error::Validation("access unit contains no NAL units".into()));
        }

        let dts = duration_to_ticks(au.pts);
        if let Some(last) = self.last_dts {
            if dts <= last {
                return Err(Error::Media(format!(
                    "timestamp is not monotonically increasing ({:?} after {:?})",
                    au.pts,
                    ticks_to_duration(last)
                )));
            }
        }

        for nalu in &nalus {
            match h264::nal_type(nalu) {
                Some(NalUnitType::Sps) => self.sps = Some(nalu.clone()),
                Some(NalUnitType::Pps) => self.pps = Some(nalu.clone()),
                _ => {}
            }
        }

        let random_access = h264::is_random_access(&nalus);
        let mut events = Vec::new();

        if !self.initialized {
            if !random_access {
                tracing::trace!("Dropping access unit while waiting for a keyframe");
                return Ok(events);
            }
            let (Some(sps), Some(pps)) = (self.sps.as_deref(), self.pps.as_deref()) else {
                tracing::debug!("Dropping keyframe received before SPS/PPS");
                return Ok(events);
            };
            let track = TrackConfig {
                track_id: 1,
                timescale: TIMESCALE,
                width: self.config.width,
                height: self.config.height,
                codec_private: h264::decoder_configuration(sps, pps)?,
            };
            events.push(SegmenterEvent::Init(InitSegment {
                data: write_init_segment(&track),
                codecs: h264::codec_string(sps)?,
                width: track.width,
                height: track.height,
            }));
            self.initialized = true;
        }

        if let Some(prev) = self.pending.take() {
            let duration = u32::try_from(dts - prev.dts).unwrap_or(u32::MAX);
            self.last_duration = duration;
            self.append(prev, duration, &mut events);
        }

        self.cut(dts, au.ntp, random_access, &mut events);

        self.pending = Some(PendingSample {
            dts,
            data: h264::access_unit_to_avcc(&nalus),
            is_keyframe: random_access,
        });
        self.last_dts = Some(dts);

        Ok(events)
    }

    /// Flush the held-back sample and close the open segment.
    pub fn finish(&mut self) -> Vec<SegmenterEvent> {
        let mut events = Vec::new();
        let Some(prev) = self.pending.take() else {
            return events;
        };

        let duration = if self.last_duration > 0 {
            self.last_duration
        } else {
            FALLBACK_SAMPLE_TICKS
        };
        let end_dts = prev.dts + duration as u64;
        self.append(prev, duration, &mut events);

        if let Some(seg) = self.current.take() {
            self.close_segment(seg, end_dts, &mut events);
        }
        self.last_dts = Some(end_dts);
        events
    }

    /// Add a sample to the open segment. In low-latency mode the buffered
    /// part is flushed first if the sample would stretch it past
    /// `part_duration`, so parts never exceed the advertised part target
    /// unless a single sample is longer than it.
    fn append(&mut self, sample: PendingSample, duration: u32, events: &mut Vec<SegmenterEvent>) {
        let part_ticks = self
            .is_low_latency()
            .then(|| duration_to_ticks(self.config.part_duration));
        let Some(seg) = self.current.as_mut() else {
            return;
        };

        if let Some(part_ticks) = part_ticks {
            let end = sample.dts + duration as u64;
            if !seg.samples.is_empty() && end - seg.samples_start_dts > part_ticks {
                flush_part(seg, &mut self.next_fragment_seq, sample.dts, events);
                seg.samples_independent = sample.is_keyframe;
            }
        }

        seg.samples.push(SampleInfo {
            data: sample.data,
            duration,
            is_keyframe: sample.is_keyframe,
            composition_offset: 0,
        });
    }

    /// Apply segment and part boundaries at `dts`, before the sample starting
    /// there is added.
    fn cut(
        &mut self,
        dts: u64,
        ntp: DateTime<Utc>,
        random_access: bool,
        events: &mut Vec<SegmenterEvent>,
    ) {
        let segment_ticks = duration_to_ticks(self.config.segment_duration);
        let segment_due = match &self.current {
            None => true,
            Some(seg) => random_access && dts - seg.start_dts >= segment_ticks,
        };

        if segment_due {
            if let Some(seg) = self.current.take() {
                self.close_segment(seg, dts, events);
            }
            self.current = Some(OpenSegment {
                id: self.next_segment_id,
                start_dts: dts,
                ntp,
                data: Vec::new(),
                part_count: 0,
                samples: Vec::new(),
                samples_start_dts: dts,
                samples_independent: true,
            });
            self.next_segment_id += 1;
            return;
        }

        if !self.is_low_latency() {
            return;
        }

        let part_ticks = duration_to_ticks(self.config.part_duration);
        if let Some(seg) = self.current.as_mut() {
            if !seg.samples.is_empty() && dts - seg.samples_start_dts >= part_ticks {
                flush_part(seg, &mut self.next_fragment_seq, dts, events);
                seg.samples_independent = random_access;
            }
        }
    }

    fn close_segment(
        &mut self,
        mut seg: OpenSegment,
        end_dts: u64,
        events: &mut Vec<SegmenterEvent>,
    ) {
        let data = if self.is_low_latency() {
            if !seg.samples.is_empty() {
                flush_part(&mut seg, &mut self.next_fragment_seq, end_dts, events);
            }
            seg.data
        } else {
            let fragment = write_media_segment(self.next_fragment_seq, seg.start_dts, &seg.samples);
            self.next_fragment_seq += 1;
            fragment
        };

        let duration = ticks_to_duration(end_dts - seg.start_dts);
        tracing::trace!(id = seg.id, ?duration, parts = seg.part_count, "Segment closed");

        events.push(SegmenterEvent::Segment(SegmentReady {
            id: seg.id,
            ntp: seg.ntp,
            duration,
            data,
            part_count: seg.part_count,
        }));
    }
}

/// Write the buffered samples of `seg` as one fragment and emit it as a part
/// ending at `end_dts`.
fn flush_part(
    seg: &mut OpenSegment,
    seq: &mut u32,
    end_dts: u64,
    events: &mut Vec<SegmenterEvent>,
) {
    let samples = std::mem::take(&mut seg.samples);
    let fragment = write_media_segment(*seq, seg.samples_start_dts, &samples);
    *seq += 1;

    seg.data.extend_from_slice(&fragment);
    events.push(SegmenterEvent::Part(PartReady {
        segment_id: seg.id,
        index: seg.part_count,
        independent: seg.samples_independent,
        duration: ticks_to_duration(end_dts - seg.samples_start_dts),
        data: fragment,
    }));
    seg.part_count += 1;
    seg.samples_start_dts = end_dts;
}
