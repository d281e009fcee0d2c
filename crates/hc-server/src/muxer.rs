//! Disk-backed live HLS muxer.
//!
//! [`Muxer`] drives a [`Segmenter`] and materializes its output in the
//! configured directory: the init segment, partial segments, complete
//! segments, the media playlist and the multivariant playlist. Every change
//! to the media playlist is also published on a [`watch`] channel so HTTP
//! handlers can serve blocking playlist reloads.
//!
//! The API is synchronous (it performs file I/O under a mutex); async callers
//! should go through `spawn_blocking`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use hc_core::config::{MuxerConfig, MuxerVariant};
use hc_core::{Error, Result};
use hc_media::{
    generate_media_playlist, generate_multivariant_playlist, AccessUnit, MediaPlaylist,
    MultivariantPlaylist, Part, PreloadHint, Segment, Segmenter, SegmenterConfig, SegmenterEvent,
    ServerControl, Variant,
};

/// File name of the media playlist.
pub const MEDIA_PLAYLIST: &str = "stream.m3u8";

/// File name of the multivariant playlist (the entry point for players).
pub const MULTIVARIANT_PLAYLIST: &str = "index.m3u8";

/// Parts are advertised for this many of the most recent complete segments.
const PART_HISTORY_SEGMENTS: usize = 2;

/// State of the media playlist as seen by HTTP handlers.
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    /// Rendered playlist; `None` until the first segment is complete.
    pub body: Option<Arc<str>>,
    /// Media sequence number of the segment being produced.
    pub next_msn: u64,
    /// Index of the next part within that segment.
    pub next_part: usize,
    pub target_duration: Duration,
    /// The stream has ended; no further updates will be published.
    pub ended: bool,
}

impl PlaylistSnapshot {
    /// Whether this playlist already contains segment `msn`, or part `part`
    /// of it when given.
    pub fn satisfies(&self, msn: u64, part: Option<usize>) -> bool {
        if self.ended {
            return true;
        }
        if self.body.is_none() {
            return false;
        }
        match part {
            None => msn < self.next_msn,
            Some(p) => msn < self.next_msn || (msn == self.next_msn && p < self.next_part),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Closed,
}

struct StoredPart {
    uri: String,
    duration: Duration,
    independent: bool,
}

struct StoredSegment {
    id: u64,
    uri: String,
    duration: Duration,
    ntp: DateTime<Utc>,
    size: usize,
    parts: Vec<StoredPart>,
}

struct TrackInfo {
    codecs: String,
    width: u32,
    height: u32,
}

struct MuxerState {
    lifecycle: Lifecycle,
    segmenter: Segmenter,
    track: Option<TrackInfo>,
    segments: VecDeque<StoredSegment>,
    open_parts: Vec<StoredPart>,
    next_part_number: u64,
    target_duration: u32,
    peak_bandwidth: u64,
}

/// Live HLS muxer writing fMP4 segments and playlists to a directory.
pub struct Muxer {
    config: MuxerConfig,
    prefix: String,
    state: Mutex<MuxerState>,
    playlist_tx: watch::Sender<PlaylistSnapshot>,
}

fn ceil_secs(d: Duration) -> u32 {
    d.as_secs_f64().ceil().max(1.0) as u32
}

impl Muxer {
    /// Build a muxer; fails if the configuration is unusable.
    pub fn new(config: MuxerConfig) -> Result<Self> {
        config.check()?;

        let target_duration = ceil_secs(config.segment_duration());
        let (playlist_tx, _) = watch::channel(PlaylistSnapshot {
            body: None,
            next_msn: 0,
            next_part: 0,
            target_duration: Duration::from_secs(target_duration as u64),
            ended: false,
        });

        let mut prefix = uuid::Uuid::new_v4().simple().to_string();
        prefix.truncate(8);

        Ok(Self {
            state: Mutex::new(MuxerState {
                lifecycle: Lifecycle::Created,
                segmenter: Segmenter::new(SegmenterConfig::from(&config)),
                track: None,
                segments: VecDeque::new(),
                open_parts: Vec::new(),
                next_part_number: 0,
                target_duration,
                peak_bandwidth: 0,
            }),
            config,
            prefix,
            playlist_tx,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Random per-instance prefix of every media file name.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn variant(&self) -> MuxerVariant {
        self.config.variant
    }

    pub fn init_uri(&self) -> String {
        format!("{}_init.mp4", self.prefix)
    }

    fn segment_uri(&self, id: u64) -> String {
        format!("{}_seg{}.mp4", self.prefix, id)
    }

    fn part_uri(&self, number: u64) -> String {
        format!("{}_part{}.mp4", self.prefix, number)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.config.directory.join(name)
    }

    /// Current playlist state.
    pub fn snapshot(&self) -> PlaylistSnapshot {
        self.playlist_tx.borrow().clone()
    }

    /// Receive every playlist update.
    pub fn subscribe(&self) -> watch::Receiver<PlaylistSnapshot> {
        self.playlist_tx.subscribe()
    }

    /// Create the output directory and accept writes.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.lifecycle != Lifecycle::Created {
            return Err(Error::State("muxer already started".into()));
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder.create(&self.config.directory)?;

        state.lifecycle = Lifecycle::Running;
        tracing::info!(
            directory = %self.config.directory.display(),
            prefix = %self.prefix,
            variant = ?self.config.variant,
            segment_count = self.config.segment_count,
            segment_duration = ?self.config.segment_duration(),
            "Muxer started"
        );
        Ok(())
    }

    /// Write one H.264 access unit.
    ///
    /// `au` holds raw NAL units or Annex-B buffers. `pts` must increase
    /// strictly between calls; `ntp` is the wall-clock capture time.
    pub fn write_h264(&self, ntp: DateTime<Utc>, pts: Duration, au: &[Vec<u8>]) -> Result<()> {
        let mut state = self.state.lock();
        match state.lifecycle {
            Lifecycle::Created => return Err(Error::State("muxer not started".into())),
            Lifecycle::Closed => return Err(Error::State("muxer is closed".into())),
            Lifecycle::Running => {}
        }

        let events = state.segmenter.push(AccessUnit {
            ntp,
            pts,
            nalus: au.to_vec(),
        })?;
        self.apply(&mut state, events)
    }

    /// Flush the open segment, mark the playlist as ended and refuse further
    /// writes. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.lifecycle {
            Lifecycle::Closed => return Ok(()),
            Lifecycle::Created => {
                state.lifecycle = Lifecycle::Closed;
                return Ok(());
            }
            Lifecycle::Running => {}
        }

        let events = state.segmenter.finish();
        self.apply(&mut state, events)?;
        state.lifecycle = Lifecycle::Closed;
        self.publish(&state, true)?;
        tracing::info!(segments = state.segments.len(), "Muxer closed");
        Ok(())
    }

    /// Apply segmenter output. Events after a failed write are discarded;
    /// the playlist is republished either way so it only lists files that
    /// made it to disk.
    fn apply(&self, state: &mut MuxerState, events: Vec<SegmenterEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut outcome = Ok(());
        for event in events {
            if let Err(e) = self.apply_event(state, event) {
                outcome = Err(e);
                break;
            }
        }

        self.publish(state, false)?;
        outcome
    }

    fn apply_event(&self, state: &mut MuxerState, event: SegmenterEvent) -> Result<()> {
        match event {
            SegmenterEvent::Init(init) => {
                write_atomic(&self.path(&self.init_uri()), &init.data)?;
                tracing::info!(codecs = %init.codecs, "Init segment written");
                state.track = Some(TrackInfo {
                    codecs: init.codecs,
                    width: init.width,
                    height: init.height,
                });
            }
            SegmenterEvent::Part(part) => {
                let uri = self.part_uri(state.next_part_number);
                write_atomic(&self.path(&uri), &part.data)?;
                state.next_part_number += 1;
                tracing::trace!(
                    %uri,
                    segment = part.segment_id,
                    index = part.index,
                    "Part written"
                );
                state.open_parts.push(StoredPart {
                    uri,
                    duration: part.duration,
                    independent: part.independent,
                });
            }
            SegmenterEvent::Segment(segment) => {
                // The parts belong to this segment whether or not it lands on disk.
                let parts = std::mem::take(&mut state.open_parts);
                let uri = self.segment_uri(segment.id);
                if let Err(e) = write_atomic(&self.path(&uri), &segment.data) {
                    for part in &parts {
                        self.remove_file(&part.uri);
                    }
                    return Err(e);
                }
                tracing::debug!(
                    %uri,
                    duration = ?segment.duration,
                    bytes = segment.data.len(),
                    "Segment written"
                );

                state.target_duration = state.target_duration.max(ceil_secs(segment.duration));
                state.segments.push_back(StoredSegment {
                    id: segment.id,
                    uri,
                    duration: segment.duration,
                    ntp: segment.ntp,
                    size: segment.data.len(),
                    parts,
                });
                self.evict(state);

                let secs = segment.duration.as_secs_f64();
                if secs > 0.0 {
                    let bandwidth = (segment.data.len() as f64 * 8.0 / secs) as u64;
                    if bandwidth > state.peak_bandwidth {
                        self.write_multivariant(state, bandwidth)?;
                        state.peak_bandwidth = bandwidth;
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop segments beyond the window and part listings older than
    /// [`PART_HISTORY_SEGMENTS`], deleting their files.
    fn evict(&self, state: &mut MuxerState) {
        while state.segments.len() > self.config.segment_count {
            if let Some(old) = state.segments.pop_front() {
                tracing::debug!(id = old.id, "Evicting segment");
                self.remove_file(&old.uri);
                for part in &old.parts {
                    self.remove_file(&part.uri);
                }
            }
        }

        let keep_from = state.segments.len().saturating_sub(PART_HISTORY_SEGMENTS);
        for segment in state.segments.iter_mut().take(keep_from) {
            for part in segment.parts.drain(..) {
                self.remove_file(&part.uri);
            }
        }
    }

    fn remove_file(&self, name: &str) {
        match std::fs::remove_file(self.path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {name}: {e}"),
        }
    }

    fn write_multivariant(&self, state: &MuxerState, peak_bandwidth: u64) -> Result<()> {
        let Some(ref track) = state.track else {
            return Ok(());
        };

        let total_bytes: usize = state.segments.iter().map(|s| s.size).sum();
        let total_secs: f64 = state.segments.iter().map(|s| s.duration.as_secs_f64()).sum();
        let average_bandwidth =
            (total_secs > 0.0).then(|| (total_bytes as f64 * 8.0 / total_secs) as u64);

        let playlist = MultivariantPlaylist {
            independent_segments: true,
            variants: vec![Variant {
                bandwidth: peak_bandwidth.max(1),
                average_bandwidth,
                resolution: Some((track.width, track.height)),
                codecs: track.codecs.clone(),
                frame_rate: None,
                uri: MEDIA_PLAYLIST.to_string(),
            }],
        };
        write_atomic(
            &self.path(MULTIVARIANT_PLAYLIST),
            generate_multivariant_playlist(&playlist).as_bytes(),
        )
    }

    fn render(&self, state: &MuxerState, ended: bool) -> String {
        let low_latency = self.config.variant == MuxerVariant::LowLatency;
        let part_target = self.config.part_duration().as_secs_f64();

        let to_part = |p: &StoredPart| Part {
            duration: p.duration.as_secs_f64(),
            uri: p.uri.clone(),
            independent: p.independent,
        };

        let playlist = MediaPlaylist {
            version: if low_latency { 9 } else { 7 },
            target_duration: state.target_duration,
            media_sequence: state.segments.front().map_or(0, |s| s.id),
            init_segment_uri: Some(self.init_uri()),
            server_control: Some(ServerControl {
                can_block_reload: true,
                part_hold_back: low_latency.then_some(part_target * 3.0),
            }),
            part_target: low_latency.then_some(part_target),
            segments: state
                .segments
                .iter()
                .map(|s| Segment {
                    duration: s.duration.as_secs_f64(),
                    uri: s.uri.clone(),
                    program_date_time: Some(s.ntp),
                    parts: s.parts.iter().map(to_part).collect(),
                })
                .collect(),
            trailing_parts: state.open_parts.iter().map(to_part).collect(),
            preload_hint: (low_latency && !ended).then(|| PreloadHint {
                uri: self.part_uri(state.next_part_number),
            }),
            ended,
        };
        generate_media_playlist(&playlist)
    }

    fn publish(&self, state: &MuxerState, ended: bool) -> Result<()> {
        let body = if state.segments.is_empty() {
            None
        } else {
            let rendered = self.render(state, ended);
            write_atomic(&self.path(MEDIA_PLAYLIST), rendered.as_bytes())?;
            Some(Arc::from(rendered))
        };

        self.playlist_tx.send_replace(PlaylistSnapshot {
            body,
            next_msn: state.segments.back().map_or(0, |s| s.id + 1),
            next_part: state.open_parts.len(),
            target_duration: Duration::from_secs(state.target_duration as u64),
            ended,
        });
        Ok(())
    }
}

/// Write `data` to a sibling temp file and rename it over `path`, so readers
/// never observe a partially written file.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Internal(format!("invalid output path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&tmp, data)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: [u8; 6] = [0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02];
    const PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

    fn config(dir: &Path, variant: MuxerVariant) -> MuxerConfig {
        MuxerConfig {
            directory: dir.to_path_buf(),
            variant,
            segment_count: 7,
            segment_duration_ms: 1000,
            part_duration_ms: 200,
            width: 640,
            height: 360,
        }
    }

    fn frame(index: u64) -> Vec<Vec<u8>> {
        if index % 5 == 0 {
            vec![SPS.to_vec(), PPS.to_vec(), vec![0x65, 0x88, 0x84]]
        } else {
            vec![vec![0x41, 0x9A]]
        }
    }

    /// Write frames 0..=last at 100 ms spacing.
    fn feed(muxer: &Muxer, last: u64) {
        for i in 0..=last {
            muxer
                .write_h264(Utc::now(), Duration::from_millis(i * 100), &frame(i))
                .unwrap();
        }
    }

    #[test]
    fn snapshot_satisfies() {
        let snap = PlaylistSnapshot {
            body: Some(Arc::from("#EXTM3U\n")),
            next_msn: 5,
            next_part: 2,
            target_duration: Duration::from_secs(4),
            ended: false,
        };
        assert!(snap.satisfies(4, None));
        assert!(!snap.satisfies(5, None));
        assert!(snap.satisfies(5, Some(1)));
        assert!(!snap.satisfies(5, Some(2)));
        assert!(!snap.satisfies(6, Some(0)));

        let empty = PlaylistSnapshot { body: None, ..snap.clone() };
        assert!(!empty.satisfies(0, None));

        let ended = PlaylistSnapshot { ended: true, ..snap };
        assert!(ended.satisfies(100, None));
    }

    #[test]
    fn write_before_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::Fmp4)).unwrap();
        let err = muxer
            .write_h264(Utc::now(), Duration::ZERO, &frame(0))
            .unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }

    #[test]
    fn start_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::Fmp4)).unwrap();
        muxer.start().unwrap();
        assert!(matches!(muxer.start(), Err(Error::State(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), MuxerVariant::LowLatency);
        cfg.segment_count = 3;
        assert!(matches!(Muxer::new(cfg), Err(Error::Validation(_))));
    }

    #[test]
    fn start_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("hls");
        let muxer = Muxer::new(config(&out, MuxerVariant::Fmp4)).unwrap();
        muxer.start().unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn writes_init_segments_and_playlists() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::Fmp4)).unwrap();
        muxer.start().unwrap();

        feed(&muxer, 9);
        assert!(dir.path().join(muxer.init_uri()).exists());
        assert!(muxer.snapshot().body.is_none());
        assert!(!dir.path().join(MEDIA_PLAYLIST).exists());

        feed_from(&muxer, 10, 10);
        let snap = muxer.snapshot();
        assert_eq!(snap.next_msn, 1);
        let body = snap.body.unwrap();
        assert!(body.contains(&format!("#EXT-X-MAP:URI=\"{}\"", muxer.init_uri())));
        assert!(body.contains(&format!("{}_seg0.mp4", muxer.prefix())));
        assert!(!body.contains("#EXT-X-PART"));

        let on_disk = std::fs::read_to_string(dir.path().join(MEDIA_PLAYLIST)).unwrap();
        assert_eq!(on_disk, body.as_ref());

        let index = std::fs::read_to_string(dir.path().join(MULTIVARIANT_PLAYLIST)).unwrap();
        assert!(index.contains("CODECS=\"avc1.42c01e\""));
        assert!(index.contains("RESOLUTION=640x360"));
        assert!(index.contains(MEDIA_PLAYLIST));
    }

    fn feed_from(muxer: &Muxer, first: u64, last: u64) {
        for i in first..=last {
            muxer
                .write_h264(Utc::now(), Duration::from_millis(i * 100), &frame(i))
                .unwrap();
        }
    }

    #[test]
    fn sliding_window_evicts_old_segments() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), MuxerVariant::Fmp4);
        cfg.segment_count = 3;
        let muxer = Muxer::new(cfg).unwrap();
        muxer.start().unwrap();

        // 6 complete segments (ids 0..=5)
        feed(&muxer, 60);

        let body = muxer.snapshot().body.unwrap();
        assert!(body.contains("#EXT-X-MEDIA-SEQUENCE:3\n"));
        assert!(!body.contains(&format!("{}_seg2.mp4", muxer.prefix())));
        assert!(body.contains(&format!("{}_seg5.mp4", muxer.prefix())));

        assert!(!dir.path().join(format!("{}_seg2.mp4", muxer.prefix())).exists());
        assert!(dir.path().join(format!("{}_seg3.mp4", muxer.prefix())).exists());
    }

    #[test]
    fn low_latency_playlist_lists_parts_and_hint() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::LowLatency)).unwrap();
        muxer.start().unwrap();

        // one complete segment plus two parts of the next
        feed(&muxer, 14);

        let snap = muxer.snapshot();
        assert_eq!(snap.next_msn, 1);
        assert_eq!(snap.next_part, 2);
        let body = snap.body.unwrap();
        assert!(body.contains("#EXT-X-VERSION:9"));
        assert!(body.contains("#EXT-X-PART-INF:PART-TARGET=0.20000"));
        assert!(body.contains("CAN-BLOCK-RELOAD=YES"));
        assert_eq!(body.matches("#EXT-X-PART:").count(), 7);
        assert!(body.contains(&format!(
            "#EXT-X-PRELOAD-HINT:TYPE=PART,URI=\"{}_part7.mp4\"",
            muxer.prefix()
        )));
        assert!(dir.path().join(format!("{}_part6.mp4", muxer.prefix())).exists());
    }

    #[test]
    fn old_parts_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::LowLatency)).unwrap();
        muxer.start().unwrap();

        // segments 0, 1, 2 complete; parts of segment 0 are no longer listed
        feed(&muxer, 30);

        let body = muxer.snapshot().body.unwrap();
        assert!(!body.contains(&format!("{}_part0.mp4", muxer.prefix())));
        assert!(body.contains(&format!("{}_part5.mp4", muxer.prefix())));
        assert!(!dir.path().join(format!("{}_part0.mp4", muxer.prefix())).exists());
    }

    #[test]
    fn close_ends_playlist_and_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::Fmp4)).unwrap();
        muxer.start().unwrap();
        feed(&muxer, 12);

        muxer.close().unwrap();
        let snap = muxer.snapshot();
        assert!(snap.ended);
        let body = snap.body.unwrap();
        assert!(body.ends_with("#EXT-X-ENDLIST\n"));
        assert!(body.contains(&format!("{}_seg1.mp4", muxer.prefix())));

        let err = muxer
            .write_h264(Utc::now(), Duration::from_secs(10), &frame(0))
            .unwrap_err();
        assert!(matches!(err, Error::State(_)));
        assert!(muxer.close().is_ok());
    }

    #[test]
    fn subscribers_see_updates() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::Fmp4)).unwrap();
        muxer.start().unwrap();
        let mut rx = muxer.subscribe();
        assert!(!rx.has_changed().unwrap());

        feed(&muxer, 10);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().next_msn, 1);
    }

    #[test]
    fn failed_segment_write_does_not_leak_parts() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = Muxer::new(config(dir.path(), MuxerVariant::LowLatency)).unwrap();
        muxer.start().unwrap();

        // a directory in the way makes the rename of segment 0 fail
        let blocked = dir.path().join(format!("{}_seg0.mp4", muxer.prefix()));
        std::fs::create_dir(&blocked).unwrap();

        feed(&muxer, 9);
        let err = muxer
            .write_h264(Utc::now(), Duration::from_millis(1000), &frame(10))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(muxer.snapshot().next_part, 0);
        assert!(!dir.path().join(format!("{}_part0.mp4", muxer.prefix())).exists());
        assert!(!dir.path().join(format!(".{}_seg0.mp4.tmp", muxer.prefix())).exists());

        feed_from(&muxer, 11, 20);
        let snap = muxer.snapshot();
        assert_eq!(snap.next_msn, 2);
        let body = snap.body.unwrap();
        assert!(!body.contains(&format!("{}_seg0.mp4", muxer.prefix())));
        assert!(body.contains(&format!("{}_seg1.mp4", muxer.prefix())));
        assert_eq!(body.matches("#EXT-X-PART:").count(), 5);
        assert_eq!(body.matches("INDEPENDENT=YES").count(), 1);
        assert!(body.contains(&format!("URI=\"{}_part5.mp4\",INDEPENDENT=YES", muxer.prefix())));
    }

    #[test]
    fn part_durations_stay_within_part_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), MuxerVariant::LowLatency);
        cfg.part_duration_ms = 150;
        let muxer = Muxer::new(cfg).unwrap();
        muxer.start().unwrap();

        // 40 ms frames, keyframe every second
        for i in 0..=60u64 {
            let au = if i % 25 == 0 { frame(0) } else { frame(1) };
            muxer
                .write_h264(Utc::now(), Duration::from_millis(i * 40), &au)
                .unwrap();
        }

        let body = muxer.snapshot().body.unwrap();
        assert!(body.contains("#EXT-X-PART-INF:PART-TARGET=0.15000\n"));
        let durations: Vec<f64> = body
            .lines()
            .filter_map(|l| l.strip_prefix("#EXT-X-PART:DURATION="))
            .map(|rest| rest.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert!(!durations.is_empty());
        for d in durations {
            assert!(d <= 0.15, "part duration {d} exceeds the part target");
        }
    }
}
