//! Muxer output on disk.

mod common;

use std::collections::HashSet;

use common::TestHarness;
use hc_core::config::MuxerVariant;
use hc_server::muxer::{MEDIA_PLAYLIST, MULTIVARIANT_PLAYLIST};

fn files_in(dir: &std::path::Path) -> HashSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[cfg(unix)]
#[test]
fn output_directory_is_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let harness = TestHarness::new(MuxerVariant::Fmp4);
    let mode = std::fs::metadata(harness.muxer().directory())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o755, 0o755);
}

#[test]
fn directory_matches_playlist_window() {
    let harness = TestHarness::new(MuxerVariant::Fmp4);
    // 10 complete segments, window of 7
    harness.feed(101);

    let prefix = harness.muxer().prefix().to_string();
    let files = files_in(harness.muxer().directory());

    let mut expected: HashSet<String> = (3..10).map(|i| format!("{prefix}_seg{i}.mp4")).collect();
    expected.insert(format!("{prefix}_init.mp4"));
    expected.insert(MEDIA_PLAYLIST.to_string());
    expected.insert(MULTIVARIANT_PLAYLIST.to_string());
    assert_eq!(files, expected);

    let playlist =
        std::fs::read_to_string(harness.muxer().directory().join(MEDIA_PLAYLIST)).unwrap();
    assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:3\n"));
    assert_eq!(playlist.matches("#EXTINF:1.000000,").count(), 7);
    assert_eq!(playlist.matches("#EXT-X-PROGRAM-DATE-TIME:").count(), 7);
}

#[test]
fn low_latency_keeps_recent_parts_only() {
    let harness = TestHarness::new(MuxerVariant::LowLatency);
    // segments 0..=4 complete, segment 5 open with two parts
    harness.feed(55);

    let prefix = harness.muxer().prefix().to_string();
    let files = files_in(harness.muxer().directory());
    let parts: HashSet<&String> = files.iter().filter(|f| f.contains("_part")).collect();

    // parts of segments 3 and 4 (numbers 15..25) plus the open segment's 25 and 26
    assert_eq!(parts.len(), 12);
    assert!(files.contains(&format!("{prefix}_part15.mp4")));
    assert!(files.contains(&format!("{prefix}_part26.mp4")));
    assert!(!files.contains(&format!("{prefix}_part14.mp4")));

    let snap = harness.muxer().snapshot();
    assert_eq!(snap.next_msn, 5);
    assert_eq!(snap.next_part, 2);
    let body = snap.body.unwrap();
    assert!(body.contains("#EXT-X-PART-INF:PART-TARGET=0.20000\n"));
    assert!(body.contains("PART-HOLD-BACK=0.60000"));
    assert_eq!(body.matches("#EXT-X-PART:").count(), 12);
    assert!(body.contains(&format!("URI=\"{prefix}_part15.mp4\",INDEPENDENT=YES")));
}

#[test]
fn close_writes_ended_playlist() {
    let harness = TestHarness::new(MuxerVariant::LowLatency);
    harness.feed(25);
    harness.muxer().close().unwrap();

    let playlist =
        std::fs::read_to_string(harness.muxer().directory().join(MEDIA_PLAYLIST)).unwrap();
    assert!(playlist.ends_with("#EXT-X-ENDLIST\n"));
    assert!(!playlist.contains("#EXT-X-PRELOAD-HINT"));
    assert!(playlist.contains(&format!("{}_seg2.mp4", harness.muxer().prefix())));
}
