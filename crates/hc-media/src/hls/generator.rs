//! HLS playlist generation functions.

use super::types::{MediaPlaylist, MultivariantPlaylist, Part};
use chrono::SecondsFormat;
use std::fmt::Write;

/// Generate an HLS multivariant playlist (M3U8) from a [`MultivariantPlaylist`].
///
/// Output includes `#EXTM3U` header and `#EXT-X-STREAM-INF` for each variant.
pub fn generate_multivariant_playlist(playlist: &MultivariantPlaylist) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTM3U").unwrap();
    if playlist.independent_segments {
        writeln!(out, "#EXT-X-INDEPENDENT-SEGMENTS").unwrap();
    }

    for variant in &playlist.variants {
        write!(out, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth).unwrap();

        if let Some(avg) = variant.average_bandwidth {
            write!(out, ",AVERAGE-BANDWIDTH={}", avg).unwrap();
        }

        if let Some((w, h)) = variant.resolution {
            write!(out, ",RESOLUTION={}x{}", w, h).unwrap();
        }

        if !variant.codecs.is_empty() {
            write!(out, ",CODECS=\"{}\"", variant.codecs).unwrap();
        }

        if let Some(fps) = variant.frame_rate {
            write!(out, ",FRAME-RATE={:.3}", fps).unwrap();
        }

        writeln!(out).unwrap();
        writeln!(out, "{}", variant.uri).unwrap();
    }

    out
}

fn write_part(out: &mut String, part: &Part) {
    write!(out, "#EXT-X-PART:DURATION={:.5},URI=\"{}\"", part.duration, part.uri).unwrap();
    if part.independent {
        write!(out, ",INDEPENDENT=YES").unwrap();
    }
    writeln!(out).unwrap();
}

/// Generate an HLS media playlist (M3U8) from a [`MediaPlaylist`].
///
/// Output includes:
/// - `#EXTM3U`, `#EXT-X-VERSION`, `#EXT-X-TARGETDURATION`
/// - `#EXT-X-SERVER-CONTROL` and `#EXT-X-PART-INF` when configured
/// - `#EXT-X-MEDIA-SEQUENCE` and optional `#EXT-X-MAP`
/// - per segment: `#EXT-X-PROGRAM-DATE-TIME`, `#EXT-X-PART` lines, `#EXTINF`
/// - trailing parts, `#EXT-X-PRELOAD-HINT`, optional `#EXT-X-ENDLIST`
pub fn generate_media_playlist(playlist: &MediaPlaylist) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTM3U").unwrap();
    writeln!(out, "#EXT-X-VERSION:{}", playlist.version).unwrap();
    writeln!(out, "#EXT-X-TARGETDURATION:{}", playlist.target_duration).unwrap();

    if let Some(ref control) = playlist.server_control {
        write!(out, "#EXT-X-SERVER-CONTROL").unwrap();
        let mut sep = ':';
        if control.can_block_reload {
            write!(out, "{sep}CAN-BLOCK-RELOAD=YES").unwrap();
            sep = ',';
        }
        if let Some(hold_back) = control.part_hold_back {
            write!(out, "{sep}PART-HOLD-BACK={:.5}", hold_back).unwrap();
        }
        writeln!(out).unwrap();
    }

    if let Some(part_target) = playlist.part_target {
        writeln!(out, "#EXT-X-PART-INF:PART-TARGET={:.5}", part_target).unwrap();
    }

    writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", playlist.media_sequence).unwrap();

    if let Some(ref init_uri) = playlist.init_segment_uri {
        writeln!(out, "#EXT-X-MAP:URI=\"{}\"", init_uri).unwrap();
    }

    for segment in &playlist.segments {
        if let Some(pdt) = segment.program_date_time {
            writeln!(
                out,
                "#EXT-X-PROGRAM-DATE-TIME:{}",
                pdt.to_rfc3339_opts(SecondsFormat::Millis, true)
            )
            .unwrap();
        }
        for part in &segment.parts {
            write_part(&mut out, part);
        }
        writeln!(out, "#EXTINF:{:.6},", segment.duration).unwrap();
        writeln!(out, "{}", segment.uri).unwrap();
    }

    for part in &playlist.trailing_parts {
        write_part(&mut out, part);
    }

    if let Some(ref hint) = playlist.preload_hint {
        writeln!(out, "#EXT-X-PRELOAD-HINT:TYPE=PART,URI=\"{}\"", hint.uri).unwrap();
    }

    if playlist.ended {
        writeln!(out, "#EXT-X-ENDLIST").unwrap();
    }

    out
}
