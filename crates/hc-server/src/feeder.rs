//! Synthetic frame source.
//!
//! Writes a placeholder H.264 access unit to the muxer on every tick, with a
//! keyframe (SPS, PPS, IDR slice) every `keyframe_interval` frames. The
//! payload is not decodable video; it exercises the muxing pipeline end to
//! end.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hc_core::config::FeederConfig;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::muxer::Muxer;

/// Annex-B access unit delimiter that starts every placeholder frame.
pub const ACCESS_UNIT_DELIMITER: [u8; 5] = [0x00, 0x00, 0x01, 0x09, 0x10];

const PLACEHOLDER_SPS: [u8; 10] = [0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02, 0x80, 0xBF, 0xE5, 0x84];
const PLACEHOLDER_PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];
const PLACEHOLDER_IDR: [u8; 6] = [0x65, 0x88, 0x84, 0x00, 0x33, 0xFF];
const PLACEHOLDER_SLICE: [u8; 4] = [0x41, 0x9A, 0x02, 0x04];

/// Build placeholder access unit number `frame`.
pub fn placeholder_access_unit(frame: u64, keyframe_interval: u32) -> Vec<Vec<u8>> {
    let mut au = vec![ACCESS_UNIT_DELIMITER.to_vec()];
    if frame % u64::from(keyframe_interval.max(1)) == 0 {
        au.push(PLACEHOLDER_SPS.to_vec());
        au.push(PLACEHOLDER_PPS.to_vec());
        au.push(PLACEHOLDER_IDR.to_vec());
    } else {
        au.push(PLACEHOLDER_SLICE.to_vec());
    }
    au
}

/// Feed placeholder frames into `muxer` until `cancel` fires.
///
/// Write errors are logged and do not stop the feeder.
pub async fn run_feeder(muxer: Arc<Muxer>, config: FeederConfig, cancel: CancellationToken) {
    let step_ms = config.interval_ms.max(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(step_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_ms = step_ms,
        keyframe_interval = config.keyframe_interval,
        "Feeder started"
    );

    let mut frame: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let au = placeholder_access_unit(frame, config.keyframe_interval);
        let pts = Duration::from_millis(step_ms.saturating_mul(frame));
        let ntp = Utc::now();

        let writer = muxer.clone();
        match tokio::task::spawn_blocking(move || writer.write_h264(ntp, pts, &au)).await {
            Ok(Ok(())) => tracing::debug!(frame, ?pts, "Frame written"),
            Ok(Err(e)) => tracing::warn!(frame, "Failed to write frame: {e}"),
            Err(e) => {
                tracing::error!("Muxer write task failed: {e}");
                break;
            }
        }
        frame += 1;
    }

    tracing::info!(frames = frame, "Feeder stopped");
}
