//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which owns a temporary output directory and a
//! started [`Muxer`]. The [`TestHarness::with_server`] constructor serves the
//! router on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hc_core::config::{MuxerConfig, MuxerVariant};
use hc_server::context::AppContext;
use hc_server::feeder::placeholder_access_unit;
use hc_server::muxer::Muxer;
use hc_server::router::build_router;
use tempfile::TempDir;

/// Frame spacing used by [`TestHarness::feed`].
pub const FRAME_INTERVAL_MS: u64 = 100;

/// Keyframe every 5 frames, so segments of 1 s hold exactly 10 frames.
pub const KEYFRAME_INTERVAL: u32 = 5;

pub struct TestHarness {
    pub dir: TempDir,
    pub ctx: AppContext,
    next_frame: AtomicU64,
}

impl TestHarness {
    /// Harness with a 1 s segment duration and 200 ms parts.
    pub fn new(variant: MuxerVariant) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let config = MuxerConfig {
            directory: dir.path().join("hls"),
            variant,
            segment_count: 7,
            segment_duration_ms: 1000,
            part_duration_ms: 200,
            width: 640,
            height: 360,
        };

        let muxer = Arc::new(Muxer::new(config).expect("invalid muxer config"));
        muxer.start().expect("failed to start muxer");

        Self {
            dir,
            ctx: AppContext::new(muxer),
            next_frame: AtomicU64::new(0),
        }
    }

    pub fn muxer(&self) -> &Muxer {
        &self.ctx.muxer
    }

    /// Write `count` placeholder frames, continuing from the last one written.
    pub fn feed(&self, count: u64) {
        feed_muxer(&self.ctx.muxer, &self.next_frame, count);
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(variant: MuxerVariant) -> (Arc<Self>, SocketAddr) {
        let harness = Arc::new(Self::new(variant));
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Feed `count` frames after `delay` on a background task.
    pub fn feed_later(self: &Arc<Self>, delay: Duration, count: u64) {
        let harness = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            harness.feed(count);
        });
    }
}

fn feed_muxer(muxer: &Muxer, next_frame: &AtomicU64, count: u64) {
    for _ in 0..count {
        let frame = next_frame.fetch_add(1, Ordering::SeqCst);
        let au = placeholder_access_unit(frame, KEYFRAME_INTERVAL);
        muxer
            .write_h264(
                Utc::now(),
                Duration::from_millis(frame * FRAME_INTERVAL_MS),
                &au,
            )
            .expect("failed to write frame");
    }
}
