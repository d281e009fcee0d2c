//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON or TOML and
//! carries the server, muxer and feeder sections. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Minimum number of segments kept in a Low-Latency HLS playlist.
pub const MIN_LOW_LATENCY_SEGMENTS: usize = 7;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub muxer: MuxerConfig,
    pub feeder: FeederConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Read and parse a config file. Files ending in `.toml` are parsed as
    /// TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => config,
            Err(Error::Io { source }) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    ///
    /// Fatal muxer problems are reported by [`MuxerConfig::check`].
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !self.feeder.enabled {
            warnings.push("feeder is disabled; no segments will be produced".into());
        } else {
            let gop = self.feeder.keyframe_spacing();
            if gop > self.muxer.segment_duration() {
                warnings.push(format!(
                    "feeder keyframes every {} ms exceed muxer.segment_duration_ms ({}); \
                     segments will be longer than the target",
                    gop.as_millis(),
                    self.muxer.segment_duration_ms
                ));
            }
            if self.feeder.interval_ms == 0 {
                warnings.push("feeder.interval_ms is 0; frames will be sent back to back".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Output flavour of the muxer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxerVariant {
    /// Fragmented MP4 segments, one fragment per segment.
    Fmp4,
    /// Fragmented MP4 segments split into partial segments (LL-HLS).
    #[default]
    LowLatency,
}

impl std::str::FromStr for MuxerVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fmp4" => Ok(MuxerVariant::Fmp4),
            "low-latency" | "low_latency" | "lowlatency" => Ok(MuxerVariant::LowLatency),
            other => Err(Error::Validation(format!(
                "unknown muxer variant '{other}' (valid: fmp4, low-latency)"
            ))),
        }
    }
}

/// HLS muxer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxerConfig {
    /// Directory where playlists and segments are written.
    pub directory: PathBuf,
    pub variant: MuxerVariant,
    /// Number of segments kept in the live playlist window.
    pub segment_count: usize,
    /// Minimum segment duration; segments are cut on the first keyframe after it.
    pub segment_duration_ms: u64,
    /// Target duration of LL-HLS partial segments.
    pub part_duration_ms: u64,
    /// Advertised video width.
    pub width: u32,
    /// Advertised video height.
    pub height: u32,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("hls"),
            variant: MuxerVariant::LowLatency,
            segment_count: MIN_LOW_LATENCY_SEGMENTS,
            segment_duration_ms: 4000,
            part_duration_ms: 200,
            width: 1280,
            height: 720,
        }
    }
}

impl MuxerConfig {
    pub fn segment_duration(&self) -> Duration {
        Duration::from_millis(self.segment_duration_ms)
    }

    pub fn part_duration(&self) -> Duration {
        Duration::from_millis(self.part_duration_ms)
    }

    /// Reject settings the muxer cannot run with.
    pub fn check(&self) -> Result<()> {
        if self.segment_count == 0 {
            return Err(Error::Validation(
                "muxer.segment_count must be at least 1".into(),
            ));
        }
        if self.variant == MuxerVariant::LowLatency
            && self.segment_count < MIN_LOW_LATENCY_SEGMENTS
        {
            return Err(Error::Validation(format!(
                "Low-Latency HLS requires muxer.segment_count >= {MIN_LOW_LATENCY_SEGMENTS}, got {}",
                self.segment_count
            )));
        }
        if self.segment_duration_ms == 0 {
            return Err(Error::Validation(
                "muxer.segment_duration_ms must be greater than 0".into(),
            ));
        }
        if self.variant == MuxerVariant::LowLatency {
            if self.part_duration_ms == 0 {
                return Err(Error::Validation(
                    "muxer.part_duration_ms must be greater than 0".into(),
                ));
            }
            if self.part_duration_ms > self.segment_duration_ms {
                return Err(Error::Validation(format!(
                    "muxer.part_duration_ms ({}) exceeds muxer.segment_duration_ms ({})",
                    self.part_duration_ms, self.segment_duration_ms
                )));
            }
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::Validation(format!(
                "muxer resolution {}x{} is invalid",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Placeholder frame generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    pub enabled: bool,
    /// Delay between two written frames.
    pub interval_ms: u64,
    /// Every n-th frame is a keyframe (IDR). 1 makes every frame a keyframe.
    pub keyframe_interval: u32,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 100,
            keyframe_interval: 10,
        }
    }
}

impl FeederConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Time between two consecutive keyframes.
    pub fn keyframe_spacing(&self) -> Duration {
        self.interval() * self.keyframe_interval.max(1)
    }
}
