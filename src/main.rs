mod cli;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use hc_core::config::{Config, MuxerVariant};

/// Command-line overrides for `start`.
struct StartOverrides {
    host: Option<String>,
    port: Option<u16>,
    dir: Option<PathBuf>,
    segment_count: Option<usize>,
    segment_duration: Option<f64>,
    variant: Option<MuxerVariant>,
    no_feeder: bool,
}

impl StartOverrides {
    fn apply(self, config: &mut Config) -> Result<()> {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.dir {
            config.muxer.directory = dir;
        }
        if let Some(count) = self.segment_count {
            config.muxer.segment_count = count;
        }
        if let Some(secs) = self.segment_duration {
            let duration = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid segment duration {secs}"))?;
            config.muxer.segment_duration_ms = duration.as_millis() as u64;
        }
        if let Some(variant) = self.variant {
            config.muxer.variant = variant;
        }
        if self.no_feeder {
            config.feeder.enabled = false;
        }
        Ok(())
    }
}

async fn start_server(config_path: Option<&Path>, overrides: StartOverrides) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    overrides.apply(&mut config)?;

    tracing::info!("Starting hlscast");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    hc_server::start(config).await?;
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load {}", path.display()))?
        }
        None => Config::default(),
    };

    config.muxer.check()?;

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid");
    } else {
        println!("Configuration is valid with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlscast=trace,hc_server=trace,hc_media=trace,hc_core=debug,tower_http=debug"
                .to_string()
        } else {
            "hlscast=info,hc_server=info,hc_media=info,hc_core=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            dir,
            segment_count,
            segment_duration,
            variant,
            no_feeder,
        } => {
            if matches!(segment_duration, Some(secs) if secs <= 0.0) {
                bail!("--segment-duration must be positive");
            }
            let overrides = StartOverrides {
                host,
                port,
                dir,
                segment_count,
                segment_duration,
                variant,
                no_feeder,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(cli.config.as_deref(), overrides))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlscast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
