use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use spreadscan_config::{load_config, DirectionsConfig, ExchangesConfig};
use spreadscan_discovery::DiscoveryError;

#[derive(Parser)]
#[command(author, version, about = "Pair discovery for the spread scanner")]
struct Cli {
    /// Path to the general configuration file; exchanges.toml and
    /// directions.toml are loaded from the same directory
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,
    /// Output directory (defaults to generated_dir from the config)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Monotonic version stamped into metadata.json; falls back to the
    /// wall-clock timestamp
    #[arg(long)]
    config_version: Option<u64>,
    /// Increases logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The subscriber may not be installed yet when config
            // loading itself failed, so mirror the error to stderr.
            eprintln!("pair-discovery: {err:#}");
            error!(error = format!("{err:#}"), "discovery run failed");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// 0 success, 1 I/O or config error, 2 inventory quorum violation,
/// 3 validation quorum violation.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DiscoveryError>() {
        Some(DiscoveryError::InsufficientSources { .. }) => 2,
        Some(DiscoveryError::ValidationFailed { .. }) => 3,
        Some(DiscoveryError::Io(_)) | None => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config).context("failed to load configuration")?;

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| match cli.verbose {
        0 => config.log_level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    });
    init_tracing(&filter).context("failed to initialize logging")?;

    let config_dir = cli.config.parent().unwrap_or_else(|| Path::new("."));
    let exchanges = ExchangesConfig::load(&config_dir.join("exchanges.toml"))?;
    let directions = DirectionsConfig::load(&config_dir.join("directions.toml"))?;

    let output_dir = cli.output.unwrap_or_else(|| config.generated_dir.clone());
    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    info!(
        config = %cli.config.display(),
        output = %output_dir.display(),
        "starting pair discovery"
    );

    tokio::select! {
        result = spreadscan_discovery::run(
            &client,
            &config,
            &exchanges,
            &directions,
            &output_dir,
            cli.config_version,
        ) => {
            let summary = result?;
            info!(
                symbols = summary.num_symbols,
                pruned = summary.pruned_symbols,
                pair_directions = summary.total_pair_directions(),
                "published generated configs"
            );
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            // In-flight requests are dropped; nothing was emitted, so
            // the previously published files stay current.
            warn!("interrupted; previously published files remain in place");
            Err(anyhow::anyhow!("interrupted"))
        }
    }
}

fn init_tracing(filter: &str) -> Result<()> {
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));
    tracing_subscriber::registry().with(stdout_layer).try_init()?;
    Ok(())
}
