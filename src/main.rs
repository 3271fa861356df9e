mod cli;

use reelcast::{
    config::{self, Config},
    library::Catalog,
    server::{self, AppContext},
    transcode::{ConversionPipeline, ConversionReport, FfmpegTranscoder, HlsProfile},
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting Reelcast server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    // The pipeline must finish before the service accepts traffic: the
    // catalog has its one-time bulk write here.
    let (catalog, report) = convert_library(&config).await?;
    let failed = report
        .values()
        .filter(|o| matches!(o, reelcast::transcode::ConversionOutcome::Failed(_)))
        .count();
    if failed > 0 {
        tracing::warn!(failed, "Some assets failed to convert and stay unavailable");
    }

    let ctx = AppContext::new(config, catalog);
    server::start_server(ctx).await
}

async fn convert_library(config: &Config) -> Result<(Arc<Catalog>, ConversionReport)> {
    std::fs::create_dir_all(&config.library.videos_dir)?;
    std::fs::create_dir_all(&config.library.hls_dir)?;

    let catalog = Arc::new(Catalog::new(config.library.hls_dir.clone()));
    let transcoder = Arc::new(FfmpegTranscoder::new(HlsProfile::default()));
    let pipeline = ConversionPipeline::new(
        transcoder,
        config.library.videos_dir.clone(),
        Arc::clone(&catalog),
        config.transcode.max_parallel,
    );

    let report = pipeline.ensure_all_converted().await?;
    Ok((catalog, report))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelcast=trace,tower_http=debug".to_string()
        } else {
            "reelcast=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_convert(cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_convert(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (_, report) = convert_library(&config).await?;

    if report.is_empty() {
        println!(
            "No source files found in {:?}",
            config.library.videos_dir
        );
        return Ok(());
    }

    for (asset, outcome) in &report {
        println!("{}: {}", asset, outcome);
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    match which::which("ffmpeg") {
        Ok(path) => {
            println!("✓ ffmpeg - {}", path.display());
            Ok(())
        }
        Err(_) => {
            println!("✗ ffmpeg not found on PATH");
            println!("\nInstall ffmpeg to enable library conversion.");
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Videos dir: {:?}", config.library.videos_dir);
            println!("  HLS dir: {:?}", config.library.hls_dir);
            println!("  Max channels: {}", config.channels.max_channels);
            println!("  Max parallel encodes: {}", config.transcode.max_parallel);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Max channels: {}", config.channels.max_channels);
        }
    }

    Ok(())
}
