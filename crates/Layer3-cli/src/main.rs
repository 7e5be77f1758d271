//! Reactor CLI - Main entry point

mod load;

use clap::{Parser, Subcommand};
use reactor_core::{resolve, PluginCatalog, Reactor};
use reactor_foundation::validate_manifest_set;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Reactor - manifest-driven plugin host
#[derive(Parser, Debug)]
#[command(name = "reactor")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and resolve a manifest set without starting anything
    Check {
        /// Manifest file (`[[plugin]]` entries)
        manifests: PathBuf,

        /// Config file with plugin overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Boot the manifests with declarative plugins and wait for Ctrl-C
    Run {
        /// Manifest file (`[[plugin]]` entries)
        manifests: PathBuf,

        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match args.command {
        Command::Check { manifests, config } => check(manifests, config),
        Command::Run {
            manifests,
            config,
            json,
        } => run(manifests, config, json).await,
    }
}

/// 검증 + 해석만 수행. 거부된 플러그인이 있으면 실패 코드로 종료
fn check(manifests: PathBuf, config: Option<PathBuf>) -> anyhow::Result<()> {
    let source = load::manifests(&manifests)?;
    let config = load::config(config.as_deref())?;

    let (valid, invalid) = validate_manifest_set(load::effective_manifests(&source, &config)?);
    let resolution = resolve(&valid);

    println!("Load order:");
    for (i, manifest) in resolution.order.iter().enumerate() {
        println!(
            "  {:>2}. {} ({}, {}, priority {})",
            i + 1,
            manifest.name,
            manifest.kind,
            manifest.phase,
            manifest.priority
        );
    }

    let rejected = invalid.len() + resolution.rejected.len();
    if rejected == 0 {
        println!("\n✓ {} plugins resolved", resolution.order.len());
        return Ok(());
    }

    println!("\nRejected:");
    for err in &invalid {
        println!("  ✗ {}", err);
    }
    for err in &resolution.rejected {
        println!("  ✗ {}", err);
    }

    anyhow::bail!("{} plugin(s) rejected", rejected)
}

/// 선언형 카탈로그로 부트하고 Ctrl-C 까지 대기
async fn run(manifests: PathBuf, config: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let source = load::manifests(&manifests)?;
    let config = load::config(config.as_deref())?;

    let system = Reactor::builder()
        .config(config)
        .catalog(PluginCatalog::new())
        .source(source)
        .start()
        .await?;

    let report = system.report();
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("Running: {}", report.running.join(", "));
        for failure in report.failed.iter().chain(&report.rejected) {
            println!("  ✗ {} - {}", failure.plugin, failure.reason);
        }
        println!("Started in {}ms. Press Ctrl-C to stop.", report.startup.as_millis());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, shutting down");

    let shutdown = system.stop().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&shutdown)?);
    } else {
        println!(
            "Stopped {} plugin(s) in {}ms",
            shutdown.stopped.len(),
            shutdown.elapsed.as_millis()
        );
    }

    Ok(())
}
