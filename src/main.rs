use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use xenoscan::config::{validate_config, ConfigLoader};
use xenoscan::probe::ProbeReport;
use xenoscan::{platform_target, BlueprintRegistry, MemoryAddress, ProcessId};

#[derive(Parser, Debug)]
#[command(name = "xenoscan-probe")]
#[command(version)]
#[command(about = "Attach to a process and summarise its address space", long_about = None)]
struct Args {
    /// Process to attach to
    pid: ProcessId,

    #[arg(short, long, default_value = "xenoscan.toml")]
    config: PathBuf,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Re-walk every N seconds until Ctrl+C; overrides the config file
    #[arg(short, long)]
    watch: Option<u64>,

    /// First address to walk
    #[arg(long)]
    start: Option<MemoryAddress>,

    /// Last address to walk
    #[arg(long)]
    end: Option<MemoryAddress>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigLoader::new(&args.config)
        .load_or_default()
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.start.is_some() {
        config.walk.start_address = args.start;
    }
    if args.end.is_some() {
        config.walk.end_address = args.end;
    }
    if let Some(interval) = args.watch {
        config.probe.watch_interval_secs = interval;
    }
    validate_config(&config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(false)
        .init();

    info!("xenoscan-probe v{}", env!("CARGO_PKG_VERSION"));

    let mut target = platform_target();
    target
        .attach(args.pid)
        .with_context(|| format!("attaching to process {}", args.pid))?;

    let registry = BlueprintRegistry::new();

    loop {
        let report = ProbeReport::collect(target.as_ref(), &registry, &config)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report.render_text());
        }

        if config.probe.watch_interval_secs == 0 {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(config.probe.watch_interval_secs)) => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                break;
            }
        }
    }

    target.detach();
    info!("detached from process {}", args.pid);
    Ok(())
}
