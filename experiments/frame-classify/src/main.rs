mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use mote_base::init_logging;
use mote_camera::{CameraError, open_source};
use mote_infer::{
    CycleError, CycleStats, ExecutionContext, InferenceRunner, LogReporter, PrintReporter,
    ResultReporter, create_registry,
};
use std::path::PathBuf;
use std::time::Duration;

/// Capture frames and classify them with a pre-compiled model.
#[derive(Parser, Debug)]
#[command(name = "frame-classify", version)]
struct Cli {
    /// JSON configuration file
    config: PathBuf,

    /// Override the configured cycle limit (0 = until the source runs out)
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Print every result to stdout
    #[arg(long)]
    print: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(cycles) = cli.cycles {
        config.runner.max_cycles = cycles;
    }
    config.runner.print |= cli.print;

    init_logging(&config.log).context("failed to initialize logging")?;
    log::info!("configuration loaded from {}", cli.config.display());

    let registry = create_registry();
    let mut context = ExecutionContext::create(&registry, &config.model)
        .with_context(|| format!("failed to load model {}", config.model.model.display()))?;
    let mut source =
        open_source(&config.source, config.camera.clone()).context("failed to open frame source")?;

    let labels = config.model.labels.clone();
    let mut reporter: Box<dyn ResultReporter> = if config.runner.print {
        Box::new(PrintReporter::stdout(labels))
    } else {
        Box::new(LogReporter::new(labels, config.runner.top_k))
    };

    let mut runner = InferenceRunner::new(&mut context)?;
    let interval = Duration::from_millis(config.runner.interval_ms);
    let max_cycles = config.runner.max_cycles;

    let mut cycle = 0;
    while max_cycles == 0 || cycle < max_cycles {
        cycle += 1;
        match runner.run_cycle(source.as_mut(), reporter.as_mut()) {
            Ok(()) => {}
            Err(CycleError::Acquisition(CameraError::Unavailable(reason))) => {
                log::info!("frame source exhausted: {reason}");
                break;
            }
            Err(e) if e.is_retryable() => {
                log::warn!("cycle {cycle} failed ({:?}): {e}", e.reason());
            }
            Err(e) => return Err(e).context("inference stopped"),
        }
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    finish(runner.stats())
}

/// Log the run summary; a run in which every cycle failed is an error.
fn finish(stats: &CycleStats) -> Result<()> {
    log::info!(
        "{} cycles, {} succeeded, {} failed, last invoke {:?}",
        stats.cycles,
        stats.successes,
        stats.failures(),
        stats.last_latency
    );
    if stats.successes == 0 && stats.failures() > 0 {
        anyhow::bail!("all {} cycles failed", stats.cycles);
    }
    Ok(())
}
