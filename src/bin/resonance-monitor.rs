use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mtf_resonance::{
    config::MonitorConfig,
    logging::init_logging,
    monitor::Monitor,
    notify::{JsonLinesNotifier, LogNotifier, Notifier},
    provider::JsonFileProvider,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-timeframe resonance monitor", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root of the `{SYMBOL}/{interval}.json` bar files
    #[arg(long, value_name = "DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Comma-separated watch list, replacing the configured one
    #[arg(long)]
    symbols: Option<String>,

    /// Run a single cycle and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Write alerts to stdout as JSON lines instead of the log
    #[arg(long, default_value_t = false)]
    json_alerts: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if let Some(symbols) = &cli.symbols {
        config = config.with_symbols(symbols);
    }

    let notifier: Box<dyn Notifier> = if cli.json_alerts {
        Box::new(JsonLinesNotifier::new(std::io::stdout()))
    } else {
        Box::new(LogNotifier)
    };
    let provider = JsonFileProvider::new(&cli.data_dir);

    tracing::info!(
        symbols = config.symbols.len(),
        intervals = ?config.intervals,
        refresh_secs = config.refresh_secs,
        data_dir = %cli.data_dir.display(),
        "monitor starting"
    );

    let monitor = Monitor::new(config, provider, notifier).context("invalid configuration")?;
    monitor.run(cli.once.then_some(1));
    Ok(())
}
