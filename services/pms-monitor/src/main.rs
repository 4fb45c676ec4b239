//! PMS5003 monitor CLI
//!
//! Command-line interface for the particulate monitor.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

#[cfg(feature = "mock")]
use pms_monitor::{load_config, Config, MockSerialPortFactory, MonitorBuilder};
#[cfg(not(feature = "mock"))]
use pms_monitor::{load_config, Config, MonitorBuilder};

#[derive(Parser)]
#[command(name = "pms-monitor")]
#[command(about = "Rolling particulate statistics from a PMS5003 sensor")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port path (overrides config file)
    #[arg(long)]
    port: Option<String>,

    /// CSV output file (overrides config file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the terminal dashboard
    #[arg(long)]
    no_display: bool,

    /// Log level
    #[arg(short, long, default_value = "info", value_parser = parse_log_level)]
    log_level: Level,
}

fn parse_log_level(s: &str) -> Result<Level, String> {
    s.parse().map_err(|_| {
        format!(
            "Invalid log level: {}. Use: trace, debug, info, warn, error",
            s
        )
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so they don't interleave with the dashboard on stdout
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, output={:?}, no_display={}, log_level={:?}",
        args.config,
        args.port,
        args.output,
        args.no_display,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(output) = args.output {
        config.storage.path = output;
    }
    if args.no_display {
        config.display.enabled = false;
    }

    tracing::info!("Starting PMS5003 monitor");
    #[cfg(feature = "mock")]
    tracing::info!("Running in MOCK MODE - no real hardware");
    #[cfg(not(feature = "mock"))]
    tracing::info!("Serial port: {}", config.serial.port);
    tracing::info!("Baud rate: {}", config.serial.baud_rate);
    if config.storage.enabled {
        tracing::info!("Writing readings to {}", config.storage.path.display());
    }

    #[cfg(feature = "mock")]
    let builder = MonitorBuilder::new(config)
        .with_factory(std::sync::Arc::new(MockSerialPortFactory::default()));
    #[cfg(not(feature = "mock"))]
    let builder = MonitorBuilder::new(config);

    builder.build()?.start().await?;

    tracing::info!("Program interrupted. Exiting...");
    Ok(())
}
