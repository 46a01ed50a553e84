use std::process::ExitCode;

use clap::Parser;
use lendrelay_cli::Cli;
use lendrelay_core::config::{AppConfig, LogFormat};

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Commands report config errors themselves; logging falls back to defaults.
    let config = AppConfig::load(cli.load_options()).unwrap_or_default();
    init_logging(&config);

    lendrelay_cli::execute(cli)
}
