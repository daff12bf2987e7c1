use std::error::Error;

use clap::Parser;
use cronsync::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(64);
        }
    };

    if let Err(e) = init_logger_from_settings(&settings) {
        eprintln!("Failed to initialize logger: {:#}", e);
        std::process::exit(1);
    }

    tracing::debug!(
        version = cronsync::pkg_version(),
        data_dir = %settings.storage.data_dir,
        "Starting cronsync"
    );

    if let Err(e) = execute_command(&cli, settings).await {
        tracing::error!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(e.exit_code());
    }
}
