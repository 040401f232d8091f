//! mcmafia - chain-of-command bookkeeping CLI.

use clap::Parser;
use mcmafia_cli::{commands, logging, Cli, CliError, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .with_file(cli.config.clone())
        .with_store(cli.store.clone())
        .with_format(cli.format)
        .load();

    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "warn".to_string());
    logging::init(cli.debug, &log_level);

    let result = match config {
        Ok(config) => commands::run(cli.command, &config, &mut std::io::stdout()).await,
        Err(e) => Err(CliError::from(e)),
    };
    std::process::exit(result_to_exit(result));
}

/// Convert a command result to an exit code, reporting the error on stderr.
fn result_to_exit(result: Result<(), CliError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}
