//! Main entry point for tabvault CLI

use clap::Parser;
use std::path::PathBuf;
use tabvault::cli::{Cli, Commands};
use tabvault::commands::execute_command;
use tabvault::logging::{self, LogOptions};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Long-running cycles always leave a log file behind
    let file = match (&cli.log_file, &cli.command) {
        (Some(path), _) => Some(path.clone()),
        (None, Commands::Run { .. }) => Some(PathBuf::from(tabvault::DEFAULT_LOG_FILE)),
        (None, _) => None,
    };

    let handle = match logging::init(LogOptions {
        verbose: cli.verbose,
        file,
    }) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Execute the command
    let result = execute_command(cli.command);
    handle.shutdown();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
