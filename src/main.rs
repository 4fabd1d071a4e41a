//! tgbot - command-line client for the Telegram Bot API.

use clap::Parser;
use std::process::ExitCode;

use tgbot::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments; usage errors exit 1, help/version exit 0
    let args = match Commands::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Initialize logging
    let _guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
