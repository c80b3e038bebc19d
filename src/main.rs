//! recipeci CLI - dependency-aware build scheduler for package recipes
//!
//! Entry point for the recipeci command-line application.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use recipeci::cli::output::display_error;
use recipeci::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = cli.output();

    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(output.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    // Run the command and handle errors
    let code = match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            display_error(&e);
            1
        }
    };
    std::process::exit(code);
}
