mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_amp_compare, run_scan};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Scan {
            render,
            screenshot,
            history,
        } => run_scan(args.config, render, screenshot, history).await,
        Commands::AmpCompare { render } => run_amp_compare(args.config, render).await,
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,seoscan=debug,seoscan_lib=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
