mod cli;
mod utils;
mod verify;

use clap::Parser;
use cli::Cli;
use utils::StackcheckError;

// Exit codes: 0 = all healthy, 1 = unhealthy or run error, 2 = bad config.
fn main() {
    let cli = Cli::parse();

    let result = verify::run_verify(
        cli.config.as_deref(),
        &cli.output,
        &cli.runtime,
        cli.global_timeout,
        cli.verbose,
    );

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e @ StackcheckError::Config(_)) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
