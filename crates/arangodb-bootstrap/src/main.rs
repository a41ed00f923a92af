use std::process::ExitCode;

use arangodb_bootstrap::cli::{Cli, parse_exit_code};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Prints usage for errors, help text or version otherwise
            let _ = e.print();
            return ExitCode::from(parse_exit_code(&e));
        }
    };

    ExitCode::from(arangodb_bootstrap::run(cli).await)
}
