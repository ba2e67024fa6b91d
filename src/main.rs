//! Savekeep CLI - Save-profile backup and restore manager

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = savekeep_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
