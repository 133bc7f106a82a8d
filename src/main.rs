mod app;
mod args;
mod config;
mod distributed;
mod domain;
mod entry;
mod error;
mod http;
mod logger;
mod metrics;
mod shutdown;
mod workload;

use std::process::ExitCode;

fn main() -> ExitCode {
    match entry::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
