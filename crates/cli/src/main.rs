//! `flies`: listens on a port and logs every request it receives, in full.
//!
//! Requests are rendered on stdout, diagnostics go to stderr.

mod config;
mod startup;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(config.log_level).with_writer(std::io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "can't start flies");
            ExitCode::FAILURE
        }
    }
}
