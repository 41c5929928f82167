//! # HN Front Page
//!
//! Loads the Hacker News front page in headless Chromium, reads every story
//! out of the rendered page and ranks them into two buckets by title length.
//!
//! ## Usage
//!
//! ```sh
//! hn_front_page            # text report on stdout
//! hn_front_page --json     # JSON on stdout
//! ```
//!
//! ## Architecture
//!
//! 1. **Launch**: Start a browser with the sandbox disabled
//! 2. **Navigate**: Open a page and wait for network idle
//! 3. **Extract**: Run the extraction script inside the page
//! 4. **Classify**: Split by title length and sort each bucket
//! 5. **Report**: Print the buckets, then close the browser
//!
//! Logs go to stderr so stdout only carries the result. Exit status is 0 on
//! success and 1 if any stage fails.

use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod classifier;
mod cli;
mod models;
mod outputs;
mod scrapers;
mod session;
mod utils;

use browser::LaunchConfig;
use browser::chromium::ChromiumEngine;
use browser::snapshot::SnapshotEngine;
use cli::Cli;
use models::ClassifiedResult;
use outputs::{json, text};
use scrapers::hacker_news::TARGET_URL;
use session::RunFailure;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = LaunchConfig {
        headless: !args.headful,
        executable: args.chrome_bin.clone(),
        ..LaunchConfig::default()
    };

    let as_json = args.json;
    let print = move |result: &ClassifiedResult| match render(result, as_json) {
        Ok(output) => println!("{output}"),
        Err(e) => error!(error = %e, "Failed to render result"),
    };

    let outcome = match args.snapshot {
        Some(ref path) => {
            session::run(&SnapshotEngine::from_file(path), &config, &TARGET_URL, print).await
        }
        None => session::run(&ChromiumEngine, &config, &TARGET_URL, print).await,
    };

    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => {
            report_failure(&failure);
            ExitCode::FAILURE
        }
    }
}

fn render(result: &ClassifiedResult, as_json: bool) -> serde_json::Result<String> {
    if as_json {
        json::render(result)
    } else {
        Ok(text::render(result, Utc::now()))
    }
}

fn report_failure(failure: &RunFailure) {
    eprintln!("Error ({} stage): {}", failure.stage(), failure);
    if let Some(ref cleanup) = failure.cleanup {
        eprintln!("Additionally, the browser could not be closed: {cleanup}");
    }
}
