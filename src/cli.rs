//! Command-line interface definitions for the front page ranker.
//!
//! None of these change what is scraped; the target page is fixed. They
//! pick the engine, the browser binary and the output format.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Live run through headless Chromium
/// hn_front_page
///
/// # JSON output, explicit browser binary
/// hn_front_page --json --chrome-bin /usr/bin/chromium
///
/// # Offline run against a saved page
/// hn_front_page --snapshot ./front_page.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Read the front page from a saved HTML file instead of launching a browser
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Print the result as JSON instead of text
    #[arg(short, long)]
    pub json: bool,

    /// Path to the Chrome/Chromium binary
    #[arg(long, env = "CHROME_BIN")]
    pub chrome_bin: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}
