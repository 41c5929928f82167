//! Browser automation boundary.
//!
//! The session controller only talks to a browser through the traits here,
//! so the pipeline can run against headless Chromium or against a saved
//! page without changing.
//!
//! # Implementations
//!
//! | Engine | Module | Notes |
//! |--------|--------|-------|
//! | Headless Chromium | [`chromium`] | CDP via `chromiumoxide`; in-page extraction script |
//! | Saved HTML | [`snapshot`] | Offline; extraction with `scraper` |

use crate::models::StoryRecord;
use crate::scrapers::hacker_news::ExtractError;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub mod chromium;
pub mod snapshot;

/// Errors reported by a browser engine.
///
/// These carry the collaborator's reason; the session controller decides
/// which pipeline stage they belong to.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("invalid browser configuration: {0}")]
    Config(String),
    #[error("could not decode page result: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Structure(#[from] ExtractError),
    #[error("{0}")]
    Other(String),
}

/// Launch options for the browser process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub headless: bool,
    /// Extra command-line flags passed to the browser.
    pub args: Vec<String>,
    /// Browser binary; `None` lets the engine find one.
    pub executable: Option<PathBuf>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
            ],
            executable: None,
        }
    }
}

/// Something that can start a browser process.
pub trait Engine {
    type Browser: Browser;

    async fn launch(&self, config: &LaunchConfig) -> Result<Self::Browser, EngineError>;
}

/// A running browser process, exclusively owned by one session.
pub trait Browser {
    type Page: Page;

    /// Open a new blank page.
    async fn new_page(&mut self) -> Result<Self::Page, EngineError>;

    /// Shut the browser process down.
    async fn close(&mut self) -> Result<(), EngineError>;
}

/// One page (tab) in a browser.
pub trait Page {
    /// Navigate and wait until network activity has been idle for a short
    /// window.
    async fn goto_and_wait_for_idle(&mut self, url: &Url) -> Result<(), EngineError>;

    /// Read the story records out of the currently rendered document.
    async fn extract_stories(&mut self) -> Result<Vec<StoryRecord>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_launch_config_disables_sandbox() {
        let config = LaunchConfig::default();
        assert!(config.headless);
        assert!(config.args.iter().any(|a| a == "--no-sandbox"));
        assert!(config.args.iter().any(|a| a == "--disable-setuid-sandbox"));
        assert_eq!(config.executable, None);
    }

    #[test]
    fn test_structure_error_message_passes_through() {
        let err = EngineError::from(ExtractError::NoStories);
        assert_eq!(err.to_string(), "no story containers (.athing) on page");
    }
}
