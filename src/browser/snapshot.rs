//! Offline engine backed by a saved copy of the front page.
//!
//! "Navigating" loads the HTML, and extraction runs
//! [`extract_from_html`] over it. Nothing is launched, so closing is a
//! no-op apart from bookkeeping.

use super::{Browser, Engine, EngineError, LaunchConfig, Page};
use crate::models::StoryRecord;
use crate::scrapers::hacker_news::extract_from_html;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Html(Arc<str>),
}

/// Serves a fixed document in place of the live site.
#[derive(Debug, Clone)]
pub struct SnapshotEngine {
    source: Source,
}

impl SnapshotEngine {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    pub fn from_html(html: impl Into<Arc<str>>) -> Self {
        Self {
            source: Source::Html(html.into()),
        }
    }
}

pub struct SnapshotBrowser {
    source: Source,
    open: bool,
}

pub struct SnapshotPage {
    source: Source,
    document: Option<Arc<str>>,
}

impl Engine for SnapshotEngine {
    type Browser = SnapshotBrowser;

    async fn launch(&self, _config: &LaunchConfig) -> Result<SnapshotBrowser, EngineError> {
        debug!(source = ?self.source, "Using snapshot engine");
        Ok(SnapshotBrowser {
            source: self.source.clone(),
            open: true,
        })
    }
}

impl Browser for SnapshotBrowser {
    type Page = SnapshotPage;

    async fn new_page(&mut self) -> Result<SnapshotPage, EngineError> {
        if !self.open {
            return Err(EngineError::Other("snapshot browser is closed".to_string()));
        }
        Ok(SnapshotPage {
            source: self.source.clone(),
            document: None,
        })
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.open = false;
        Ok(())
    }
}

impl Page for SnapshotPage {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn goto_and_wait_for_idle(&mut self, url: &Url) -> Result<(), EngineError> {
        let html: Arc<str> = match &self.source {
            Source::File(path) => fs::read_to_string(path).await?.into(),
            Source::Html(html) => Arc::clone(html),
        };
        info!(bytes = html.len(), "Loaded snapshot in place of live page");
        self.document = Some(html);
        Ok(())
    }

    async fn extract_stories(&mut self) -> Result<Vec<StoryRecord>, EngineError> {
        let html = self
            .document
            .as_deref()
            .ok_or_else(|| EngineError::Other("no document loaded".to_string()))?;
        Ok(extract_from_html(html)?)
    }
}
