//! Session controller: one browser, one page, one pass over the front page.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted -> Launched -> PageOpened -> Navigated -> Extracted -> Reported -> Closed
//!      \____________\____________\____________\____________\___________\-> Failed
//! ```
//!
//! Each fallible step is tagged with the [`Stage`] it belongs to. The first
//! failure short-circuits the rest of the pipeline. Once a browser exists it
//! is closed exactly once on every path; a close failure after an earlier
//! failure is kept as secondary context and never replaces the first error.

use crate::browser::{Browser, Engine, EngineError, LaunchConfig, Page};
use crate::classifier::classify;
use crate::models::ClassifiedResult;
use crate::scrapers::hacker_news::validate;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Where a session is in its lifecycle.
///
/// States only move forward. A successful run ends in `Closed`; any failure
/// ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Launched,
    PageOpened,
    Navigated,
    Extracted,
    Reported,
    Closed,
    Failed,
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Launch,
    PageOpen,
    Navigation,
    Extraction,
    Shutdown,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Launch => "launch",
            Stage::PageOpen => "page-open",
            Stage::Navigation => "navigation",
            Stage::Extraction => "extraction",
            Stage::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// A stage failure together with the engine error that caused it.
///
/// Each variant maps to one [`Stage`]; see [`RunError::stage`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Could not launch browser. Reason: {0}")]
    Launch(#[source] EngineError),
    #[error("Could not open new page. Reason: {0}")]
    PageOpen(#[source] EngineError),
    #[error("Could not navigate to {url}. Reason: {source}")]
    Navigation {
        url: String,
        #[source]
        source: EngineError,
    },
    #[error("Something went wrong while crawling the front page. Reason: {0}")]
    Extraction(#[source] EngineError),
    #[error("Could not close browser. Reason: {0}")]
    Shutdown(#[source] EngineError),
}

impl RunError {
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Launch(_) => Stage::Launch,
            RunError::PageOpen(_) => Stage::PageOpen,
            RunError::Navigation { .. } => Stage::Navigation,
            RunError::Extraction(_) => Stage::Extraction,
            RunError::Shutdown(_) => Stage::Shutdown,
        }
    }
}

/// The outcome of a failed run.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    /// First failure encountered.
    pub error: RunError,
    /// Close failure that happened while cleaning up after `error`.
    pub cleanup: Option<EngineError>,
    /// Last state reached before failing.
    pub reached: SessionState,
}

impl RunFailure {
    pub fn stage(&self) -> Stage {
        self.error.stage()
    }
}

struct Session {
    state: SessionState,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::NotStarted,
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session transition");
        self.state = next;
    }

    fn fail(&mut self, error: RunError, cleanup: Option<EngineError>) -> RunFailure {
        let reached = self.state;
        self.advance(SessionState::Failed);
        RunFailure {
            error,
            cleanup,
            reached,
        }
    }
}

/// Run the whole pipeline once.
///
/// `report` receives the classified stories after extraction and before the
/// browser is closed. The result is also returned on success.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn run<E, F>(
    engine: &E,
    config: &LaunchConfig,
    url: &Url,
    report: F,
) -> Result<ClassifiedResult, RunFailure>
where
    E: Engine,
    F: FnOnce(&ClassifiedResult),
{
    info!("Crawler starting");
    let outcome = run_session(engine, config, url, report).await;
    match &outcome {
        Ok(result) => info!(stories = result.len(), "Crawler finished"),
        Err(failure) => error!(stage = %failure.stage(), error = %failure, "Crawler finished with failure"),
    }
    outcome
}

async fn run_session<E, F>(
    engine: &E,
    config: &LaunchConfig,
    url: &Url,
    report: F,
) -> Result<ClassifiedResult, RunFailure>
where
    E: Engine,
    F: FnOnce(&ClassifiedResult),
{
    let mut session = Session::new();

    let mut browser = match engine.launch(config).await {
        Ok(browser) => browser,
        Err(e) => return Err(session.fail(RunError::Launch(e), None)),
    };
    session.advance(SessionState::Launched);

    let outcome = drive(&mut session, &mut browser, url, report).await;
    let closed = browser.close().await;

    match (outcome, closed) {
        (Ok(result), Ok(())) => {
            session.advance(SessionState::Closed);
            Ok(result)
        }
        (Ok(_), Err(e)) => Err(session.fail(RunError::Shutdown(e), None)),
        (Err(error), Ok(())) => Err(session.fail(error, None)),
        (Err(error), Err(close_error)) => {
            warn!(error = %close_error, "Could not close browser after an earlier failure");
            Err(session.fail(error, Some(close_error)))
        }
    }
}

/// Everything between launch and close.
async fn drive<B, F>(
    session: &mut Session,
    browser: &mut B,
    url: &Url,
    report: F,
) -> Result<ClassifiedResult, RunError>
where
    B: Browser,
    F: FnOnce(&ClassifiedResult),
{
    let mut page = browser.new_page().await.map_err(RunError::PageOpen)?;
    session.advance(SessionState::PageOpened);

    page.goto_and_wait_for_idle(url)
        .await
        .map_err(|source| RunError::Navigation {
            url: url.to_string(),
            source,
        })?;
    session.advance(SessionState::Navigated);

    let stories = page
        .extract_stories()
        .await
        .and_then(|stories| {
            validate(&stories)?;
            Ok(stories)
        })
        .map_err(RunError::Extraction)?;
    session.advance(SessionState::Extracted);

    let result = classify(&stories);
    report(&result);
    session.advance(SessionState::Reported);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::snapshot::SnapshotEngine;
    use crate::models::StoryRecord;
    use crate::scrapers::hacker_news::{ExtractError, TARGET_URL};
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FRONT_PAGE: &str = include_str!("../tests/fixtures/front_page.html");

    #[derive(Default)]
    struct Script {
        fail_at: Option<Stage>,
        close_fails: bool,
        stories: Vec<StoryRecord>,
        structure_error: Option<ExtractError>,
        closes: AtomicUsize,
    }

    struct ScriptedEngine(Arc<Script>);
    struct ScriptedBrowser(Arc<Script>);
    struct ScriptedPage(Arc<Script>);

    fn boom(what: &str) -> EngineError {
        EngineError::Other(format!("{what} exploded"))
    }

    impl Engine for ScriptedEngine {
        type Browser = ScriptedBrowser;

        async fn launch(&self, _config: &LaunchConfig) -> Result<ScriptedBrowser, EngineError> {
            if self.0.fail_at == Some(Stage::Launch) {
                return Err(boom("launch"));
            }
            Ok(ScriptedBrowser(Arc::clone(&self.0)))
        }
    }

    impl Browser for ScriptedBrowser {
        type Page = ScriptedPage;

        async fn new_page(&mut self) -> Result<ScriptedPage, EngineError> {
            if self.0.fail_at == Some(Stage::PageOpen) {
                return Err(boom("new page"));
            }
            Ok(ScriptedPage(Arc::clone(&self.0)))
        }

        async fn close(&mut self) -> Result<(), EngineError> {
            self.0.closes.fetch_add(1, Ordering::SeqCst);
            if self.0.close_fails || self.0.fail_at == Some(Stage::Shutdown) {
                return Err(boom("close"));
            }
            Ok(())
        }
    }

    impl Page for ScriptedPage {
        async fn goto_and_wait_for_idle(&mut self, _url: &Url) -> Result<(), EngineError> {
            if self.0.fail_at == Some(Stage::Navigation) {
                return Err(boom("goto"));
            }
            Ok(())
        }

        async fn extract_stories(&mut self) -> Result<Vec<StoryRecord>, EngineError> {
            if let Some(ref e) = self.0.structure_error {
                return Err(EngineError::Structure(e.clone()));
            }
            if self.0.fail_at == Some(Stage::Extraction) {
                return Err(boom("evaluate"));
            }
            Ok(self.0.stories.clone())
        }
    }

    fn story(title: &str, order: u32, comments: Option<u32>, score: Option<u32>) -> StoryRecord {
        StoryRecord {
            title: title.to_string(),
            order,
            comments,
            score,
        }
    }

    fn stories() -> Vec<StoryRecord> {
        vec![
            story("a b c d e f", 1, Some(10), Some(5)),
            story("short one", 2, Some(3), Some(20)),
        ]
    }

    async fn run_script(script: Script) -> (Result<ClassifiedResult, RunFailure>, Arc<Script>, usize) {
        let script = Arc::new(script);
        let engine = ScriptedEngine(Arc::clone(&script));
        let reports = Cell::new(0);
        let outcome = run(&engine, &LaunchConfig::default(), &TARGET_URL, |_| {
            reports.set(reports.get() + 1)
        })
        .await;
        (outcome, script, reports.get())
    }

    #[tokio::test]
    async fn test_successful_run_reports_and_closes() {
        let (outcome, script, reports) = run_script(Script {
            stories: stories(),
            ..Default::default()
        })
        .await;

        let result = outcome.unwrap();
        assert_eq!(result.long_titles[0].order, 1);
        assert_eq!(result.short_titles[0].order, 2);
        assert_eq!(reports, 1);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_has_nothing_to_close() {
        let (outcome, script, reports) = run_script(Script {
            fail_at: Some(Stage::Launch),
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::Launch);
        assert_eq!(failure.reached, SessionState::NotStarted);
        assert!(failure.to_string().starts_with("Could not launch browser"));
        assert_eq!(reports, 0);
        assert_eq!(script.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_page_open_failure_closes_browser() {
        let (outcome, script, _) = run_script(Script {
            fail_at: Some(Stage::PageOpen),
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::PageOpen);
        assert_eq!(failure.reached, SessionState::Launched);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_closes_browser() {
        let (outcome, script, reports) = run_script(Script {
            fail_at: Some(Stage::Navigation),
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::Navigation);
        assert_eq!(failure.reached, SessionState::PageOpened);
        assert!(failure.to_string().contains("news.ycombinator.com"));
        assert_eq!(reports, 0);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_story_containers_is_extraction_failure() {
        let (outcome, script, reports) = run_script(Script {
            structure_error: Some(ExtractError::NoStories),
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::Extraction);
        assert!(matches!(
            failure.error,
            RunError::Extraction(EngineError::Structure(ExtractError::NoStories))
        ));
        assert_eq!(failure.reached, SessionState::Navigated);
        assert_eq!(reports, 0);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_records_are_extraction_failure() {
        let (outcome, script, _) = run_script(Script {
            stories: vec![story("second", 2, None, None), story("first", 1, None, None)],
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::Extraction);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_failure_after_report() {
        let (outcome, script, reports) = run_script(Script {
            fail_at: Some(Stage::Shutdown),
            stories: stories(),
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::Shutdown);
        assert_eq!(failure.reached, SessionState::Reported);
        assert!(failure.cleanup.is_none());
        assert_eq!(reports, 1);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_failure_does_not_mask_first_error() {
        let (outcome, script, _) = run_script(Script {
            fail_at: Some(Stage::Extraction),
            close_fails: true,
            ..Default::default()
        })
        .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.stage(), Stage::Extraction);
        assert!(failure.cleanup.is_some());
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_end_to_end() {
        let engine = SnapshotEngine::from_html(FRONT_PAGE);
        let result = run(&engine, &LaunchConfig::default(), &TARGET_URL, |_| {})
            .await
            .unwrap();

        assert_eq!(result.len(), 5);
        let long = result.long_titles.iter().map(|s| s.order).collect::<Vec<_>>();
        let short = result.short_titles.iter().map(|s| s.order).collect::<Vec<_>>();
        assert_eq!(long, vec![5, 1, 3, 4]);
        assert_eq!(short, vec![2]);
    }

    #[tokio::test]
    async fn test_snapshot_layout_change() {
        let engine = SnapshotEngine::from_html("<html><body><table></table></body></html>");
        let failure = run(&engine, &LaunchConfig::default(), &TARGET_URL, |_| {})
            .await
            .unwrap_err();
        assert_eq!(failure.stage(), Stage::Extraction);
        assert_eq!(failure.reached, SessionState::Navigated);
    }
}
