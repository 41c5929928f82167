//! Headless Chromium engine over the DevTools protocol.
//!
//! `chromiumoxide` hands back a [`Handler`](chromiumoxide::Handler) stream
//! that must be polled for the connection to make progress, so launching
//! spawns it on the tokio runtime and closing tears it down again.
//!
//! # Network idle
//!
//! `Page::goto` only waits for the load event. To get `networkidle0`
//! behaviour the page subscribes to request start/finish/fail events before
//! navigating and then waits until nothing has been in flight for
//! [`NETWORK_IDLE_WINDOW`].

use super::{Browser, Engine, EngineError, LaunchConfig, Page};
use crate::models::StoryRecord;
use crate::scrapers::hacker_news::{EXTRACT_STORIES_JS, ScriptOutcome};
use crate::utils::truncate_for_log;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

/// How long the network must stay quiet before a page counts as loaded.
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Launches a local Chromium/Chrome binary.
#[derive(Debug, Default)]
pub struct ChromiumEngine;

pub struct ChromiumBrowser {
    browser: chromiumoxide::Browser,
    handler_task: Option<JoinHandle<()>>,
}

pub struct ChromiumPage {
    page: chromiumoxide::Page,
}

impl Engine for ChromiumEngine {
    type Browser = ChromiumBrowser;

    #[instrument(level = "info", skip_all, fields(headless = config.headless))]
    async fn launch(&self, config: &LaunchConfig) -> Result<ChromiumBrowser, EngineError> {
        let mut builder = chromiumoxide::BrowserConfig::builder();
        if let Some(ref bin) = config.executable {
            builder = builder.chrome_executable(bin);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .args(config.args.clone())
            .build()
            .map_err(EngineError::Config)?;

        let (browser, mut handler) = chromiumoxide::Browser::launch(browser_config).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Chromium handler event error");
                }
            }
            debug!("Chromium event loop exited");
        });

        info!(args = ?config.args, "Launched Chromium");
        Ok(ChromiumBrowser {
            browser,
            handler_task: Some(handler_task),
        })
    }
}

impl Browser for ChromiumBrowser {
    type Page = ChromiumPage;

    async fn new_page(&mut self) -> Result<ChromiumPage, EngineError> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(ChromiumPage { page })
    }

    #[instrument(level = "info", skip_all)]
    async fn close(&mut self) -> Result<(), EngineError> {
        let browser = &mut self.browser;
        let shutdown = async move {
            browser.close().await?;
            Ok::<_, EngineError>(browser.wait().await?)
        };
        let status = shut_down(shutdown, &mut self.handler_task).await?;
        info!(?status, "Chromium exited");
        Ok(())
    }
}

impl Page for ChromiumPage {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn goto_and_wait_for_idle(&mut self, url: &Url) -> Result<(), EngineError> {
        self.page.execute(EnableParams::default()).await?;

        let started = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|e| NetworkEvent::Settled(e.request_id.inner().clone()));
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|e| NetworkEvent::Settled(e.request_id.inner().clone()));
        let events = std::pin::pin!(stream::select(started, stream::select(finished, failed)));

        self.page.goto(url.as_str()).await?;
        debug!("Load event fired; waiting for network idle");

        let requests = wait_for_network_idle(events, NETWORK_IDLE_WINDOW).await;
        info!(requests, "Network idle");
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn extract_stories(&mut self) -> Result<Vec<StoryRecord>, EngineError> {
        let result = self.page.evaluate(EXTRACT_STORIES_JS).await?;
        let value = result.value().cloned().unwrap_or_default();
        let outcome = serde_json::from_value::<ScriptOutcome>(value.clone()).map_err(|e| {
            warn!(
                error = %e,
                value_preview = %truncate_for_log(&value.to_string(), 300),
                "Page returned an unexpected shape"
            );
            e
        })?;
        let stories = outcome.into_result()?;
        info!(count = stories.len(), "Extracted stories in page");
        Ok(stories)
    }
}

/// Run `shutdown`, then stop the CDP handler task whatever it returned.
///
/// The handler only makes sense while the browser is alive, so it is aborted
/// and awaited even when closing fails. The shutdown result is passed through.
async fn shut_down<T>(
    shutdown: impl Future<Output = Result<T, EngineError>>,
    handler: &mut Option<JoinHandle<()>>,
) -> Result<T, EngineError> {
    let outcome = shutdown.await;
    if let Some(task) = handler.take() {
        task.abort();
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Chromium handler task failed");
            }
        }
    }
    outcome
}

/// A network request starting or settling (finished or failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NetworkEvent {
    Started(String),
    Settled(String),
}

/// Wait until no request has been in flight for `window`.
///
/// Returns the number of requests observed. Also returns if the event
/// stream ends, which happens when the page goes away.
pub(crate) async fn wait_for_network_idle<S>(mut events: S, window: Duration) -> usize
where
    S: Stream<Item = NetworkEvent> + Unpin,
{
    let mut in_flight: HashSet<String> = HashSet::new();
    let mut seen = 0;
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(NetworkEvent::Started(id)) => {
                    trace!(%id, "Request started");
                    if in_flight.insert(id) {
                        seen += 1;
                    }
                }
                Some(NetworkEvent::Settled(id)) => {
                    trace!(%id, "Request settled");
                    in_flight.remove(&id);
                }
                None => break,
            },
            _ = tokio::time::sleep(window), if in_flight.is_empty() => break,
        }
    }
    seen
}
