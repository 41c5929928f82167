//! Hacker News front page extractor.
//!
//! # Page structure
//!
//! Each story is a `tr.athing` row whose `id` is the item id. Inside the row
//! there are two `.title` cells: the first holds the rank (`"1."`), the
//! second wraps the headline anchor. Score and comment count live in the
//! following subtext row and are looked up by id, not by nesting:
//!
//! - score: `#score_{id}`, text like `"118 points"`
//! - comments: the last `a[href="item?id={id}"]` whose text is a count, like
//!   `"42 comments"`. Self-posts link their headline and age to the same
//!   href, so position on the page says nothing.
//!
//! A missing score, or no comment link with a number (`"discuss"`), yields
//! `None`. Counts are `[0-9]+` followed by the unit; anything else is not a
//! count.

use crate::models::StoryRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// The front page. Not configurable.
pub static TARGET_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://news.ycombinator.com/").unwrap());

/// In-page extraction script.
///
/// Self-contained: it reads only the live DOM and returns plain data, either
/// `{status: "ok", stories}` or `{status: "failed", error}` where `error` is
/// an [`ExtractError`] in its serialized form. See [`ScriptOutcome`].
pub const EXTRACT_STORIES_JS: &str = r#"(() => {
  class LayoutError {
    constructor(detail) { this.detail = detail; }
  }
  const fail = (detail) => { throw new LayoutError(detail); };
  const POINTS = /^\s*([0-9]+)\s+points?\s*$/;
  const COMMENTS = /^\s*([0-9]+)\s+comments?\s*$/;
  const ORDINAL = /^\s*([0-9]+)\.?\s*$/;
  const MAX_COUNT = 4294967295;
  const toCount = (text, pattern) => {
    const m = pattern.exec(text);
    if (!m) return null;
    const n = Number(m[1]);
    return Number.isInteger(n) && n <= MAX_COUNT ? n : null;
  };
  try {
    const items = Array.from(document.querySelectorAll('.athing'));
    if (items.length === 0) fail({ kind: 'noStories' });
    const stories = items.map((item, index) => {
      const id = item.id;
      if (!id) fail({ kind: 'missingId', index: index + 1 });
      const titles = item.querySelectorAll('.title');
      if (titles.length < 1) fail({ kind: 'missingOrdinal', id });
      const rank = titles[0].textContent;
      const order = toCount(rank, ORDINAL);
      if (order === null) fail({ kind: 'badOrdinal', id, text: rank.trim() });
      const anchor = titles.length > 1 ? titles[1].querySelector('a') : null;
      if (!anchor) fail({ kind: 'missingTitle', id });
      const scoreElement = document.getElementById(`score_${id}`);
      const comments = Array.from(document.querySelectorAll(`a[href="item?id=${id}"]`))
        .map((a) => toCount(a.textContent, COMMENTS))
        .filter((n) => n !== null);
      return {
        title: anchor.textContent,
        order,
        score: scoreElement ? toCount(scoreElement.textContent, POINTS) : null,
        comments: comments.length > 0 ? comments[comments.length - 1] : null,
      };
    });
    return { status: 'ok', stories };
  } catch (e) {
    if (e instanceof LayoutError) return { status: 'failed', error: e.detail };
    throw e;
  }
})()"#;

/// Structural failures of the page, i.e. the site layout no longer matches.
///
/// Deserializable so the in-page script can report the same failures as
/// plain data.
#[derive(Debug, Clone, Error, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExtractError {
    #[error("no story containers (.athing) on page")]
    NoStories,
    #[error("story container {index} has no id")]
    MissingId { index: usize },
    #[error("story {id} has no ordinal")]
    MissingOrdinal { id: String },
    #[error("story {id} has unparsable ordinal {text:?}")]
    BadOrdinal { id: String, text: String },
    #[error("story {id} has no title anchor")]
    MissingTitle { id: String },
    #[error("story at position {order} has an empty title")]
    EmptyTitle { order: u32 },
    #[error("story order not increasing: {current} follows {previous}")]
    OrderNotIncreasing { previous: u32, current: u32 },
    #[error("invalid selector: {reason}")]
    #[serde(skip_deserializing)]
    Selector { reason: String },
}

/// What [`EXTRACT_STORIES_JS`] hands back to the host.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScriptOutcome {
    Ok { stories: Vec<StoryRecord> },
    Failed { error: ExtractError },
}

impl ScriptOutcome {
    /// Turn the page's answer back into the extractor's own result.
    pub fn into_result(self) -> Result<Vec<StoryRecord>, ExtractError> {
        match self {
            ScriptOutcome::Ok { stories } => Ok(stories),
            ScriptOutcome::Failed { error } => Err(error),
        }
    }
}

static STORY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".athing").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".title").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static POINTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s+points?\s*$").unwrap());
static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s+comments?\s*$").unwrap());
static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([0-9]+)\.?\s*$").unwrap());

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Parse a count like `"118 points"` against `pattern`. Anything else is absent.
fn parse_count(text: &str, pattern: &Regex) -> Option<u32> {
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        reason: e.to_string(),
    })
}

/// Extract stories from a saved copy of the front page.
///
/// Mirrors [`EXTRACT_STORIES_JS`] for documents that are not loaded in a
/// browser.
#[instrument(level = "info", skip_all, fields(bytes = html.len()))]
pub fn extract_from_html(html: &str) -> Result<Vec<StoryRecord>, ExtractError> {
    let document = Html::parse_document(html);

    let items = document.select(&STORY_SELECTOR).collect::<Vec<_>>();
    if items.is_empty() {
        return Err(ExtractError::NoStories);
    }

    let mut stories = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let id = match item.value().id() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(ExtractError::MissingId { index: index + 1 }),
        };

        let mut titles = item.select(&TITLE_SELECTOR);
        let rank = titles
            .next()
            .map(text_of)
            .ok_or_else(|| ExtractError::MissingOrdinal { id: id.clone() })?;
        let order = parse_count(&rank, &ORDINAL).ok_or_else(|| ExtractError::BadOrdinal {
            id: id.clone(),
            text: rank.trim().to_string(),
        })?;

        let title = titles
            .next()
            .and_then(|cell| cell.select(&ANCHOR_SELECTOR).next())
            .map(text_of)
            .ok_or_else(|| ExtractError::MissingTitle { id: id.clone() })?;

        let score = document
            .select(&selector(&format!("#score_{id}"))?)
            .next()
            .and_then(|e| parse_count(&text_of(e), &POINTS));
        let comments = document
            .select(&selector(&format!(r#"a[href="item?id={id}"]"#))?)
            .filter_map(|e| parse_count(&text_of(e), &COMMENTS))
            .last();

        debug!(%id, order, ?score, ?comments, "Extracted story");
        stories.push(StoryRecord {
            title,
            order,
            comments,
            score,
        });
    }

    info!(count = stories.len(), "Extracted stories from HTML");
    Ok(stories)
}

/// Check record invariants on whatever the page handed back.
///
/// Titles must be non-empty and `order` strictly increasing, which also
/// makes it unique.
pub fn validate(records: &[StoryRecord]) -> Result<(), ExtractError> {
    if records.is_empty() {
        return Err(ExtractError::NoStories);
    }
    let mut previous: Option<u32> = None;
    for record in records {
        if record.title.trim().is_empty() {
            return Err(ExtractError::EmptyTitle {
                order: record.order,
            });
        }
        if let Some(previous) = previous {
            if record.order <= previous {
                return Err(ExtractError::OrderNotIncreasing {
                    previous,
                    current: record.order,
                });
            }
        }
        previous = Some(record.order);
    }
    Ok(())
}
