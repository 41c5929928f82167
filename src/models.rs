//! Data models for scraped stories and their ranked representation.
//!
//! - [`StoryRecord`]: One front-page story as read out of the rendered page
//! - [`ClassifiedResult`]: The two title-length buckets produced by the classifier
//!
//! Both are built once per run and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// A single story entry from the Hacker News front page.
///
/// The numeric fields are optional: a story with no score element (job
/// postings) or no comment count ("discuss") carries `None`, never `0`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoryRecord {
    /// The headline text.
    pub title: String,
    /// 1-based display rank on the page.
    pub order: u32,
    /// Number of comments, if the page shows one.
    pub comments: Option<u32>,
    /// Point score, if the page shows one.
    pub score: Option<u32>,
}

/// Stories split by title length.
///
/// `long_titles` holds titles with more than five words sorted by comment
/// count, `short_titles` the rest sorted by score. Stories with an absent
/// sort key sit at the end of their bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedResult {
    pub long_titles: Vec<StoryRecord>,
    pub short_titles: Vec<StoryRecord>,
}

impl ClassifiedResult {
    /// Total number of stories across both buckets.
    pub fn len(&self) -> usize {
        self.long_titles.len() + self.short_titles.len()
    }

    /// True when neither bucket holds a story.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
