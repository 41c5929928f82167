//! Plain-text rendering of the ranked front page.
//!
//! ```text
//! Hacker News front page, 4 stories (2026-10-19T08:00:00+00:00)
//!
//! Long titles (by comments, 3)
//!   #1   Writing a tiny garbage collector in Rust from scratch  [score 342, comments 87]
//!   #3   Show HN: A calendar for the terminal  [score 12, comments -]
//!
//! Short titles (by score, 1)
//!   #2   SQLite is not a toy  [score 1, comments 1]
//! ```

use crate::models::{ClassifiedResult, StoryRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;

fn count(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}

fn line(story: &StoryRecord) -> String {
    format!(
        "  #{:<3} {}  [score {}, comments {}]",
        story.order,
        story.title,
        count(story.score),
        count(story.comments)
    )
}

fn section(heading: &str, sort_key: &str, stories: &[StoryRecord]) -> String {
    let body = if stories.is_empty() {
        "  (none)".to_string()
    } else {
        stories.iter().map(line).join("\n")
    };
    format!("{heading} (by {sort_key}, {})\n{body}", stories.len())
}

/// Render both buckets as readable text, headed by the generation time.
pub fn render(result: &ClassifiedResult, generated_at: DateTime<Utc>) -> String {
    format!(
        "Hacker News front page, {} stories ({})\n\n{}\n\n{}\n",
        result.len(),
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        section("Long titles", "comments", &result.long_titles),
        section("Short titles", "score", &result.short_titles),
    )
}
