//! Title-length classification and ranking.
//!
//! Stories are split into two buckets by the number of whitespace-delimited
//! words in their title:
//!
//! | Bucket | Rule | Sorted by |
//! |--------|------|-----------|
//! | long   | more than 5 words | `comments`, ascending |
//! | short  | 5 words or fewer  | `score`, ascending |
//!
//! Sorting is stable, so equal keys keep their page order. A story whose sort
//! key is absent goes after every story that has one.

use crate::models::{ClassifiedResult, StoryRecord};
use itertools::Itertools;
use tracing::{debug, instrument};

/// Smallest word count that makes a title "long".
pub const LONG_TITLE_MIN_WORDS: usize = 6;

/// Count whitespace-delimited words in a title.
pub fn word_count(title: &str) -> usize {
    title.split_whitespace().count()
}

/// A title is long when it has more than five words.
pub fn is_long_title(title: &str) -> bool {
    word_count(title) >= LONG_TITLE_MIN_WORDS
}

/// Sort key placing present values first (ascending) and absent values last.
fn absent_last(value: Option<u32>) -> (bool, u32) {
    match value {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

/// Partition stories by title length and rank each bucket.
///
/// Total over any input, including an empty slice. Every input record lands
/// in exactly one bucket.
#[instrument(level = "debug", skip_all, fields(count = records.len()))]
pub fn classify(records: &[StoryRecord]) -> ClassifiedResult {
    let (long, short): (Vec<&StoryRecord>, Vec<&StoryRecord>) =
        records.iter().partition(|r| is_long_title(&r.title));

    let long_titles = long
        .into_iter()
        .sorted_by_key(|r| absent_last(r.comments))
        .cloned()
        .collect::<Vec<_>>();
    let short_titles = short
        .into_iter()
        .sorted_by_key(|r| absent_last(r.score))
        .cloned()
        .collect::<Vec<_>>();

    debug!(
        long = long_titles.len(),
        short = short_titles.len(),
        "Classified stories"
    );
    ClassifiedResult {
        long_titles,
        short_titles,
    }
}
