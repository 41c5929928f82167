//! JSON rendering of the ranked front page.
//!
//! Keys follow the serde names on the models: `longTitles`, `shortTitles`,
//! and absent counts as `null`.

use crate::models::ClassifiedResult;
use tracing::{debug, instrument};

/// Serialize a [`ClassifiedResult`] as pretty-printed JSON.
#[instrument(level = "debug", skip_all, fields(stories = result.len()))]
pub fn render(result: &ClassifiedResult) -> serde_json::Result<String> {
    let json = serde_json::to_string_pretty(result)?;
    debug!(bytes = json.len(), "Rendered JSON");
    Ok(json)
}
