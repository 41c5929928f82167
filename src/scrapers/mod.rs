//! Story extraction for the scraped news site.
//!
//! The site currently covered is the Hacker News front page, in
//! [`hacker_news`]. Extraction has two renditions of the same contract:
//!
//! | Rendition | Runs in | Used by |
//! |-----------|---------|---------|
//! | [`hacker_news::EXTRACT_STORIES_JS`] | the browser page | Chromium sessions |
//! | [`hacker_news::extract_from_html`] | this process, over saved HTML | snapshot runs, tests |
//!
//! Whatever comes back from either one goes through
//! [`hacker_news::validate`] before it reaches the classifier.

pub mod hacker_news;
