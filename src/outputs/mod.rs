//! Rendering of the classified front page.
//!
//! # Submodules
//!
//! - [`text`]: Human-readable dump with both buckets (default output)
//! - [`json`]: Pretty-printed JSON of [`ClassifiedResult`](crate::models::ClassifiedResult)
//!
//! Both write nothing themselves; the caller decides where the string goes.

pub mod json;
pub mod text;
