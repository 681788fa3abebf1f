//! Query normalization.
//!
//! Bare free-text queries (typically a lone province name) are expanded with
//! a language-appropriate tourism qualifier before they reach the cache-key
//! deriver, so equivalent surface forms normalize to the same key and the
//! upstream search providers get enough context to return useful results.

mod gazetteer;
mod normalizer;

pub use gazetteer::{contains_thai, is_known_place};
pub use normalizer::expand_query;
