//! Utility modules.

pub mod text;

pub use text::{MAX_METADATA_TEXT, truncate_chars, word_count};
