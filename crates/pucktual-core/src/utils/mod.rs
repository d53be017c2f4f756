//! Utility functions for formatting values for display.

pub mod format;

pub use format::{format_grams, format_seconds, truncate_string};
