//! Data models for the coffee service.
//!
//! - `Bean`: a coffee product (name, manufacturer, decaf flag)
//! - `Extraction`: one recorded espresso shot for a bean

pub mod bean;
pub mod extraction;

pub use bean::Bean;
pub use extraction::{sort_newest_first, Extraction};
