//! REST API client module for the coffee service.
//!
//! This module provides the `ApiClient` for logging in and fetching beans and
//! extractions. Authenticated requests carry the bearer token held by the
//! shared `ActiveToken`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
