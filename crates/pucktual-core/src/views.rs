//! Screen state for the bean list and the extraction detail view.
//!
//! Front ends render these enums; they never inspect `ApiError` themselves.
//! `Unauthorized` is the cue to run a manual login and load again.

use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::models::{sort_newest_first, Bean, Extraction};

#[derive(Debug, Clone, PartialEq)]
pub enum BeanListState {
    Loaded(Vec<Bean>),
    Unauthorized,
    Error(String),
}

impl BeanListState {
    pub fn from_result(result: Result<Vec<Bean>, ApiError>) -> Self {
        match result {
            Ok(beans) => BeanListState::Loaded(beans),
            Err(ApiError::Unauthorized) => BeanListState::Unauthorized,
            Err(e) => {
                warn!(error = %e, "Failed to load beans");
                BeanListState::Error(format!("Failed to load beans: {}", e.user_message()))
            }
        }
    }

    pub fn needs_login(&self) -> bool {
        matches!(self, BeanListState::Unauthorized)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionState {
    /// Newest first, never empty
    Loaded(Vec<Extraction>),
    Empty,
    Unauthorized,
    Error(String),
}

impl ExtractionState {
    pub fn from_result(result: Result<Vec<Extraction>, ApiError>) -> Self {
        match result {
            Ok(extractions) if extractions.is_empty() => ExtractionState::Empty,
            Ok(mut extractions) => {
                sort_newest_first(&mut extractions);
                ExtractionState::Loaded(extractions)
            }
            Err(ApiError::Unauthorized) => ExtractionState::Unauthorized,
            Err(e) => {
                warn!(error = %e, "Failed to load extractions");
                ExtractionState::Error(format!("Failed to load recipes: {}", e.user_message()))
            }
        }
    }

    /// The current recipe: the most recent extraction
    pub fn latest(&self) -> Option<&Extraction> {
        match self {
            ExtractionState::Loaded(extractions) => extractions.first(),
            _ => None,
        }
    }

    /// Older extractions, newest first
    pub fn history(&self) -> &[Extraction] {
        match self {
            ExtractionState::Loaded(extractions) if !extractions.is_empty() => &extractions[1..],
            _ => &[],
        }
    }

    pub fn needs_login(&self) -> bool {
        matches!(self, ExtractionState::Unauthorized)
    }
}

pub async fn load_beans(api: &ApiClient) -> BeanListState {
    BeanListState::from_result(api.fetch_beans().await)
}

pub async fn load_extractions(api: &ApiClient, bean_id: i64) -> ExtractionState {
    ExtractionState::from_result(api.fetch_extractions(bean_id).await)
}
