use crate::store::StoreError;

/// Errors surfaced to the operator at the point of the action that caused them.
///
/// None of these are retried automatically. Component state (a half-typed
/// message, an existing transcript) is left untouched when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum PolyglotError {
    #[error("input is empty")]
    EmptyInput,
    #[error("query is empty")]
    EmptyQuery,
    #[error("gateway request failed: {0:#}")]
    Gateway(#[source] anyhow::Error),
    #[error("backup is not valid JSON: {0}")]
    ImportFormat(#[source] serde_json::Error),
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),
    #[error("speech recognition is already listening")]
    RecognitionInProgress,
    #[error("no scenario selected")]
    NoScenarioSelected,
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("no item with id {0}")]
    UnknownItem(String),
    #[error("select at least {required} words (got {selected})")]
    NotEnoughWords { required: usize, selected: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PolyglotError>;
