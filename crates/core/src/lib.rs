pub mod conversation;
pub mod dictionary;
pub mod error;
pub mod gateway;
pub mod journal;
pub mod language;
pub mod library;
pub mod models;
pub mod offline;
pub mod prompts;
pub mod review;
pub mod scenario;
pub mod speech;
pub mod store;

pub use error::{PolyglotError, Result};
pub use language::Language;

/// Represents side effects the core logic asks the runtime to perform.
///
/// Sessions decide *what* should happen; the runtime owning the speech
/// backend decides *how*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Speak the given text to the user in the current target language.
    SpeakText(String),
}
