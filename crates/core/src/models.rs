//! Domain records owned by the store, plus the chat and scenario shapes used
//! by the conversation session.

use crate::language::Language;
use serde::{Deserialize, Serialize};

/// Fresh opaque identifier for a stored record.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabItem {
    pub id: String,
    pub word: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub pronunciation: String,
    #[serde(default)]
    pub collocations: Vec<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub example: String,
    pub language: Language,
    #[serde(default)]
    pub is_mistake: bool,
    #[serde(default)]
    pub is_important: bool,
    pub created_at: i64,
}

/// A vocabulary entry before the store stamps id, language and creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabDraft {
    pub word: String,
    pub translation: String,
    pub definition: String,
    pub pronunciation: String,
    pub collocations: Vec<String>,
    pub context: String,
    pub example: String,
    pub is_mistake: bool,
    pub is_important: bool,
}

impl VocabDraft {
    pub fn important(mut self) -> Self {
        self.is_important = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceItem {
    pub id: String,
    pub original: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub analysis: String,
    pub language: Language,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarItem {
    pub id: String,
    pub rule: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub examples: Vec<String>,
    pub language: Language,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabSuggestion {
    pub word: String,
    pub translation: String,
    pub definition: String,
    pub example: String,
}

impl From<VocabSuggestion> for VocabDraft {
    fn from(s: VocabSuggestion) -> Self {
        VocabDraft {
            word: s.word,
            translation: s.translation,
            definition: s.definition,
            example: s.example,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub original: String,
    pub optimized: String,
    pub analysis: String,
    #[serde(default)]
    pub vocab_suggestions: Vec<VocabSuggestion>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub description: String,
    pub cheat_sheet: Vec<String>,
    #[serde(default)]
    pub is_custom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Per-word annotation attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordToken {
    pub text: String,
    pub pos: String,
    pub def: String,
    pub grammar: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Correction {
    pub original: String,
    pub suggested: String,
    pub explanation: String,
}

impl Correction {
    /// Providers sometimes return an empty correction object instead of omitting it.
    pub fn is_empty(&self) -> bool {
        self.suggested.trim().is_empty() && self.explanation.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<WordToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Correction>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role: Role::User,
            content: content.into(),
            tokens: Vec::new(),
            translation: None,
            correction: None,
        }
    }
}
