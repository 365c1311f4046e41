use crate::gateway::{
    DictionaryResult, Gateway, HistoryTurn, JournalAnalysis, ScenarioDraft, TutorReply,
    WordDetails,
};
use crate::language::Language;
use crate::models::{VocabSuggestion, WordToken};
use anyhow::Result;
use async_trait::async_trait;

/// A simulated `Gateway`.
///
/// This implementation does not make any network calls. It echoes the input
/// back in plausible, hard-coded shapes so the CLI can be exercised without an
/// API key.
pub struct OfflineGateway;

#[async_trait]
impl Gateway for OfflineGateway {
    async fn lookup(&self, language: Language, query: &str) -> Result<DictionaryResult> {
        Ok(DictionaryResult {
            term: query.to_string(),
            definition: format!("(offline) {language} entry for \"{query}\""),
            pos: "unknown".to_string(),
            related_grammar: String::new(),
            related_vocab: Vec::new(),
            example: query.to_string(),
        })
    }

    async fn tutor_reply(
        &self,
        _language: Language,
        history: &[HistoryTurn],
        message: &str,
        scenario_title: &str,
    ) -> Result<TutorReply> {
        // Simulate a tutor that repeats the learner back.
        let tokens = message
            .split_whitespace()
            .map(|word| WordToken {
                text: word.to_string(),
                pos: String::new(),
                def: String::new(),
                grammar: String::new(),
            })
            .collect();
        Ok(TutorReply {
            message: message.to_string(),
            native_subtitle: format!(
                "(offline) {scenario_title}, turn {}",
                history.len() / 2 + 1
            ),
            tokens,
            correction: None,
        })
    }

    async fn analyze_journal(&self, _language: Language, content: &str) -> Result<JournalAnalysis> {
        Ok(JournalAnalysis {
            optimized: content.trim().to_string(),
            analysis: "(offline) no analysis available".to_string(),
            vocab_suggestions: content
                .split_whitespace()
                .take(3)
                .map(|word| VocabSuggestion {
                    word: word.to_string(),
                    translation: String::new(),
                    definition: String::new(),
                    example: content.trim().to_string(),
                })
                .collect(),
        })
    }

    async fn word_details(&self, _language: Language, word: &str) -> Result<WordDetails> {
        Ok(WordDetails {
            word: word.to_string(),
            translation: String::new(),
            definition: "(offline)".to_string(),
            pronunciation: String::new(),
            collocations: Vec::new(),
            context: String::new(),
            example: String::new(),
        })
    }

    async fn create_scenario(
        &self,
        _language: Language,
        description: &str,
    ) -> Result<ScenarioDraft> {
        Ok(ScenarioDraft {
            title: description.trim().to_string(),
            icon: "fa-star".to_string(),
            description: description.trim().to_string(),
            cheat_sheet: Vec::new(),
        })
    }

    async fn generate_story(&self, language: Language, words: &[String]) -> Result<String> {
        Ok(format!("(offline {language} story) {}.", words.join(" ")))
    }
}
