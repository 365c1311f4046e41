use crate::error::{PolyglotError, Result};
use crate::gateway::{Gateway, JournalAnalysis};
use crate::models::{VocabDraft, VocabItem, VocabSuggestion};
use crate::store::{Store, StoreBackend};

/// Sends a mixed-language journal entry for rewriting and persists the result.
///
/// The returned analysis and the stored `JournalEntry` carry the same
/// optimized text, analysis and suggestions. The entry keeps `content` as typed.
pub async fn analyze<G: Gateway + ?Sized, B: StoreBackend>(
    gateway: &G,
    store: &mut Store<B>,
    content: &str,
) -> Result<JournalAnalysis> {
    if content.trim().is_empty() {
        return Err(PolyglotError::EmptyInput);
    }
    let analysis = gateway
        .analyze_journal(store.language(), content)
        .await
        .map_err(PolyglotError::Gateway)?;
    store.add_journal(
        content,
        &analysis.optimized,
        &analysis.analysis,
        analysis.vocab_suggestions.clone(),
    )?;
    Ok(analysis)
}

/// Promotes one suggested word to important vocabulary.
pub fn save_suggestion<B: StoreBackend>(
    store: &mut Store<B>,
    suggestion: &VocabSuggestion,
) -> Result<VocabItem> {
    store.add_vocab(VocabDraft::from(suggestion.clone()).important())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::language::Language;
    use crate::store::MemoryBackend;

    fn analysis() -> JournalAnalysis {
        JournalAnalysis {
            optimized: "Heute bin ich ins Kino gegangen.".into(),
            analysis: "Perfekt mit sein für Bewegungsverben.".into(),
            vocab_suggestions: vec![VocabSuggestion {
                word: "das Kino".into(),
                translation: "電影院".into(),
                definition: "cinema".into(),
                example: "Wir gehen ins Kino.".into(),
            }],
        }
    }

    #[tokio::test]
    async fn stored_entry_matches_the_returned_analysis() {
        let mut store = Store::load(MemoryBackend::new()).unwrap();
        store.set_language(Language::German).unwrap();
        let mut gateway = MockGateway::new();
        gateway
            .expect_analyze_journal()
            .withf(|lang, content| *lang == Language::German && content.contains("今天"))
            .times(1)
            .returning(|_, _| Ok(analysis()));

        let shown = analyze(&gateway, &mut store, "  今天我 ging ins Kino  ").await.unwrap();
        let stored = &store.journals()[0];
        assert_eq!(stored.original, "  今天我 ging ins Kino  ");
        assert_eq!(stored.optimized, shown.optimized);
        assert_eq!(stored.analysis, shown.analysis);
        assert_eq!(stored.vocab_suggestions, shown.vocab_suggestions);
    }

    #[tokio::test]
    async fn blank_or_failed_entries_are_not_stored() {
        let mut store = Store::load(MemoryBackend::new()).unwrap();
        let mut gateway = MockGateway::new();
        gateway
            .expect_analyze_journal()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("malformed JSON")));

        let err = analyze(&gateway, &mut store, "   ").await.unwrap_err();
        assert!(matches!(err, PolyglotError::EmptyInput));
        let err = analyze(&gateway, &mut store, "Hej").await.unwrap_err();
        assert!(matches!(err, PolyglotError::Gateway(_)));
        assert!(store.journals().is_empty());
    }

    #[test]
    fn suggestions_become_important_vocabulary() {
        let mut store = Store::load(MemoryBackend::new()).unwrap();
        let suggestion = &analysis().vocab_suggestions[0];
        let item = save_suggestion(&mut store, suggestion).unwrap();
        assert_eq!(item.word, "das Kino");
        assert_eq!(item.translation, "電影院");
        assert!(item.is_important);
        assert_eq!(store.pending_review_count(), 1);
    }
}
