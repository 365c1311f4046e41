use crate::error::{PolyglotError, Result};
use crate::gateway::Gateway;
use crate::language::Language;
use crate::models::{SentenceItem, VocabDraft, VocabItem};
use crate::store::{Store, StoreBackend};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::collections::HashSet;

/// Minimum number of words a review story must use.
pub const MIN_STORY_WORDS: usize = 3;

/// Adds a word to the vocabulary book after fetching its details. Both review
/// flags start cleared.
pub async fn quick_add<G: Gateway + ?Sized, B: StoreBackend>(
    gateway: &G,
    store: &mut Store<B>,
    word: &str,
) -> Result<VocabItem> {
    let word = word.trim();
    if word.is_empty() {
        return Err(PolyglotError::EmptyInput);
    }
    let details = gateway
        .word_details(store.language(), word)
        .await
        .map_err(PolyglotError::Gateway)?;
    store.add_vocab(VocabDraft::from(details))
}

/// Resolves vocabulary ids to their words. Repeated ids count once.
pub fn story_words<B: StoreBackend>(store: &Store<B>, ids: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .map(|id| {
            store
                .find_vocab(id)
                .map(|v| v.word.clone())
                .ok_or_else(|| PolyglotError::UnknownItem(id.clone()))
        })
        .collect()
}

/// Asks the gateway for a short story that uses every word in `words`.
pub async fn generate_story<G: Gateway + ?Sized>(
    gateway: &G,
    language: Language,
    words: &[String],
) -> Result<String> {
    if words.len() < MIN_STORY_WORDS {
        return Err(PolyglotError::NotEnoughWords {
            required: MIN_STORY_WORDS,
            selected: words.len(),
        });
    }
    tracing::debug!(%language, words = words.len(), "generating story");
    gateway
        .generate_story(language, words)
        .await
        .map_err(PolyglotError::Gateway)
}

/// Filters the vocabulary and sentence books by a search term.
pub struct LibrarySearch {
    matcher: SkimMatcherV2,
    threshold: i64,
}

impl Default for LibrarySearch {
    fn default() -> Self {
        Self::new(50)
    }
}

impl LibrarySearch {
    pub fn new(threshold: i64) -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
            threshold,
        }
    }

    // Word: case-insensitive substring or fuzzy subsequence above the threshold.
    // Translation: plain substring.
    pub fn search_vocab<'a>(&self, items: &'a [VocabItem], term: &str) -> Vec<&'a VocabItem> {
        let term = term.trim();
        if term.is_empty() {
            return items.iter().collect();
        }
        let term_lower = term.to_lowercase();
        items
            .iter()
            .filter(|item| {
                let word = item.word.to_lowercase();
                word.contains(&term_lower)
                    || item.translation.contains(term)
                    || self.matcher.fuzzy_match(&word, &term_lower).unwrap_or(0) > self.threshold
            })
            .collect()
    }

    /// Sentences whose original or translation contains `term`, ignoring case.
    pub fn search_sentences<'a>(&self, items: &'a [SentenceItem], term: &str) -> Vec<&'a SentenceItem> {
        let term = term.trim();
        if term.is_empty() {
            return items.iter().collect();
        }
        let term_lower = term.to_lowercase();
        items
            .iter()
            .filter(|s| {
                s.original.to_lowercase().contains(&term_lower)
                    || s.translation.to_lowercase().contains(&term_lower)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, WordDetails};
    use crate::models::now_millis;
    use crate::store::MemoryBackend;

    fn item(word: &str, translation: &str) -> VocabItem {
        VocabItem {
            id: word.to_string(),
            word: word.to_string(),
            translation: translation.to_string(),
            definition: String::new(),
            pronunciation: String::new(),
            collocations: vec![],
            context: String::new(),
            example: String::new(),
            language: Language::German,
            is_mistake: false,
            is_important: false,
            created_at: now_millis(),
        }
    }

    #[test]
    fn search_matches_word_case_insensitively_and_translation_exactly() {
        let items = vec![item("Hund", "狗"), item("Katze", "貓"), item("Hundehütte", "狗屋")];
        let search = LibrarySearch::default();

        let words: Vec<&str> = search.search_vocab(&items, "hund").iter().map(|v| v.word.as_str()).collect();
        assert_eq!(words, ["Hund", "Hundehütte"]);

        let words: Vec<&str> = search.search_vocab(&items, "貓").iter().map(|v| v.word.as_str()).collect();
        assert_eq!(words, ["Katze"]);

        assert_eq!(search.search_vocab(&items, "  ").len(), 3);
        assert!(search.search_vocab(&items, "Vogel").is_empty());
    }

    #[test]
    fn search_tolerates_abbreviated_words() {
        let items = vec![item("Krankenhaus", "醫院"), item("Bahnhof", "車站")];
        let search = LibrarySearch::new(0);
        let words: Vec<&str> = search.search_vocab(&items, "krnknhs").iter().map(|v| v.word.as_str()).collect();
        assert_eq!(words, ["Krankenhaus"]);
    }

    fn sentence(original: &str, translation: &str) -> SentenceItem {
        SentenceItem {
            id: original.to_string(),
            original: original.to_string(),
            translation: translation.to_string(),
            analysis: String::new(),
            language: Language::German,
            created_at: now_millis(),
        }
    }

    #[test]
    fn sentences_match_original_or_translation() {
        let items = vec![
            sentence("Wo ist der Bahnhof?", "車站在哪裡？"),
            sentence("Ich hätte gern einen Kaffee.", "我想要一杯咖啡。"),
        ];
        let search = LibrarySearch::default();

        let found: Vec<&str> = search.search_sentences(&items, "bahnhof").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, ["Wo ist der Bahnhof?"]);

        let found: Vec<&str> = search.search_sentences(&items, "咖啡").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, ["Ich hätte gern einen Kaffee."]);

        assert_eq!(search.search_sentences(&items, "").len(), 2);
        assert!(search.search_sentences(&items, "Flughafen").is_empty());
    }

    #[tokio::test]
    async fn quick_add_stores_unflagged_vocabulary() {
        let mut store = Store::load(MemoryBackend::new()).unwrap();
        let mut gateway = MockGateway::new();
        gateway
            .expect_word_details()
            .times(1)
            .returning(|_, word| {
                Ok(WordDetails {
                    word: word.to_string(),
                    translation: "謝謝".into(),
                    definition: "thanks".into(),
                    pronunciation: "kiitos".into(),
                    collocations: vec![],
                    context: String::new(),
                    example: "Kiitos paljon!".into(),
                })
            });

        let added = quick_add(&gateway, &mut store, " kiitos ").await.unwrap();
        assert_eq!(added.word, "kiitos");
        assert!(!added.is_important && !added.is_mistake);
        assert_eq!(store.pending_review_count(), 0);

        let err = quick_add(&gateway, &mut store, "").await.unwrap_err();
        assert!(matches!(err, PolyglotError::EmptyInput));
    }

    #[test]
    fn repeated_ids_count_once_toward_the_story_minimum() {
        let mut store = Store::load(MemoryBackend::new()).unwrap();
        let hund = store.add_vocab(VocabDraft { word: "Hund".into(), ..Default::default() }).unwrap();
        let katze = store.add_vocab(VocabDraft { word: "Katze".into(), ..Default::default() }).unwrap();

        let ids = vec![hund.id.clone(), hund.id.clone(), katze.id.clone(), hund.id.clone()];
        assert_eq!(story_words(&store, &ids).unwrap(), ["Hund", "Katze"]);

        let err = story_words(&store, &["missing".to_string()]).unwrap_err();
        assert!(matches!(err, PolyglotError::UnknownItem(id) if id == "missing"));
    }

    #[tokio::test]
    async fn stories_need_three_words() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate_story()
            .withf(|_, words| words.len() == 3)
            .times(1)
            .returning(|_, words| Ok(words.join(" ")));

        let two = vec!["Hund".to_string(), "Katze".to_string()];
        let err = generate_story(&gateway, Language::German, &two).await.unwrap_err();
        assert!(matches!(
            err,
            PolyglotError::NotEnoughWords { required: 3, selected: 2 }
        ));

        let three = vec!["Hund".to_string(), "Katze".to_string(), "Maus".to_string()];
        let story = generate_story(&gateway, Language::German, &three).await.unwrap();
        assert_eq!(story, "Hund Katze Maus");
    }
}
