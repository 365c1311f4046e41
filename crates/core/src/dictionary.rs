//! One-shot lookups of a word or grammar point, with promotion of the result
//! into the vocabulary or grammar lists.

use crate::error::{PolyglotError, Result};
use crate::gateway::{DictionaryResult, Gateway};
use crate::language::Language;
use crate::models::{GrammarItem, VocabDraft, VocabItem};
use crate::store::{Store, StoreBackend};

/// Returns the gateway's entry for `query` exactly as received.
pub async fn lookup<G: Gateway + ?Sized>(
    gateway: &G,
    language: Language,
    query: &str,
) -> Result<DictionaryResult> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PolyglotError::EmptyQuery);
    }
    tracing::debug!(%language, query, "dictionary lookup");
    gateway
        .lookup(language, query)
        .await
        .map_err(PolyglotError::Gateway)
}

/// Fetches full word details for the looked-up term and stores it as important vocabulary.
pub async fn save_as_vocab<G: Gateway + ?Sized, B: StoreBackend>(
    gateway: &G,
    store: &mut Store<B>,
    result: &DictionaryResult,
) -> Result<VocabItem> {
    let details = gateway
        .word_details(store.language(), &result.term)
        .await
        .map_err(PolyglotError::Gateway)?;
    store.add_vocab(VocabDraft::from(details).important())
}

pub fn save_as_grammar<B: StoreBackend>(
    store: &mut Store<B>,
    result: &DictionaryResult,
) -> Result<GrammarItem> {
    store.add_grammar(&result.term, &result.definition, vec![result.example.clone()])
}
