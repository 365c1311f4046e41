//! Snapshot store for everything the learner has saved.
//!
//! Five named slots (vocabulary, sentences, grammar, journals and the selected
//! language) are read once when the store is loaded and the whole snapshot is
//! written back after every mutation. Backends only deal in strings keyed by
//! slot name, so a directory of files and an in-memory map look the same.

use crate::error::{PolyglotError, Result};
use crate::language::Language;
use crate::models::{
    GrammarItem, JournalEntry, SentenceItem, VocabDraft, VocabItem, VocabSuggestion, new_id,
    now_millis,
};
use crate::review::GradeEffect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("slot {slot} holds unreadable data: {source}")]
    Corrupt {
        slot: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Vocab,
    Sentences,
    Grammar,
    Journals,
    Language,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::Vocab,
        Slot::Sentences,
        Slot::Grammar,
        Slot::Journals,
        Slot::Language,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Slot::Vocab => "polyglot_vocab_v6",
            Slot::Sentences => "polyglot_sentences_v6",
            Slot::Grammar => "polyglot_grammar_v6",
            Slot::Journals => "polyglot_journals_v6",
            Slot::Language => "polyglot_lang_v6",
        }
    }
}

/// Key-value persistence underneath a [`Store`].
pub trait StoreBackend {
    fn read(&self, key: &str) -> std::result::Result<Option<String>, StoreError>;
    fn write(&mut self, key: &str, value: &str) -> std::result::Result<(), StoreError>;
    /// Removes every slot this backend holds.
    fn clear(&mut self) -> std::result::Result<(), StoreError>;

    /// Writes several slots as one snapshot. Stops at the first failure.
    fn write_all(&mut self, entries: &[(&str, String)]) -> std::result::Result<(), StoreError> {
        for (key, value) in entries {
            self.write(key, value)?;
        }
        Ok(())
    }
}

/// Backend used by tests and by callers that do not want anything on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StoreBackend for MemoryBackend {
    fn read(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> std::result::Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

/// One JSON file per slot inside a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn open(dir: impl Into<PathBuf>) -> std::result::Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StoreBackend for FileBackend {
    fn read(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&mut self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
        // Write to a sibling file first so a crash never leaves half a slot behind.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Stages every slot in a temporary file before renaming any of them.
    fn write_all(&mut self, entries: &[(&str, String)]) -> std::result::Result<(), StoreError> {
        let mut staged = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            if let Err(e) = fs::write(&tmp, value) {
                for (tmp, _) in &staged {
                    let _ = fs::remove_file(tmp);
                }
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
            staged.push((tmp, path));
        }
        for (tmp, path) in &staged {
            fs::rename(tmp, path)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> std::result::Result<(), StoreError> {
        for slot in Slot::ALL {
            let path = self.path_for(slot.key());
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub vocab: Vec<VocabItem>,
    pub sentences: Vec<SentenceItem>,
    pub grammar: Vec<GrammarItem>,
    pub journals: Vec<JournalEntry>,
    pub language: Language,
}

/// Backup document written by [`Store::export_json`].
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub vocab: &'a [VocabItem],
    pub sentences: &'a [SentenceItem],
    pub grammar: &'a [GrammarItem],
    pub journals: &'a [JournalEntry],
}

/// Backup document accepted by [`Store::import_json`]. Missing keys leave the
/// matching slot untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ImportDocument {
    pub vocab: Option<Vec<VocabItem>>,
    pub sentences: Option<Vec<SentenceItem>>,
    pub grammar: Option<Vec<GrammarItem>>,
    pub journals: Option<Vec<JournalEntry>>,
}

/// Which slots an import replaced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub vocab: Option<usize>,
    pub sentences: Option<usize>,
    pub grammar: Option<usize>,
    pub journals: Option<usize>,
}

pub struct Store<B: StoreBackend> {
    backend: B,
    state: StoreState,
    revision: watch::Sender<u64>,
}

fn read_list<T, B>(backend: &B, slot: Slot) -> std::result::Result<Vec<T>, StoreError>
where
    T: for<'de> Deserialize<'de>,
    B: StoreBackend,
{
    match backend.read(slot.key())? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            slot: slot.key(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

impl<B: StoreBackend> Store<B> {
    /// Reads every slot from `backend`. Missing slots start empty.
    pub fn load(backend: B) -> std::result::Result<Self, StoreError> {
        let state = Self::read_state(&backend)?;
        tracing::debug!(
            vocab = state.vocab.len(),
            sentences = state.sentences.len(),
            grammar = state.grammar.len(),
            journals = state.journals.len(),
            language = %state.language,
            "store loaded"
        );
        let (revision, _) = watch::channel(0);
        Ok(Self {
            backend,
            state,
            revision,
        })
    }

    fn read_state(backend: &B) -> std::result::Result<StoreState, StoreError> {
        let language = match backend.read(Slot::Language.key())? {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{e}; falling back to {}", Language::default());
                Language::default()
            }),
            None => Language::default(),
        };
        Ok(StoreState {
            vocab: read_list(backend, Slot::Vocab)?,
            sentences: read_list(backend, Slot::Sentences)?,
            grammar: read_list(backend, Slot::Grammar)?,
            journals: read_list(backend, Slot::Journals)?,
            language,
        })
    }

    fn snapshot(state: &StoreState) -> std::result::Result<Vec<(&'static str, String)>, StoreError> {
        Ok(vec![
            (Slot::Vocab.key(), serde_json::to_string(&state.vocab)?),
            (Slot::Sentences.key(), serde_json::to_string(&state.sentences)?),
            (Slot::Grammar.key(), serde_json::to_string(&state.grammar)?),
            (Slot::Journals.key(), serde_json::to_string(&state.journals)?),
            (Slot::Language.key(), state.language.name().to_string()),
        ])
    }

    /// Writes `next` in full and only then makes it the current state. On a
    /// failed write the previous snapshot is written back and the in-memory
    /// state is left as it was.
    fn commit(&mut self, next: StoreState) -> std::result::Result<(), StoreError> {
        let entries = Self::snapshot(&next)?;
        if let Err(e) = self.backend.write_all(&entries) {
            tracing::error!("store write failed: {e}");
            let restore = Self::snapshot(&self.state)
                .and_then(|previous| self.backend.write_all(&previous));
            if let Err(restore_err) = restore {
                tracing::error!("could not restore previous snapshot: {restore_err}");
            }
            return Err(e);
        }
        self.state = next;
        self.revision.send_modify(|rev| *rev += 1);
        Ok(())
    }

    /// Receives a new revision number after every change to the store.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn language(&self) -> Language {
        self.state.language
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        let mut next = self.state.clone();
        next.language = language;
        self.commit(next)?;
        Ok(())
    }

    pub fn vocab(&self) -> &[VocabItem] {
        &self.state.vocab
    }

    pub fn sentences(&self) -> &[SentenceItem] {
        &self.state.sentences
    }

    pub fn grammar(&self) -> &[GrammarItem] {
        &self.state.grammar
    }

    pub fn journals(&self) -> &[JournalEntry] {
        &self.state.journals
    }

    pub fn vocab_in(&self, language: Language) -> Vec<VocabItem> {
        self.state
            .vocab
            .iter()
            .filter(|v| v.language == language)
            .cloned()
            .collect()
    }

    pub fn sentences_in(&self, language: Language) -> Vec<SentenceItem> {
        self.state
            .sentences
            .iter()
            .filter(|s| s.language == language)
            .cloned()
            .collect()
    }

    pub fn grammar_in(&self, language: Language) -> Vec<GrammarItem> {
        self.state
            .grammar
            .iter()
            .filter(|g| g.language == language)
            .cloned()
            .collect()
    }

    pub fn find_vocab(&self, id: &str) -> Option<&VocabItem> {
        self.state.vocab.iter().find(|v| v.id == id)
    }

    /// Vocabulary still waiting for review: mistakes or items marked important.
    pub fn pending_review_count(&self) -> usize {
        self.state
            .vocab
            .iter()
            .filter(|v| v.is_mistake || v.is_important)
            .count()
    }

    pub fn add_vocab(&mut self, draft: VocabDraft) -> Result<VocabItem> {
        let item = VocabItem {
            id: new_id(),
            word: draft.word,
            translation: draft.translation,
            definition: draft.definition,
            pronunciation: draft.pronunciation,
            collocations: draft.collocations,
            context: draft.context,
            example: draft.example,
            language: self.state.language,
            is_mistake: draft.is_mistake,
            is_important: draft.is_important,
            created_at: now_millis(),
        };
        let mut next = self.state.clone();
        next.vocab.insert(0, item.clone());
        self.commit(next)?;
        tracing::info!(id = %item.id, word = %item.word, "vocabulary saved");
        Ok(item)
    }

    pub fn add_sentence(
        &mut self,
        original: &str,
        translation: &str,
        analysis: &str,
    ) -> Result<SentenceItem> {
        let item = SentenceItem {
            id: new_id(),
            original: original.to_string(),
            translation: translation.to_string(),
            analysis: analysis.to_string(),
            language: self.state.language,
            created_at: now_millis(),
        };
        let mut next = self.state.clone();
        next.sentences.insert(0, item.clone());
        self.commit(next)?;
        tracing::info!(id = %item.id, "sentence saved");
        Ok(item)
    }

    pub fn add_grammar(
        &mut self,
        rule: &str,
        explanation: &str,
        examples: Vec<String>,
    ) -> Result<GrammarItem> {
        let item = GrammarItem {
            id: new_id(),
            rule: rule.to_string(),
            explanation: explanation.to_string(),
            examples,
            language: self.state.language,
            created_at: now_millis(),
        };
        let mut next = self.state.clone();
        next.grammar.insert(0, item.clone());
        self.commit(next)?;
        tracing::info!(id = %item.id, rule = %item.rule, "grammar point saved");
        Ok(item)
    }

    pub fn add_journal(
        &mut self,
        original: &str,
        optimized: &str,
        analysis: &str,
        vocab_suggestions: Vec<VocabSuggestion>,
    ) -> Result<JournalEntry> {
        let entry = JournalEntry {
            id: new_id(),
            original: original.to_string(),
            optimized: optimized.to_string(),
            analysis: analysis.to_string(),
            vocab_suggestions,
            created_at: now_millis(),
        };
        let mut next = self.state.clone();
        next.journals.insert(0, entry.clone());
        self.commit(next)?;
        tracing::info!(id = %entry.id, "journal entry saved");
        Ok(entry)
    }

    fn update_vocab(&mut self, id: &str, update: impl FnOnce(&mut VocabItem)) -> Result<&VocabItem> {
        let idx = self
            .state
            .vocab
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| PolyglotError::UnknownItem(id.to_string()))?;
        let mut next = self.state.clone();
        update(&mut next.vocab[idx]);
        self.commit(next)?;
        Ok(&self.state.vocab[idx])
    }

    pub fn set_important(&mut self, id: &str, important: bool) -> Result<&VocabItem> {
        self.update_vocab(id, |v| v.is_important = important)
    }

    pub fn set_mistake(&mut self, id: &str, mistake: bool) -> Result<&VocabItem> {
        self.update_vocab(id, |v| v.is_mistake = mistake)
    }

    pub fn delete_vocab(&mut self, id: &str) -> Result<VocabItem> {
        let idx = self
            .state
            .vocab
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| PolyglotError::UnknownItem(id.to_string()))?;
        let mut next = self.state.clone();
        let removed = next.vocab.remove(idx);
        self.commit(next)?;
        tracing::info!(id = %removed.id, word = %removed.word, "vocabulary deleted");
        Ok(removed)
    }

    /// Applies the side effect of grading a review card.
    ///
    /// Clearing a flag that is already clear, or one on an item that has since
    /// been deleted, changes nothing.
    pub fn apply_grade(&mut self, effect: &GradeEffect) -> Result<()> {
        let GradeEffect::ClearMistake { vocab_id } = effect else {
            return Ok(());
        };
        let flagged = match self.find_vocab(vocab_id) {
            Some(item) => item.is_mistake,
            None => {
                tracing::debug!(id = %vocab_id, "graded item no longer stored");
                false
            }
        };
        if flagged {
            self.set_mistake(vocab_id, false)?;
        }
        Ok(())
    }

    pub fn export(&self) -> ExportDocument<'_> {
        ExportDocument {
            vocab: &self.state.vocab,
            sentences: &self.state.sentences,
            grammar: &self.state.grammar,
            journals: &self.state.journals,
        }
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export())
            .map_err(|e| PolyglotError::Store(StoreError::Json(e)))
    }

    /// Replaces the slots present in `raw`. Invalid JSON leaves the store unchanged.
    pub fn import_json(&mut self, raw: &str) -> Result<ImportSummary> {
        let doc: ImportDocument = serde_json::from_str(raw).map_err(PolyglotError::ImportFormat)?;
        self.import(doc)
    }

    pub fn import(&mut self, doc: ImportDocument) -> Result<ImportSummary> {
        let mut next = self.state.clone();
        let mut summary = ImportSummary::default();
        if let Some(vocab) = doc.vocab {
            summary.vocab = Some(vocab.len());
            next.vocab = vocab;
        }
        if let Some(sentences) = doc.sentences {
            summary.sentences = Some(sentences.len());
            next.sentences = sentences;
        }
        if let Some(grammar) = doc.grammar {
            summary.grammar = Some(grammar.len());
            next.grammar = grammar;
        }
        if let Some(journals) = doc.journals {
            summary.journals = Some(journals.len());
            next.journals = journals;
        }
        self.commit(next)?;
        tracing::info!(?summary, "backup imported");
        Ok(summary)
    }

    /// Wipes every slot and starts over from the empty state.
    pub fn factory_reset(&mut self) -> Result<()> {
        self.backend.clear()?;
        self.state = Self::read_state(&self.backend)?;
        self.revision.send_modify(|rev| *rev += 1);
        tracing::warn!("factory reset: all learning data removed");
        Ok(())
    }
}
