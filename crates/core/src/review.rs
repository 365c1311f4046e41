use crate::models::{GrammarItem, SentenceItem, VocabItem};
use rand::Rng;
use rand::seq::SliceRandom;

/// Which saved items go into a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewConfig {
    pub include_vocab: bool,
    pub include_sentences: bool,
    pub include_grammar: bool,
    pub only_important: bool,
    pub only_mistakes: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            include_vocab: true,
            include_sentences: false,
            include_grammar: false,
            only_important: true,
            only_mistakes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Vocab,
    Sentence,
    Grammar,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Vocab => "vocabulary",
            ItemKind::Sentence => "sentence",
            ItemKind::Grammar => "grammar",
        }
    }
}

/// A card in the review pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewItem {
    Vocab(VocabItem),
    Sentence(SentenceItem),
    Grammar(GrammarItem),
}

/// What a card shows on its front and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFace<'a> {
    pub front: &'a str,
    pub pronunciation: Option<&'a str>,
    pub answer: &'a str,
    pub explanation: &'a str,
    pub example: Option<&'a str>,
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

impl ReviewItem {
    pub fn id(&self) -> &str {
        match self {
            ReviewItem::Vocab(v) => &v.id,
            ReviewItem::Sentence(s) => &s.id,
            ReviewItem::Grammar(g) => &g.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ReviewItem::Vocab(_) => ItemKind::Vocab,
            ReviewItem::Sentence(_) => ItemKind::Sentence,
            ReviewItem::Grammar(_) => ItemKind::Grammar,
        }
    }

    /// Importance filter. Grammar has no importance flag of its own and always
    /// passes; sentences never do.
    fn passes_important(&self) -> bool {
        match self {
            ReviewItem::Vocab(v) => v.is_important,
            ReviewItem::Sentence(_) => false,
            ReviewItem::Grammar(_) => true,
        }
    }

    /// Only vocabulary carries a mistake flag.
    fn is_mistake(&self) -> bool {
        matches!(self, ReviewItem::Vocab(v) if v.is_mistake)
    }

    pub fn face(&self) -> CardFace<'_> {
        match self {
            ReviewItem::Vocab(v) => CardFace {
                front: &v.word,
                pronunciation: non_empty(&v.pronunciation),
                answer: &v.translation,
                explanation: &v.definition,
                example: non_empty(&v.example),
            },
            ReviewItem::Sentence(s) => CardFace {
                front: &s.original,
                pronunciation: None,
                answer: &s.translation,
                explanation: "",
                example: non_empty(&s.analysis),
            },
            ReviewItem::Grammar(g) => CardFace {
                front: &g.rule,
                pronunciation: None,
                answer: "Grammar",
                explanation: &g.explanation,
                example: g.examples.first().map(String::as_str),
            },
        }
    }
}

/// Builds the filtered, shuffled pool for one session.
pub fn build_pool<R: Rng + ?Sized>(
    config: &ReviewConfig,
    vocab: Vec<VocabItem>,
    sentences: Vec<SentenceItem>,
    grammar: Vec<GrammarItem>,
    rng: &mut R,
) -> Vec<ReviewItem> {
    let mut pool: Vec<ReviewItem> = Vec::new();
    if config.include_vocab {
        pool.extend(vocab.into_iter().map(ReviewItem::Vocab));
    }
    if config.include_sentences {
        pool.extend(sentences.into_iter().map(ReviewItem::Sentence));
    }
    if config.include_grammar {
        pool.extend(grammar.into_iter().map(ReviewItem::Grammar));
    }

    if config.only_important {
        pool.retain(ReviewItem::passes_important);
    }
    if config.only_mistakes {
        pool.retain(ReviewItem::is_mistake);
    }

    pool.shuffle(rng);
    pool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Configuring,
    InProgress,
    /// Every card has been graded.
    Completed,
    /// The filters matched nothing.
    Empty,
}

/// Persisted side effect of grading a card, applied by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeEffect {
    None,
    ClearMistake { vocab_id: String },
}

/// A flip-and-grade pass over a fixed pool of cards.
#[derive(Debug)]
pub struct ReviewSession {
    config: ReviewConfig,
    state: ReviewState,
    pool: Vec<ReviewItem>,
    cursor: usize,
    flipped: bool,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new(ReviewConfig::default())
    }
}

impl ReviewSession {
    pub fn new(config: ReviewConfig) -> Self {
        Self {
            config,
            state: ReviewState::Configuring,
            pool: Vec::new(),
            cursor: 0,
            flipped: false,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Changes the filters. Only allowed before the session starts.
    pub fn configure(&mut self, config: ReviewConfig) -> bool {
        if self.state != ReviewState::Configuring {
            tracing::warn!(state = ?self.state, "review already started; reset before reconfiguring");
            return false;
        }
        self.config = config;
        true
    }

    pub fn start(
        &mut self,
        vocab: Vec<VocabItem>,
        sentences: Vec<SentenceItem>,
        grammar: Vec<GrammarItem>,
    ) -> ReviewState {
        self.start_with_rng(vocab, sentences, grammar, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        vocab: Vec<VocabItem>,
        sentences: Vec<SentenceItem>,
        grammar: Vec<GrammarItem>,
        rng: &mut R,
    ) -> ReviewState {
        if self.state != ReviewState::Configuring {
            tracing::warn!(state = ?self.state, "review already started; ignoring start");
            return self.state;
        }
        self.pool = build_pool(&self.config, vocab, sentences, grammar, rng);
        self.cursor = 0;
        self.flipped = false;
        self.state = if self.pool.is_empty() {
            ReviewState::Empty
        } else {
            ReviewState::InProgress
        };
        tracing::info!(cards = self.pool.len(), config = ?self.config, "review started");
        self.state
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn current_item(&self) -> Option<&ReviewItem> {
        match self.state {
            ReviewState::InProgress => self.pool.get(self.cursor),
            _ => None,
        }
    }

    /// 1-based position of the current card and the pool size.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.current_item()
            .map(|_| (self.cursor + 1, self.pool.len()))
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn flip(&mut self) {
        if self.state == ReviewState::InProgress {
            self.flipped = !self.flipped;
        }
    }

    /// Grades the current card and moves to the next one.
    pub fn grade(&mut self, remembered: bool) -> GradeEffect {
        if self.state != ReviewState::InProgress {
            tracing::warn!(state = ?self.state, "grade outside of an active review ignored");
            return GradeEffect::None;
        }

        let effect = match self.pool.get_mut(self.cursor) {
            Some(ReviewItem::Vocab(v)) if remembered => {
                v.is_mistake = false;
                GradeEffect::ClearMistake {
                    vocab_id: v.id.clone(),
                }
            }
            _ => GradeEffect::None,
        };

        self.cursor += 1;
        self.flipped = false;
        if self.cursor >= self.pool.len() {
            self.state = ReviewState::Completed;
            tracing::info!(cards = self.pool.len(), "review completed");
        }
        effect
    }

    /// Discards the pool and goes back to configuration.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.cursor = 0;
        self.flipped = false;
        self.state = ReviewState::Configuring;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn vocab(id: &str, important: bool, mistake: bool) -> VocabItem {
        VocabItem {
            id: id.to_string(),
            word: format!("word-{id}"),
            translation: format!("tr-{id}"),
            definition: String::new(),
            pronunciation: String::new(),
            collocations: Vec::new(),
            context: String::new(),
            example: String::new(),
            language: Language::Japanese,
            is_mistake: mistake,
            is_important: important,
            created_at: 0,
        }
    }

    fn sentence(id: &str) -> SentenceItem {
        SentenceItem {
            id: id.to_string(),
            original: format!("sentence-{id}"),
            translation: String::new(),
            analysis: String::new(),
            language: Language::Japanese,
            created_at: 0,
        }
    }

    fn grammar(id: &str) -> GrammarItem {
        GrammarItem {
            id: id.to_string(),
            rule: format!("rule-{id}"),
            explanation: "explained".to_string(),
            examples: vec!["ex".to_string()],
            language: Language::Japanese,
            created_at: 0,
        }
    }

    fn everything() -> ReviewConfig {
        ReviewConfig {
            include_vocab: true,
            include_sentences: true,
            include_grammar: true,
            only_important: false,
            only_mistakes: false,
        }
    }

    fn ids(pool: &[ReviewItem]) -> Vec<String> {
        let mut ids: Vec<String> = pool.iter().map(|i| i.id().to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn default_config_reviews_important_vocabulary() {
        let config = ReviewConfig::default();
        assert!(config.include_vocab);
        assert!(!config.include_sentences);
        assert!(!config.include_grammar);
        assert!(config.only_important);
        assert!(!config.only_mistakes);
    }

    #[test]
    fn nothing_included_goes_straight_to_empty() {
        let mut session = ReviewSession::new(ReviewConfig {
            include_vocab: false,
            include_sentences: false,
            include_grammar: false,
            only_important: false,
            only_mistakes: false,
        });
        let state = session.start(
            vec![vocab("v1", true, true)],
            vec![sentence("s1")],
            vec![grammar("g1")],
        );
        assert_eq!(state, ReviewState::Empty);
        assert!(session.current_item().is_none());
        assert_eq!(session.grade(true), GradeEffect::None);
        assert_eq!(session.state(), ReviewState::Empty);
    }

    #[test]
    fn grammar_always_passes_the_important_filter() {
        // Grammar has no importance flag; the filter keeps it regardless.
        let mut rng = StdRng::seed_from_u64(7);
        let grammar_pool: Vec<GrammarItem> = (0..6).map(|i| grammar(&format!("g{i}"))).collect();
        let config = ReviewConfig {
            include_vocab: false,
            include_grammar: true,
            only_important: true,
            ..ReviewConfig::default()
        };
        let pool = build_pool(&config, vec![], vec![], grammar_pool.clone(), &mut rng);
        let expected: Vec<String> = grammar_pool.iter().map(|g| g.id.clone()).collect();
        assert_eq!(ids(&pool), expected);
    }

    #[test]
    fn important_filter_drops_plain_vocab_and_sentences() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = ReviewConfig {
            only_important: true,
            ..everything()
        };
        let pool = build_pool(
            &config,
            vec![vocab("v1", true, false), vocab("v2", false, true)],
            vec![sentence("s1")],
            vec![grammar("g1")],
            &mut rng,
        );
        assert_eq!(ids(&pool), vec!["g1", "v1"]);
    }

    #[test]
    fn mistakes_filter_empties_grammar_and_sentence_pools() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = ReviewConfig {
            include_vocab: false,
            include_sentences: true,
            include_grammar: true,
            only_important: false,
            only_mistakes: true,
        };
        let pool = build_pool(
            &config,
            vec![],
            vec![sentence("s1"), sentence("s2")],
            vec![grammar("g1")],
            &mut rng,
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn combined_filters_keep_important_mistakes() {
        let mut rng = StdRng::seed_from_u64(9);
        let config = ReviewConfig {
            only_important: true,
            only_mistakes: true,
            ..everything()
        };
        let pool = build_pool(
            &config,
            vec![
                vocab("both", true, true),
                vocab("important", true, false),
                vocab("mistake", false, true),
            ],
            vec![],
            vec![grammar("g1")],
            &mut rng,
        );
        assert_eq!(ids(&pool), vec!["both"]);
    }

    #[test]
    fn shuffle_is_a_permutation_of_the_filtered_pool() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<VocabItem> = (0..20).map(|i| vocab(&format!("{i:02}"), false, false)).collect();
        let pool = build_pool(&everything(), items.clone(), vec![], vec![], &mut rng);
        let mut expected: Vec<String> = items.iter().map(|v| v.id.clone()).collect();
        expected.sort();
        assert_eq!(ids(&pool), expected);
    }

    #[test]
    fn remembering_a_vocab_mistake_clears_it() {
        let mut session = ReviewSession::new(ReviewConfig {
            only_important: false,
            ..ReviewConfig::default()
        });
        session.start(vec![vocab("v1", false, true)], vec![], vec![]);

        match session.current_item() {
            Some(ReviewItem::Vocab(v)) => assert!(v.is_mistake),
            other => panic!("expected vocab card, got {other:?}"),
        }
        let effect = session.grade(true);
        assert_eq!(
            effect,
            GradeEffect::ClearMistake {
                vocab_id: "v1".to_string()
            }
        );
    }

    #[test]
    fn grading_sentences_and_grammar_has_no_effect() {
        let mut session = ReviewSession::new(ReviewConfig {
            include_vocab: false,
            include_sentences: true,
            include_grammar: true,
            only_important: false,
            only_mistakes: false,
        });
        session.start(vec![], vec![sentence("s1")], vec![grammar("g1")]);
        assert_eq!(session.grade(true), GradeEffect::None);
        assert_eq!(session.grade(true), GradeEffect::None);
    }

    #[test]
    fn forgetting_a_card_leaves_the_flag_alone() {
        let mut session = ReviewSession::new(ReviewConfig {
            only_important: false,
            ..ReviewConfig::default()
        });
        session.start(vec![vocab("v1", false, true)], vec![], vec![]);
        assert_eq!(session.grade(false), GradeEffect::None);
    }

    #[test]
    fn n_grades_complete_a_pool_of_n() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut session = ReviewSession::new(everything());
        session.start_with_rng(
            vec![vocab("v1", false, false), vocab("v2", false, false)],
            vec![sentence("s1")],
            vec![grammar("g1")],
            &mut rng,
        );
        assert_eq!(session.len(), 4);

        for n in 1..=4 {
            assert_eq!(session.state(), ReviewState::InProgress);
            assert_eq!(session.progress(), Some((n, 4)));
            session.flip();
            assert!(session.is_flipped());
            session.grade(n % 2 == 0);
            assert!(!session.is_flipped());
        }
        assert_eq!(session.state(), ReviewState::Completed);
        assert!(session.current_item().is_none());
        assert_eq!(session.progress(), None);
    }

    #[test]
    fn reconfiguring_requires_a_reset() {
        let mut session = ReviewSession::default();
        session.start(vec![vocab("v1", true, false)], vec![], vec![]);
        assert!(!session.configure(everything()));
        assert_eq!(session.start(vec![], vec![], vec![]), ReviewState::InProgress);

        session.reset();
        assert_eq!(session.state(), ReviewState::Configuring);
        assert!(session.is_empty());
        assert!(session.configure(everything()));
        assert_eq!(session.config(), &everything());
    }

    #[test]
    fn card_faces_follow_the_item_kind() {
        let v = ReviewItem::Vocab(VocabItem {
            pronunciation: "inu".into(),
            example: "犬が走る".into(),
            ..vocab("v1", true, false)
        });
        let face = v.face();
        assert_eq!(face.front, "word-v1");
        assert_eq!(face.pronunciation, Some("inu"));
        assert_eq!(face.example, Some("犬が走る"));
        assert_eq!(v.kind().label(), "vocabulary");

        let g = ReviewItem::Grammar(grammar("g1"));
        assert_eq!(g.face().answer, "Grammar");
        assert_eq!(g.face().example, Some("ex"));

        let s = ReviewItem::Sentence(sentence("s1"));
        assert_eq!(s.face().pronunciation, None);
        assert_eq!(s.kind(), ItemKind::Sentence);
    }
}
