mod config;
mod speech;

use crate::config::{Config, ProviderKind};
use crate::speech::CommandSpeech;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use polyglot_core::conversation::ConversationSession;
use polyglot_core::gateway::{DictionaryResult, Gateway, GatewayClient, Provider};
use polyglot_core::models::{ChatMessage, Role, WordToken};
use polyglot_core::offline::OfflineGateway;
use polyglot_core::prompts::PromptSet;
use polyglot_core::review::{ReviewConfig, ReviewSession, ReviewState};
use polyglot_core::scenario::builtin_scenarios;
use polyglot_core::speech::Speech;
use polyglot_core::store::{FileBackend, Store, StoreBackend};
use polyglot_core::{Command, Language, dictionary, journal, library};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::fmt::time::ChronoLocal;

type Input = Lines<BufReader<Stdin>>;
type LocalStore = Store<FileBackend>;

#[derive(Parser)]
#[command(
    name = "polyglot",
    version,
    about = "Dictionary, tutor chat, journal and flashcards for language learners"
)]
struct Cli {
    /// Overrides POLYGLOT_PROVIDER
    #[arg(long, global = true, value_enum)]
    provider: Option<ProviderKind>,
    /// Overrides POLYGLOT_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a word or grammar point
    Lookup {
        #[arg(required = true)]
        query: Vec<String>,
        /// Save the term to the vocabulary book (marked important)
        #[arg(long)]
        save_word: bool,
        /// Save the entry as a grammar point
        #[arg(long, conflicts_with = "save_word")]
        save_grammar: bool,
    },
    /// Add a word to the vocabulary book
    Add { word: String },
    /// List saved items for the current language
    List {
        #[arg(value_enum, default_value_t = ListKind::Vocab)]
        kind: ListKind,
        /// Filter vocabulary or sentences by text or translation
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Set review flags on a vocabulary item
    Mark {
        id: String,
        #[arg(long)]
        important: Option<bool>,
        #[arg(long)]
        mistake: Option<bool>,
    },
    /// Delete a vocabulary item
    Delete { id: String },
    /// Rewrite a mixed-language journal entry
    Journal {
        #[arg(required = true)]
        text: Vec<String>,
        /// Save every suggested word as important vocabulary
        #[arg(long)]
        save_suggestions: bool,
    },
    /// Write a short story from at least three saved words
    Story {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Flashcard review
    Quiz(QuizArgs),
    /// Role-play with the AI tutor
    Chat {
        /// Scenario id (see `scenarios`)
        #[arg(long)]
        scenario: Option<String>,
        /// Generate a custom scenario from a description
        #[arg(long, conflicts_with = "scenario")]
        custom: Option<String>,
    },
    /// Write a JSON backup of all saved items
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Restore the lists present in a JSON backup
    Import { path: PathBuf },
    /// Erase all saved data
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show or change the target language
    Lang { language: Option<String> },
    /// List the built-in practice scenarios
    Scenarios,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    Vocab,
    Sentences,
    Grammar,
    Journals,
}

#[derive(Args)]
struct QuizArgs {
    /// Leave vocabulary out of the pool
    #[arg(long)]
    no_vocab: bool,
    /// Include saved sentences
    #[arg(long)]
    sentences: bool,
    /// Include grammar points
    #[arg(long)]
    grammar: bool,
    /// Include vocabulary not marked important
    #[arg(long)]
    all: bool,
    /// Only vocabulary marked as a mistake
    #[arg(long)]
    mistakes: bool,
}

impl From<&QuizArgs> for ReviewConfig {
    fn from(args: &QuizArgs) -> Self {
        ReviewConfig {
            include_vocab: !args.no_vocab,
            include_sentences: args.sentences,
            include_grammar: args.grammar,
            only_important: !args.all,
            only_mistakes: args.mistakes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 2. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    // --- 3. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 4. Open the Store ---
    let backend = FileBackend::open(config.data_dir.clone())
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;
    let mut store = Store::load(backend).context("Failed to load saved data")?;
    tracing::debug!("Store opened at {}", config.data_dir.display());

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match args.command {
        Commands::Lookup {
            query,
            save_word,
            save_grammar,
        } => {
            let gateway = build_gateway(&config)?;
            let entry =
                dictionary::lookup(gateway.as_ref(), store.language(), &query.join(" ")).await?;
            print_entry(&entry);
            if save_word {
                let item = dictionary::save_as_vocab(gateway.as_ref(), &mut store, &entry).await?;
                println!("Saved \"{}\" to the vocabulary book ({})", item.word, item.id);
            }
            if save_grammar {
                let item = dictionary::save_as_grammar(&mut store, &entry)?;
                println!("Saved \"{}\" to the grammar book ({})", item.rule, item.id);
            }
        }
        Commands::Add { word } => {
            let gateway = build_gateway(&config)?;
            let item = library::quick_add(gateway.as_ref(), &mut store, &word).await?;
            println!("Added \"{}\" ({}): {}", item.word, item.id, item.translation);
        }
        Commands::List { kind, search } => list(&store, kind, search.as_deref())?,
        Commands::Mark {
            id,
            important,
            mistake,
        } => {
            if important.is_none() && mistake.is_none() {
                bail!("Nothing to change: pass --important and/or --mistake");
            }
            if let Some(flag) = important {
                store.set_important(&id, flag)?;
            }
            if let Some(flag) = mistake {
                store.set_mistake(&id, flag)?;
            }
            if let Some(item) = store.find_vocab(&id) {
                println!("{}", vocab_line(item));
            }
        }
        Commands::Delete { id } => {
            let item = store.delete_vocab(&id)?;
            println!("Deleted \"{}\"", item.word);
        }
        Commands::Journal {
            text,
            save_suggestions,
        } => {
            let gateway = build_gateway(&config)?;
            let analysis = journal::analyze(gateway.as_ref(), &mut store, &text.join(" ")).await?;
            println!("{}\n", analysis.optimized);
            println!("{}\n", analysis.analysis);
            for suggestion in &analysis.vocab_suggestions {
                println!(
                    "  + {} ({}): {}",
                    suggestion.word, suggestion.translation, suggestion.definition
                );
                if save_suggestions {
                    journal::save_suggestion(&mut store, suggestion)?;
                }
            }
            if save_suggestions && !analysis.vocab_suggestions.is_empty() {
                println!("Saved {} suggestions.", analysis.vocab_suggestions.len());
            }
        }
        Commands::Story { ids } => {
            let words = library::story_words(&store, &ids)?;
            let gateway = build_gateway(&config)?;
            let story = library::generate_story(gateway.as_ref(), store.language(), &words).await?;
            println!("{story}");
        }
        Commands::Quiz(quiz) => run_quiz(&mut store, ReviewConfig::from(&quiz), &mut input).await?,
        Commands::Chat { scenario, custom } => {
            let gateway = build_gateway(&config)?;
            let speech = Arc::new(Speech::new(CommandSpeech::new(config.tts_command.clone())));
            run_chat(gateway.as_ref(), &mut store, speech, scenario, custom, &mut input).await?;
        }
        Commands::Export { output } => {
            let json = store.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Backup written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Import { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let summary = store.import_json(&raw)?;
            for (name, count) in [
                ("vocab", summary.vocab),
                ("sentences", summary.sentences),
                ("grammar", summary.grammar),
                ("journals", summary.journals),
            ] {
                match count {
                    Some(n) => println!("{name}: replaced with {n} items"),
                    None => println!("{name}: unchanged"),
                }
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                let answer = prompt(&mut input, "This erases every saved item. Continue? [y/N] ").await?;
                let confirmed = answer
                    .map(|a| matches!(a.trim().to_lowercase().as_str(), "y" | "yes"))
                    .unwrap_or(false);
                if !confirmed {
                    println!("Reset cancelled.");
                    return Ok(());
                }
            }
            store.factory_reset()?;
            println!("All data erased.");
        }
        Commands::Lang { language } => match language {
            Some(name) => {
                let language: Language = name.parse()?;
                store.set_language(language)?;
                println!("Target language set to {language}");
            }
            None => {
                println!("Target language: {}", store.language());
                println!("Cards waiting for review: {}", store.pending_review_count());
                let names: Vec<&str> = Language::ALL.iter().map(|l| l.name()).collect();
                println!("Available: {}", names.join(", "));
            }
        },
        Commands::Scenarios => {
            for scenario in builtin_scenarios() {
                println!("{:<10} {}  {}", scenario.id, scenario.title, scenario.description);
            }
        }
    }

    Ok(())
}

fn build_gateway(config: &Config) -> Result<Box<dyn Gateway>> {
    let api_key = config.api_key()?;
    let provider = match config.provider {
        ProviderKind::Offline => {
            tracing::info!("Using the offline gateway; responses are simulated.");
            return Ok(Box::new(OfflineGateway));
        }
        ProviderKind::Gemini => Provider::Gemini,
        ProviderKind::OpenAi => Provider::OpenAi,
    };

    let mut prompts = PromptSet::default();
    if let Some(language) = &config.explanation_language {
        prompts = prompts.with_explanation_language(language.clone());
    }
    if let Some(dir) = &config.prompts_dir {
        prompts = prompts
            .with_overrides_from(dir)
            .context("Failed to load LLM prompts")?;
    }

    let model = config
        .chat_model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let mut client = GatewayClient::new(provider, api_key.unwrap_or_default().to_string(), model)
        .with_prompts(prompts);
    if let Some(url) = &config.base_url {
        client = client.with_base_url(url);
    }
    tracing::info!(?provider, model = client.model(), "Gateway ready");
    Ok(Box::new(client))
}

async fn prompt(input: &mut Input, message: &str) -> Result<Option<String>> {
    print!("{message}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

fn print_entry(entry: &DictionaryResult) {
    println!("{} [{}]", entry.term, entry.pos);
    println!("  {}", entry.definition);
    if !entry.example.is_empty() {
        println!("  e.g. {}", entry.example);
    }
    if !entry.related_grammar.is_empty() {
        println!("  grammar: {}", entry.related_grammar);
    }
    if !entry.related_vocab.is_empty() {
        println!("  see also: {}", entry.related_vocab.join(", "));
    }
}

fn vocab_line(item: &polyglot_core::models::VocabItem) -> String {
    let mut flags = String::new();
    if item.is_important {
        flags.push('*');
    }
    if item.is_mistake {
        flags.push('!');
    }
    format!("{}  {:<2} {} - {}", item.id, flags, item.word, item.translation)
}

fn list<B: StoreBackend>(store: &Store<B>, kind: ListKind, search: Option<&str>) -> Result<()> {
    let language = store.language();
    let finder = library::LibrarySearch::default();
    match kind {
        ListKind::Vocab => {
            let items = store.vocab_in(language);
            let shown = finder.search_vocab(&items, search.unwrap_or(""));
            for item in &shown {
                println!("{}", vocab_line(item));
            }
            println!("{} of {} {language} words", shown.len(), items.len());
        }
        ListKind::Sentences => {
            let items = store.sentences_in(language);
            let shown = finder.search_sentences(&items, search.unwrap_or(""));
            for s in &shown {
                println!("{}  {} - {}", s.id, s.original, s.translation);
            }
            println!("{} of {} {language} sentences", shown.len(), items.len());
        }
        ListKind::Grammar | ListKind::Journals if search.is_some() => {
            bail!("--search only applies to vocab and sentences");
        }
        ListKind::Grammar => {
            for g in store.grammar_in(language) {
                println!("{}  {} - {}", g.id, g.rule, g.explanation);
            }
        }
        ListKind::Journals => {
            for j in store.journals() {
                println!("{}  {}\n    {}", j.id, j.original, j.optimized);
            }
        }
    }
    Ok(())
}

async fn run_quiz(store: &mut LocalStore, config: ReviewConfig, input: &mut Input) -> Result<()> {
    let language = store.language();
    let mut session = ReviewSession::new(config);
    let state = session.start(
        store.vocab_in(language),
        store.sentences_in(language),
        store.grammar_in(language),
    );
    if state == ReviewState::Empty {
        println!("No cards match this review setup.");
        return Ok(());
    }

    let mut remembered_count = 0;
    while let Some(item) = session.current_item() {
        let (position, total) = session.progress().unwrap_or((0, 0));
        let face = item.face();
        println!("\n[{position}/{total}] ({}) {}", item.kind().label(), face.front);
        if prompt(input, "  press Enter to flip ").await?.is_none() {
            break;
        }

        session.flip();
        if let Some(item) = session.current_item() {
            let face = item.face();
            if let Some(pronunciation) = face.pronunciation {
                println!("  /{pronunciation}/");
            }
            println!("  {}", face.answer);
            if !face.explanation.is_empty() {
                println!("  {}", face.explanation);
            }
            if let Some(example) = face.example {
                println!("  e.g. {example}");
            }
        }

        let remembered = loop {
            match prompt(input, "  remembered? [y/n/q] ").await? {
                None => return Ok(()),
                Some(answer) => match answer.trim() {
                    "y" | "Y" => break true,
                    "n" | "N" => break false,
                    "q" | "Q" => return Ok(()),
                    _ => continue,
                },
            }
        };
        if remembered {
            remembered_count += 1;
        }
        let effect = session.grade(remembered);
        store.apply_grade(&effect)?;
    }

    if session.state() == ReviewState::Completed {
        println!(
            "\nReview complete: {remembered_count} of {} remembered.",
            session.len()
        );
    }
    Ok(())
}

fn print_reply(index: usize, message: &ChatMessage) {
    println!("[{index}] tutor> {}", message.content);
    if let Some(subtitle) = &message.translation {
        println!("      {subtitle}");
    }
    if !message.tokens.is_empty() {
        let glossary: Vec<String> = message
            .tokens
            .iter()
            .filter(|t| !t.def.is_empty())
            .map(|t| format!("{} ({}): {}", t.text, t.pos, t.def))
            .collect();
        if !glossary.is_empty() {
            println!("      {}", glossary.join(" | "));
        }
    }
    if let Some(correction) = &message.correction {
        println!(
            "      fix: {} -> {} ({})",
            correction.original, correction.suggested, correction.explanation
        );
    }
}

async fn choose_scenario(session: &ConversationSession, input: &mut Input) -> Result<Option<String>> {
    for (n, scenario) in session.scenarios().iter().enumerate() {
        println!("{}. {}  {}", n + 1, scenario.title, scenario.description);
    }
    loop {
        let Some(answer) = prompt(input, "scenario #: ").await? else {
            return Ok(None);
        };
        if let Some(scenario) = answer
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| session.scenarios().get(n))
        {
            return Ok(Some(scenario.id.clone()));
        }
    }
}

async fn send(
    session: &mut ConversationSession,
    gateway: &dyn Gateway,
    language: Language,
    text: &str,
    commands: &tokio::sync::mpsc::Sender<Command>,
) {
    match session.send_message(gateway, language, text, commands).await {
        Ok(_) => {
            let index = session.transcript().len();
            if let Some(reply) = session.transcript().last() {
                print_reply(index, reply);
            }
        }
        Err(e) => {
            tracing::error!("Tutor request failed: {e}");
            println!("! {e}");
        }
    }
}

async fn run_chat(
    gateway: &dyn Gateway,
    store: &mut LocalStore,
    speech: Arc<Speech<CommandSpeech>>,
    scenario: Option<String>,
    custom: Option<String>,
    input: &mut Input,
) -> Result<()> {
    let language = store.language();
    let mut session = ConversationSession::new();

    if let Some(description) = custom {
        let created = session
            .create_custom_scenario(gateway, language, &description)
            .await?;
        println!("Created scenario: {}", created.title);
    } else {
        let id = match scenario {
            Some(id) => id,
            None => match choose_scenario(&session, input).await? {
                Some(id) => id,
                None => return Ok(()),
            },
        };
        session.select_scenario(&id)?;
    }
    if let Some(active) = session.selected_scenario() {
        println!("\n== {} ==\n{}", active.title, active.description);
        println!("cheat sheet: {}", active.cheat_sheet.join(" / "));
    }
    println!("Commands: /listen, /save <n>, /word <text>, /cheat, /quit\n");

    // This task handles commands from the session, executing side effects.
    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel::<Command>(32);
    let speaker = speech.clone();
    let command_handler = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::SpeakText(text) => {
                    tracing::debug!("Speaking reply: '{}'", text);
                    speaker.speak(language, &text);
                }
            }
        }
    });

    while let Some(line) = prompt(input, "you> ").await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/cheat" => {
                if let Some(active) = session.selected_scenario() {
                    for phrase in &active.cheat_sheet {
                        println!("  - {phrase}");
                    }
                }
            }
            "/listen" => match speech.listen(language).await {
                Ok(Some(heard)) => {
                    println!("you (voice)> {heard}");
                    send(&mut session, gateway, language, &heard, &command_tx).await;
                }
                Ok(None) => println!("(nothing heard)"),
                Err(e) => println!("! {e}"),
            },
            _ if line.starts_with("/save ") => {
                let index = line["/save ".len()..].trim().parse::<usize>().ok();
                let message_id = index
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|n| session.transcript().get(n))
                    .filter(|m| m.role == Role::Assistant)
                    .map(|m| m.id.clone());
                match message_id {
                    Some(id) => match session.save_sentence(store, &id) {
                        Ok(saved) => println!("Saved sentence: {}", saved.original),
                        Err(e) => println!("! {e}"),
                    },
                    None => println!("! /save takes the [n] of a tutor reply"),
                }
            }
            _ if line.starts_with("/word ") => {
                let text = line["/word ".len()..].trim();
                let token = session
                    .transcript()
                    .iter()
                    .rev()
                    .flat_map(|m| m.tokens.iter())
                    .find(|t| t.text == text)
                    .cloned()
                    .unwrap_or_else(|| WordToken {
                        text: text.to_string(),
                        pos: String::new(),
                        def: String::new(),
                        grammar: String::new(),
                    });
                match session.save_token(gateway, store, &token).await {
                    Ok(item) => println!("Saved \"{}\" to the vocabulary book", item.word),
                    Err(e) => println!("! {e}"),
                }
            }
            text => send(&mut session, gateway, language, text, &command_tx).await,
        }
    }

    drop(command_tx);
    command_handler.await?;
    Ok(())
}
