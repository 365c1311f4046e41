//! Prompt templates for each gateway task.
//!
//! Built-in templates can be replaced by dropping `<task>.md` files into a
//! prompts directory, e.g. `tutor.md` or `word_details.md`. Placeholders use
//! `{name}` syntax and are filled in by [`PromptSet::render`].

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Lookup,
    Tutor,
    Journal,
    WordDetails,
    Scenario,
    Story,
}

impl Task {
    pub const ALL: [Task; 6] = [
        Task::Lookup,
        Task::Tutor,
        Task::Journal,
        Task::WordDetails,
        Task::Scenario,
        Task::Story,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Task::Lookup => "lookup",
            Task::Tutor => "tutor",
            Task::Journal => "journal",
            Task::WordDetails => "word_details",
            Task::Scenario => "scenario",
            Task::Story => "story",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            Task::Lookup => LOOKUP,
            Task::Tutor => TUTOR,
            Task::Journal => JOURNAL,
            Task::WordDetails => WORD_DETAILS,
            Task::Scenario => SCENARIO,
            Task::Story => STORY,
        }
    }
}

const LOOKUP: &str = r#"Analyze the input: "{query}" for a {language} learner.
If it's a word, provide definition, POS, related grammar rules, and example sentences.
If it's a grammar point, explain it and list related vocabulary.
System language: {explain_in}."#;

const TUTOR: &str = r#"You are a native {language} tutor. Scene: {scenario}.
User input is Omni-Lingual (mixed {explain_in}/English/{language}).
Response logic:
1. If the user practices {language}: roleplay and correct their mistakes.
2. If the user asks for help in another language: translate, explain, then continue the roleplay.
Only include a correction when the user's last message needed one.
Return JSON strictly matching the provided schema."#;

const JOURNAL: &str = r#"Process this journal for a {language} learner.
Input: "{content}" (mixed languages).
Provide:
1. Optimized native version.
2. Detailed analysis (grammar or translation choices).
3. Related vocabulary.
System language: {explain_in}."#;

const WORD_DETAILS: &str = r#"Detail analysis of {language} word: "{word}".
System language: {explain_in}."#;

const SCENARIO: &str = r#"Create a {language} practice scenario for: "{description}".
Write the title, description and cheat sheet in {explain_in}; the icon is a Font Awesome class such as "fa-coffee"."#;

const STORY: &str = r#"Write a short {language} story using these words: {words}. Return plain text story."#;

/// Reads every `.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    Ok(prompts)
}

#[derive(Debug, Clone)]
pub struct PromptSet {
    overrides: HashMap<String, String>,
    explain_in: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            explain_in: "Traditional Chinese".to_string(),
        }
    }
}

impl PromptSet {
    /// Layers the templates found in `dir` over the built-ins. Files whose stem
    /// is not a known task are ignored.
    pub fn with_overrides_from(mut self, dir: &Path) -> Result<Self> {
        for (key, content) in load_prompts(dir)? {
            if Task::ALL.iter().any(|t| t.key() == key) {
                tracing::debug!(task = %key, "prompt override loaded");
                self.overrides.insert(key, content);
            } else {
                tracing::warn!(file = %key, "ignoring prompt file for unknown task");
            }
        }
        Ok(self)
    }

    /// Language used for explanations, translations and subtitles.
    pub fn with_explanation_language(mut self, language: impl Into<String>) -> Self {
        self.explain_in = language.into();
        self
    }

    pub fn explanation_language(&self) -> &str {
        &self.explain_in
    }

    pub fn template(&self, task: Task) -> &str {
        self.overrides
            .get(task.key())
            .map(String::as_str)
            .unwrap_or(task.builtin())
    }

    /// Fills `{explain_in}` plus the given placeholders into the task template.
    ///
    /// The template is scanned once, so braces inside substituted values are
    /// left alone. Unknown placeholders are kept verbatim.
    pub fn render(&self, task: Task, vars: &[(&str, &str)]) -> String {
        let template = self.template(task);
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                rest = &rest[open..];
                break;
            };
            let name = &after[..close];
            let value = if name == "explain_in" {
                Some(self.explain_in.as_str())
            } else {
                vars.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
            };
            match value {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}
