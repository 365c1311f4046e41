use crate::language::Language;
use crate::models::{Correction, Role, VocabDraft, VocabSuggestion, WordToken};
use crate::prompts::{PromptSet, Task};
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryResult {
    pub term: String,
    pub definition: String,
    pub pos: String,
    pub related_grammar: String,
    pub related_vocab: Vec<String>,
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorReply {
    pub message: String,
    pub native_subtitle: String,
    pub tokens: Vec<WordToken>,
    #[serde(default)]
    pub correction: Option<Correction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalAnalysis {
    pub optimized: String,
    pub analysis: String,
    pub vocab_suggestions: Vec<VocabSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordDetails {
    pub word: String,
    pub translation: String,
    pub definition: String,
    pub pronunciation: String,
    pub collocations: Vec<String>,
    pub context: String,
    pub example: String,
}

impl From<WordDetails> for VocabDraft {
    fn from(d: WordDetails) -> Self {
        VocabDraft {
            word: d.word,
            translation: d.translation,
            definition: d.definition,
            pronunciation: d.pronunciation,
            collocations: d.collocations,
            context: d.context,
            example: d.example,
            is_mistake: false,
            is_important: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDraft {
    pub title: String,
    pub icon: String,
    pub description: String,
    pub cheat_sheet: Vec<String>,
}

/// One prior line of a conversation, as sent to the tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// The external AI service. Every method builds a prompt and a response schema
/// for one task and returns the parsed result, or fails as a whole.
///
/// `MockGateway` is generated for unit tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn lookup(&self, language: Language, query: &str) -> Result<DictionaryResult>;

    async fn tutor_reply(
        &self,
        language: Language,
        history: &[HistoryTurn],
        message: &str,
        scenario_title: &str,
    ) -> Result<TutorReply>;

    async fn analyze_journal(&self, language: Language, content: &str) -> Result<JournalAnalysis>;

    async fn word_details(&self, language: Language, word: &str) -> Result<WordDetails>;

    async fn create_scenario(&self, language: Language, description: &str)
    -> Result<ScenarioDraft>;

    async fn generate_story(&self, language: Language, words: &[String]) -> Result<String>;
}

// --- Response schemas ---

fn string() -> Value {
    json!({ "type": "string" })
}

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

pub fn lookup_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "term": string(),
            "definition": string(),
            "pos": string(),
            "related_grammar": string(),
            "related_vocab": string_list(),
            "example": string(),
        },
        "required": ["term", "definition", "pos", "related_grammar", "related_vocab", "example"],
    })
}

pub fn tutor_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message": string(),
            "native_subtitle": string(),
            "tokens": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": string(),
                        "pos": string(),
                        "def": string(),
                        "grammar": string(),
                    },
                    "required": ["text", "pos", "def", "grammar"],
                },
            },
            "correction": {
                "type": "object",
                "properties": {
                    "original": string(),
                    "suggested": string(),
                    "explanation": string(),
                },
            },
        },
        "required": ["message", "native_subtitle", "tokens"],
    })
}

pub fn journal_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "optimized": string(),
            "analysis": string(),
            "vocabSuggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "word": string(),
                        "translation": string(),
                        "definition": string(),
                        "example": string(),
                    },
                    "required": ["word", "translation", "definition", "example"],
                },
            },
        },
        "required": ["optimized", "analysis", "vocabSuggestions"],
    })
}

pub fn word_details_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "word": string(),
            "translation": string(),
            "definition": string(),
            "pronunciation": string(),
            "collocations": string_list(),
            "context": string(),
            "example": string(),
        },
        "required": ["word", "translation", "definition", "pronunciation", "collocations", "context", "example"],
    })
}

pub fn scenario_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": string(),
            "icon": string(),
            "description": string(),
            "cheatSheet": string_list(),
        },
        "required": ["title", "icon", "description", "cheatSheet"],
    })
}

/// Gemini expects upper-case OpenAPI type names.
fn gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| match (k.as_str(), v) {
                    ("type", Value::String(t)) => (k.clone(), Value::String(t.to_uppercase())),
                    _ => (k.clone(), gemini_schema(v)),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(gemini_schema).collect()),
        other => other.clone(),
    }
}

// --- HTTP client ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Gemini => "gemini-3-flash-preview",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

/// A provider-neutral generation request.
#[derive(Debug, Clone)]
pub struct Generation {
    pub system: Option<String>,
    pub turns: Vec<(Role, String)>,
    /// Name and JSON schema of a structured response; `None` asks for plain text.
    pub schema: Option<(&'static str, Value)>,
}

impl Generation {
    fn prompt(prompt: String) -> Self {
        Self {
            system: None,
            turns: vec![(Role::User, prompt)],
            schema: None,
        }
    }

    fn with_schema(mut self, name: &'static str, schema: Value) -> Self {
        self.schema = Some((name, schema));
        self
    }
}

pub fn openai_body(model: &str, generation: &Generation) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &generation.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    for (role, content) in &generation.turns {
        messages.push(json!({ "role": role.as_str(), "content": content }));
    }
    let mut body = json!({ "model": model, "messages": messages });
    if let Some((name, schema)) = &generation.schema {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": { "name": name, "schema": schema, "strict": false },
        });
    }
    body
}

pub fn gemini_body(generation: &Generation) -> Value {
    let contents: Vec<Value> = generation
        .turns
        .iter()
        .map(|(role, text)| {
            let role = match role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": text }] })
        })
        .collect();
    let mut body = json!({ "contents": contents });
    if let Some(system) = &generation.system {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    if let Some((_, schema)) = &generation.schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": gemini_schema(schema),
        });
    }
    body
}

/// Talks to an OpenAI-compatible chat completions endpoint or to Gemini's
/// `generateContent`.
pub struct GatewayClient {
    client: Client,
    provider: Provider,
    base_url: String,
    api_key: SecretString,
    model: String,
    prompts: PromptSet,
}

impl GatewayClient {
    pub fn new(provider: Provider, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            provider,
            base_url: provider.default_base_url().to_string(),
            api_key: SecretString::from(api_key),
            model,
            prompts: PromptSet::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one request and returns the raw text of the first candidate.
    pub async fn generate(&self, generation: &Generation) -> Result<String> {
        tracing::debug!(provider = ?self.provider, turns = generation.turns.len(), "gateway request");
        let request = match self.provider {
            Provider::OpenAi => self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(self.api_key.expose_secret())
                .json(&openai_body(&self.model, generation)),
            Provider::Gemini => self
                .client
                .post(format!(
                    "{}/models/{}:generateContent",
                    self.base_url, self.model
                ))
                .header("x-goog-api-key", self.api_key.expose_secret())
                .json(&gemini_body(generation)),
        };
        let body = request.send().await?.error_for_status()?.text().await?;
        match self.provider {
            Provider::OpenAi => parse_openai(&body),
            Provider::Gemini => parse_gemini(&body),
        }
    }

    async fn generate_json<T: DeserializeOwned>(&self, generation: Generation) -> Result<T> {
        let answer = self.generate(&generation).await?;
        let name = generation.schema.as_ref().map(|(n, _)| *n).unwrap_or("text");
        parse_answer(name, &answer)
    }
}

/// Extracts the first choice's message from a chat completions response body.
pub fn parse_openai(body: &str) -> Result<String> {
    let resp: LlmResponse =
        serde_json::from_str(body).context("Unexpected chat completions response")?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("No response from LLM"))
}

/// Joins the text parts of the first candidate in a `generateContent` response body.
pub fn parse_gemini(body: &str) -> Result<String> {
    let resp: GeminiResponse =
        serde_json::from_str(body).context("Unexpected generateContent response")?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.is_empty() {
        anyhow::bail!("LLM candidate carried no text");
    }
    Ok(text)
}

/// Parses a structured answer against the type its schema describes.
pub fn parse_answer<T: DeserializeOwned>(name: &str, answer: &str) -> Result<T> {
    serde_json::from_str(answer.trim())
        .with_context(|| format!("Failed to parse {name} response from LLM: {answer}"))
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn lookup(&self, language: Language, query: &str) -> Result<DictionaryResult> {
        let prompt = self.prompts.render(
            Task::Lookup,
            &[("query", query), ("language", language.name())],
        );
        self.generate_json(Generation::prompt(prompt).with_schema("dictionary_lookup", lookup_schema()))
            .await
    }

    async fn tutor_reply(
        &self,
        language: Language,
        history: &[HistoryTurn],
        message: &str,
        scenario_title: &str,
    ) -> Result<TutorReply> {
        let system = self.prompts.render(
            Task::Tutor,
            &[("language", language.name()), ("scenario", scenario_title)],
        );
        let mut turns: Vec<(Role, String)> = history
            .iter()
            .map(|h| (h.role, h.content.clone()))
            .collect();
        turns.push((Role::User, message.to_string()));
        let generation = Generation {
            system: Some(system),
            turns,
            schema: Some(("tutor_reply", tutor_schema())),
        };
        self.generate_json(generation).await
    }

    async fn analyze_journal(&self, language: Language, content: &str) -> Result<JournalAnalysis> {
        let prompt = self.prompts.render(
            Task::Journal,
            &[("content", content), ("language", language.name())],
        );
        self.generate_json(Generation::prompt(prompt).with_schema("journal_analysis", journal_schema()))
            .await
    }

    async fn word_details(&self, language: Language, word: &str) -> Result<WordDetails> {
        let prompt = self.prompts.render(
            Task::WordDetails,
            &[("word", word), ("language", language.name())],
        );
        self.generate_json(Generation::prompt(prompt).with_schema("word_details", word_details_schema()))
            .await
    }

    async fn create_scenario(
        &self,
        language: Language,
        description: &str,
    ) -> Result<ScenarioDraft> {
        let prompt = self.prompts.render(
            Task::Scenario,
            &[("description", description), ("language", language.name())],
        );
        self.generate_json(Generation::prompt(prompt).with_schema("scenario", scenario_schema()))
            .await
    }

    async fn generate_story(&self, language: Language, words: &[String]) -> Result<String> {
        let joined = words.join(", ");
        let prompt = self.prompts.render(
            Task::Story,
            &[("words", &joined), ("language", language.name())],
        );
        let story = self.generate(&Generation::prompt(prompt)).await?;
        Ok(story.trim().to_string())
    }
}
