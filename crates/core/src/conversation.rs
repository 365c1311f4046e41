use crate::Command;
use crate::error::{PolyglotError, Result};
use crate::gateway::{Gateway, HistoryTurn, TutorReply};
use crate::language::Language;
use crate::models::{ChatMessage, Role, Scenario, SentenceItem, VocabDraft, VocabItem, WordToken, new_id};
use crate::scenario::{builtin_scenarios, custom_from_draft};
use crate::store::{Store, StoreBackend};
use tokio::sync::mpsc;

/// Everything the gateway needs to answer one user turn. Only the ticket for
/// the most recent `begin_send` is accepted by `finish_send`.
#[derive(Debug)]
pub struct PendingTurn {
    generation: u64,
    pub history: Vec<HistoryTurn>,
    pub message: String,
    pub scenario_title: String,
}

/// A scenario-based practice dialogue with the tutor.
pub struct ConversationSession {
    scenarios: Vec<Scenario>,
    selected: Option<String>,
    transcript: Vec<ChatMessage>,
    generation: u64,
    in_flight: Option<u64>,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            scenarios: builtin_scenarios(),
            selected: None,
            transcript: Vec::new(),
            generation: 0,
            in_flight: None,
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn selected_scenario(&self) -> Option<&Scenario> {
        let id = self.selected.as_deref()?;
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn select_scenario(&mut self, id: &str) -> Result<&Scenario> {
        let scenario = self
            .scenarios
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| PolyglotError::UnknownScenario(id.to_string()))?;
        tracing::info!(scenario = %scenario.id, "scenario selected");
        self.selected = Some(scenario.id.clone());
        Ok(scenario)
    }

    /// Returns to the scenario picker. The transcript is kept.
    pub fn leave_scenario(&mut self) {
        self.selected = None;
    }

    pub async fn create_custom_scenario<G: Gateway + ?Sized>(
        &mut self,
        gateway: &G,
        language: Language,
        prompt: &str,
    ) -> Result<&Scenario> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(PolyglotError::EmptyInput);
        }
        let draft = gateway
            .create_scenario(language, prompt)
            .await
            .map_err(PolyglotError::Gateway)?;
        let scenario = custom_from_draft(draft);
        tracing::info!(scenario = %scenario.id, title = %scenario.title, "custom scenario created");
        self.selected = Some(scenario.id.clone());
        self.scenarios.insert(0, scenario);
        Ok(&self.scenarios[0])
    }

    /// Validates `text`, appends it to the transcript and hands out the ticket
    /// for the gateway call. Blank text and a send while another turn is still
    /// waiting both fail with `EmptyInput`.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingTurn> {
        if text.trim().is_empty() {
            return Err(PolyglotError::EmptyInput);
        }
        if self.in_flight.is_some() {
            tracing::warn!("send rejected: the previous turn is still waiting for the tutor");
            return Err(PolyglotError::EmptyInput);
        }
        let scenario_title = self
            .selected_scenario()
            .map(|s| s.title.clone())
            .ok_or(PolyglotError::NoScenarioSelected)?;

        let history = self
            .transcript
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        self.transcript.push(ChatMessage::user(text));
        self.generation += 1;
        self.in_flight = Some(self.generation);

        Ok(PendingTurn {
            generation: self.generation,
            history,
            message: text.to_string(),
            scenario_title,
        })
    }

    /// Records the outcome of a turn. Returns `Ok(None)` when the ticket is not
    /// the one currently in flight, in which case nothing changes.
    pub fn finish_send(
        &mut self,
        turn: PendingTurn,
        outcome: anyhow::Result<TutorReply>,
    ) -> Result<Option<&ChatMessage>> {
        if self.in_flight != Some(turn.generation) {
            tracing::warn!(generation = turn.generation, "discarding reply for a stale turn");
            return Ok(None);
        }
        self.in_flight = None;

        let reply = outcome.map_err(PolyglotError::Gateway)?;
        self.transcript.push(ChatMessage {
            id: new_id(),
            role: Role::Assistant,
            content: reply.message,
            tokens: reply.tokens,
            translation: Some(reply.native_subtitle),
            correction: reply.correction.filter(|c| !c.is_empty()),
        });
        Ok(self.transcript.last())
    }

    /// Sends one user turn and waits for the tutor. The reply is queued for
    /// speaking on `commands`.
    pub async fn send_message<G: Gateway + ?Sized>(
        &mut self,
        gateway: &G,
        language: Language,
        text: &str,
        commands: &mpsc::Sender<Command>,
    ) -> Result<&ChatMessage> {
        let turn = self.begin_send(text)?;
        tracing::debug!(history = turn.history.len(), scenario = %turn.scenario_title, "requesting tutor reply");
        let outcome = gateway
            .tutor_reply(language, &turn.history, &turn.message, &turn.scenario_title)
            .await;
        if let Err(e) = &outcome {
            tracing::warn!("tutor reply failed: {e:#}");
        }

        let reply = self
            .finish_send(turn, outcome)?
            .ok_or(PolyglotError::EmptyInput)?;
        if commands.send(Command::SpeakText(reply.content.clone())).await.is_err() {
            tracing::warn!("command receiver dropped; reply not spoken");
        }
        Ok(reply)
    }

    /// Looks up full details for a tapped token and saves it as important vocabulary.
    pub async fn save_token<G: Gateway + ?Sized, B: StoreBackend>(
        &self,
        gateway: &G,
        store: &mut Store<B>,
        token: &WordToken,
    ) -> Result<VocabItem> {
        let details = gateway
            .word_details(store.language(), &token.text)
            .await
            .map_err(PolyglotError::Gateway)?;
        store.add_vocab(VocabDraft::from(details).important())
    }

    /// Saves an assistant reply and its subtitle as a sentence pattern.
    pub fn save_sentence<B: StoreBackend>(
        &self,
        store: &mut Store<B>,
        message_id: &str,
    ) -> Result<SentenceItem> {
        let message = self
            .transcript
            .iter()
            .find(|m| m.id == message_id && m.role == Role::Assistant)
            .ok_or_else(|| PolyglotError::UnknownItem(message_id.to_string()))?;
        store.add_sentence(
            &message.content,
            message.translation.as_deref().unwrap_or_default(),
            "From Dojo Chat",
        )
    }
}
