use log::{ error, info, warn };
use std::sync::Arc;

use crate::config::prompt::{ Prompt, PromptTemplate };
use crate::config::settings::Settings;
use crate::llm::chat::{ new_client, ChatClient, LlmError };
use crate::models::chat::{ Conversation, Message };

/// The only failure text a user ever sees, whatever the provider said.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error. Please check your API key and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRejection {
    EmptyInput,
    Busy,
    NoPendingTurn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Rejected(TurnRejection),
    Replied(String),
    Failed,
}

/// One chat thread: the message list, the turn state and at most one error
/// notification. A missing provider makes every turn fail the same way a
/// rejected key would.
pub struct ChatSession {
    client: Option<Arc<dyn ChatClient>>,
    template: PromptTemplate,
    conversation: Conversation,
    state: SessionState,
    error: Option<String>,
}

impl ChatSession {
    pub fn new(client: Option<Arc<dyn ChatClient>>, template: PromptTemplate) -> Self {
        Self {
            client,
            template,
            conversation: Conversation::new(),
            state: SessionState::Idle,
            error: None,
        }
    }

    /// Builds the provider from `settings`. A configuration problem (usually a
    /// missing key) is logged and leaves the session without a provider.
    pub fn from_settings(settings: &Settings) -> Self {
        let client = match new_client(&settings.llm) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Chat provider not ready: {}", e);
                None
            }
        };
        Self::new(client, settings.template.clone())
    }

    pub fn set_client(&mut self, client: Option<Arc<dyn ChatClient>>) {
        self.client = client;
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SessionState::AwaitingResponse
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Starts a fresh thread. Refused while a reply is pending.
    pub fn new_thread(&mut self) -> Result<(), TurnRejection> {
        if self.is_busy() {
            return Err(TurnRejection::Busy);
        }
        self.conversation = Conversation::new();
        self.error = None;
        info!("Started a new thread");
        Ok(())
    }

    /// Appends the user message and moves to `AwaitingResponse`. Blank input
    /// changes nothing.
    pub fn begin_turn(&mut self, input: &str) -> Result<Prompt, TurnRejection> {
        if input.trim().is_empty() {
            return Err(TurnRejection::EmptyInput);
        }
        if self.is_busy() {
            return Err(TurnRejection::Busy);
        }
        self.conversation.push(Message::user(input));
        self.error = None;
        self.state = SessionState::AwaitingResponse;
        Ok(self.template.wrap(input))
    }

    pub fn complete_turn(&mut self, result: Result<String, LlmError>) -> TurnOutcome {
        if !self.is_busy() {
            warn!("Ignoring a provider result with no turn in flight");
            return TurnOutcome::Rejected(TurnRejection::NoPendingTurn);
        }
        self.state = SessionState::Idle;
        match result {
            Ok(text) => {
                self.conversation.push(Message::assistant(text.clone()));
                TurnOutcome::Replied(text)
            }
            Err(e) => {
                error!("Chat turn failed: {}", e);
                self.error = Some(GENERIC_ERROR_MESSAGE.to_string());
                TurnOutcome::Failed
            }
        }
    }

    /// One full turn: at most one outbound request.
    pub async fn submit(&mut self, input: &str) -> TurnOutcome {
        let prompt = match self.begin_turn(input) {
            Ok(p) => p,
            Err(rejection) => {
                return TurnOutcome::Rejected(rejection);
            }
        };
        let result = match &self.client {
            Some(client) => client.generate(&prompt).await,
            None => Err(LlmError::Config("no chat provider configured".to_string())),
        };
        self.complete_turn(result)
    }
}
