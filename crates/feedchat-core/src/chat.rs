//! The chat transcript and its request/response cycle.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::services::ChatService;
use crate::state::ChatMessage;

/// Username sent when no session username is known.
pub const ANONYMOUS: &str = "anonymous";

/// Prefix of every error entry appended to the transcript.
pub const ERROR_PREFIX: &str = "Sorry, I encountered an error. ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatTurn {
    #[default]
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    Submit,
    Resolve,
}

impl ChatTurn {
    /// The state after `event`, or `None` if the event is not allowed here.
    pub fn next(self, event: TurnEvent) -> Option<ChatTurn> {
        match (self, event) {
            (ChatTurn::Idle, TurnEvent::Submit) => Some(ChatTurn::AwaitingResponse),
            (ChatTurn::AwaitingResponse, TurnEvent::Resolve) => Some(ChatTurn::Idle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTicket(u64);

/// What to send for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub ticket: ChatTicket,
    pub message: String,
    pub username: String,
}

pub struct ChatController {
    transcript: Vec<ChatMessage>,
    input: String,
    turn: ChatTurn,
    issued: u64,
    pending: Option<ChatTicket>,
    appended: watch::Sender<usize>,
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatController {
    pub fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            transcript: Vec::new(),
            input: String::new(),
            turn: ChatTurn::Idle,
            issued: 0,
            pending: None,
            appended,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn turn(&self) -> ChatTurn {
        self.turn
    }

    pub fn is_idle(&self) -> bool {
        self.turn == ChatTurn::Idle
    }

    /// Receives the transcript length after every append, so the surface can
    /// scroll to the latest entry.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.appended.subscribe()
    }

    fn push(&mut self, message: ChatMessage) {
        self.transcript.push(message);
        self.appended.send_replace(self.transcript.len());
    }

    /// Accepts `raw` if it is not blank and no reply is pending: appends the
    /// user entry, clears the input buffer and enters `AwaitingResponse`.
    pub fn begin(&mut self, raw: &str, username: Option<&str>) -> Option<ChatRequest> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        let next = self.turn.next(TurnEvent::Submit)?;

        self.push(ChatMessage::user(text));
        self.input.clear();
        self.turn = next;
        self.issued += 1;
        let ticket = ChatTicket(self.issued);
        self.pending = Some(ticket);

        Some(ChatRequest {
            ticket,
            message: text.to_string(),
            username: username
                .filter(|u| !u.is_empty())
                .unwrap_or(ANONYMOUS)
                .to_string(),
        })
    }

    /// [`begin`](Self::begin) with the current input buffer.
    pub fn submit_input(&mut self, username: Option<&str>) -> Option<ChatRequest> {
        let raw = self.input.clone();
        self.begin(&raw, username)
    }

    /// Appends the bot reply (or error entry) for the pending request and
    /// returns to `Idle`. Returns false if `ticket` is not the pending one.
    pub fn resolve(&mut self, ticket: ChatTicket, outcome: Result<String, ChatError>) -> bool {
        if self.pending != Some(ticket) {
            debug!(?ticket, pending = ?self.pending, "Ignoring chat reply for another request");
            return false;
        }
        let Some(next) = self.turn.next(TurnEvent::Resolve) else {
            return false;
        };

        let outcome = outcome.and_then(|text| {
            if text.is_empty() {
                Err(ChatError::InvalidFormat)
            } else {
                Ok(text)
            }
        });
        let message = match outcome {
            Ok(text) => ChatMessage::bot(text),
            Err(e) => {
                warn!(error = %e, "Chat error");
                ChatMessage::bot_error(format!("{ERROR_PREFIX}{e}"))
            }
        };

        self.push(message);
        self.turn = next;
        self.pending = None;
        true
    }

    /// Runs one full exchange. Returns false if the submission was a no-op.
    pub async fn submit(&mut self, service: &ChatService, raw: &str, username: Option<&str>) -> bool {
        let Some(request) = self.begin(raw, username) else {
            return false;
        };
        let outcome = service
            .send_message(&request.message, &request.username)
            .await;
        self.resolve(request.ticket, outcome)
    }
}
