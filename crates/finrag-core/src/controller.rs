//! Interaction controller
//!
//! Owns every piece of UI-affecting state: the text inputs, the ingest
//! status indicator, which controls are enabled, prompts, and the
//! conversation. Front ends feed it [`UiEvent`]s and draw whatever
//! [`Controller::view`] returns. Network work is never done here; accepted
//! submissions return a [`Command`] for the caller to run with [`execute`],
//! and the result comes back as another event.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{Backend, IngestPayload, QueryPayload, RequestFailure, RequestOutcome};
use crate::context::{normalize_ticker, ContextStore};
use crate::conversation::{ConversationLog, PendingHandle};
use crate::state::{Author, Message, RenderMode};

pub const DEFAULT_SUGGESTIONS: &[&str] = &[
    "What was the revenue trend over the last three years?",
    "What is the current net profit margin?",
    "How has the debt-to-equity ratio changed?",
    "Summarize the latest balance sheet.",
];

const UNREACHABLE_MESSAGE: &str =
    "**Network Error**: Could not reach server. System might be down.";
const MALFORMED_MESSAGE: &str =
    "**Network Error**: The server sent a response that could not be read.";

/// Why a submission was refused before anything was sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("ticker is empty")]
    EmptyTicker,

    #[error("question is empty")]
    EmptyQuestion,

    #[error("no company selected; ingest a ticker first")]
    NoTicker,

    #[error("an ingestion is already in progress")]
    IngestInFlight,

    #[error("a question is already waiting for an answer")]
    QueryInFlight,

    #[error("no suggestion at position {0}")]
    UnknownSuggestion(usize),

    #[error("cannot clear the conversation while a question is pending")]
    ConversationBusy,
}

/// Everything a front end can tell the controller
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SubmitIngest { ticker: String },
    SubmitQuery { question: String },
    PickSuggestion(usize),
    SetContext { ticker: String },
    ClearContext,
    ClearConversation,
    IngestCompleted { ticker: String, outcome: RequestOutcome<IngestPayload> },
    QueryCompleted { outcome: RequestOutcome<QueryPayload> },
}

/// Network work the caller must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ingest { ticker: String },
    Query { ticker: String, question: String },
}

/// What happened to a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Execute(Command),
    Accepted,
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingIngest,
    AwaitingQuery,
    AwaitingBoth,
}

/// Status pill next to the ticker input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IngestIndicator {
    #[default]
    Empty,
    Busy {
        ticker: String,
    },
    Succeeded {
        ticker: String,
        summary: String,
    },
    Failed {
        reason: String,
        transport: bool,
    },
}

impl IngestIndicator {
    pub fn text(&self) -> String {
        match self {
            IngestIndicator::Empty => String::new(),
            IngestIndicator::Busy { ticker } => format!("Ingesting {}...", ticker),
            IngestIndicator::Succeeded { ticker, .. } => format!("Ingested {}", ticker),
            IngestIndicator::Failed { reason, transport: true } => reason.clone(),
            IngestIndicator::Failed { reason, transport: false } => format!("Error: {}", reason),
        }
    }
}

/// Non-blocking prompt shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NeedTicker,
    ContextSet(String),
    ContextCleared,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NeedTicker => {
                write!(f, "Enter a ticker and ingest a company before asking questions.")
            }
            Notice::ContextSet(ticker) => write!(f, "Questions now apply to {}.", ticker),
            Notice::ContextCleared => write!(f, "Active company cleared."),
        }
    }
}

/// Editable text fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub ticker: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IngestTrack {
    Idle,
    Awaiting { ticker: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryTrack {
    Idle,
    Awaiting { ticker: String, handle: PendingHandle },
}

/// Snapshot of everything a front end draws
#[derive(Debug)]
pub struct View<'a> {
    pub messages: &'a [Message],
    pub inputs: &'a Inputs,
    pub ingest: &'a IngestIndicator,
    pub ingest_enabled: bool,
    pub send_enabled: bool,
    pub active_ticker: Option<&'a str>,
    /// The ticker a question would be sent with right now
    pub effective_ticker: Option<String>,
    pub notice: Option<&'a Notice>,
    /// Classification of the most recent answer
    pub caption: Option<&'a str>,
    pub suggestions: &'a [String],
    pub phase: Phase,
}

pub struct Controller {
    context: ContextStore,
    log: ConversationLog,
    inputs: Inputs,
    ingest_track: IngestTrack,
    query_track: QueryTrack,
    indicator: IngestIndicator,
    notice: Option<Notice>,
    caption: Option<String>,
    suggestions: Vec<String>,
}

impl Controller {
    pub fn new(context: ContextStore, suggestions: Vec<String>) -> Self {
        Self {
            context,
            log: ConversationLog::new(),
            inputs: Inputs::default(),
            ingest_track: IngestTrack::Idle,
            query_track: QueryTrack::Idle,
            indicator: IngestIndicator::Empty,
            notice: None,
            caption: None,
            suggestions,
        }
    }

    pub fn with_default_suggestions(context: ContextStore) -> Self {
        let suggestions = DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        Self::new(context, suggestions)
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn indicator(&self) -> &IngestIndicator {
        &self.indicator
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn phase(&self) -> Phase {
        let ingesting = matches!(self.ingest_track, IngestTrack::Awaiting { .. });
        let querying = matches!(self.query_track, QueryTrack::Awaiting { .. });
        match (ingesting, querying) {
            (false, false) => Phase::Idle,
            (true, false) => Phase::AwaitingIngest,
            (false, true) => Phase::AwaitingQuery,
            (true, true) => Phase::AwaitingBoth,
        }
    }

    pub fn view(&self) -> View<'_> {
        View {
            messages: self.log.messages(),
            inputs: &self.inputs,
            ingest: &self.indicator,
            ingest_enabled: self.ingest_track == IngestTrack::Idle,
            send_enabled: self.query_track == QueryTrack::Idle,
            active_ticker: self.context.active_ticker(),
            effective_ticker: self.context.resolve(&self.inputs.ticker).ok(),
            notice: self.notice.as_ref(),
            caption: self.caption.as_deref(),
            suggestions: &self.suggestions,
            phase: self.phase(),
        }
    }

    /// Route an event to its transition handler.
    pub fn dispatch(&mut self, event: UiEvent) -> Dispatch {
        let result = match event {
            UiEvent::SubmitIngest { ticker } => self.submit_ingest(&ticker).map(Some),
            UiEvent::SubmitQuery { question } => self.submit_query(&question).map(Some),
            UiEvent::PickSuggestion(index) => self.pick_suggestion(index).map(Some),
            UiEvent::SetContext { ticker } => self.set_context(&ticker).map(|_| None),
            UiEvent::ClearContext => {
                self.clear_context();
                Ok(None)
            }
            UiEvent::ClearConversation => self.clear_conversation().map(|_| None),
            UiEvent::IngestCompleted { ticker, outcome } => {
                self.ingest_completed(&ticker, outcome);
                Ok(None)
            }
            UiEvent::QueryCompleted { outcome } => {
                self.query_completed(outcome);
                Ok(None)
            }
        };

        match result {
            Ok(Some(command)) => Dispatch::Execute(command),
            Ok(None) => Dispatch::Accepted,
            Err(rejection) => {
                debug!(%rejection, "event rejected");
                Dispatch::Rejected(rejection)
            }
        }
    }

    pub fn submit_ingest(&mut self, ticker: &str) -> Result<Command, Rejection> {
        let ticker = normalize_ticker(ticker).ok_or(Rejection::EmptyTicker)?;
        if self.ingest_track != IngestTrack::Idle {
            return Err(Rejection::IngestInFlight);
        }

        info!(%ticker, "ingestion started");
        self.ingest_track = IngestTrack::Awaiting {
            ticker: ticker.clone(),
        };
        self.indicator = IngestIndicator::Busy {
            ticker: ticker.clone(),
        };
        Ok(Command::Ingest { ticker })
    }

    pub fn ingest_completed(&mut self, ticker: &str, outcome: RequestOutcome<IngestPayload>) {
        let awaiting = match &self.ingest_track {
            IngestTrack::Awaiting { ticker: awaiting } if awaiting == ticker => awaiting.clone(),
            _ => {
                warn!(%ticker, "ignoring ingest completion that nothing is waiting for");
                return;
            }
        };
        self.ingest_track = IngestTrack::Idle;

        match outcome {
            RequestOutcome::Success(payload) => {
                if let Err(e) = self.context.set_active_ticker(&awaiting) {
                    warn!(ticker = %awaiting, error = %e, "could not record active ticker");
                }
                info!(ticker = %awaiting, summary = %payload.summary(), "ingestion succeeded");
                if self.notice == Some(Notice::NeedTicker) {
                    self.notice = None;
                }
                self.indicator = IngestIndicator::Succeeded {
                    ticker: awaiting,
                    summary: payload.summary(),
                };
            }
            RequestOutcome::Failure(failure) => {
                warn!(ticker = %awaiting, %failure, "ingestion failed");
                self.indicator = ingest_failure_indicator(&failure);
            }
        }
    }

    pub fn submit_query(&mut self, question: &str) -> Result<Command, Rejection> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Rejection::EmptyQuestion);
        }
        if self.query_track != QueryTrack::Idle || self.log.has_pending() {
            return Err(Rejection::QueryInFlight);
        }
        let ticker = match self.context.resolve(&self.inputs.ticker) {
            Ok(ticker) => ticker,
            Err(rejection) => {
                self.notice = Some(Notice::NeedTicker);
                return Err(rejection);
            }
        };

        self.log
            .append_final(Author::User, question, RenderMode::PlainText);
        let handle = self.log.append_pending().ok_or(Rejection::QueryInFlight)?;

        info!(%ticker, "question submitted");
        self.inputs.question.clear();
        self.notice = None;
        self.query_track = QueryTrack::Awaiting {
            ticker: ticker.clone(),
            handle,
        };
        Ok(Command::Query {
            ticker,
            question: question.to_string(),
        })
    }

    pub fn query_completed(&mut self, outcome: RequestOutcome<QueryPayload>) {
        let (ticker, handle) = match &self.query_track {
            QueryTrack::Awaiting { ticker, handle } => (ticker.clone(), *handle),
            QueryTrack::Idle => {
                warn!("ignoring query completion that nothing is waiting for");
                return;
            }
        };
        self.query_track = QueryTrack::Idle;

        match outcome {
            RequestOutcome::Success(payload) => {
                debug!(%ticker, query_type = ?payload.query_type, "answer received");
                self.caption = payload.caption();
                if let Err(e) = self
                    .log
                    .resolve_pending(handle, payload.answer, RenderMode::RichText)
                {
                    warn!(error = %e, "pending answer slot vanished");
                }
            }
            RequestOutcome::Failure(failure) => {
                warn!(%ticker, %failure, "question failed");
                if let Err(e) = self.log.remove_pending(handle) {
                    warn!(error = %e, "pending answer slot vanished");
                }
                self.log.append_final(
                    Author::Assistant,
                    query_failure_message(&failure),
                    RenderMode::RichText,
                );
            }
        }
    }

    /// Fill the question box with a canned question and send it.
    pub fn pick_suggestion(&mut self, index: usize) -> Result<Command, Rejection> {
        let question = self
            .suggestions
            .get(index)
            .cloned()
            .ok_or(Rejection::UnknownSuggestion(index))?;
        self.inputs.question = question.clone();
        self.submit_query(&question)
    }

    pub fn set_context(&mut self, ticker: &str) -> Result<(), Rejection> {
        let ticker = self
            .context
            .set_active_ticker(ticker)
            .map_err(|_| Rejection::EmptyTicker)?;
        self.notice = Some(Notice::ContextSet(ticker));
        Ok(())
    }

    pub fn clear_context(&mut self) {
        self.context.clear_active_ticker();
        self.notice = Some(Notice::ContextCleared);
    }

    pub fn clear_conversation(&mut self) -> Result<(), Rejection> {
        self.log.clear().map_err(|_| Rejection::ConversationBusy)?;
        self.caption = None;
        Ok(())
    }
}

fn ingest_failure_indicator(failure: &RequestFailure) -> IngestIndicator {
    if failure.is_transport() {
        return IngestIndicator::Failed {
            reason: "Network Error".to_string(),
            transport: true,
        };
    }
    IngestIndicator::Failed {
        reason: failure.detail().unwrap_or("Failed").to_string(),
        transport: false,
    }
}

fn query_failure_message(failure: &RequestFailure) -> String {
    match failure {
        RequestFailure::Server { .. } => format!(
            "**Error**: {}",
            failure.detail().unwrap_or("Something went wrong.")
        ),
        RequestFailure::Unreachable(_) => UNREACHABLE_MESSAGE.to_string(),
        RequestFailure::Malformed(_) => MALFORMED_MESSAGE.to_string(),
    }
}

/// Perform the network call for `command` and return its completion event.
pub async fn execute(backend: &dyn Backend, command: Command) -> UiEvent {
    match command {
        Command::Ingest { ticker } => {
            let outcome = backend.ingest(&ticker).await;
            UiEvent::IngestCompleted { ticker, outcome }
        }
        Command::Query { ticker, question } => UiEvent::QueryCompleted {
            outcome: backend.query(&ticker, &question).await,
        },
    }
}
