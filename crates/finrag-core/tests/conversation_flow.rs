//! End-to-end flows through the controller with a scripted backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use finrag_core::api::{HealthStatus, IngestPayload, QueryPayload};
use finrag_core::controller::{IngestIndicator, Notice, Phase};
use finrag_core::{
    execute, Author, Backend, Command, ContextStore, Controller, Dispatch, FileStore,
    MessageStatus, Rejection, RenderMode, RequestFailure, RequestOutcome, UiEvent,
};
use tempfile::TempDir;

#[derive(Default)]
struct ScriptedBackend {
    ingests: Mutex<VecDeque<RequestOutcome<IngestPayload>>>,
    answers: Mutex<VecDeque<RequestOutcome<QueryPayload>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn with_ingest(self, outcome: RequestOutcome<IngestPayload>) -> Self {
        self.ingests.lock().unwrap().push_back(outcome);
        self
    }

    fn with_answer(self, outcome: RequestOutcome<QueryPayload>) -> Self {
        self.answers.lock().unwrap().push_back(outcome);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn ingest(&self, ticker: &str) -> RequestOutcome<IngestPayload> {
        self.calls.lock().unwrap().push(format!("ingest {}", ticker));
        self.ingests
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected ingest call")
    }

    async fn query(&self, ticker: &str, question: &str) -> RequestOutcome<QueryPayload> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("query {} {}", ticker, question));
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected query call")
    }

    async fn health(&self) -> RequestOutcome<HealthStatus> {
        RequestOutcome::Success(HealthStatus {
            status: "ok".to_string(),
            version: "test".to_string(),
        })
    }
}

fn ingested(company: &str) -> RequestOutcome<IngestPayload> {
    RequestOutcome::Success(IngestPayload {
        status: Some("success".to_string()),
        company: Some(company.to_string()),
        statements: Some(12),
        chunks: Some(40),
        ..Default::default()
    })
}

fn answered(text: &str) -> RequestOutcome<QueryPayload> {
    RequestOutcome::Success(QueryPayload {
        answer: text.to_string(),
        query_type: Some("numeric".to_string()),
        confidence: Some("high".to_string()),
        sources: vec![],
    })
}

fn submit_ingest(ticker: &str) -> UiEvent {
    UiEvent::SubmitIngest {
        ticker: ticker.to_string(),
    }
}

fn submit_query(question: &str) -> UiEvent {
    UiEvent::SubmitQuery {
        question: question.to_string(),
    }
}

/// Dispatch an event and, if it produced a command, run it and feed the
/// completion back in.
async fn drive(controller: &mut Controller, backend: &dyn Backend, event: UiEvent) -> Dispatch {
    let dispatch = controller.dispatch(event);
    if let Dispatch::Execute(command) = &dispatch {
        let completion = execute(backend, command.clone()).await;
        assert_eq!(controller.dispatch(completion), Dispatch::Accepted);
    }
    dispatch
}

#[tokio::test]
async fn test_ingest_then_ask() {
    let backend = ScriptedBackend::default()
        .with_ingest(ingested("Apple Inc."))
        .with_answer(answered("Revenue was $100B"));
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());

    drive(
        &mut controller,
        &backend,
        UiEvent::SubmitIngest {
            ticker: "aapl".to_string(),
        },
    )
    .await;
    assert_eq!(controller.context().active_ticker(), Some("AAPL"));
    assert_eq!(
        controller.indicator(),
        &IngestIndicator::Succeeded {
            ticker: "AAPL".to_string(),
            summary: "Apple Inc. · 12 statements · 40 chunks".to_string()
        }
    );

    drive(
        &mut controller,
        &backend,
        UiEvent::SubmitQuery {
            question: "What was FY2022 revenue?".to_string(),
        },
    )
    .await;

    let messages = controller.log().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].author, Author::User);
    assert_eq!(messages[0].body, "What was FY2022 revenue?");
    assert_eq!(messages[1].author, Author::Assistant);
    assert_eq!(messages[1].body, "Revenue was $100B");
    assert_eq!(messages[1].status, MessageStatus::Final);
    assert_eq!(messages[1].render_mode, RenderMode::RichText);
    assert_eq!(
        backend.calls(),
        vec![
            "ingest AAPL".to_string(),
            "query AAPL What was FY2022 revenue?".to_string()
        ]
    );
    assert_eq!(controller.view().caption, Some("numeric query · high confidence"));
}

#[tokio::test]
async fn test_question_without_company_is_refused() {
    let backend = ScriptedBackend::default();
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());

    let dispatch = drive(
        &mut controller,
        &backend,
        UiEvent::SubmitQuery {
            question: "What was revenue?".to_string(),
        },
    )
    .await;

    assert_eq!(dispatch, Dispatch::Rejected(Rejection::NoTicker));
    assert!(controller.log().is_empty());
    assert!(backend.calls().is_empty());
    assert_eq!(controller.view().notice, Some(&Notice::NeedTicker));
}

#[tokio::test]
async fn test_rejected_ingestion_leaves_context() {
    let backend = ScriptedBackend::default()
        .with_ingest(ingested("Alphabet Inc."))
        .with_ingest(RequestOutcome::Failure(RequestFailure::Server {
            status: 400,
            detail: Some("Unknown ticker".to_string()),
        }));
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());

    drive(&mut controller, &backend, submit_ingest("GOOG")).await;
    drive(&mut controller, &backend, submit_ingest("MSFT")).await;

    assert_eq!(controller.context().active_ticker(), Some("GOOG"));
    assert_eq!(controller.indicator().text(), "Error: Unknown ticker");
    assert!(controller.view().ingest_enabled);
}

#[tokio::test]
async fn test_dropped_connection_during_query() {
    let backend = ScriptedBackend::default().with_answer(RequestOutcome::Failure(
        RequestFailure::Unreachable("connection reset by peer".to_string()),
    ));
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());
    controller.set_context("AAPL").unwrap();

    drive(&mut controller, &backend, submit_query("Margins?")).await;

    let messages = controller.log().messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.status == MessageStatus::Final));
    assert_eq!(messages[1].author, Author::Assistant);
    assert!(messages[1].body.to_lowercase().contains("could not reach server"));
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_query_uses_sidebar_ticker_over_context() {
    let backend = ScriptedBackend::default().with_answer(answered("42%"));
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());
    controller.set_context("AAPL").unwrap();
    controller.inputs_mut().ticker = " tcs.ns ".to_string();

    drive(&mut controller, &backend, submit_query("Margin?")).await;

    assert_eq!(backend.calls(), vec!["query TCS.NS Margin?".to_string()]);
    assert_eq!(controller.context().active_ticker(), Some("AAPL"));
}

#[tokio::test]
async fn test_suggestion_round_trip() {
    let backend = ScriptedBackend::default().with_answer(answered("Up 8% a year"));
    let mut controller = Controller::new(
        ContextStore::in_memory(),
        vec!["How did revenue grow?".to_string()],
    );
    controller.set_context("INFY.NS").unwrap();

    drive(&mut controller, &backend, UiEvent::PickSuggestion(0)).await;

    assert_eq!(backend.calls(), vec!["query INFY.NS How did revenue grow?".to_string()]);
    assert_eq!(controller.log().messages()[1].body, "Up 8% a year");
}

#[tokio::test]
async fn test_overlapping_requests_complete_out_of_order() {
    let backend = ScriptedBackend::default()
        .with_ingest(ingested("Microsoft Corporation"))
        .with_answer(answered("Revenue was $100B"));
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());
    controller.set_context("AAPL").unwrap();

    let ingest = match controller.dispatch(submit_ingest("MSFT")) {
        Dispatch::Execute(command) => command,
        other => panic!("expected a command, got {:?}", other),
    };
    let query = match controller.dispatch(submit_query("Revenue?")) {
        Dispatch::Execute(command) => command,
        other => panic!("expected a command, got {:?}", other),
    };
    assert!(matches!(query, Command::Query { ref ticker, .. } if ticker == "AAPL"));
    assert_eq!(controller.phase(), Phase::AwaitingBoth);

    // Further submissions on either track are refused while it is busy
    assert_eq!(
        controller.dispatch(submit_query("again")),
        Dispatch::Rejected(Rejection::QueryInFlight)
    );
    assert_eq!(
        controller.dispatch(submit_ingest("NVDA")),
        Dispatch::Rejected(Rejection::IngestInFlight)
    );

    let query_done = execute(&backend, query).await;
    let ingest_done = execute(&backend, ingest).await;
    controller.dispatch(query_done);
    controller.dispatch(ingest_done);

    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.context().active_ticker(), Some("MSFT"));
    assert_eq!(controller.log().len(), 2);
    assert!(!controller.log().has_pending());
}

#[tokio::test]
async fn test_context_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let backend = ScriptedBackend::default()
        .with_ingest(ingested("NVIDIA Corporation"))
        .with_answer(answered("Strong"));

    {
        let context = ContextStore::new(Box::new(FileStore::open(&path)));
        let mut controller = Controller::with_default_suggestions(context);
        drive(&mut controller, &backend, submit_ingest("nvda")).await;
    }

    let context = ContextStore::new(Box::new(FileStore::open(&path)));
    let mut controller = Controller::with_default_suggestions(context);
    assert_eq!(controller.context().active_ticker(), Some("NVDA"));
    drive(&mut controller, &backend, submit_query("Outlook?")).await;
    assert_eq!(backend.calls().last().unwrap(), "query NVDA Outlook?");
}

#[tokio::test]
async fn test_clear_context_then_ask() {
    let backend = ScriptedBackend::default();
    let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());
    controller.dispatch(UiEvent::SetContext { ticker: "AAPL".to_string() });
    assert_eq!(controller.dispatch(UiEvent::ClearContext), Dispatch::Accepted);

    let dispatch = drive(&mut controller, &backend, submit_query("q")).await;
    assert_eq!(dispatch, Dispatch::Rejected(Rejection::NoTicker));
    assert!(backend.calls().is_empty());
}
