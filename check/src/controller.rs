//! CheckController facade: the API consumed by the host.
//!
//! The host submits document snapshots through [`CheckController::check_document`]
//! and drains completions with [`poll_events`](CheckController::poll_events)
//! (non-blocking, once per host tick) or
//! [`next_completion`](CheckController::next_completion) (async).
//!
//! Live runs sit in the `runs` map keyed by document; removal from the map is
//! the state transition for supersede, cancel and completion. A completion
//! event is only acted on when its run id still matches the map entry, so a
//! killed run that manages to report late is ignored.

use std::collections::HashMap;

use tokio::sync::mpsc;

use flint_types::{Diagnostic, Document, DocumentId, RunId};

use crate::report::parse_report;
use crate::run::{self, LiveRun};
use crate::types::{CheckError, CheckerConfig, RunEvent, RunOutcome, RunState};

/// Channel capacity for the event channel between run tasks and the controller.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Single-flight analyzer runs, one per document.
pub struct CheckController {
    config: CheckerConfig,
    runs: HashMap<DocumentId, LiveRun>,
    next_run: RunId,
    event_rx: mpsc::Receiver<RunEvent>,
    event_tx: mpsc::Sender<RunEvent>,
}

impl CheckController {
    #[must_use]
    pub fn new(config: CheckerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            runs: HashMap::new(),
            next_run: RunId::new(1),
            event_rx,
            event_tx,
        }
    }

    /// Start a fresh check of `document`.
    ///
    /// Any run still live for the same document is killed first and its
    /// `report` never fires. `report` is called at most once, from
    /// [`poll_events`](Self::poll_events) or
    /// [`next_completion`](Self::next_completion), with the diagnostics in
    /// report order.
    ///
    /// Must be called from within a tokio runtime. On error no run exists
    /// for the document afterwards.
    pub fn check_document<F>(&mut self, document: Document, report: F) -> Result<RunId, CheckError>
    where
        F: FnOnce(Vec<Diagnostic>) + Send + 'static,
    {
        let document_id = document.id();
        if let Some(previous) = self.runs.remove(&document_id) {
            tracing::debug!(
                document = %document_id,
                run = %previous.id(),
                "Superseding live run"
            );
            previous.cancel();
        }

        let id = self.next_run;
        self.next_run = id.next();

        match run::spawn(
            id,
            document,
            Box::new(report),
            &self.config,
            self.event_tx.clone(),
        ) {
            Ok(live) => {
                self.runs.insert(document_id, live);
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(document = %document_id, "No check performed: {e}");
                Err(e)
            }
        }
    }

    /// Kill the live run for `document`, if any. Its callback never fires.
    pub fn cancel(&mut self, document: DocumentId) -> bool {
        match self.runs.remove(&document) {
            Some(live) => {
                tracing::debug!(
                    document = %document,
                    run = %live.id(),
                    state = RunState::Superseded.label(),
                    "Cancelled run"
                );
                live.cancel();
                true
            }
            None => false,
        }
    }

    /// The host closed `document`: stop its analyzer and forget it.
    pub fn close_document(&mut self, document: DocumentId) {
        if self.cancel(document) {
            tracing::info!(document = %document, "Document closed with a run in flight");
        }
    }

    /// Id of the run currently live for `document`.
    #[must_use]
    pub fn current_run(&self, document: DocumentId) -> Option<RunId> {
        self.runs.get(&document).map(LiveRun::id)
    }

    #[must_use]
    pub fn is_running(&self, document: DocumentId) -> bool {
        self.runs.contains_key(&document)
    }

    /// [`RunState::Running`] while a run is live for `document`. Finished
    /// runs are forgotten; their state is reported once as a [`RunOutcome`].
    #[must_use]
    pub fn run_state(&self, document: DocumentId) -> Option<RunState> {
        self.is_running(document).then_some(RunState::Running)
    }

    /// Number of documents with a live run.
    #[must_use]
    pub fn live_runs(&self) -> usize {
        self.runs.len()
    }

    /// Drain pending completions, up to `budget`.
    ///
    /// Non-blocking; returns immediately if no events are available.
    pub fn poll_events(&mut self, budget: usize) -> Vec<RunOutcome> {
        let mut outcomes = Vec::new();
        while outcomes.len() < budget {
            match self.event_rx.try_recv() {
                Ok(event) => outcomes.push(self.handle_event(event)),
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        outcomes
    }

    /// Wait for the next completion event and handle it.
    ///
    /// Returns `None` without waiting when no run is live. Late events from
    /// superseded runs come back as [`RunState::Superseded`].
    pub async fn next_completion(&mut self) -> Option<RunOutcome> {
        if self.runs.is_empty() {
            return None;
        }
        let event = self.event_rx.recv().await?;
        Some(self.handle_event(event))
    }

    /// Wait until no run is live.
    pub async fn wait_idle(&mut self) {
        while self.next_completion().await.is_some() {}
    }

    /// Completion gate and delivery.
    fn handle_event(&mut self, event: RunEvent) -> RunOutcome {
        let document = event.document();
        let run = event.run();

        let live = match self.runs.remove(&document) {
            Some(live) if live.id() == run => live,
            other => {
                if let Some(current) = other {
                    self.runs.insert(document, current);
                }
                let state = RunState::Superseded;
                tracing::debug!(
                    document = %document,
                    run = %run,
                    state = state.label(),
                    "Discarding stale run event"
                );
                return RunOutcome {
                    document,
                    run,
                    state,
                };
            }
        };
        let elapsed_ms = u64::try_from(live.started().elapsed().as_millis()).unwrap_or(u64::MAX);

        let state = match event {
            RunEvent::Finished { status, output, .. } => {
                let diagnostics = parse_report(&output, live.document());
                tracing::debug!(
                    document = %document,
                    run = %run,
                    %status,
                    elapsed_ms,
                    count = diagnostics.len(),
                    "Run completed"
                );
                live.deliver(diagnostics);
                RunState::Completed
            }
            RunEvent::Failed { error, .. } => {
                tracing::warn!(
                    document = %document,
                    run = %run,
                    elapsed_ms,
                    error = %error,
                    "Run failed"
                );
                RunState::Failed
            }
        };

        RunOutcome {
            document,
            run,
            state,
        }
    }

    /// Kill every live run.
    pub fn shutdown(&mut self) {
        for (document, live) in self.runs.drain() {
            tracing::debug!(document = %document, run = %live.id(), "Stopping run on shutdown");
            live.cancel();
        }
    }

    /// Get a reference to the event sender (for testing).
    #[cfg(test)]
    pub(crate) fn event_tx(&self) -> &mpsc::Sender<RunEvent> {
        &self.event_tx
    }
}

impl Drop for CheckController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
