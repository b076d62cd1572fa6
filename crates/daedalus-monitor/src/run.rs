use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::backend::WorkflowBackend;
use crate::errors::{MonitorError, RunFailure, session_failure, stream_failure};
use crate::model::{CompletionReason, SessionInfo, StreamRequest, StreamState};
use crate::pipeline::{EventPipeline, PipelineOutput};
use crate::projection::ViewState;
use crate::session::{RunSession, UserIdStore};
use crate::update::{MonitorUpdate, RunReport};

/// Handle used to request cancellation of a running monitor run.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The run stops reading at its next suspension point and ends with
    /// `RunFailure::Cancelled`; its stream is dropped.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Everything a run task needs; moved into the task on spawn.
pub(crate) struct RunContext {
    pub run_id: uuid::Uuid,
    pub backend: Arc<dyn WorkflowBackend>,
    pub user_ids: Arc<dyn UserIdStore>,
    pub app_name: String,
    pub prompt: String,
    pub buffer_capacity: usize,
}

/// Live handle for one run, returned by `Monitor::start_run`.
///
/// `next_update()` yields updates in order and keeps `view()` in step with
/// them. `finish()` returns the final report after the terminal update.
pub struct RunStream {
    run_id: uuid::Uuid,
    rx: mpsc::Receiver<MonitorUpdate>,
    final_rx: oneshot::Receiver<RunReport>,
    abort_handle: AbortHandle,
    state: StreamState,
    session: Option<SessionInfo>,
    view: ViewState,
    failure: Option<RunFailure>,
    saw_terminal: bool,
}

impl RunStream {
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// State as of the last consumed update.
    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    /// Event log and stages as of the last consumed update.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    /// Waits for and returns the next update.
    ///
    /// Returns `None` once the run task has finished and every update has
    /// been consumed.
    pub async fn next_update(&mut self) -> Option<MonitorUpdate> {
        let update = self.rx.recv().await?;
        self.apply(&update);
        Some(update)
    }

    /// Drains remaining updates and returns the final report.
    pub async fn finish(mut self) -> Result<RunReport, MonitorError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(update) => self.apply(&update),
                None => break,
            }
        }
        self.final_rx.await.map_err(|_| {
            MonitorError::protocol_msg(format!(
                "run task {} ended without a final report",
                self.run_id
            ))
        })
    }

    fn apply(&mut self, update: &MonitorUpdate) {
        match update {
            MonitorUpdate::StateChanged { state, .. } => self.state = *state,
            MonitorUpdate::SessionReady { session, .. } => self.session = Some(session.clone()),
            MonitorUpdate::EventAppended { event, .. } => {
                self.view.project(event.clone());
            }
            MonitorUpdate::StageEntered { .. } => {}
            MonitorUpdate::Completed { .. } => {
                self.state = StreamState::Completed;
                self.saw_terminal = true;
            }
            MonitorUpdate::Failed { failure, .. } => {
                self.state = StreamState::Failed;
                self.failure = Some(failure.clone());
                self.saw_terminal = true;
            }
        }
    }
}

/// Spawns the run task and returns its handle.
pub(crate) fn spawn_run(ctx: RunContext) -> RunStream {
    let (tx, rx) = mpsc::channel(ctx.buffer_capacity);
    let (final_tx, final_rx) = oneshot::channel();
    let (abort_tx, abort_rx) = watch::channel(false);
    let run_id = ctx.run_id;

    tokio::spawn(run_task(ctx, tx, final_tx, abort_rx));

    RunStream {
        run_id,
        rx,
        final_rx,
        abort_handle: AbortHandle { tx: abort_tx },
        state: StreamState::Idle,
        session: None,
        view: ViewState::new(),
        failure: None,
        saw_terminal: false,
    }
}

/// Why a run task stopped before reaching an outcome of its own.
enum Halt {
    /// The `RunStream` was dropped.
    ConsumerGone,
    /// Cancellation was requested.
    Aborted,
}

/// How the streaming phase ended.
enum Outcome {
    Completed(CompletionReason),
    Failed(RunFailure),
}

/// Publishes updates and the final report for one run.
struct Reporter {
    run_id: uuid::Uuid,
    tx: mpsc::Sender<MonitorUpdate>,
    final_tx: oneshot::Sender<RunReport>,
    state: StreamState,
    session: Option<SessionInfo>,
}

impl Reporter {
    /// Sends one update. Returns `Halt::Aborted` once cancellation is
    /// requested, even while the buffer is full.
    async fn send(
        &self,
        update: MonitorUpdate,
        abort_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), Halt> {
        tokio::select! {
            biased;
            _ = aborted(abort_rx) => Err(Halt::Aborted),
            sent = self.tx.send(update) => sent.map_err(|_| Halt::ConsumerGone),
        }
    }

    async fn transition(
        &mut self,
        next: StreamState,
        abort_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), Halt> {
        debug_assert!(self.state.can_transition_to(next));
        self.state = next;
        info!(run_id = %self.run_id, state = %next, "run state changed");
        self.send(
            MonitorUpdate::StateChanged {
                run_id: self.run_id,
                state: next,
            },
            abort_rx,
        )
        .await
    }

    async fn session_ready(
        &mut self,
        session: SessionInfo,
        abort_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), Halt> {
        self.session = Some(session.clone());
        self.send(
            MonitorUpdate::SessionReady {
                run_id: self.run_id,
                session,
            },
            abort_rx,
        )
        .await
    }

    /// Sends appended events and stage changes in order.
    async fn publish(
        &self,
        outputs: Vec<PipelineOutput>,
        abort_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), Halt> {
        let run_id = self.run_id;
        for output in outputs {
            let PipelineOutput::Appended {
                event,
                stage_entered,
            } = output
            else {
                continue;
            };
            debug!(run_id = %run_id, event_id = %event.id, author = %event.author, "event appended");
            let author = stage_entered.then(|| event.author.clone());
            self.send(MonitorUpdate::EventAppended { run_id, event }, abort_rx)
                .await?;
            if let Some(author) = author {
                info!(run_id = %run_id, author = %author, "stage entered");
                self.send(MonitorUpdate::StageEntered { run_id, author }, abort_rx)
                    .await?;
            }
        }
        Ok(())
    }

    async fn complete(mut self, reason: CompletionReason, pipeline: EventPipeline) {
        self.state = StreamState::Completed;
        let skipped = pipeline.skipped();
        info!(
            run_id = %self.run_id,
            ?reason,
            events = pipeline.view().events().len(),
            malformed = skipped.malformed,
            missing_author = skipped.missing_author,
            duplicates = skipped.duplicates,
            "run completed"
        );
        let terminal = MonitorUpdate::Completed {
            run_id: self.run_id,
            reason,
        };
        self.finalize(terminal, Some(reason), None, pipeline.into_view())
            .await;
    }

    async fn fail(mut self, failure: RunFailure, pipeline: EventPipeline) {
        self.state = StreamState::Failed;
        warn!(run_id = %self.run_id, error = %failure, events = pipeline.view().events().len(), "run failed");
        let terminal = MonitorUpdate::Failed {
            run_id: self.run_id,
            failure: failure.clone(),
        };
        self.finalize(terminal, None, Some(failure), pipeline.into_view())
            .await;
    }

    /// Delivers the report first, then the terminal update. `finish()` drains
    /// the update buffer, so a blocked send here never hides the report.
    async fn finalize(
        self,
        terminal: MonitorUpdate,
        completion: Option<CompletionReason>,
        failure: Option<RunFailure>,
        view: ViewState,
    ) {
        let Reporter {
            run_id,
            tx,
            final_tx,
            state,
            session,
        } = self;
        let report = RunReport {
            run_id,
            state,
            session,
            completion,
            failure,
            view,
        };
        let _ = final_tx.send(report);
        let _ = tx.send(terminal).await;
    }
}

/// Resolves once cancellation has been requested. Never resolves if every
/// abort handle is gone without aborting.
async fn aborted(abort_rx: &mut watch::Receiver<bool>) {
    loop {
        let requested = *abort_rx.borrow_and_update();
        if requested {
            return;
        }
        if abort_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_task(
    ctx: RunContext,
    tx: mpsc::Sender<MonitorUpdate>,
    final_tx: oneshot::Sender<RunReport>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let run_id = ctx.run_id;
    let mut reporter = Reporter {
        run_id,
        tx,
        final_tx,
        state: StreamState::Idle,
        session: None,
    };
    let mut pipeline = EventPipeline::new();

    // The event stream lives inside `drive`, so it is released before any
    // terminal update is sent.
    match drive(ctx, &mut reporter, &mut pipeline, &mut abort_rx).await {
        Ok(Outcome::Completed(reason)) => reporter.complete(reason, pipeline).await,
        Ok(Outcome::Failed(failure)) => reporter.fail(failure, pipeline).await,
        Err(Halt::Aborted) => reporter.fail(RunFailure::Cancelled, pipeline).await,
        Err(Halt::ConsumerGone) => debug!(run_id = %run_id, "run consumer dropped; stopping"),
    }
}

async fn drive(
    ctx: RunContext,
    reporter: &mut Reporter,
    pipeline: &mut EventPipeline,
    abort_rx: &mut watch::Receiver<bool>,
) -> Result<Outcome, Halt> {
    let RunContext {
        backend,
        user_ids,
        app_name,
        prompt,
        ..
    } = ctx;

    reporter.transition(StreamState::Connecting, abort_rx).await?;

    let user_id = match user_ids.load_or_create() {
        Ok(id) => id,
        Err(err) => {
            return Ok(Outcome::Failed(RunFailure::Protocol {
                message: err.to_string(),
            }));
        }
    };

    let mut run_session = RunSession::new(app_name, user_id);
    let session = tokio::select! {
        biased;
        _ = aborted(abort_rx) => return Err(Halt::Aborted),
        created = run_session.ensure(backend.as_ref()) => match created {
            Ok(session) => session,
            Err(err) => return Ok(Outcome::Failed(session_failure(&err))),
        }
    };

    reporter.session_ready(session.clone(), abort_rx).await?;
    reporter.transition(StreamState::Streaming, abort_rx).await?;

    let request = StreamRequest { session, prompt };
    let mut stream = tokio::select! {
        biased;
        _ = aborted(abort_rx) => return Err(Halt::Aborted),
        opened = backend.open_stream(request) => match opened {
            Ok(stream) => stream,
            Err(err) => return Ok(Outcome::Failed(stream_failure(&err))),
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = aborted(abort_rx) => return Err(Halt::Aborted),
            next = stream.next() => next,
        };
        match next {
            Some(Ok(chunk)) => {
                let outputs = pipeline.push_chunk(&chunk);
                reporter.publish(outputs, abort_rx).await?;
                if pipeline.is_completed() {
                    return Ok(Outcome::Completed(CompletionReason::Sentinel));
                }
            }
            Some(Err(err)) => return Ok(Outcome::Failed(stream_failure(&err))),
            None => {
                let outputs = pipeline.finish();
                reporter.publish(outputs, abort_rx).await?;
                let reason = if pipeline.is_completed() {
                    CompletionReason::Sentinel
                } else {
                    CompletionReason::EndOfStream
                };
                return Ok(Outcome::Completed(reason));
            }
        }
    }
}
