use crate::errors::RunFailure;
use crate::event::StreamEvent;
use crate::model::{CompletionReason, SessionInfo, StreamState};
use crate::projection::ViewState;

/// Ordered updates published by a run as it progresses.
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorUpdate {
    /// Non-terminal state change (`Connecting`, `Streaming`).
    StateChanged {
        run_id: uuid::Uuid,
        state: StreamState,
    },
    /// The engine session for this run is known.
    SessionReady {
        run_id: uuid::Uuid,
        session: SessionInfo,
    },
    /// A new event entered the log.
    EventAppended {
        run_id: uuid::Uuid,
        event: StreamEvent,
    },
    /// The stage sequence grew by one author.
    StageEntered { run_id: uuid::Uuid, author: String },
    /// Terminal success.
    Completed {
        run_id: uuid::Uuid,
        reason: CompletionReason,
    },
    /// Terminal failure. Events already received stay in the view.
    Failed {
        run_id: uuid::Uuid,
        failure: RunFailure,
    },
}

impl MonitorUpdate {
    pub fn run_id(&self) -> uuid::Uuid {
        match self {
            Self::StateChanged { run_id, .. }
            | Self::SessionReady { run_id, .. }
            | Self::EventAppended { run_id, .. }
            | Self::StageEntered { run_id, .. }
            | Self::Completed { run_id, .. }
            | Self::Failed { run_id, .. } => *run_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Final outcome of a run, including partial progress on failure.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub state: StreamState,
    pub session: Option<SessionInfo>,
    pub completion: Option<CompletionReason>,
    pub failure: Option<RunFailure>,
    pub view: ViewState,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.state == StreamState::Completed
    }

    /// Converts a failed report into its `RunFailure`, dropping the view.
    pub fn into_result(self) -> Result<ViewState, RunFailure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.view),
        }
    }
}
