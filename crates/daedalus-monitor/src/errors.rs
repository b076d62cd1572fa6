/// Errors returned by a backend collaborator (session creation, event stream,
/// order creation) before they are normalized into a run failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend answered with a non-success status or an application error.
    #[error("backend error ({endpoint}): {message}")]
    Http {
        endpoint: String,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error ({endpoint}): {message}")]
    Transport { endpoint: String, message: String },
    /// Response shape was not what the client expects.
    #[error("protocol error ({endpoint}): {message}")]
    Protocol { endpoint: String, message: String },
}

impl BackendError {
    /// Creates an HTTP/application-level error.
    pub fn http(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Returns the endpoint label associated with this error.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Http { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Protocol { endpoint, .. } => endpoint,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. }
            | Self::Transport { message, .. }
            | Self::Protocol { message, .. } => message,
        }
    }
}

/// Terminal run failure carried by `MonitorUpdate::Failed` and `RunReport`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum RunFailure {
    /// The session could not be created; no stream was opened.
    #[error("session creation failed: {message}")]
    SessionCreation { message: String },
    /// The event stream could not be opened or failed mid-read.
    #[error("stream transport failed: {message}")]
    Transport { message: String },
    /// Local invariant or setup error (for example the user id store failed).
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The run was abandoned by the caller or superseded by a newer run.
    #[error("run cancelled")]
    Cancelled,
}

impl RunFailure {
    /// Short text suitable for a user-facing alert.
    pub fn alert(&self) -> String {
        match self {
            Self::SessionCreation { .. } => {
                format!("Could not start a session with the pipeline. {self}")
            }
            Self::Transport { .. } => format!("Lost connection to the pipeline. {self}"),
            Self::Protocol { .. } => format!("Monitor error. {self}"),
            Self::Cancelled => "Run cancelled.".to_string(),
        }
    }
}

/// Why a single payload line was skipped. Never terminal for a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// Content was not valid JSON (or not a JSON object).
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// Payload had no string `author` field.
    #[error("payload has no author")]
    MissingAuthor,
}

/// Top-level error type for the public monitor API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (for example a blank prompt).
    #[error("validation error: {0}")]
    Validation(String),
    /// Reading or persisting the user id failed.
    #[error("user id store error: {0}")]
    UserId(String),
    /// Collaborator call made outside a run failed.
    #[error(transparent)]
    Backend(BackendError),
    /// Terminal failure of a started run.
    #[error(transparent)]
    RunFailed(RunFailure),
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl MonitorError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<RunFailure> for MonitorError {
    fn from(value: RunFailure) -> Self {
        MonitorError::RunFailed(value)
    }
}

impl From<BackendError> for MonitorError {
    fn from(value: BackendError) -> Self {
        MonitorError::Backend(value)
    }
}

pub(crate) fn session_failure(err: &BackendError) -> RunFailure {
    RunFailure::SessionCreation {
        message: err.to_string(),
    }
}

pub(crate) fn stream_failure(err: &BackendError) -> RunFailure {
    RunFailure::Transport {
        message: err.to_string(),
    }
}
