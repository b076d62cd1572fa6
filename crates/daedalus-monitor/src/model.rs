use std::fmt;

/// Application name the pipeline is registered under on the engine.
pub const DEFAULT_APP_NAME: &str = "daedalus";

/// Lifecycle of one monitor run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
}

impl StreamState {
    /// `Completed` and `Failed` end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor within one run.
    pub fn can_transition_to(self, next: StreamState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Connecting)
                | (Self::Connecting, Self::Streaming)
                | (Self::Connecting, Self::Failed)
                | (Self::Streaming, Self::Completed)
                | (Self::Streaming, Self::Failed)
        )
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a run reached `Completed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The `[DONE]` sentinel arrived.
    Sentinel,
    /// The stream ended without a sentinel.
    EndOfStream,
}

/// Identifiers for one engine session.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionInfo {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

/// Outbound request for the event stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamRequest {
    pub session: SessionInfo,
    pub prompt: String,
}

/// Generic run behavior options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RunOptions {
    /// Bounded update buffer between the run task and the consumer.
    pub update_buffer_capacity: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            update_buffer_capacity: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_options_default_buffer_capacity() {
        assert_eq!(RunOptions::default().update_buffer_capacity, 128);
    }

    #[test]
    fn terminal_states_have_no_successor() {
        for next in [
            StreamState::Idle,
            StreamState::Connecting,
            StreamState::Streaming,
            StreamState::Completed,
            StreamState::Failed,
        ] {
            assert!(!StreamState::Completed.can_transition_to(next));
            assert!(!StreamState::Failed.can_transition_to(next));
        }
        assert!(StreamState::Idle.can_transition_to(StreamState::Connecting));
        assert!(!StreamState::Idle.can_transition_to(StreamState::Streaming));
    }
}
