use std::pin::Pin;

use crate::errors::BackendError;
use crate::model::StreamRequest;

/// Raw response body chunks of the event stream.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, BackendError>> + Send + 'static>>;

/// Contract for the remote workflow engine.
///
/// Implementations only move bytes; decoding, classification and projection
/// stay in the run task.
#[async_trait::async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Creates a session for `user_id` under `app_name` and returns its id.
    async fn create_session(&self, app_name: &str, user_id: &str) -> Result<String, BackendError>;

    /// Opens the event stream for a prompt within an existing session.
    async fn open_stream(&self, request: StreamRequest) -> Result<ByteStream, BackendError>;

    /// Application name this backend is configured for. A `Monitor` built
    /// without an explicit app name uses it.
    fn app_name(&self) -> Option<&str> {
        None
    }
}
