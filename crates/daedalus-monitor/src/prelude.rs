//! Common imports for typical monitor usage.
pub use crate::{
    AbortHandle, BackendError, Monitor, MonitorBuilder, MonitorError, MonitorUpdate, RunFailure,
    RunReport, RunStream, StreamEvent, StreamState, ViewState, WorkflowBackend,
};
