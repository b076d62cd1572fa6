//! Client-side protocol for following a Daedalus design pipeline run.
//!
//! A run creates an engine session, opens the `run_sse` event stream and
//! folds every `data: ` frame into a deduplicated event log and a stage
//! sequence while the stream is still open.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use daedalus_monitor::prelude::*;
//! use daedalus_monitor::session::FileUserIdStore;
//! use daedalus_monitor::vendors::adk::AdkBackend;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), MonitorError> {
//! let monitor = Monitor::builder()
//!     .backend(Arc::new(AdkBackend::from_env()?))
//!     .user_id_store(Arc::new(FileUserIdStore::from_env()))
//!     .build()?;
//!
//! let mut run = monitor.start_run("Order ID: 42").await?;
//! while let Some(update) = run.next_update().await {
//!     if let MonitorUpdate::StageEntered { author, .. } = &update {
//!         println!("stage: {author}");
//!     }
//!     if update.is_terminal() {
//!         break;
//!     }
//! }
//! let report = run.finish().await?;
//! println!("{} events", report.view.events().len());
//! # Ok(())
//! # }
//! ```

/// Backend contract for sessions and the event stream.
pub mod backend;
/// Incremental newline framing of the raw stream.
pub mod decoder;
/// Public error types.
pub mod errors;
/// Payload parsing into `StreamEvent`.
pub mod event;
/// `data: ` line classification.
pub mod frame;
/// Run states, session identifiers and options.
pub mod model;
/// Monitor entry point and builder.
pub mod monitor;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Bytes-to-view ingestion.
pub mod pipeline;
/// Event log and stage sequence.
pub mod projection;
/// Run handle, cancellation and the run task.
pub mod run;
/// User id persistence and per-run sessions.
pub mod session;
/// Updates and final reports.
pub mod update;
/// Concrete HTTP collaborators.
pub mod vendors;

pub use backend::{ByteStream, WorkflowBackend};
pub use decoder::FrameDecoder;
pub use errors::{BackendError, MonitorError, ParseFailure, RunFailure};
pub use event::{StreamEvent, TokenUsage, parse_event};
pub use frame::{Frame, classify};
pub use model::{CompletionReason, RunOptions, SessionInfo, StreamRequest, StreamState};
pub use monitor::{Monitor, MonitorBuilder};
pub use pipeline::{EventPipeline, PipelineOutput};
pub use projection::{Projection, ViewState};
pub use run::{AbortHandle, RunStream};
pub use update::{MonitorUpdate, RunReport};
