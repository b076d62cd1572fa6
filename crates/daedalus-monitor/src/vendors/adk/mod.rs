//! Client for the agent engine that runs the design pipeline.
//!
//! Sessions are created under `/apps/{app}/users/{user}/sessions` and each run
//! is streamed from `/run_sse`.
mod adapter;
mod config;

pub use adapter::AdkBackend;
pub use config::AdkClientConfig;

pub(crate) use config::non_empty_env;
