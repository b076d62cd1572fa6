/// Agent engine (sessions and the event stream).
pub mod adk;
/// Order service that seeds a pipeline run.
pub mod plutus;
