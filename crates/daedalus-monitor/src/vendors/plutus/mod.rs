//! Order service client. Creating an order yields the id that seeds the
//! monitor prompt.
mod client;
mod config;

pub use client::{OrderClient, order_prompt};
pub use config::OrderClientConfig;
