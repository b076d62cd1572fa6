use std::time::Duration;

use crate::errors::MonitorError;
use crate::vendors::adk::non_empty_env;

/// Configuration for the order service client.
#[derive(Clone, Debug)]
pub struct OrderClientConfig {
    pub base_url: String,
    /// Sent as `X-Api-Key`.
    pub api_key: String,
    pub timeout: Duration,
}

impl OrderClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Builds a config from `PLUTUS_API_BASE_URL` and `PLUTUS_API_KEY`.
    pub fn from_env() -> Result<Self, MonitorError> {
        let base_url = non_empty_env("PLUTUS_API_BASE_URL").ok_or_else(|| {
            MonitorError::Config("missing PLUTUS_API_BASE_URL for order client".into())
        })?;
        let api_key = non_empty_env("PLUTUS_API_KEY")
            .ok_or_else(|| MonitorError::Config("missing PLUTUS_API_KEY for order client".into()))?;
        Ok(Self::new(base_url, api_key))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn create_order_url(&self) -> String {
        format!("{}/createOrder", self.base_url.trim_end_matches('/'))
    }
}
