use std::time::Duration;

use crate::errors::MonitorError;
use crate::model::DEFAULT_APP_NAME;

/// Configuration for the agent engine HTTP client.
#[derive(Clone, Debug)]
pub struct AdkClientConfig {
    /// Base URL of the engine API server.
    pub base_url: String,
    /// Application the pipeline is registered under; the default app name of
    /// a `Monitor` built on this backend.
    pub app_name: String,
    /// Connect timeout. No read timeout is applied; an event stream stays
    /// open for the whole pipeline run.
    pub connect_timeout: Duration,
}

impl Default for AdkClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl AdkClientConfig {
    /// Builds a config from `DAEDALUS_BASE_URL`, `DAEDALUS_APP_NAME` and
    /// `DAEDALUS_CONNECT_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, MonitorError> {
        let mut config = Self::default();
        if let Some(base_url) = non_empty_env("DAEDALUS_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(app_name) = non_empty_env("DAEDALUS_APP_NAME") {
            config.app_name = app_name;
        }
        if let Some(raw) = non_empty_env("DAEDALUS_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                MonitorError::Config(format!(
                    "DAEDALUS_CONNECT_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.connect_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn sessions_url(&self, app_name: &str, user_id: &str) -> String {
        format!(
            "{}/apps/{app_name}/users/{user_id}/sessions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub(crate) fn run_sse_url(&self) -> String {
        format!("{}/run_sse", self.base_url.trim_end_matches('/'))
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_ignore_trailing_slash() {
        let config = AdkClientConfig::default().base_url("http://engine:8000/");
        assert_eq!(
            config.sessions_url("daedalus", "user_abc"),
            "http://engine:8000/apps/daedalus/users/user_abc/sessions"
        );
        assert_eq!(config.run_sse_url(), "http://engine:8000/run_sse");
    }

    #[test]
    fn defaults_point_at_local_engine() {
        let config = AdkClientConfig::default();
        assert_eq!(config.app_name, "daedalus");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }
}
