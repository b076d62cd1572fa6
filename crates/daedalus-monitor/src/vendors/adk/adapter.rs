use futures::StreamExt as _;
use tracing::debug;

use crate::backend::{ByteStream, WorkflowBackend};
use crate::errors::{BackendError, MonitorError};
use crate::model::StreamRequest;

use super::config::AdkClientConfig;

const SESSIONS_ENDPOINT: &str = "sessions";
const RUN_SSE_ENDPOINT: &str = "run_sse";

/// `WorkflowBackend` over the agent engine's HTTP API.
pub struct AdkBackend {
    client: reqwest::Client,
    config: AdkClientConfig,
}

impl AdkBackend {
    /// Creates a backend from explicit client configuration.
    pub fn new(config: AdkClientConfig) -> Result<Self, MonitorError> {
        if config.base_url.trim().is_empty() {
            return Err(MonitorError::Config("engine base_url must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to build engine client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a backend from `DAEDALUS_*` environment variables.
    pub fn from_env() -> Result<Self, MonitorError> {
        Self::new(AdkClientConfig::from_env()?)
    }

    pub fn config(&self) -> &AdkClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl WorkflowBackend for AdkBackend {
    async fn create_session(&self, app_name: &str, user_id: &str) -> Result<String, BackendError> {
        let url = self.config.sessions_url(app_name, user_id);
        debug!(%url, "creating engine session");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                BackendError::transport(SESSIONS_ENDPOINT, format!("session request failed: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::http(
                SESSIONS_ENDPOINT,
                format!("session request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }
        let value: serde_json::Value = response.json().await.map_err(|e| {
            BackendError::protocol(SESSIONS_ENDPOINT, format!("invalid session response: {e}"))
        })?;
        session_id_from_response(&value)
    }

    async fn open_stream(&self, request: StreamRequest) -> Result<ByteStream, BackendError> {
        let body = build_run_body(&request);
        debug!(session_id = %request.session.session_id, "opening engine event stream");
        let response = self
            .client
            .post(self.config.run_sse_url())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                BackendError::transport(RUN_SSE_ENDPOINT, format!("stream request failed: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::http(
                RUN_SSE_ENDPOINT,
                format!("stream request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                BackendError::transport(RUN_SSE_ENDPOINT, format!("stream read failed: {e}"))
            })
        });
        Ok(Box::pin(stream))
    }

    fn app_name(&self) -> Option<&str> {
        Some(&self.config.app_name)
    }
}

pub(crate) fn build_run_body(request: &StreamRequest) -> serde_json::Value {
    serde_json::json!({
        "appName": request.session.app_name,
        "userId": request.session.user_id,
        "sessionId": request.session.session_id,
        "newMessage": {
            "parts": [{ "text": request.prompt }],
            "role": "user",
        },
        "streaming": true,
    })
}

pub(crate) fn session_id_from_response(value: &serde_json::Value) -> Result<String, BackendError> {
    value
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|id| !id.trim().is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| BackendError::protocol(SESSIONS_ENDPOINT, "session response has no id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionInfo;

    fn request() -> StreamRequest {
        StreamRequest {
            session: SessionInfo {
                app_name: "daedalus".into(),
                user_id: "user_abc".into(),
                session_id: "s-1".into(),
            },
            prompt: "Order ID: 42".into(),
        }
    }

    #[test]
    fn run_body_matches_engine_contract() {
        let body = build_run_body(&request());
        assert_eq!(
            body,
            serde_json::json!({
                "appName": "daedalus",
                "userId": "user_abc",
                "sessionId": "s-1",
                "newMessage": {"parts": [{"text": "Order ID: 42"}], "role": "user"},
                "streaming": true
            })
        );
    }

    #[test]
    fn session_id_is_required() {
        assert_eq!(
            session_id_from_response(&serde_json::json!({"id": "abc", "appName": "daedalus"})),
            Ok("abc".to_string())
        );
        assert!(matches!(
            session_id_from_response(&serde_json::json!({"appName": "daedalus"})),
            Err(BackendError::Protocol { .. })
        ));
        assert!(session_id_from_response(&serde_json::json!({"id": ""})).is_err());
    }

    #[test]
    fn empty_base_url_is_config_error() {
        let result = AdkBackend::new(AdkClientConfig::default().base_url(" "));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn monitor_takes_app_name_from_engine_config() {
        let backend = std::sync::Arc::new(
            AdkBackend::new(AdkClientConfig::default().app_name("studio")).expect("backend"),
        );
        let monitor = crate::Monitor::builder()
            .backend(backend.clone())
            .build()
            .expect("monitor");
        assert_eq!(monitor.app_name(), "studio");

        let monitor = crate::Monitor::builder()
            .backend(backend)
            .app_name("override")
            .build()
            .expect("monitor");
        assert_eq!(monitor.app_name(), "override");
    }

    #[tokio::test]
    async fn env_gated_smoke_run_if_engine_configured() {
        if std::env::var("DAEDALUS_SMOKE_BASE_URL")
            .unwrap_or_default()
            .trim()
            .is_empty()
        {
            eprintln!("skipping engine smoke test (DAEDALUS_SMOKE_BASE_URL missing)");
            return;
        }
        let base_url = std::env::var("DAEDALUS_SMOKE_BASE_URL").unwrap_or_default();
        let backend = AdkBackend::new(AdkClientConfig::default().base_url(base_url))
            .expect("backend");
        let monitor = crate::Monitor::builder()
            .backend(std::sync::Arc::new(backend))
            .build()
            .expect("monitor");
        let mut run = monitor.start_run("ping").await.expect("start run");
        let mut saw_state = false;
        while let Some(update) = run.next_update().await {
            if let crate::MonitorUpdate::StateChanged { .. } = update {
                saw_state = true;
            }
            if update.is_terminal() {
                break;
            }
        }
        run.abort_handle().abort();
        let _ = run.finish().await;
        assert!(saw_state, "expected at least one state change");
    }
}
