use std::sync::{Arc, Mutex};

use tracing::info;

use crate::backend::WorkflowBackend;
use crate::errors::MonitorError;
use crate::model::{DEFAULT_APP_NAME, RunOptions};
use crate::run::{AbortHandle, RunContext, RunStream, spawn_run};
use crate::session::{MemoryUserIdStore, UserIdStore};

pub(crate) struct MonitorInner {
    backend: Arc<dyn WorkflowBackend>,
    user_ids: Arc<dyn UserIdStore>,
    app_name: String,
    options: RunOptions,
    active: Mutex<Option<AbortHandle>>,
}

/// Entry point for starting monitor runs against one backend.
///
/// At most one run is live per `Monitor`: starting a run aborts the previous
/// one, so a superseded stream can never feed the new run's view.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    pub fn app_name(&self) -> &str {
        &self.inner.app_name
    }

    /// Starts a run for `prompt`.
    ///
    /// Blank prompts are rejected and leave any active run untouched. Must be
    /// called from within a Tokio runtime.
    pub async fn start_run(&self, prompt: impl Into<String>) -> Result<RunStream, MonitorError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(MonitorError::Validation("prompt must not be empty".into()));
        }

        let mut active = self
            .inner
            .active
            .lock()
            .map_err(|_| MonitorError::protocol_msg("active run lock poisoned"))?;
        if let Some(previous) = active.take() {
            previous.abort();
        }

        let run_id = uuid::Uuid::new_v4();
        info!(run_id = %run_id, app_name = %self.inner.app_name, "starting run");
        let stream = spawn_run(RunContext {
            run_id,
            backend: self.inner.backend.clone(),
            user_ids: self.inner.user_ids.clone(),
            app_name: self.inner.app_name.clone(),
            prompt,
            buffer_capacity: self.inner.options.update_buffer_capacity,
        });
        *active = Some(stream.abort_handle());
        Ok(stream)
    }

    /// Aborts the active run, if any.
    pub fn abort_active(&self) {
        if let Ok(mut active) = self.inner.active.lock()
            && let Some(handle) = active.take()
        {
            handle.abort();
        }
    }
}

/// Builder for a `Monitor`.
#[derive(Default)]
pub struct MonitorBuilder {
    backend: Option<Arc<dyn WorkflowBackend>>,
    user_ids: Option<Arc<dyn UserIdStore>>,
    app_name: Option<String>,
    options: RunOptions,
}

impl MonitorBuilder {
    /// Sets the engine backend. Required.
    pub fn backend(mut self, backend: Arc<dyn WorkflowBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets where the user id is persisted. Defaults to an in-memory store.
    pub fn user_id_store(mut self, store: Arc<dyn UserIdStore>) -> Self {
        self.user_ids = Some(store);
        self
    }

    /// Overrides the application name. Defaults to the backend's configured
    /// name, then `daedalus`.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn update_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.update_buffer_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Monitor, MonitorError> {
        let backend = self
            .backend
            .ok_or_else(|| MonitorError::Config("monitor requires a backend".into()))?;
        let app_name = self
            .app_name
            .or_else(|| backend.app_name().map(ToOwned::to_owned))
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        if app_name.trim().is_empty() {
            return Err(MonitorError::Config("app name must not be empty".into()));
        }
        if self.options.update_buffer_capacity == 0 {
            return Err(MonitorError::Config(
                "update_buffer_capacity must be greater than 0".into(),
            ));
        }
        let user_ids = self
            .user_ids
            .unwrap_or_else(|| Arc::new(MemoryUserIdStore::new()));
        Ok(Monitor {
            inner: Arc::new(MonitorInner {
                backend,
                user_ids,
                app_name,
                options: self.options,
                active: Mutex::new(None),
            }),
        })
    }
}
