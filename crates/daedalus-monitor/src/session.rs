use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::backend::WorkflowBackend;
use crate::errors::{BackendError, MonitorError};
use crate::model::SessionInfo;

const USER_ID_PREFIX: &str = "user_";
const USER_ID_RANDOM_LEN: usize = 9;

/// Generates a `user_<random>` token.
///
/// Only needs to avoid clashing with other concurrent users in practice; it is
/// not a credential.
pub fn generate_user_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{USER_ID_PREFIX}{}", &random[..USER_ID_RANDOM_LEN])
}

/// Source of the client's persistent user id.
pub trait UserIdStore: Send + Sync {
    /// Returns the stored id, generating and persisting one if absent.
    fn load_or_create(&self) -> Result<String, MonitorError>;
}

/// Keeps the user id in a small text file so it survives restarts.
#[derive(Clone, Debug)]
pub struct FileUserIdStore {
    path: PathBuf,
}

impl FileUserIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `DAEDALUS_USER_ID_PATH`, defaulting to `.daedalus/user_id`.
    pub fn from_env() -> Self {
        let path = std::env::var("DAEDALUS_USER_ID_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| ".daedalus/user_id".to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UserIdStore for FileUserIdStore {
    fn load_or_create(&self) -> Result<String, MonitorError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if !raw.trim().is_empty() => return Ok(raw.trim().to_string()),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(MonitorError::UserId(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        }

        let user_id = generate_user_id();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MonitorError::UserId(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(&self.path, &user_id).map_err(|e| {
            MonitorError::UserId(format!("failed to write {}: {e}", self.path.display()))
        })?;
        info!(user_id = %user_id, path = %self.path.display(), "generated new user id");
        Ok(user_id)
    }
}

/// Process-local store; the id lives as long as the store.
#[derive(Debug, Default)]
pub struct MemoryUserIdStore {
    user_id: Mutex<Option<String>>,
}

impl MemoryUserIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a known id.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Mutex::new(Some(user_id.into())),
        }
    }
}

impl UserIdStore for MemoryUserIdStore {
    fn load_or_create(&self) -> Result<String, MonitorError> {
        let mut guard = self
            .user_id
            .lock()
            .map_err(|_| MonitorError::UserId("user id lock poisoned".into()))?;
        Ok(guard.get_or_insert_with(generate_user_id).clone())
    }
}

/// Session of a single run, created lazily and at most once.
pub(crate) struct RunSession {
    app_name: String,
    user_id: String,
    session_id: Option<String>,
}

impl RunSession {
    pub(crate) fn new(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: None,
        }
    }

    /// Returns the session, asking the backend for one only on first use.
    pub(crate) async fn ensure(
        &mut self,
        backend: &dyn WorkflowBackend,
    ) -> Result<SessionInfo, BackendError> {
        let session_id = match &self.session_id {
            Some(id) => id.clone(),
            None => {
                let id = backend.create_session(&self.app_name, &self.user_id).await?;
                debug!(app_name = %self.app_name, user_id = %self.user_id, session_id = %id, "session created");
                self.session_id = Some(id.clone());
                id
            }
        };
        Ok(SessionInfo {
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ByteStream;
    use crate::model::StreamRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn generated_user_id_has_prefix_and_length() {
        let id = generate_user_id();
        assert!(id.starts_with("user_"));
        assert_eq!(id.len(), USER_ID_PREFIX.len() + USER_ID_RANDOM_LEN);
        assert_ne!(id, generate_user_id());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("user_id");
        let first = FileUserIdStore::new(&path).load_or_create().expect("create");
        let second = FileUserIdStore::new(&path).load_or_create().expect("load");
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), first);
    }

    #[test]
    fn file_store_replaces_blank_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("user_id");
        std::fs::write(&path, "  \n").expect("write");
        let id = FileUserIdStore::new(&path).load_or_create().expect("create");
        assert!(id.starts_with("user_"));
    }

    #[test]
    fn memory_store_is_stable() {
        let store = MemoryUserIdStore::new();
        let id = store.load_or_create().expect("id");
        assert_eq!(store.load_or_create().expect("id"), id);
        let fixed = MemoryUserIdStore::with_user_id("user_fixed");
        assert_eq!(fixed.load_or_create().expect("id"), "user_fixed");
    }

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl WorkflowBackend for CountingBackend {
        async fn create_session(
            &self,
            _app_name: &str,
            _user_id: &str,
        ) -> Result<String, BackendError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("session-{n}"))
        }

        async fn open_stream(&self, _request: StreamRequest) -> Result<ByteStream, BackendError> {
            unreachable!("not used in this test")
        }
    }

    #[tokio::test]
    async fn run_session_creates_once() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let mut session = RunSession::new("daedalus", "user_abc");
        let first = session.ensure(&backend).await.expect("first");
        let second = session.ensure(&backend).await.expect("second");
        assert_eq!(first, second);
        assert_eq!(first.session_id, "session-0");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
