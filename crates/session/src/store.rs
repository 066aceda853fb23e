//! Session store
//!
//! Maps session IDs to token records. Each record sits behind its own tokio
//! Mutex, so a refresh holds only that session: concurrent readers of the
//! same session wait for the in-flight refresh and see its result, while
//! other sessions are unaffected.
//!
//! When a path is configured the store is persisted as a JSON map of
//! session ID to record. All writes use atomic temp-file + rename and are
//! serialized by a separate Mutex over the persisted view.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use adapter::{AdapterError, Session, SessionError, SessionSource};
use identity::{OidcClient, TokenResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::now_millis;
use crate::state::{TokenAction, TokenEvent, TokenState, handle_event};

/// Access tokens this close to expiry are refreshed on read.
pub const DEFAULT_REFRESH_LEEWAY: Duration = Duration::from_secs(60);

/// One session's token set.
///
/// `expires_at` and `created_at` are unix timestamps in milliseconds.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: u64,
    pub state: TokenState,
    pub created_at: u64,
}

impl SessionRecord {
    /// Record for a freshly exchanged token set.
    pub fn from_tokens(tokens: TokenResponse, now: u64) -> Self {
        Self {
            expires_at: tokens.expires_at_millis(now),
            access_token: Some(tokens.access_token),
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            state: TokenState::Valid,
            created_at: now,
        }
    }

    /// Apply a refresh response. Tokens the server did not reissue (id
    /// token, unrotated refresh token) are kept.
    fn apply_refresh(&mut self, tokens: TokenResponse, now: u64) {
        self.expires_at = tokens.expires_at_millis(now);
        self.access_token = Some(tokens.access_token);
        if tokens.id_token.is_some() {
            self.id_token = tokens.id_token;
        }
        if tokens.refresh_token.is_some() {
            self.refresh_token = tokens.refresh_token;
        }
    }

    /// Read model handed to adapters.
    pub fn snapshot(&self) -> Session {
        Session {
            access_token: self.access_token.clone(),
            id_token: self.id_token.clone(),
            expires_at: self.expires_at,
            error: (self.state == TokenState::Errored).then_some(SessionError::RefreshTokenError),
        }
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("state", &self.state)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

pub struct SessionStore {
    path: Option<PathBuf>,
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionRecord>>>>,
    persisted: Mutex<HashMap<String, SessionRecord>>,
    oidc: Arc<OidcClient>,
    leeway: Duration,
}

impl SessionStore {
    /// Store without persistence; sessions end with the process.
    pub fn in_memory(oidc: Arc<OidcClient>) -> Self {
        Self::from_records(None, HashMap::new(), oidc)
    }

    /// Load sessions from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}`. Records caught
    /// mid-refresh by a restart are reset to `Expired` so the next read
    /// retries them.
    pub async fn load(path: PathBuf, oidc: Arc<OidcClient>) -> Result<Self> {
        let records = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let mut records: HashMap<String, SessionRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing session file: {e}")))?;
            for record in records.values_mut() {
                if record.state == TokenState::Refreshing {
                    record.state = TokenState::Expired;
                }
            }
            info!(path = %path.display(), sessions = records.len(), "loaded sessions");
            records
        } else {
            info!(path = %path.display(), "session file not found, starting with empty store");
            let records = HashMap::new();
            write_atomic(&path, &records).await?;
            records
        };

        Ok(Self::from_records(Some(path), records, oidc))
    }

    fn from_records(
        path: Option<PathBuf>,
        records: HashMap<String, SessionRecord>,
        oidc: Arc<OidcClient>,
    ) -> Self {
        let sessions = records
            .iter()
            .map(|(id, record)| (id.clone(), Arc::new(Mutex::new(record.clone()))))
            .collect();
        Self {
            path,
            sessions: RwLock::new(sessions),
            persisted: Mutex::new(records),
            oidc,
            leeway: DEFAULT_REFRESH_LEEWAY,
        }
    }

    /// Override how close to expiry a read triggers a refresh.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Start a session from a code-exchange response. Returns the new
    /// session ID.
    pub async fn create(&self, tokens: TokenResponse) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let record = SessionRecord::from_tokens(tokens, now_millis());

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(record.clone())));
        self.persist(&id, Some(&record)).await?;

        info!(session_id = %id, "session created");
        Ok(id)
    }

    /// Current session snapshot, refreshing the access token first if it is
    /// inside the leeway. Returns `None` for unknown IDs.
    ///
    /// Refresh failures are logged and reflected in the snapshot's error
    /// flag; they are never returned.
    pub async fn session(&self, id: &str) -> Option<Session> {
        let entry = self.entry(id).await?;
        let mut record = entry.lock().await;
        self.ensure_fresh(id, &mut record, self.leeway).await;
        Some(record.snapshot())
    }

    /// Refresh `id` if its access token expires within `threshold`. Used by
    /// the background task. Returns the resulting state.
    pub async fn refresh_if_expiring(&self, id: &str, threshold: Duration) -> Option<TokenState> {
        let entry = self.entry(id).await?;
        let mut record = entry.lock().await;
        Some(self.ensure_fresh(id, &mut record, threshold).await)
    }

    /// State of a session without triggering a refresh.
    pub async fn state(&self, id: &str) -> Option<TokenState> {
        let entry = self.entry(id).await?;
        let record = entry.lock().await;
        Some(record.state)
    }

    /// Remove a session. Returns whether it existed.
    pub async fn sign_out(&self, id: &str) -> Result<bool> {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            self.persist(id, None).await?;
            info!(session_id = %id, "session removed");
        }
        Ok(removed)
    }

    /// All session IDs.
    pub async fn ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Session counts per state label. Sessions locked by an in-flight
    /// refresh are counted as refreshing rather than waited on.
    pub async fn state_counts(&self) -> HashMap<&'static str, usize> {
        let entries: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut counts = HashMap::new();
        for entry in entries {
            let label = match entry.try_lock() {
                Ok(record) => record.state.label(),
                Err(_) => TokenState::Refreshing.label(),
            };
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Session handle for adapters.
    pub fn handle(self: &Arc<Self>, id: impl Into<String>) -> StoreSession {
        StoreSession {
            store: self.clone(),
            id: id.into(),
        }
    }

    async fn entry(&self, id: &str) -> Option<Arc<Mutex<SessionRecord>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drive the state machine for one record, performing at most one
    /// refresh request. Caller holds the record lock.
    async fn ensure_fresh(
        &self,
        id: &str,
        record: &mut SessionRecord,
        threshold: Duration,
    ) -> TokenState {
        // No refresh is in flight while we hold the lock, so a Refreshing
        // record is left over from an interrupted one
        if record.state == TokenState::Refreshing {
            record.state = TokenState::Expired;
        }

        let now = now_millis();
        let expired = record.expires_at <= now.saturating_add(threshold.as_millis() as u64);
        let (state, action) = handle_event(record.state, TokenEvent::Observed { expired });
        record.state = state;
        if action != TokenAction::BeginRefresh {
            return record.state;
        }

        // The in-flight state stays local: if this future is dropped at the
        // await below, the record is left Expired and the next read retries.
        let (in_flight, _) = handle_event(record.state, TokenEvent::RefreshStarted);
        debug!(session_id = %id, "access token expiring, refreshing");

        let outcome = match record.refresh_token.as_deref() {
            Some(refresh) => self.oidc.refresh(refresh).await.map_err(|e| e.to_string()),
            None => Err("session has no refresh token".to_string()),
        };

        let event = match outcome {
            Ok(tokens) => {
                record.apply_refresh(tokens, now_millis());
                metrics::counter!("session_refresh_total", "outcome" => "success").increment(1);
                info!(session_id = %id, "session token refreshed");
                TokenEvent::RefreshSucceeded
            }
            Err(error) => {
                metrics::counter!("session_refresh_total", "outcome" => "failure").increment(1);
                warn!(session_id = %id, %error, "session refresh failed, sign-in required");
                TokenEvent::RefreshFailed
            }
        };

        let (state, action) = handle_event(in_flight, event);
        record.state = state;
        if action == TokenAction::Persist {
            if let Err(e) = self.persist_if_live(id, record).await {
                warn!(session_id = %id, error = %e, "failed to persist session");
            }
        }
        record.state
    }

    async fn persist(&self, id: &str, record: Option<&SessionRecord>) -> Result<()> {
        let mut persisted = self.persisted.lock().await;
        match record {
            Some(record) => {
                persisted.insert(id.to_owned(), record.clone());
            }
            None => {
                persisted.remove(id);
            }
        }
        match &self.path {
            Some(path) => write_atomic(path, &persisted).await,
            None => Ok(()),
        }
    }

    /// Persist a refreshed record unless the session was signed out while
    /// the refresh was in flight. The liveness check runs under the persist
    /// lock so it cannot interleave with a sign-out's removal.
    async fn persist_if_live(&self, id: &str, record: &SessionRecord) -> Result<()> {
        let mut persisted = self.persisted.lock().await;
        if !self.sessions.read().await.contains_key(id) {
            debug!(session_id = %id, "session signed out during refresh, not persisting");
            return Ok(());
        }
        persisted.insert(id.to_owned(), record.clone());
        match &self.path {
            Some(path) => write_atomic(path, &persisted).await,
            None => Ok(()),
        }
    }
}

/// A single session in the store, as seen by an adapter.
#[derive(Clone)]
pub struct StoreSession {
    store: Arc<SessionStore>,
    id: String,
}

impl SessionSource for StoreSession {
    fn current(&self) -> Pin<Box<dyn Future<Output = Option<Session>> + Send + '_>> {
        Box::pin(self.store.session(&self.id))
    }

    fn sign_out(&self) -> Pin<Box<dyn Future<Output = adapter::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.store
                .sign_out(&self.id)
                .await
                .map(|_| ())
                .map_err(|e| AdapterError::Session(e.to_string()))
        })
    }
}

/// Write sessions to a file atomically.
///
/// Writes a temporary file in the same directory, then renames it over the
/// target. Permissions are 0600 since the file holds refresh tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, SessionRecord>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Parse(format!("serializing sessions: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".sessions.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), sessions = data.len(), "persisted sessions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{start_token_server, tokens};
    use adapter::{AuthAdapter, SessionAdapter};

    #[tokio::test]
    async fn fresh_session_served_without_refresh() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 3600)).await.unwrap();

        let session = store.session(&id).await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at_initial"));
        assert_eq!(session.id_token.as_deref(), Some("id_initial"));
        assert!(session.error.is_none());
        assert_eq!(server.calls(), 0);
        assert_eq!(store.state(&id).await, Some(TokenState::Valid));
    }

    #[tokio::test]
    async fn unknown_session_is_none() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        assert!(store.session("nope").await.is_none());
        assert!(store.state("nope").await.is_none());
    }

    #[tokio::test]
    async fn expiring_session_refreshes_and_rotates() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 0)).await.unwrap();

        let session = store.session(&id).await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at_1"));
        assert_eq!(session.id_token.as_deref(), Some("id_1"));
        assert!(session.expires_at > now_millis());
        assert_eq!(server.calls(), 1);

        // Now valid for an hour: no further refresh
        store.session(&id).await.unwrap();
        assert_eq!(server.calls(), 1);
        assert_eq!(store.state(&id).await, Some(TokenState::Valid));
    }

    #[tokio::test]
    async fn unrotated_refresh_token_is_kept() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client()).with_leeway(Duration::from_secs(7200));
        let id = store.create(tokens(Some("rt_keep"), 0)).await.unwrap();

        // Leeway longer than the token lifetime: every read refreshes
        let first = store.session(&id).await.unwrap();
        let second = store.session(&id).await.unwrap();
        assert_eq!(first.access_token.as_deref(), Some("at_1"));
        assert_eq!(second.access_token.as_deref(), Some("at_2"));
        // id token not reissued: the original one stays
        assert_eq!(second.id_token.as_deref(), Some("id_initial"));
    }

    #[tokio::test]
    async fn rejected_refresh_is_terminal() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_revoked"), 0)).await.unwrap();

        let session = store.session(&id).await.unwrap();
        assert_eq!(session.error, Some(SessionError::RefreshTokenError));
        assert_eq!(session.access_token.as_deref(), Some("at_initial"));
        assert_eq!(session.bearer_token(), None);
        assert_eq!(store.state(&id).await, Some(TokenState::Errored));

        // No retry on later reads
        store.session(&id).await.unwrap();
        store.session(&id).await.unwrap();
        assert_eq!(server.calls(), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_errors_without_network() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(None, 0)).await.unwrap();

        let session = store.session(&id).await.unwrap();
        assert_eq!(session.error, Some(SessionError::RefreshTokenError));
        assert_eq!(server.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_refresh() {
        let server = start_token_server().await;
        let store = Arc::new(SessionStore::in_memory(server.client()));
        let id = store.create(tokens(Some("rt_good"), 0)).await.unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { store.session(&id).await }));
        }

        for h in handles {
            let session = h.await.unwrap().unwrap();
            assert_eq!(session.access_token.as_deref(), Some("at_1"));
        }
        assert_eq!(server.calls(), 1);
    }

    #[tokio::test]
    async fn cancelled_refresh_leaves_session_retryable() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 0)).await.unwrap();

        // Token endpoint answers after 50ms; the reader gives up first
        let cancelled = tokio::time::timeout(Duration::from_millis(10), store.session(&id)).await;
        assert!(cancelled.is_err());
        assert_eq!(store.state(&id).await, Some(TokenState::Expired));

        let session = store.session(&id).await.unwrap();
        let access = session.access_token.as_deref().unwrap();
        assert!(access.starts_with("at_") && access != "at_initial");
        assert!(session.error.is_none());
        assert!(session.expires_at > now_millis());
        assert_eq!(store.state(&id).await, Some(TokenState::Valid));
    }

    #[tokio::test]
    async fn background_refresh_recovers_cancelled_read() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 0)).await.unwrap();

        let _ = tokio::time::timeout(Duration::from_millis(10), store.session(&id)).await;

        let state = store
            .refresh_if_expiring(&id, Duration::from_secs(900))
            .await;
        assert_eq!(state, Some(TokenState::Valid));
        let session = store.session(&id).await.unwrap();
        assert_ne!(session.access_token.as_deref(), Some("at_initial"));
    }

    #[tokio::test]
    async fn refresh_if_expiring_respects_threshold() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 600)).await.unwrap();

        // 10 minutes left, 5 minute threshold: nothing to do
        let state = store
            .refresh_if_expiring(&id, Duration::from_secs(300))
            .await;
        assert_eq!(state, Some(TokenState::Valid));
        assert_eq!(server.calls(), 0);

        // 15 minute threshold: refresh
        let state = store
            .refresh_if_expiring(&id, Duration::from_secs(900))
            .await;
        assert_eq!(state, Some(TokenState::Valid));
        assert_eq!(server.calls(), 1);
    }

    #[tokio::test]
    async fn sign_out_removes_session() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 3600)).await.unwrap();
        assert_eq!(store.len().await, 1);

        assert!(store.sign_out(&id).await.unwrap());
        assert!(!store.sign_out(&id).await.unwrap());
        assert!(store.session(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn state_counts_by_label() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        store.create(tokens(Some("rt_good"), 3600)).await.unwrap();
        let bad = store.create(tokens(None, 0)).await.unwrap();
        store.session(&bad).await;

        let counts = store.state_counts().await;
        assert_eq!(counts.get("valid"), Some(&1));
        assert_eq!(counts.get("errored"), Some(&1));
    }

    #[tokio::test]
    async fn persisted_sessions_survive_reload() {
        let server = start_token_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = SessionStore::load(path.clone(), server.client()).await.unwrap();
        let kept = store.create(tokens(Some("rt_good"), 3600)).await.unwrap();
        let gone = store.create(tokens(Some("rt_good"), 3600)).await.unwrap();
        store.sign_out(&gone).await.unwrap();

        let reloaded = SessionStore::load(path, server.client()).await.unwrap();
        assert_eq!(reloaded.ids().await, vec![kept.clone()]);
        let session = reloaded.session(&kept).await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at_initial"));
    }

    #[tokio::test]
    async fn refreshed_tokens_are_persisted() {
        let server = start_token_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = SessionStore::load(path.clone(), server.client()).await.unwrap();
        let id = store.create(tokens(Some("rt_good"), 0)).await.unwrap();
        store.session(&id).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let on_disk: HashMap<String, SessionRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(on_disk[&id].access_token.as_deref(), Some("at_1"));
        assert_eq!(on_disk[&id].refresh_token.as_deref(), Some("rt_good_1"));
        assert_eq!(on_disk[&id].state, TokenState::Valid);
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let server = start_token_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        assert!(!path.exists());
        let store = SessionStore::load(path.clone(), server.client()).await.unwrap();
        assert!(store.is_empty().await);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, SessionRecord> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn interrupted_refresh_resets_to_expired() {
        let server = start_token_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let contents = serde_json::json!({
            "s1": {
                "access_token": "at",
                "refresh_token": "rt_good",
                "expires_at": 4102444800000u64,
                "state": "refreshing",
                "created_at": 0,
            }
        });
        std::fs::write(&path, contents.to_string()).unwrap();

        let store = SessionStore::load(path, server.client()).await.unwrap();
        assert_eq!(store.state("s1").await, Some(TokenState::Expired));
    }

    #[tokio::test]
    async fn corrupt_file_is_parse_error() {
        let server = start_token_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = SessionStore::load(path, server.client()).await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_file_is_0600() {
        use std::os::unix::fs::PermissionsExt;

        let server = start_token_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let store = SessionStore::load(path.clone(), server.client()).await.unwrap();
        store.create(tokens(Some("rt_good"), 3600)).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "session file must be 0600, got {mode:o}");
    }

    #[test]
    fn record_debug_hides_tokens() {
        let record = SessionRecord::from_tokens(tokens(Some("rt_secret"), 60), 0);
        let debug = format!("{record:?}");
        assert!(!debug.contains("rt_secret"));
        assert!(!debug.contains("at_initial"));
        assert!(debug.contains("Valid"));
    }

    #[tokio::test]
    async fn adapter_reads_through_store_handle() {
        let server = start_token_server().await;
        let store = Arc::new(SessionStore::in_memory(server.client()));
        let id = store.create(tokens(Some("rt_good"), 0)).await.unwrap();

        let adapter = SessionAdapter::new("okta", Arc::new(store.handle(&id)));
        assert_eq!(adapter.get_token().await.as_deref(), Some("at_1"));

        adapter.sign_out().await;
        assert_eq!(adapter.get_token().await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn adapter_sees_refresh_failure_as_no_token() {
        let server = start_token_server().await;
        let store = Arc::new(SessionStore::in_memory(server.client()));
        let id = store.create(tokens(Some("rt_revoked"), 0)).await.unwrap();

        let adapter = SessionAdapter::new("okta", Arc::new(store.handle(id)));
        assert_eq!(adapter.get_token().await, None);
    }
}
