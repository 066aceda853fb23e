//! Proactive background token refresh
//!
//! Spawns a periodic task that refreshes sessions whose access token is
//! approaching expiry, so most reads never pay refresh latency. Each session
//! still gets a single attempt: a failure leaves it `Errored` and later
//! cycles skip it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::state::TokenState;
use crate::store::SessionStore;

/// Spawn a background task that proactively refreshes expiring sessions.
///
/// Runs every `interval` and refreshes any session expiring within
/// `threshold`. Returns a `JoinHandle` for the spawned task.
pub fn spawn_refresh_task(
    store: Arc<SessionStore>,
    interval: Duration,
    threshold: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick; sessions were just loaded
        ticker.tick().await;

        loop {
            ticker.tick().await;
            refresh_cycle(&store, threshold).await;
        }
    })
}

/// Run one refresh cycle over every session. Returns how many sessions ended
/// the cycle errored.
async fn refresh_cycle(store: &SessionStore, threshold: Duration) -> usize {
    let ids = store.ids().await;
    let mut errored = 0;

    for id in &ids {
        match store.refresh_if_expiring(id, threshold).await {
            Some(TokenState::Errored) => errored += 1,
            Some(_) => {}
            // Signed out since the ID list was taken
            None => continue,
        }
    }

    debug!(sessions = ids.len(), errored, "refresh cycle complete");
    if errored > 0 {
        info!(errored, "sessions awaiting interactive sign-in");
    }
    errored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{start_token_server, tokens};

    #[tokio::test]
    async fn cycle_skips_valid_sessions() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 3600)).await.unwrap();

        let errored = refresh_cycle(&store, Duration::from_secs(900)).await;

        assert_eq!(errored, 0);
        assert_eq!(server.calls(), 0);
        let session = store.session(&id).await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at_initial"));
    }

    #[tokio::test]
    async fn cycle_refreshes_expiring_sessions() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        let id = store.create(tokens(Some("rt_good"), 300)).await.unwrap();

        refresh_cycle(&store, Duration::from_secs(900)).await;

        assert_eq!(server.calls(), 1);
        assert_eq!(store.state(&id).await, Some(TokenState::Valid));
        let session = store.session(&id).await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at_1"));
    }

    #[tokio::test]
    async fn failed_sessions_are_not_retried() {
        let server = start_token_server().await;
        let store = SessionStore::in_memory(server.client());
        store.create(tokens(Some("rt_revoked"), 300)).await.unwrap();

        assert_eq!(refresh_cycle(&store, Duration::from_secs(900)).await, 1);
        assert_eq!(refresh_cycle(&store, Duration::from_secs(900)).await, 1);
        assert_eq!(server.calls(), 1);
    }

    #[tokio::test]
    async fn spawned_task_refreshes_on_tick() {
        let server = start_token_server().await;
        let store = Arc::new(SessionStore::in_memory(server.client()));
        let id = store.create(tokens(Some("rt_good"), 300)).await.unwrap();

        let handle = spawn_refresh_task(
            store.clone(),
            Duration::from_millis(20),
            Duration::from_secs(900),
        );

        // First tick is skipped; give the second one time to run the refresh
        for _ in 0..50 {
            if server.calls() > 0 && store.state(&id).await == Some(TokenState::Valid) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert_eq!(server.calls(), 1);
        let session = store.session(&id).await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at_1"));
    }
}
