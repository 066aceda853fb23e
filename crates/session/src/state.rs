//! Token state machine
//!
//! Pure function: receives events, returns (new_state, action). The session
//! store executes the I/O implied by each action (refresh request, persist).
//!
//! Transitions:
//! - Valid → Expired (access token inside the refresh leeway)
//! - Expired → Refreshing (refresh request sent)
//! - Refreshing → Valid (new tokens applied)
//! - Refreshing → Errored (refresh rejected, failed, or impossible)
//! - Errored is terminal; only a new sign-in creates a usable session

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Access token present and outside the refresh leeway
    Valid,
    /// Access token expired or about to; a refresh is due
    Expired,
    /// Refresh request in flight
    Refreshing,
    /// Silent refresh failed; surfaced to readers as `RefreshTokenError`
    Errored,
}

impl TokenState {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TokenState::Valid => "valid",
            TokenState::Expired => "expired",
            TokenState::Refreshing => "refreshing",
            TokenState::Errored => "errored",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    /// A reader looked at the session; `expired` compares expiry with now
    Observed { expired: bool },
    RefreshStarted,
    RefreshSucceeded,
    RefreshFailed,
}

/// What the caller should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// Send a refresh request (after recording `RefreshStarted`)
    BeginRefresh,
    /// Write the updated record to the store
    Persist,
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: TokenState, event: TokenEvent) -> (TokenState, TokenAction) {
    match (state, event) {
        // --- Errored: terminal ---
        (TokenState::Errored, _) => (TokenState::Errored, TokenAction::None),

        // --- Valid ---
        (TokenState::Valid, TokenEvent::Observed { expired: false }) => {
            (TokenState::Valid, TokenAction::None)
        }
        (TokenState::Valid, TokenEvent::Observed { expired: true }) => {
            (TokenState::Expired, TokenAction::BeginRefresh)
        }

        // --- Expired ---
        (TokenState::Expired, TokenEvent::Observed { .. }) => {
            (TokenState::Expired, TokenAction::BeginRefresh)
        }
        (TokenState::Expired, TokenEvent::RefreshStarted) => {
            (TokenState::Refreshing, TokenAction::None)
        }

        // --- Refreshing ---
        (TokenState::Refreshing, TokenEvent::RefreshSucceeded) => {
            (TokenState::Valid, TokenAction::Persist)
        }
        (TokenState::Refreshing, TokenEvent::RefreshFailed) => {
            (TokenState::Errored, TokenAction::Persist)
        }

        // Anything else leaves the state untouched
        (state, _) => (state, TokenAction::None),
    }
}
