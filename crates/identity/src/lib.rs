//! Identity provider wire clients
//!
//! Speaks the two provider protocols the gateway supports:
//!
//! - OIDC authorization-code flow with PKCE plus the refresh-token grant
//!   (`oidc::OidcClient`, used for Okta)
//! - Clerk's backend API for minting and revoking session tokens
//!   (`clerk::ClerkClient`)
//!
//! Sign-in flow for OIDC:
//! 1. `pkce::generate_verifier()` + `pkce::compute_challenge()` + `pkce::generate_state()`
//! 2. Browser is sent to `OidcClient::authorization_url()`
//! 3. Callback code goes to `OidcClient::exchange_code()`
//! 4. The session provider stores the `TokenResponse` and later calls
//!    `OidcClient::refresh()` when the access token expires

pub mod clerk;
pub mod error;
pub mod oidc;
pub mod pkce;

pub use clerk::ClerkClient;
pub use error::{Error, Result};
pub use oidc::{OidcClient, OidcConfig, TokenResponse};
pub use pkce::{compute_challenge, generate_state, generate_verifier};
