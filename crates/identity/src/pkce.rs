//! PKCE (Proof Key for Code Exchange) per RFC 7636, plus the opaque `state`
//! value that ties a callback to the sign-in that started it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Random PKCE code verifier.
///
/// 64 random bytes, URL-safe base64 without padding (86 characters, inside
/// the 43-128 range RFC 7636 allows).
pub fn generate_verifier() -> String {
    random_token::<64>()
}

/// S256 challenge: `BASE64URL(SHA256(verifier))`.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random CSRF `state` for the authorization request (32 bytes).
pub fn generate_state() -> String {
    random_token::<32>()
}

fn random_token<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}
