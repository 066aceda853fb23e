//! Shared types for the auth gateway workspace
//!
//! `Secret` keeps bearer tokens and client credentials out of logs; the
//! config `Error` is shared by every crate that reads settings from disk.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{Secret, load_secret};
