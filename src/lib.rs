//! vaultkenv - run a command with environment variables fetched from Vault.
//!
//! This library implements the launch sequence: exchange the pod's
//! service-account token for a Vault token, read a KV v2 secret, and hand
//! its string fields to the command as environment variables.

pub mod config;
pub mod error;
pub mod exec;
pub mod identity;
pub mod logging;
pub mod secrets;
pub mod session;
