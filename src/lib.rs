//! sops-init — provision an age key for SOPS (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod atomic;
pub mod config;
pub mod constants;
pub mod env;
pub mod init;
pub mod input;
pub mod keygen;
pub mod keys;
pub mod policy;
