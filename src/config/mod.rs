//! Configuration resolution.
//!
//! Resolves the key store location and the key utility to invoke from
//! the environment. There is no config file; every input is an
//! environment variable or a built-in default.

pub mod loader;

pub use loader::{ConfigError, Settings};
