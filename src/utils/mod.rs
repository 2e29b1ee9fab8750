//! Shared helpers.
//!
//! Environment variable handling used by the configuration loaders.

pub mod env;

pub use env::get_env_with_prefix;
