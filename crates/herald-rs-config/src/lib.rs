//! Configuration models and loading for the Herald gateway.
//!
//! The gateway reads its configuration once at startup (JSON5 file plus an
//! environment overlay), validates it, and hands an immutable value to the
//! router. Nothing in the request path consults the environment.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Environment variable names understood by the overlay.
pub use loader::env_keys;
/// Configuration schema models.
pub use model::*;
