//! Layered configuration for triage runs.
//!
//! 1. Defaults (from code)
//! 2. Config file (`quake-triage.toml`, or an explicit path)
//! 3. Environment variables (`QUAKE_TRIAGE_*`, `__` for nesting)
//!
//! ```no_run
//! use quake_triage::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_default()?;
//! let tuned = ConfigLoader::new().with_file("./quake-triage.toml").load()?;
//! # Ok::<(), quake_triage::config::ConfigError>(())
//! ```

pub mod error;
pub mod loader;
pub mod validator;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, EngineConfig, GazetteerConfig, TriageConfig};
pub use validator::SchemaValidator;
