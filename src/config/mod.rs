//! Config file loading
//!
//! Discovers INI-style files under a path and merges their keys into a
//! [`ResolvedConfig`](crate::domain::ResolvedConfig) without overriding
//! anything a higher-precedence channel already set.

pub mod ini;
pub mod loader;

pub use loader::{normalize_extension, ConfigFileLoader, LoadReport, DEFAULT_EXTENSIONS};
