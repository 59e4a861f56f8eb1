//! Configuration loading and management.
//!
//! The engine consumes a parsed settings object; the file format is a thin
//! TOML layer over it. Globals (root directory, auto-login list) live at
//! the top level, each network is a `[[network]]` block.

mod types;

pub use types::{Config, ConfigError, LoginType, NetworkConfig};
