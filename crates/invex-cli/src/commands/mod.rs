//! CLI subcommands.

pub mod config;
pub mod process;
pub mod profiles;

use invex_core::InvexConfig;
use std::path::Path;

/// Load configuration from the given path, or the defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvexConfig> {
    match config_path {
        Some(path) => Ok(InvexConfig::from_file(Path::new(path))?),
        None => Ok(InvexConfig::default()),
    }
}
