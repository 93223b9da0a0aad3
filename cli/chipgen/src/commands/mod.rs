//! CLI command implementations.

pub mod doctor;
pub mod generate;
pub mod init;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chipgen_core::ChipConfig;

/// Load the configuration from `explicit` or by searching upward from `cwd`.
///
/// Returns the configuration and the directory relative paths resolve against.
pub fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<(ChipConfig, PathBuf)> {
    if let Some(path) = explicit {
        let path = chipgen_core::config::resolve_path(cwd, path);
        let config =
            ChipConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        return Ok((config, base_dir));
    }
    match ChipConfig::find_and_load(cwd)? {
        Some(found) => Ok(found),
        None => anyhow::bail!(
            "no {} found (run `chipgen init` first)",
            chipgen_core::config::CONFIG_FILE_NAME
        ),
    }
}
