//! `chipgen init` — write a template configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chipgen_core::config::CONFIG_FILE_NAME;
use chipgen_core::ChipConfig;

/// Create `chipgen.toml` in `dir`, creating the directory if needed.
pub fn run(dir: &Path) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!("'{}' already exists", config_path.display());
    }

    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    fs::write(&config_path, ChipConfig::template())
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!("  edit `chips` and point [database] at a libopencm3 checkout, then run `chipgen generate`");

    Ok(())
}
