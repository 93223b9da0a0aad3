//! `chipgen.toml` parsing, validation, and discovery.
//!
//! Only the `chips` list is essential; every section has defaults matching a
//! libopencm3 checkout next to the configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chip::ChipId;
use crate::error::{ChipError, Result};

/// File name searched for by [`ChipConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "chipgen.toml";

/// The top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChipConfig {
    /// Chip identifiers, in output order. A missing key means no chips.
    #[serde(default)]
    pub chips: Vec<String>,
    /// How to query the device database.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Where and how to write the generated table.
    #[serde(default)]
    pub output: OutputConfig,
    /// Resolution tuning.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Where this configuration was read from, for error messages.
    #[serde(skip)]
    pub origin: Option<String>,
}

/// Device database query tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    /// Program to run (looked up on `PATH` unless it contains a path separator).
    #[serde(default = "default_program")]
    pub program: String,
    /// Script passed as the first argument. An empty path calls `program` directly.
    #[serde(default = "default_script")]
    pub script: PathBuf,
    /// Device database file.
    #[serde(default = "default_data")]
    pub data: PathBuf,
    /// Upper bound for a single query, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Output document settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the generated Zig file.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    /// Handling of values that are unsafe inside a string literal.
    #[serde(default)]
    pub literals: LiteralPolicy,
    /// Indent width of record blocks inside the table literal.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

/// Resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Number of chips resolved concurrently.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Memoize (chip, field) lookups for the duration of one run.
    #[serde(default)]
    pub cache: bool,
}

/// How values containing quote, backslash, or control characters are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiteralPolicy {
    /// Fail the run, naming the offending chip and field.
    #[default]
    Reject,
    /// Apply Zig string escapes.
    Escape,
    /// Insert the value unchanged and log a warning.
    Verbatim,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_script() -> PathBuf {
    PathBuf::from("libopencm3/scripts/genlink.py")
}

fn default_data() -> PathBuf {
    PathBuf::from("libopencm3/ld/devices.data")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_output_path() -> PathBuf {
    PathBuf::from("devices.zig")
}

fn default_indent() -> usize {
    4
}

fn default_jobs() -> usize {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            program: default_program(),
            script: default_script(),
            data: default_data(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: default_output_path(),
            literals: LiteralPolicy::default(),
            indent: default_indent(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            jobs: default_jobs(),
            cache: false,
        }
    }
}

impl ChipConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ChipError::config(
                path.display().to_string(),
                "file not found",
            ));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate a configuration from a TOML string.
    ///
    /// `origin` names the source in error messages.
    pub fn parse(toml_str: &str, origin: &str) -> Result<Self> {
        let mut config: ChipConfig =
            toml::from_str(toml_str).map_err(|e| ChipError::config(origin, e.to_string()))?;
        config.validate(origin)?;
        config.origin = Some(origin.to_string());
        Ok(config)
    }

    /// Search upward from `start_dir` for `chipgen.toml`, returning the parsed
    /// configuration and the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Check structural constraints serde cannot express.
    pub fn validate(&self, origin: &str) -> Result<()> {
        for (index, chip) in self.chips.iter().enumerate() {
            if chip.trim().is_empty() {
                return Err(ChipError::config(
                    origin,
                    format!("chips[{index}] is an empty identifier"),
                ));
            }
        }
        if self.resolver.jobs == 0 {
            return Err(ChipError::config(origin, "resolver.jobs must be at least 1"));
        }
        if self.output.indent == 0 {
            return Err(ChipError::config(origin, "output.indent must be at least 1"));
        }
        if self.database.timeout_secs == 0 {
            return Err(ChipError::config(
                origin,
                "database.timeout-secs must be at least 1",
            ));
        }
        Ok(())
    }

    /// The file or source this configuration came from.
    pub fn origin(&self) -> &str {
        self.origin.as_deref().unwrap_or("<configuration>")
    }

    /// The configured chips as identifiers, in configuration order.
    pub fn chip_ids(&self) -> Result<Vec<ChipId>> {
        self.chips
            .iter()
            .enumerate()
            .map(|(index, chip)| {
                ChipId::new(chip.as_str()).ok_or_else(|| {
                    ChipError::config(
                        self.origin(),
                        format!("chips[{index}] is an empty identifier"),
                    )
                })
            })
            .collect()
    }

    /// Generate the default template for `chipgen init`.
    pub fn template() -> String {
        r#"# Chips to include in the generated table, in order.
chips = ["stm32f103c8", "stm32f407vg"]

[database]
program = "python"
script = "libopencm3/scripts/genlink.py"
data = "libopencm3/ld/devices.data"
timeout-secs = 30

[output]
path = "devices.zig"
literals = "reject"
"#
        .to_string()
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
