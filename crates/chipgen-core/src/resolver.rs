//! Attribute resolution against the device database.
//!
//! [`GenlinkResolver`] runs the database query tool once per (chip, field)
//! pair. [`CachingResolver`] optionally memoizes lookups for one run.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use crate::chip::{AttributeField, ChipId};
use crate::config::{resolve_path, DatabaseConfig};
use crate::error::{ChipError, Result};
use crate::process::wait_with_timeout;

/// Looks up a single attribute of a single chip.
pub trait AttributeResolver: Sync {
    /// Resolve `field` for `chip`, returning the trimmed value.
    fn resolve(&self, chip: &ChipId, field: AttributeField) -> Result<String>;
}

impl<R: AttributeResolver + ?Sized> AttributeResolver for &R {
    fn resolve(&self, chip: &ChipId, field: AttributeField) -> Result<String> {
        (**self).resolve(chip, field)
    }
}

/// Resolves attributes by running libopencm3's `genlink.py` (or a compatible tool).
///
/// Invocation: `<program> [<script>] <database> <chip> <field>`.
#[derive(Debug, Clone)]
pub struct GenlinkResolver {
    program: OsString,
    script: Option<PathBuf>,
    database: PathBuf,
    timeout: Duration,
}

impl GenlinkResolver {
    /// Create a resolver that runs `program` directly with the database path.
    pub fn new(program: impl Into<OsString>, database: impl Into<PathBuf>) -> Self {
        GenlinkResolver {
            program: program.into(),
            script: None,
            database: database.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build a resolver from configuration, resolving relative paths against `base_dir`.
    pub fn from_config(config: &DatabaseConfig, base_dir: &Path) -> Self {
        let program = if config.program.contains(std::path::is_separator) {
            resolve_path(base_dir, Path::new(&config.program)).into_os_string()
        } else {
            OsString::from(&config.program)
        };
        let script = if config.script.as_os_str().is_empty() {
            None
        } else {
            Some(resolve_path(base_dir, &config.script))
        };
        GenlinkResolver {
            program,
            script,
            database: resolve_path(base_dir, &config.data),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Pass `script` as the first argument to the program.
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Bound each query by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program that is invoked.
    pub fn program(&self) -> &OsString {
        &self.program
    }

    /// The script argument, if any.
    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    /// The device database file.
    pub fn database(&self) -> &Path {
        &self.database
    }

    /// The per-query timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, chip: &ChipId, field: AttributeField) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(script) = &self.script {
            cmd.arg(script);
        }
        cmd.arg(&self.database)
            .arg(chip.as_str())
            .arg(field.name())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl AttributeResolver for GenlinkResolver {
    fn resolve(&self, chip: &ChipId, field: AttributeField) -> Result<String> {
        let fail = |diagnostic: String| ChipError::Resolution {
            chip: chip.to_string(),
            field: field.name().into(),
            diagnostic,
        };

        tracing::debug!(%chip, %field, "querying device database");

        let child = self.command(chip, field).spawn().map_err(|e| {
            fail(format!(
                "failed to launch {}: {e}",
                Path::new(&self.program).display()
            ))
        })?;

        let output = wait_with_timeout(child, self.timeout)
            .map_err(|e| fail(format!("failed waiting for database tool: {e}")))?
            .ok_or_else(|| fail(format!("timed out after {} ms", self.timeout.as_millis())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diagnostic = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                format!("database tool exited with {}", output.status)
            };
            return Err(fail(diagnostic));
        }

        let value = String::from_utf8(output.stdout)
            .map_err(|_| fail("database tool produced non-UTF-8 output".into()))?;
        Ok(value.trim().to_string())
    }
}

/// Memoizes successful lookups of an inner resolver for the lifetime of the wrapper.
///
/// Failures are not cached; a failed lookup aborts the run anyway.
pub struct CachingResolver<R> {
    inner: R,
    cache: Mutex<HashMap<(ChipId, AttributeField), String>>,
}

impl<R: AttributeResolver> CachingResolver<R> {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: R) -> Self {
        CachingResolver {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached (chip, field) entries.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: AttributeResolver> AttributeResolver for CachingResolver<R> {
    fn resolve(&self, chip: &ChipId, field: AttributeField) -> Result<String> {
        let key = (chip.clone(), field);
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            tracing::trace!(%chip, %field, "cache hit");
            return Ok(hit);
        }

        // Lock is not held across the query so concurrent workers are not serialized.
        let value = self.inner.resolve(chip, field)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, value.clone());
        }
        Ok(value)
    }
}
