//! `chipgen doctor` — configuration and database tool diagnostics.

use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use chipgen_core::process::run_with_timeout;
use chipgen_core::GenlinkResolver;

use crate::commands::load_config;

/// Print diagnostic information about the configuration and the database tool.
pub fn run(cwd: &Path, config: Option<&Path>) -> Result<()> {
    print!("{}", report(cwd, config)?);
    Ok(())
}

/// Build the diagnostic report. A configuration that fails to load is
/// reported rather than returned as an error.
pub fn report(cwd: &Path, config: Option<&Path>) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "=== chipgen doctor ===")?;
    writeln!(out)?;
    writeln!(out, "chipgen version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;

    writeln!(out, "--- Configuration ---")?;
    let (config, base_dir) = match load_config(cwd, config) {
        Ok(found) => found,
        Err(e) => {
            writeln!(out, "  config: {e:#}")?;
            return Ok(out);
        }
    };
    writeln!(out, "  base directory: {}", base_dir.display())?;
    writeln!(out, "  chips:          {}", config.chips.len())?;
    writeln!(out, "  output:         {}", base_dir.join(&config.output.path).display())?;
    writeln!(out, "  literals:       {:?}", config.output.literals)?;
    writeln!(out, "  jobs:           {}", config.resolver.jobs)?;
    writeln!(out, "  cache:          {}", config.resolver.cache)?;
    writeln!(out)?;

    writeln!(out, "--- Device Database ---")?;
    let resolver = GenlinkResolver::from_config(&config.database, &base_dir);
    writeln!(
        out,
        "  program: {}",
        tool_status(Path::new(resolver.program()), resolver.timeout())
    )?;
    if let Some(script) = resolver.script() {
        writeln!(out, "  script:  {}", file_status(script))?;
    }
    writeln!(out, "  data:    {}", file_status(resolver.database()))?;
    writeln!(out, "  timeout: {} s", resolver.timeout().as_secs())?;

    Ok(out)
}

/// `<program> --version`, bounded by the query timeout.
fn tool_status(program: &Path, timeout: Duration) -> String {
    let mut cmd = Command::new(program);
    cmd.arg("--version");
    format!("{} ({})", program.display(), command_status(&mut cmd, timeout))
}

fn command_status(cmd: &mut Command, timeout: Duration) -> String {
    match run_with_timeout(cmd, timeout) {
        Ok(Some(output)) => {
            // Python 2 prints its version on stderr.
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).into_owned()
            };
            text.lines()
                .next()
                .unwrap_or("unknown version")
                .trim()
                .to_string()
        }
        Ok(None) => format!("timed out after {} ms", timeout.as_millis()),
        Err(_) => "not found".to_string(),
    }
}

fn file_status(path: &Path) -> String {
    if path.is_file() {
        format!("{} (found)", path.display())
    } else {
        format!("{} (missing)", path.display())
    }
}
