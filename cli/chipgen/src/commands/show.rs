//! `chipgen show` — resolve and print one chip.

use std::path::Path;

use anyhow::{Context, Result};
use chipgen_core::{AttributeResolver, ChipId, ChipRecord, GenlinkResolver, TableBuilder};

use crate::commands::load_config;

/// Resolve `chip` with the configured database tool and print its record.
pub fn run(cwd: &Path, config: Option<&Path>, chip: &str, json: bool) -> Result<()> {
    let (config, base_dir) = load_config(cwd, config)?;
    let resolver = GenlinkResolver::from_config(&config.database, &base_dir);
    let record = resolve_one(resolver, chip)?;
    println!("{}", format_record(&record, json)?);
    Ok(())
}

/// Resolve a single chip into a record.
pub fn resolve_one<R: AttributeResolver>(resolver: R, chip: &str) -> Result<ChipRecord> {
    let id = ChipId::new(chip).context("chip identifier must not be empty")?;
    Ok(TableBuilder::new(resolver).build_record(&id)?)
}

/// Human-readable or JSON rendering of a record.
pub fn format_record(record: &ChipRecord, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(record).context("serializing record");
    }
    let mut lines = vec![format!("Chip: {}", record.id())];
    for (field, value) in record.attributes() {
        lines.push(format!("  {:<15}{value}", format!("{field}:")));
    }
    lines.push(format!("  {:<15}{}", "opencm3target:", record.target_tag()));
    Ok(lines.join("\n"))
}
