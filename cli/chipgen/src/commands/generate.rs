//! `chipgen generate` — resolve the chip table and write the Zig document.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chipgen_core::config::resolve_path;
use chipgen_core::{AttributeResolver, CachingResolver, ChipConfig, GenlinkResolver, TableBuilder};
use chipgen_emit::{write_atomic, DocumentEmitter, WriteOutcome};

use crate::commands::load_config;

/// Command-line overrides for a generation run.
#[derive(Debug, Default)]
pub struct GenerateOptions {
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub timeout: Option<u64>,
    pub stdout: bool,
}

/// Run the generation pipeline, reporting on standard output.
pub fn run(cwd: &Path, opts: &GenerateOptions) -> Result<()> {
    run_with_output(cwd, opts, &mut io::stdout().lock())
}

/// Run the generation pipeline, writing the document (with `--stdout`) or
/// the status line to `out`.
pub fn run_with_output<W: Write>(cwd: &Path, opts: &GenerateOptions, out: &mut W) -> Result<()> {
    let (mut config, base_dir) = load_config(cwd, opts.config.as_deref())?;
    if let Some(jobs) = opts.jobs {
        if jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        config.resolver.jobs = jobs;
    }
    if let Some(timeout) = opts.timeout {
        if timeout == 0 {
            bail!("--timeout must be at least 1 second");
        }
        config.database.timeout_secs = timeout;
    }

    let resolver = GenlinkResolver::from_config(&config.database, &base_dir);

    if opts.stdout {
        let document = render(&config, resolver)?;
        out.write_all(document.as_bytes())?;
        out.flush()?;
        return Ok(());
    }

    let explicit = opts.output.as_deref().map(|p| resolve_path(cwd, p));
    let output = output_path(&config, &base_dir, explicit.as_deref());
    match generate(&config, resolver, &output)? {
        WriteOutcome::Written => writeln!(
            out,
            "Wrote {} chip(s) to {}",
            config.chips.len(),
            output.display()
        )?,
        WriteOutcome::Unchanged => writeln!(out, "{} is up to date", output.display())?,
    }
    Ok(())
}

/// Where the document goes: an explicit path, else `output.path` under `base_dir`.
pub fn output_path(config: &ChipConfig, base_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => resolve_path(base_dir, &config.output.path),
    }
}

/// Resolve every configured chip and render the document in memory.
pub fn render<R: AttributeResolver>(config: &ChipConfig, resolver: R) -> Result<String> {
    let chips = config.chip_ids()?;
    if chips.is_empty() {
        tracing::warn!("no chips configured; emitting an empty table");
    }

    let jobs = config.resolver.jobs;
    let records = if config.resolver.cache {
        TableBuilder::new(CachingResolver::new(resolver))
            .with_jobs(jobs)
            .build(&chips)?
    } else {
        TableBuilder::new(resolver).with_jobs(jobs).build(&chips)?
    };

    let emitter = DocumentEmitter::new(config.output.literals).with_indent(config.output.indent);
    Ok(emitter.emit(&records)?)
}

/// Render the document and write it to `output` in one step.
///
/// Nothing is written unless every chip resolved and the document rendered.
pub fn generate<R: AttributeResolver>(
    config: &ChipConfig,
    resolver: R,
    output: &Path,
) -> Result<WriteOutcome> {
    let document = render(config, resolver)?;
    let outcome = write_atomic(output, &document)?;
    tracing::info!(path = %output.display(), ?outcome, "generation finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chipgen_core::{AttributeField, ChipError, ChipId, LiteralPolicy};

    /// In-memory device database keyed by chip, with every field given explicitly.
    struct Database {
        chips: HashMap<String, HashMap<AttributeField, String>>,
        calls: AtomicUsize,
    }

    impl Database {
        fn new() -> Self {
            Database {
                chips: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_chip(mut self, id: &str, family: &str, cpu: &str, defs: &str) -> Self {
            let fields = [
                (AttributeField::Family, family.to_string()),
                (AttributeField::Subfamily, format!("{family}x")),
                (AttributeField::CppFlags, format!("-mcpu={cpu} -mthumb")),
                (AttributeField::Defs, defs.to_string()),
                (AttributeField::Cpu, cpu.to_string()),
                (AttributeField::Fpu, "soft".to_string()),
            ];
            self.chips.insert(id.to_string(), fields.into_iter().collect());
            self
        }

        fn stm32() -> Self {
            Database::new()
                .with_chip("stm32f103c8", "stm32f1", "cortex-m3", "-DSTM32F1")
                .with_chip("stm32f407vg", "stm32f4", "cortex-m4", "-DSTM32F4")
                .with_chip("stm32f030f4", "stm32f0", "cortex-m0", "-DSTM32F0")
        }
    }

    impl AttributeResolver for Database {
        fn resolve(&self, chip: &ChipId, field: AttributeField) -> chipgen_core::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.chips
                .get(chip.as_str())
                .and_then(|fields| fields.get(&field))
                .cloned()
                .ok_or_else(|| ChipError::Resolution {
                    chip: chip.to_string(),
                    field: field.name().into(),
                    diagnostic: format!("unknown device {chip}"),
                })
        }
    }

    fn config(chips: &[&str]) -> ChipConfig {
        ChipConfig {
            chips: chips.iter().map(|c| c.to_string()).collect(),
            ..ChipConfig::default()
        }
    }

    fn record_ids(doc: &str) -> Vec<String> {
        doc.lines()
            .filter_map(|l| l.trim().strip_prefix(".id = \""))
            .map(|rest| rest.trim_end_matches("\",").to_string())
            .collect()
    }

    #[test]
    fn one_block_per_chip_in_order() {
        let doc = render(
            &config(&["stm32f407vg", "stm32f030f4", "stm32f103c8"]),
            Database::stm32(),
        )
        .unwrap();
        assert_eq!(record_ids(&doc), vec!["stm32f407vg", "stm32f030f4", "stm32f103c8"]);
        assert!(doc.contains(".opencm3target = \"stm32/f4\","));
        assert!(doc.contains(".cppflags = \"-mcpu=cortex-m0 -mthumb\","));
    }

    #[test]
    fn duplicates_preserve_position() {
        let doc = render(
            &config(&["stm32f103c8", "stm32f407vg", "stm32f103c8"]),
            Database::stm32(),
        )
        .unwrap();
        assert_eq!(record_ids(&doc), vec!["stm32f103c8", "stm32f407vg", "stm32f103c8"]);
    }

    #[test]
    fn empty_chip_list_emits_empty_table() {
        let doc = render(&ChipConfig::default(), Database::new()).unwrap();
        assert!(record_ids(&doc).is_empty());
        assert!(doc.ends_with("pub const chips = [_]ChipInfo{\n};\n"));
    }

    #[test]
    fn regeneration_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("devices.zig");
        let cfg = config(&["stm32f103c8", "stm32f407vg"]);

        assert_eq!(generate(&cfg, Database::stm32(), &output).unwrap(), WriteOutcome::Written);
        let first = fs::read(&output).unwrap();
        assert_eq!(generate(&cfg, Database::stm32(), &output).unwrap(), WriteOutcome::Unchanged);
        assert_eq!(fs::read(&output).unwrap(), first);
    }

    #[test]
    fn failed_lookup_writes_nothing() {
        // stm32f103c8 resolves; stm32f407vg is missing from this database.
        let db = Database::new().with_chip("stm32f103c8", "stm32f1", "cortex-m3", "-DSTM32F1");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("devices.zig");

        let err = generate(&config(&["stm32f103c8", "stm32f407vg"]), db, &output).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("stm32f407vg"));
        assert!(msg.contains("`family`"));
        assert!(!output.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_lookup_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("devices.zig");
        fs::write(&output, "// previous run\n").unwrap();

        let err = generate(&config(&["stm32f103c8", "nope"]), Database::stm32(), &output);
        assert!(err.is_err());
        assert_eq!(fs::read_to_string(&output).unwrap(), "// previous run\n");
    }

    #[test]
    fn short_family_fails_derivation() {
        let db = Database::new().with_chip("odd", "stm", "cortex-m0", "-DODD");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("devices.zig");

        let err = generate(&config(&["odd"]), db, &output).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChipError>(),
            Some(ChipError::Derivation { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn unsafe_literal_is_rejected_before_writing() {
        let db = Database::new().with_chip("stm32f103c8", "stm32f1", "cortex-m3", "-DNAME=\"x\"");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("devices.zig");

        let err = generate(&config(&["stm32f103c8"]), db, &output).unwrap_err();
        assert!(format!("{err:#}").contains("`defs`"));
        assert!(!output.exists());
    }

    #[test]
    fn escape_policy_from_config() {
        let db = Database::new().with_chip("stm32f103c8", "stm32f1", "cortex-m3", "-DNAME=\"x\"");
        let mut cfg = config(&["stm32f103c8"]);
        cfg.output.literals = LiteralPolicy::Escape;
        let doc = render(&cfg, db).unwrap();
        assert!(doc.contains(r#".defs = "-DNAME=\"x\"","#));
    }

    #[test]
    fn cache_avoids_repeat_queries() {
        let chips = ["stm32f103c8", "stm32f103c8", "stm32f407vg"];

        let db = Database::stm32();
        render(&config(&chips), &db).unwrap();
        assert_eq!(db.calls.load(Ordering::SeqCst), 18);

        let db = Database::stm32();
        let mut cfg = config(&chips);
        cfg.resolver.cache = true;
        render(&cfg, &db).unwrap();
        assert_eq!(db.calls.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn concurrent_resolution_matches_sequential() {
        let chips = ["stm32f030f4", "stm32f407vg", "stm32f103c8", "stm32f030f4"];
        let sequential = render(&config(&chips), Database::stm32()).unwrap();

        let mut cfg = config(&chips);
        cfg.resolver.jobs = 3;
        let concurrent = render(&cfg, Database::stm32()).unwrap();
        assert_eq!(sequential, concurrent);
    }

    #[test]
    fn output_path_prefers_explicit() {
        let cfg = config(&[]);
        let base = Path::new("/project");
        assert_eq!(output_path(&cfg, base, None), PathBuf::from("/project/devices.zig"));
        assert_eq!(
            output_path(&cfg, base, Some(Path::new("/tmp/out.zig"))),
            PathBuf::from("/tmp/out.zig")
        );
    }

    /// A project directory whose database tool is `sh query.sh`.
    #[cfg(unix)]
    fn shell_database_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"
case "$3" in
  family) echo "stm32f1" ;;
  cpu) echo "cortex-m3" ;;
  fpu) echo "soft" ;;
  *) echo "-D$2-$3" ;;
esac
"#;
        fs::write(dir.path().join("query.sh"), script).unwrap();
        fs::write(dir.path().join("devices.data"), "").unwrap();
        fs::write(
            dir.path().join("chipgen.toml"),
            r#"chips = ["stm32f103c8"]

[database]
program = "sh"
script = "query.sh"
data = "devices.data"

[output]
path = "gen/devices.zig"
"#,
        )
        .unwrap();
        dir
    }

    #[cfg(unix)]
    #[test]
    fn run_uses_configured_database_tool() {
        let dir = shell_database_project();
        let mut out = Vec::new();
        run_with_output(dir.path(), &GenerateOptions::default(), &mut out).unwrap();

        let output = dir.path().join("gen/devices.zig");
        let doc = fs::read_to_string(&output).unwrap();
        assert!(doc.contains(".family = \"stm32f1\","));
        assert!(doc.contains(".defs = \"-Dstm32f103c8-defs\","));
        assert!(doc.contains(".opencm3target = \"stm32/f1\","));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Wrote 1 chip(s) to {}\n", output.display())
        );
    }

    #[cfg(unix)]
    #[test]
    fn stdout_mode_prints_document_without_writing_file() {
        let dir = shell_database_project();
        let opts = GenerateOptions {
            stdout: true,
            ..GenerateOptions::default()
        };
        let mut out = Vec::new();
        run_with_output(dir.path(), &opts, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(record_ids(&printed), vec!["stm32f103c8"]);
        assert!(printed.contains(".opencm3target = \"stm32/f1\","));
        assert!(!dir.path().join("gen/devices.zig").exists());
        assert!(!dir.path().join("gen").exists());
    }

    #[test]
    fn run_rejects_zero_jobs_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chipgen.toml"), "chips = []\n").unwrap();
        let opts = GenerateOptions {
            jobs: Some(0),
            ..GenerateOptions::default()
        };
        assert!(run(dir.path(), &opts).is_err());
    }
}
