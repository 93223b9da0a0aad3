//! Zig source rendering for the chip table.
//!
//! The emitted file defines a `ChipInfo` struct, two lookup functions that
//! scan the table by id, and the `chips` array literal in configuration order.

use std::fmt::Write as _;

use chipgen_core::{AttributeField, ChipRecord, LiteralPolicy};

use crate::error::Result;
use crate::literal::literal_body;

/// First line of every generated file.
pub const HEADER: &str = "// Generated file - do not edit\n";

/// Struct field holding the chip identifier.
const ID_FIELD: &str = "id";

/// Struct field holding the derived target tag.
const TARGET_TAG_FIELD: &str = "opencm3target";

const ACCESSORS: &str = r#"const std = @import("std");

pub fn get_chip_info(comptime id: []const u8) ChipInfo {
    for (chips) |chip| {
        if (std.mem.eql(u8, chip.id, id)) return chip;
    }
    unreachable;
}

pub fn get_chip_cpu(comptime id: []const u8) []const u8 {
    for (chips) |chip| {
        if (std.mem.eql(u8, chip.id, id)) return chip.cpu;
    }
    unreachable;
}
"#;

/// Renders chip records as a Zig source file.
#[derive(Debug, Clone)]
pub struct DocumentEmitter {
    policy: LiteralPolicy,
    indent: usize,
}

impl Default for DocumentEmitter {
    fn default() -> Self {
        DocumentEmitter::new(LiteralPolicy::default())
    }
}

impl DocumentEmitter {
    /// Create an emitter with a four-space indent.
    pub fn new(policy: LiteralPolicy) -> Self {
        DocumentEmitter { policy, indent: 4 }
    }

    /// Set the indent width (minimum 1).
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(1);
        self
    }

    /// Render the complete document. Nothing is written to disk here.
    pub fn emit(&self, records: &[ChipRecord]) -> Result<String> {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        self.write_struct(&mut out);
        out.push('\n');
        out.push_str(ACCESSORS);
        out.push('\n');

        out.push_str("pub const chips = [_]ChipInfo{\n");
        for record in records {
            self.write_record(&mut out, record)?;
        }
        out.push_str("};\n");
        Ok(out)
    }

    fn write_struct(&self, out: &mut String) {
        let pad = " ".repeat(self.indent);
        out.push_str("pub const ChipInfo = struct {\n");
        for name in field_names() {
            let _ = writeln!(out, "{pad}{name}: []const u8,");
        }
        out.push_str("};\n");
    }

    fn write_record(&self, out: &mut String, record: &ChipRecord) -> Result<()> {
        let chip = record.id().as_str();
        let outer = " ".repeat(self.indent);
        let inner = " ".repeat(self.indent * 2);

        let mut values = Vec::with_capacity(AttributeField::ALL.len() + 2);
        values.push((ID_FIELD, chip));
        values.extend(record.attributes().map(|(field, value)| (field.name(), value)));
        values.push((TARGET_TAG_FIELD, record.target_tag()));

        let _ = writeln!(out, "{outer}.{{");
        for (name, value) in values {
            let body = literal_body(self.policy, chip, name, value)?;
            let _ = writeln!(out, "{inner}.{name} = \"{body}\",");
        }
        let _ = writeln!(out, "{outer}}},");
        Ok(())
    }
}

/// Struct field names in declaration order.
fn field_names() -> impl Iterator<Item = &'static str> {
    std::iter::once(ID_FIELD)
        .chain(AttributeField::ALL.into_iter().map(AttributeField::name))
        .chain(std::iter::once(TARGET_TAG_FIELD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipgen_core::ChipId;
    use std::collections::BTreeMap;

    fn record(id: &str, family: &str, defs: &str) -> ChipRecord {
        let values: BTreeMap<_, _> = [
            (AttributeField::Family, family.to_string()),
            (AttributeField::Subfamily, format!("{family}x")),
            (AttributeField::CppFlags, "-mcpu=cortex-m3 -mthumb".to_string()),
            (AttributeField::Defs, defs.to_string()),
            (AttributeField::Cpu, "cortex-m3".to_string()),
            (AttributeField::Fpu, "soft".to_string()),
        ]
        .into_iter()
        .collect();
        ChipRecord::assemble(ChipId::new(id).unwrap(), values).unwrap()
    }

    const EXPECTED: &str = r#"// Generated file - do not edit

pub const ChipInfo = struct {
    id: []const u8,
    family: []const u8,
    subfamily: []const u8,
    cppflags: []const u8,
    defs: []const u8,
    cpu: []const u8,
    fpu: []const u8,
    opencm3target: []const u8,
};

const std = @import("std");

pub fn get_chip_info(comptime id: []const u8) ChipInfo {
    for (chips) |chip| {
        if (std.mem.eql(u8, chip.id, id)) return chip;
    }
    unreachable;
}

pub fn get_chip_cpu(comptime id: []const u8) []const u8 {
    for (chips) |chip| {
        if (std.mem.eql(u8, chip.id, id)) return chip.cpu;
    }
    unreachable;
}

pub const chips = [_]ChipInfo{
    .{
        .id = "stm32f103c8",
        .family = "stm32f1",
        .subfamily = "stm32f1x",
        .cppflags = "-mcpu=cortex-m3 -mthumb",
        .defs = "-DSTM32F1",
        .cpu = "cortex-m3",
        .fpu = "soft",
        .opencm3target = "stm32/f1",
    },
};
"#;

    #[test]
    fn emits_full_document() {
        let doc = DocumentEmitter::default()
            .emit(&[record("stm32f103c8", "stm32f1", "-DSTM32F1")])
            .unwrap();
        assert_eq!(doc, EXPECTED);
    }

    #[test]
    fn records_follow_input_order() {
        let records = [
            record("b", "stm32f4", "-DB"),
            record("a", "stm32f1", "-DA"),
            record("b", "stm32f4", "-DB"),
        ];
        let doc = DocumentEmitter::default().emit(&records).unwrap();
        let ids: Vec<_> = doc
            .lines()
            .filter_map(|l| l.trim().strip_prefix(".id = "))
            .collect();
        assert_eq!(ids, vec!["\"b\",", "\"a\",", "\"b\","]);
        assert_eq!(doc.matches("    .{\n").count(), 3);
    }

    #[test]
    fn empty_table_is_valid() {
        let doc = DocumentEmitter::default().emit(&[]).unwrap();
        assert!(doc.ends_with("pub const chips = [_]ChipInfo{\n};\n"));
        assert!(doc.starts_with(HEADER));
    }

    #[test]
    fn output_is_stable() {
        let records = [record("stm32f103c8", "stm32f1", "-DSTM32F1")];
        let emitter = DocumentEmitter::default();
        assert_eq!(emitter.emit(&records).unwrap(), emitter.emit(&records).unwrap());
    }

    #[test]
    fn custom_indent() {
        let doc = DocumentEmitter::default()
            .with_indent(2)
            .emit(&[record("stm32f103c8", "stm32f1", "-DSTM32F1")])
            .unwrap();
        assert!(doc.contains("\n  .{\n    .id = \"stm32f103c8\",\n"));
        assert!(doc.contains("\n  id: []const u8,\n"));
    }

    #[test]
    fn rejects_unsafe_value_by_default() {
        let err = DocumentEmitter::default()
            .emit(&[record("stm32f103c8", "stm32f1", "-DNAME=\"x\"")])
            .unwrap_err();
        assert!(err.to_string().contains("`defs`"));
    }

    #[test]
    fn escapes_when_configured() {
        let doc = DocumentEmitter::new(LiteralPolicy::Escape)
            .emit(&[record("stm32f103c8", "stm32f1", "-DNAME=\"x\"")])
            .unwrap();
        assert!(doc.contains(r#"        .defs = "-DNAME=\"x\"","#));
    }
}
