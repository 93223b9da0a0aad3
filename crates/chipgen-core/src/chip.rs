//! Chip identifiers, attribute fields, and resolved chip records.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{ChipError, Result};

/// Prefix prepended to the family slice to form a target tag.
pub const TARGET_TAG_PREFIX: &str = "stm32/";

/// Byte offset of the family slice used for the target tag.
pub const TARGET_TAG_OFFSET: usize = 5;

/// Length in bytes of the family slice used for the target tag.
pub const TARGET_TAG_LEN: usize = 2;

/// An opaque identifier naming one hardware part (e.g. `stm32f103c8`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChipId(String);

impl ChipId {
    /// Create an identifier. Returns `None` for empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(ChipId(id))
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named attribute resolved for every chip.
///
/// The set is closed: it mirrors the shape of the emitted `ChipInfo` struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeField {
    Family,
    Subfamily,
    CppFlags,
    Defs,
    Cpu,
    Fpu,
}

impl AttributeField {
    /// Every field, in emission order.
    pub const ALL: [AttributeField; 6] = [
        AttributeField::Family,
        AttributeField::Subfamily,
        AttributeField::CppFlags,
        AttributeField::Defs,
        AttributeField::Cpu,
        AttributeField::Fpu,
    ];

    /// Field name as understood by the device database and used in the output struct.
    pub fn name(self) -> &'static str {
        match self {
            AttributeField::Family => "family",
            AttributeField::Subfamily => "subfamily",
            AttributeField::CppFlags => "cppflags",
            AttributeField::Defs => "defs",
            AttributeField::Cpu => "cpu",
            AttributeField::Fpu => "fpu",
        }
    }

    /// Look up a field by its database name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for AttributeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derive the target tag from a family value (`"stm32f1"` → `"stm32/f1"`).
///
/// Returns `None` when the family has no complete slice window, including
/// when the window would split a multi-byte character.
pub fn derive_target_tag(family: &str) -> Option<String> {
    let slice = family.get(TARGET_TAG_OFFSET..TARGET_TAG_OFFSET + TARGET_TAG_LEN)?;
    Some(format!("{TARGET_TAG_PREFIX}{slice}"))
}

/// A fully-resolved chip: every [`AttributeField`] plus the derived target tag.
///
/// Records can only be assembled once all fields have resolved and the tag
/// has been derived, and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipRecord {
    id: ChipId,
    attributes: BTreeMap<AttributeField, String>,
    target_tag: String,
}

impl ChipRecord {
    /// Assemble a record from resolved attribute values.
    ///
    /// Fails with [`ChipError::Resolution`] if a field is missing and with
    /// [`ChipError::Derivation`] if the target tag cannot be derived.
    pub fn assemble(id: ChipId, attributes: BTreeMap<AttributeField, String>) -> Result<Self> {
        for field in AttributeField::ALL {
            if !attributes.contains_key(&field) {
                return Err(ChipError::Resolution {
                    chip: id.to_string(),
                    field: field.name().into(),
                    diagnostic: "no value was resolved".into(),
                });
            }
        }

        let family = &attributes[&AttributeField::Family];
        let target_tag = derive_target_tag(family).ok_or_else(|| ChipError::Derivation {
            chip: id.to_string(),
            family: family.clone(),
        })?;

        Ok(ChipRecord {
            id,
            attributes,
            target_tag,
        })
    }

    /// The chip identifier.
    pub fn id(&self) -> &ChipId {
        &self.id
    }

    /// The resolved value of one attribute.
    pub fn get(&self, field: AttributeField) -> &str {
        &self.attributes[&field]
    }

    /// All attributes in emission order.
    pub fn attributes(&self) -> impl Iterator<Item = (AttributeField, &str)> {
        self.attributes.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// The derived target tag (`opencm3target` in the generated table).
    pub fn target_tag(&self) -> &str {
        &self.target_tag
    }
}
