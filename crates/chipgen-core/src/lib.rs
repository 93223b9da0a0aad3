//! Chip data model, configuration, and device database resolution for chipgen.
//!
//! The generation pipeline is split into three stages:
//! - **Resolution:** [`resolver::AttributeResolver`] looks up one attribute of
//!   one chip in the device database.
//! - **Table building:** [`table::TableBuilder`] resolves every attribute of
//!   every configured chip, in order, into immutable [`chip::ChipRecord`]s.
//! - **Emission:** handled by the `chipgen-emit` crate.

pub mod chip;
pub mod config;
pub mod error;
pub mod process;
pub mod resolver;
pub mod table;

pub use chip::{AttributeField, ChipId, ChipRecord};
pub use config::{ChipConfig, LiteralPolicy};
pub use error::{ChipError, Result};
pub use resolver::{AttributeResolver, CachingResolver, GenlinkResolver};
pub use table::TableBuilder;
