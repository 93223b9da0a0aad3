//! Zig lookup table emission and atomic output writing for chipgen.
//!
//! ## Modules
//!
//! - [`zig`] — Renders chip records into a Zig source file
//! - [`literal`] — String literal safety checks and escaping
//! - [`write`] — Buffer-then-rename output writing

pub mod error;
pub mod literal;
pub mod write;
pub mod zig;

pub use error::{EmitError, Result};
pub use write::{write_atomic, WriteOutcome};
pub use zig::DocumentEmitter;
