//! Spriteforge Core - Foundational types for the spriteforge pipeline
//!
//! This crate provides the types every other spriteforge crate depends on:
//! - `ForgeError` / `Result` - the shared error taxonomy
//! - `ContentHash` - SHA-256 based artifact provenance
//! - name slugging for deriving output directories from prompts

mod error;
mod hash;
mod slug;

pub use error::{ForgeError, Result};
pub use hash::ContentHash;
pub use slug::{derive_name, slugify};
