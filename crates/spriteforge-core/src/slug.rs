//! Deterministic name derivation for pipeline outputs
//!
//! Batch items without an explicit name get one derived from their prompt.
//! A short prompt-hash suffix keeps two similar prompts from colliding on
//! the same output directory.

use crate::hash::ContentHash;

/// Maximum length of the readable part of a derived name.
const SLUG_MAX_LEN: usize = 32;

/// Length of the hash suffix appended to derived names.
const HASH_SUFFIX_LEN: usize = 8;

/// Lowercase `text`, collapse runs of non-alphanumeric characters into a
/// single `_`, and truncate to `max_len`.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(max_len);
    let mut pending_sep = false;

    for c in text.chars() {
        if slug.len() >= max_len {
            break;
        }
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }

    // Pop rather than truncate: lowercasing can overshoot the budget and a
    // byte-indexed truncate could split a multibyte character.
    while slug.len() > max_len {
        slug.pop();
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Derive a collision-resistant directory name from a free-text prompt.
///
/// The readable slug makes output directories browsable; the hash suffix
/// makes the name unique per prompt, so two batch items with similar
/// prompts never overwrite each other's output.
pub fn derive_name(prompt: &str) -> String {
    let slug = slugify(prompt, SLUG_MAX_LEN);
    let digest = ContentHash::from_bytes(prompt.as_bytes()).to_hex();
    let suffix = &digest[..HASH_SUFFIX_LEN];

    if slug.is_empty() {
        format!("character_{}", suffix)
    } else {
        format!("{}_{}", slug, suffix)
    }
}
