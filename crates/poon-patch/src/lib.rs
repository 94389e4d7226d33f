//! Unified-diff handling for Poon.
//!
//! Parses `--- a/file` / `+++ b/file` / `@@ -l,c +l,c @@` text into
//! structured hunks and applies them to flat file content. The applier is
//! positional: it trusts hunk offsets and, by default, does not compare
//! context lines with the content being patched. [`apply_patch_verified`]
//! adds that check and reports mismatches as [`PatchError::Conflict`].
//!
//! # Key Types
//!
//! - [`ParsedPatch`] / [`PatchHeader`] -- one file section of a diff
//! - [`PatchHunk`] / [`PatchLine`] -- line-range replacements

pub mod apply;
pub mod error;
pub mod parse;
pub mod render;
pub mod types;

pub use apply::{apply_patch, apply_patch_verified};
pub use error::{PatchError, PatchResult};
pub use parse::{parse_patch, parse_patch_set, validate_patch};
pub use render::render_unified;
pub use types::{ParsedPatch, PatchHeader, PatchHunk, PatchLine};
