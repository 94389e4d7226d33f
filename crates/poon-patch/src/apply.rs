//! Positional hunk application.

use std::convert::Infallible;

use crate::error::{PatchError, PatchResult};
use crate::types::{ParsedPatch, PatchLine};

/// Apply `patch` to `content` by position.
///
/// Original lines are copied up to each hunk's `old_start`; then context
/// lines copy and advance, removed lines advance without copying, and added
/// lines are emitted. Remaining original lines are copied after the last
/// hunk. Context and removed lines are not compared with the original, so
/// this never fails. The result ends with a newline unless it is empty.
pub fn apply_patch(content: &[u8], patch: &ParsedPatch) -> Vec<u8> {
    match apply_with(content, patch, |_, _, _| Ok::<(), Infallible>(())) {
        Ok(out) => out,
        Err(never) => match never {},
    }
}

/// Like [`apply_patch`], but every context and removed line must match the
/// original line it consumes. The first mismatch fails with
/// [`PatchError::Conflict`].
pub fn apply_patch_verified(content: &[u8], patch: &ParsedPatch) -> PatchResult<Vec<u8>> {
    apply_with(content, patch, |line, found, expected| {
        if found == Some(expected) {
            return Ok(());
        }
        Err(PatchError::Conflict {
            line,
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: found.map(|f| String::from_utf8_lossy(f).into_owned()),
        })
    })
}

/// Split into lines, dropping the empty piece after a trailing newline.
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Shared walk. `check(line_number, original_line, expected)` is called for
/// each context or removed line before it is consumed.
fn apply_with<'a, E, F>(content: &'a [u8], patch: &'a ParsedPatch, mut check: F) -> Result<Vec<u8>, E>
where
    F: FnMut(usize, Option<&[u8]>, &[u8]) -> Result<(), E>,
{
    let original = split_lines(content);
    let mut result: Vec<&'a [u8]> = Vec::with_capacity(original.len());
    let mut index = 0usize;

    for hunk in &patch.hunks {
        while index < hunk.old_start.saturating_sub(1) && index < original.len() {
            result.push(original[index]);
            index += 1;
        }
        for line in &hunk.lines {
            match line {
                PatchLine::Context(text) => {
                    check(index + 1, original.get(index).copied(), text.as_slice())?;
                    if let Some(&orig) = original.get(index) {
                        result.push(orig);
                        index += 1;
                    }
                }
                PatchLine::Removed(text) => {
                    check(index + 1, original.get(index).copied(), text.as_slice())?;
                    if index < original.len() {
                        index += 1;
                    }
                }
                PatchLine::Added(text) => result.push(text.as_slice()),
            }
        }
    }
    result.extend_from_slice(&original[index.min(original.len())..]);

    let mut out = result.join(&b'\n');
    if !result.is_empty() {
        out.push(b'\n');
    }
    Ok(out)
}
