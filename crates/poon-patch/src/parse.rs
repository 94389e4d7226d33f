//! Unified-diff parser.
//!
//! The input is read as bytes: hunk line payloads are kept exactly as they
//! appear, so patches against non-UTF-8 files round-trip. Only file names
//! from the `---`/`+++` lines must decode as UTF-8.
//!
//! Hunk bodies are read by count: once an `@@ -a,b +c,d @@` header is seen,
//! the next lines belong to the hunk until `b` old and `d` new lines have
//! been consumed, so a removed line such as `--- x` is never mistaken for a
//! file header. Lines with a hunk marker that follow an exhausted hunk are
//! still attached to it, which tolerates hand-written patches with wrong
//! counts.

use tracing::debug;

use crate::error::{PatchError, PatchResult};
use crate::types::{ParsedPatch, PatchHunk, PatchLine};

/// Split on `\n`, dropping the empty piece after a final newline and one
/// trailing `\r` per line.
fn patch_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = data.strip_suffix(b"\n").unwrap_or(data);
    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Check the overall shape of a patch before parsing it.
///
/// Fails with `EmptyPatch` for zero bytes, `HunkWithoutHeader` when an `@@`
/// line comes before any `---`/`+++` line, and `MissingHeaders` when no such
/// line exists at all.
pub fn validate_patch(data: &[u8]) -> PatchResult<()> {
    if data.is_empty() {
        return Err(PatchError::EmptyPatch);
    }
    let mut has_header = false;
    for (idx, line) in patch_lines(data).enumerate() {
        if line.starts_with(b"--- ") || line.starts_with(b"+++ ") {
            has_header = true;
        }
        if line.starts_with(b"@@") && !has_header {
            return Err(PatchError::HunkWithoutHeader { line: idx + 1 });
        }
    }
    if !has_header {
        return Err(PatchError::MissingHeaders);
    }
    Ok(())
}

/// Parse a single-file patch.
///
/// A patch with headers and no hunks is valid and parses to a no-op.
pub fn parse_patch(data: &[u8]) -> PatchResult<ParsedPatch> {
    let mut sections = parse_patch_set(data)?;
    match sections.len() {
        0 => Ok(ParsedPatch::default()),
        1 => Ok(sections.remove(0)),
        count => Err(PatchError::MultipleFiles { count }),
    }
}

/// Parse a diff that may touch several files into one section per file.
pub fn parse_patch_set(data: &[u8]) -> PatchResult<Vec<ParsedPatch>> {
    validate_patch(data)?;
    let mut parser = Parser::default();
    for (idx, line) in patch_lines(data).enumerate() {
        parser.feed(idx + 1, line)?;
    }
    let sections = parser.finish();
    debug!(sections = sections.len(), "parsed patch");
    Ok(sections)
}

#[derive(Default)]
struct Parser {
    sections: Vec<ParsedPatch>,
    current: Option<ParsedPatch>,
    hunk: Option<OpenHunk>,
}

struct OpenHunk {
    hunk: PatchHunk,
    old_left: usize,
    new_left: usize,
}

impl OpenHunk {
    fn expects_more(&self) -> bool {
        self.old_left > 0 || self.new_left > 0
    }

    fn push(&mut self, line: PatchLine) {
        match &line {
            PatchLine::Context(_) => {
                self.old_left = self.old_left.saturating_sub(1);
                self.new_left = self.new_left.saturating_sub(1);
            }
            PatchLine::Removed(_) => self.old_left = self.old_left.saturating_sub(1),
            PatchLine::Added(_) => self.new_left = self.new_left.saturating_sub(1),
        }
        self.hunk.lines.push(line);
    }
}

fn hunk_line(line: &[u8]) -> Option<PatchLine> {
    let (&marker, rest) = line.split_first()?;
    match marker {
        b' ' => Some(PatchLine::Context(rest.to_vec())),
        b'+' => Some(PatchLine::Added(rest.to_vec())),
        b'-' => Some(PatchLine::Removed(rest.to_vec())),
        _ => None,
    }
}

fn mode(raw: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(raw).trim().to_string())
}

impl Parser {
    fn feed(&mut self, lineno: usize, line: &[u8]) -> PatchResult<()> {
        // "\ No newline at end of file"
        if line.starts_with(b"\\") {
            return Ok(());
        }

        if let Some(open) = self.hunk.as_mut() {
            if open.expects_more() {
                if line.is_empty() {
                    open.push(PatchLine::Context(Vec::new()));
                    return Ok(());
                }
                if let Some(parsed) = hunk_line(line) {
                    open.push(parsed);
                    return Ok(());
                }
            }
        }

        if let Some(name) = line.strip_prefix(b"--- ") {
            self.close_hunk();
            if self.current.as_ref().is_some_and(|c| {
                !c.header.old_file.is_empty() || !c.header.new_file.is_empty() || !c.hunks.is_empty()
            }) {
                self.close_section();
            }
            self.section().header.old_file = file_name(lineno, name, "a/")?;
        } else if let Some(name) = line.strip_prefix(b"+++ ") {
            self.close_hunk();
            if self
                .current
                .as_ref()
                .is_some_and(|c| !c.header.new_file.is_empty() || !c.hunks.is_empty())
            {
                self.close_section();
            }
            self.section().header.new_file = file_name(lineno, name, "b/")?;
        } else if line.starts_with(b"@@") {
            self.close_hunk();
            let hunk = parse_hunk_header(lineno, line)?;
            self.section();
            self.hunk = Some(OpenHunk {
                old_left: hunk.old_count,
                new_left: hunk.new_count,
                hunk,
            });
        } else if line.starts_with(b"diff ") {
            self.close_hunk();
            self.close_section();
        } else if let Some(raw) = line.strip_prefix(b"old mode ") {
            self.section().header.old_mode = mode(raw);
        } else if let Some(raw) = line.strip_prefix(b"deleted file mode ") {
            self.section().header.old_mode = mode(raw);
        } else if let Some(raw) = line.strip_prefix(b"new mode ") {
            self.section().header.new_mode = mode(raw);
        } else if let Some(raw) = line.strip_prefix(b"new file mode ") {
            self.section().header.new_mode = mode(raw);
        } else if let Some(open) = self.hunk.as_mut() {
            if let Some(parsed) = hunk_line(line) {
                open.push(parsed);
            }
        }
        Ok(())
    }

    fn section(&mut self) -> &mut ParsedPatch {
        self.current.get_or_insert_with(ParsedPatch::default)
    }

    fn close_hunk(&mut self) {
        if let Some(open) = self.hunk.take() {
            self.section().hunks.push(open.hunk);
        }
    }

    fn close_section(&mut self) {
        if let Some(section) = self.current.take() {
            if section.target_path().is_some() {
                self.sections.push(section);
            } else {
                debug!("dropping file section without file names");
            }
        }
    }

    fn finish(mut self) -> Vec<ParsedPatch> {
        self.close_hunk();
        self.close_section();
        self.sections
    }
}

/// Decode a header file name, stripping a trailing `\t<timestamp>` and the
/// `a/` or `b/` prefix.
fn file_name(lineno: usize, raw: &[u8], prefix: &str) -> PatchResult<String> {
    let raw = raw.split(|&b| b == b'\t').next().unwrap_or(raw);
    let name = std::str::from_utf8(raw)
        .map_err(|_| PatchError::NonUtf8FileName { line: lineno })?
        .trim_end();
    Ok(name.strip_prefix(prefix).unwrap_or(name).to_string())
}

/// Parse `@@ -a[,b] +c[,d] @@[ section heading]`. Omitted counts are 1.
/// The section heading is not decoded.
fn parse_hunk_header(lineno: usize, line: &[u8]) -> PatchResult<PatchHunk> {
    let invalid = || PatchError::InvalidHunkHeader {
        line: lineno,
        header: String::from_utf8_lossy(line).into_owned(),
    };
    let rest = line.strip_prefix(b"@@ ").ok_or_else(invalid)?;
    let end = rest.windows(3).position(|w| w == b" @@").ok_or_else(invalid)?;
    let body = std::str::from_utf8(&rest[..end]).map_err(|_| invalid())?;
    let (old, new) = body.split_once(' ').ok_or_else(invalid)?;
    let (old_start, old_count) = old
        .strip_prefix('-')
        .and_then(parse_range)
        .ok_or_else(invalid)?;
    let (new_start, new_count) = new
        .trim()
        .strip_prefix('+')
        .and_then(parse_range)
        .ok_or_else(invalid)?;
    Ok(PatchHunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines: Vec::new(),
    })
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
