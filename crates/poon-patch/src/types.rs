/// File names and modes from a file section's header lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchHeader {
    /// Path from the `---` line, without the `a/` prefix.
    pub old_file: String,
    /// Path from the `+++` line, without the `b/` prefix.
    pub new_file: String,
    /// Mode from an `old mode` / `deleted file mode` line, if any.
    pub old_mode: Option<String>,
    /// Mode from a `new mode` / `new file mode` line, if any.
    pub new_mode: Option<String>,
}

/// One `@@` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchHunk {
    /// 1-based first line in the original (0 for an empty original).
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<PatchLine>,
}

impl PatchHunk {
    pub fn additions(&self) -> usize {
        self.lines.iter().filter(|l| matches!(l, PatchLine::Added(_))).count()
    }

    pub fn deletions(&self) -> usize {
        self.lines.iter().filter(|l| matches!(l, PatchLine::Removed(_))).count()
    }
}

/// A single line inside a hunk, without its marker character or line
/// terminator. Payloads are raw bytes; they need not be UTF-8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchLine {
    /// ` ` -- present in both old and new content.
    Context(Vec<u8>),
    /// `+` -- inserted.
    Added(Vec<u8>),
    /// `-` -- dropped.
    Removed(Vec<u8>),
}

impl PatchLine {
    /// The unified-diff marker for this line.
    pub fn marker(&self) -> char {
        match self {
            Self::Context(_) => ' ',
            Self::Added(_) => '+',
            Self::Removed(_) => '-',
        }
    }

    pub fn content(&self) -> &[u8] {
        match self {
            Self::Context(s) | Self::Added(s) | Self::Removed(s) => s,
        }
    }
}

/// One file section of a unified diff.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedPatch {
    pub header: PatchHeader,
    pub hunks: Vec<PatchHunk>,
}

impl ParsedPatch {
    /// The path this section writes to: the new file name, falling back to
    /// the old one. `None` when neither header named a file.
    pub fn target_path(&self) -> Option<&str> {
        [&self.header.new_file, &self.header.old_file]
            .into_iter()
            .find(|name| !name.is_empty())
            .map(String::as_str)
    }

    pub fn additions(&self) -> usize {
        self.hunks.iter().map(PatchHunk::additions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.hunks.iter().map(PatchHunk::deletions).sum()
    }
}
