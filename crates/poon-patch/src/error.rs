use thiserror::Error;

/// Errors from parsing or applying a patch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The input was zero bytes.
    #[error("patch data is empty")]
    EmptyPatch,

    /// No `---` or `+++` line anywhere in the input.
    #[error("patch does not contain unified diff headers")]
    MissingHeaders,

    /// An `@@` line appeared before any file header.
    #[error("hunk at line {line} appears before any file header")]
    HunkWithoutHeader { line: usize },

    /// An `@@` line could not be parsed.
    #[error("invalid hunk header at line {line}: {header:?}")]
    InvalidHunkHeader { line: usize, header: String },

    /// A `---` or `+++` line names a file with bytes that are not UTF-8.
    #[error("file name at line {line} is not valid UTF-8")]
    NonUtf8FileName { line: usize },

    /// A single-file parse was given a diff touching several files.
    #[error("expected a single-file patch, found {count} file sections")]
    MultipleFiles { count: usize },

    /// A context or removed line does not match the content being patched.
    #[error("patch conflict at line {line}: expected {expected:?}, found {found:?}")]
    Conflict {
        line: usize,
        expected: String,
        found: Option<String>,
    },
}

pub type PatchResult<T> = std::result::Result<T, PatchError>;
