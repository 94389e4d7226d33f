//! Repository path handling.
//!
//! Repository paths are `/`-separated and relative to the root tree.

use crate::error::{RepoError, RepoResult};

/// Reject paths that are absolute or contain a `..` segment.
///
/// Callers accepting paths from outside should run this before any
/// repository operation.
pub fn validate_path(path: &str) -> RepoResult<()> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(RepoError::PathTraversal {
            path: path.to_string(),
        });
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(RepoError::PathTraversal {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Split a path into segments, dropping empty and `.` segments.
///
/// `""`, `"."` and `"/"` all resolve to the root (no segments). A `..`
/// segment is rejected rather than resolved.
pub fn split_path(path: &str) -> RepoResult<Vec<String>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(RepoError::PathTraversal {
                    path: path.to_string(),
                })
            }
            s => segments.push(s.to_string()),
        }
    }
    Ok(segments)
}
