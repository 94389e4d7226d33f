use std::collections::HashSet;

use poon_store::StoreError;
use poon_types::{ObjectHash, ObjectType};
use tracing::{info, warn};

use crate::error::RepoResult;
use crate::repository::Repository;

/// Outcome of [`Repository::verify_objects`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Objects read and re-hashed.
    pub checked: usize,
    /// Objects whose bytes failed to decode or verify, with the reason.
    pub corrupt: Vec<(ObjectHash, String)>,
    /// Hashes referenced from a version's commit or trees but absent.
    pub missing: Vec<ObjectHash>,
    /// Objects reachable from at least one version.
    pub reachable: usize,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.corrupt.is_empty() && self.missing.is_empty()
    }
}

impl Repository {
    /// Re-verify every stored object and walk every version's commit and
    /// trees looking for dangling references.
    pub fn verify_objects(&self) -> RepoResult<VerifyReport> {
        let store = self.store();
        let mut report = VerifyReport::default();

        for hash in store.list()? {
            report.checked += 1;
            if let Err(e) = store.get(&hash) {
                warn!(hash = %hash, error = %e, "corrupt object");
                report.corrupt.push((hash, e.to_string()));
            }
        }
        let corrupt: HashSet<ObjectHash> = report.corrupt.iter().map(|(h, _)| *h).collect();

        let mut seen = HashSet::new();
        let mut pending: Vec<(ObjectHash, ObjectType)> = self
            .list_versions(0)?
            .into_iter()
            .map(|v| (v.commit_hash, ObjectType::Commit))
            .collect();

        while let Some((hash, kind)) = pending.pop() {
            if !seen.insert(hash) || corrupt.contains(&hash) {
                continue;
            }
            let result = match kind {
                ObjectType::Commit => store
                    .get_commit(&hash)
                    .map(|c| pending.push((c.root_tree, ObjectType::Tree))),
                ObjectType::Tree => store.get_tree(&hash).map(|tree| {
                    pending.extend(tree.entries.iter().map(|e| (e.hash, e.entry_type)));
                }),
                ObjectType::Blob => store.exists(&hash).and_then(|present| {
                    if present {
                        Ok(())
                    } else {
                        Err(StoreError::ObjectNotFound(hash))
                    }
                }),
            };
            match result {
                Ok(()) => report.reachable += 1,
                Err(StoreError::ObjectNotFound(_)) => report.missing.push(hash),
                Err(e) => report.corrupt.push((hash, e.to_string())),
            }
        }

        info!(
            checked = report.checked,
            reachable = report.reachable,
            corrupt = report.corrupt.len(),
            missing = report.missing.len(),
            "verified objects"
        );
        Ok(report)
    }
}
