use std::path::Path;

use anyhow::Context;
use walkdir::WalkDir;

use crate::types::RunbenchResult;

/// Size of the tree a workload left behind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepoSummary {
    pub file_count: u64,
    pub size_bytes: u64,
}

/// Count every non-directory entry below `dir` and sum up their sizes.
///
/// Symbolic links are counted as entries of their own and are not followed.
pub fn summarize_dir(dir: &Path) -> RunbenchResult<RepoSummary> {
    let mut summary = RepoSummary::default();

    for entry in WalkDir::new(dir).min_depth(1) {
        let entry =
            entry.with_context(|| format!("Error reading directory {}", dir.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("Error getting info for {}", entry.path().display()))?;

        summary.size_bytes += metadata.len();
        summary.file_count += 1;
    }

    Ok(summary)
}
