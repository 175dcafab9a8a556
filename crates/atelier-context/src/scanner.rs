//! Workspace file discovery for indexing.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory and file names excluded from every scan: dependency caches,
/// version-control metadata, build output, and lockfiles.
pub const SKIP_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    ".next",
    "dist",
    "build",
    "target",
    ".cache",
    "coverage",
    ".nyc_output",
    "venv",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
];

/// File extensions eligible for indexing.
pub const INDEXABLE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "py", "html", "css", "scss", "json", "md", "sh", "yaml", "yml",
    "env", "sql", "rs", "go", "rb", "php", "java", "c", "cpp", "cs", "swift", "kt", "vue",
    "svelte", "graphql", "prisma",
];

/// Check if a directory entry should be skipped entirely.
fn is_ignored(entry: &DirEntry) -> bool {
    // Never filter the root directory itself.
    if entry.depth() == 0 {
        return false;
    }

    let file_name = entry.file_name().to_string_lossy();
    file_name.starts_with('.') || SKIP_NAMES.contains(&file_name.as_ref())
}

/// Whether a file's extension is on the indexable allow-list.
fn is_indexable(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            let lowered = extension.to_ascii_lowercase();
            INDEXABLE_EXTENSIONS.contains(&lowered.as_str())
        })
}

/// Siblings sort directories first, then alphabetically, so repeated scans
/// of an unchanged tree visit files in the same order.
fn sibling_order(first: &DirEntry, second: &DirEntry) -> Ordering {
    first
        .file_type()
        .is_file()
        .cmp(&second.file_type().is_file())
        .then_with(|| first.file_name().cmp(second.file_name()))
}

/// Collects the indexable files under `root`.
///
/// Hidden entries and the fixed deny-list are skipped, unknown extensions
/// are silently dropped, and files of `max_file_size` bytes or more are
/// excluded outright rather than truncated.
pub fn collect_files(root: &Path, max_file_size: u64) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by(sibling_order)
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry))
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() || !is_indexable(entry.path()) {
            continue;
        }

        if let Ok(metadata) = entry.metadata()
            && metadata.len() < max_file_size
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files
}
