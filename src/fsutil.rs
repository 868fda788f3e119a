//! Directory helpers: create, empty, duplicate, copy and collect files.
//!
//! Bulk operations keep going past individual failures and report them,
//! since a half-finished copy on a farm share is more useful than none.

use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Errors from filesystem helpers.
#[derive(Debug)]
pub enum FsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A search path or extension produced an invalid glob.
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    /// The source of a copy is not a directory.
    NotADirectory(PathBuf),
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            FsError::Pattern { pattern, source } => {
                write!(f, "invalid search pattern {pattern}: {source}")
            }
            FsError::NotADirectory(path) => write!(f, "not a directory: {}", path.display()),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io { source, .. } => Some(source),
            FsError::Pattern { source, .. } => Some(source),
            FsError::NotADirectory(_) => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FsError + '_ {
    move |source| FsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Create a directory (and parents) if it doesn't exist.
pub fn ensure_dir(path: &Path) -> Result<(), FsError> {
    std::fs::create_dir_all(path).map_err(io_err(path))
}

/// Create the parent directory of a file path.
pub fn make_dirs(file_path: &Path) -> Result<(), FsError> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Result of [`empty_folder`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmptyReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub failures: usize,
    /// Stopped early because the time budget ran out.
    pub timed_out: bool,
}

/// Delete the contents of `folder`, keeping the folder itself.
///
/// With `only_files`, sub-directories are kept and only files at any depth
/// are removed. Work stops once `wait_time` has elapsed.
pub fn empty_folder(folder: &Path, only_files: bool, wait_time: Duration) -> EmptyReport {
    if only_files {
        tracing::info!(folder = %folder.display(), "deleting all files");
    } else {
        tracing::info!(folder = %folder.display(), "deleting all files and folders");
    }
    let deadline = Instant::now() + wait_time;
    let mut report = EmptyReport::default();
    empty_into(folder, only_files, deadline, &mut report);
    report
}

fn empty_into(dir: &Path, only_files: bool, deadline: Instant, report: &mut EmptyReport) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, dir = %dir.display(), "failed to read directory");
            report.failures += 1;
            return;
        }
    };

    for entry in entries.flatten() {
        if Instant::now() >= deadline {
            report.timed_out = true;
            return;
        }
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            if only_files {
                empty_into(&path, only_files, deadline, report);
                if report.timed_out {
                    return;
                }
            } else {
                match std::fs::remove_dir_all(&path) {
                    Ok(()) => report.dirs_removed += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, dir = %path.display(), "failed to remove directory");
                        report.failures += 1;
                    }
                }
            }
        } else {
            match std::fs::remove_file(&path) {
                Ok(()) => report.files_removed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, file = %path.display(), "failed to remove file");
                    report.failures += 1;
                }
            }
        }
    }
}

/// Result of [`duplicate_dir`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    pub dirs_created: usize,
    pub files_copied: usize,
    /// Files left alone because the destination already had them.
    pub files_skipped: usize,
    pub failures: Vec<PathBuf>,
}

/// Mirror `src` into `dest`, copying only files `dest` doesn't have yet.
///
/// Existing destination files are never overwritten. Per-file failures are
/// collected in the report; only an unreadable `src` is an error.
pub fn duplicate_dir(src: &Path, dest: &Path) -> Result<DuplicateReport, FsError> {
    if !src.is_dir() {
        return Err(FsError::NotADirectory(src.to_path_buf()));
    }
    ensure_dir(dest)?;
    let mut report = DuplicateReport::default();
    duplicate_into(src, dest, &mut report)?;
    tracing::info!(
        src = %src.display(),
        dest = %dest.display(),
        copied = report.files_copied,
        skipped = report.files_skipped,
        failures = report.failures.len(),
        "duplicated directory"
    );
    Ok(report)
}

fn duplicate_into(src: &Path, dest: &Path, report: &mut DuplicateReport) -> Result<(), FsError> {
    for entry in std::fs::read_dir(src).map_err(io_err(src))?.flatten() {
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        if is_dir {
            if !to.is_dir() {
                match std::fs::create_dir_all(&to) {
                    Ok(()) => {
                        tracing::debug!(dir = %to.display(), "mkdir");
                        report.dirs_created += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, dir = %to.display(), "could not mkdir");
                        report.failures.push(to);
                        continue;
                    }
                }
            }
            if let Err(e) = duplicate_into(&from, &to, report) {
                tracing::warn!(error = %e, "could not duplicate sub-directory");
                report.failures.push(from);
            }
        } else if to.exists() {
            tracing::debug!(file = %from.display(), "exists");
            report.files_skipped += 1;
        } else {
            match std::fs::copy(&from, &to) {
                Ok(_) => {
                    tracing::debug!(file = %from.display(), "copy");
                    report.files_copied += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, file = %from.display(), "could not copy");
                    report.failures.push(from);
                }
            }
        }
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, overwriting existing files.
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize, FsError> {
    if !src.is_dir() {
        return Err(FsError::NotADirectory(src.to_path_buf()));
    }
    ensure_dir(dst)?;
    let mut copied = 0;
    for entry in std::fs::read_dir(src).map_err(io_err(src))? {
        let entry = entry.map_err(io_err(src))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type().map_err(io_err(&from))?.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(io_err(&from))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn is_excluded(path: &Path, excludes: &[String]) -> bool {
    let text = forward_slashes(path);
    excludes
        .iter()
        .any(|ex| !ex.is_empty() && text.contains(ex.replace('\\', "/").as_str()))
}

/// Find files below `search_paths` with one of `extensions`.
///
/// Extensions match case-insensitively and may carry a leading dot; an
/// empty list matches every file. A file is dropped when any entry of
/// `excludes` is a substring of its forward-slash path. Results are sorted
/// and de-duplicated.
pub fn collect_files(
    search_paths: &[PathBuf],
    extensions: &[String],
    excludes: &[String],
) -> Result<Vec<PathBuf>, FsError> {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let suffixes: Vec<String> = if extensions.is_empty() {
        vec!["*".to_string()]
    } else {
        extensions
            .iter()
            .map(|e| format!("*.{}", Pattern::escape(e.trim_start_matches('.'))))
            .collect()
    };

    let mut found = Vec::new();
    for root in search_paths {
        let base = Pattern::escape(&forward_slashes(root));
        let base = base.trim_end_matches('/');
        for suffix in &suffixes {
            let pattern = format!("{base}/**/{suffix}");
            let paths = glob_with(&pattern, options).map_err(|e| FsError::Pattern {
                pattern: pattern.clone(),
                source: e,
            })?;
            for path in paths {
                match path {
                    Ok(p) if p.is_file() && !is_excluded(&p, excludes) => found.push(p),
                    Ok(_) => {}
                    Err(e) => tracing::debug!(error = %e, "skipping unreadable path"),
                }
            }
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

/// Every regular file below `dir`.
pub fn collect_all_files(dir: &Path) -> Result<Vec<PathBuf>, FsError> {
    collect_files(&[dir.to_path_buf()], &[], &[])
}
