use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::progress::{SweepReporter, FILE_EVENTS};

/// Why an empty-looking directory could not be removed.
#[derive(Debug)]
pub enum RemoveDirError {
    /// Something was written into it after it was scanned.
    NotEmpty,
    PermissionDenied,
    /// Gone before we got to it.
    AlreadyRemoved,
    Other(io::Error),
}

impl From<io::Error> for RemoveDirError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => RemoveDirError::AlreadyRemoved,
            io::ErrorKind::PermissionDenied => RemoveDirError::PermissionDenied,
            // ENOTEMPTY has no stable ErrorKind on every toolchain.
            _ if is_not_empty(&err) => RemoveDirError::NotEmpty,
            _ => RemoveDirError::Other(err),
        }
    }
}

fn is_not_empty(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        // ENOTEMPTY is 39 on Linux, 66 on the BSDs and macOS.
        matches!(err.raw_os_error(), Some(39) | Some(66))
    }
    #[cfg(windows)]
    {
        // ERROR_DIR_NOT_EMPTY
        err.raw_os_error() == Some(145)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = err;
        false
    }
}

impl std::fmt::Display for RemoveDirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoveDirError::NotEmpty => write!(f, "directory not empty"),
            RemoveDirError::PermissionDenied => write!(f, "permission denied"),
            RemoveDirError::AlreadyRemoved => write!(f, "already removed"),
            RemoveDirError::Other(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub removed: usize,
    pub failed: usize,
}

/// Remove every directory under `root` that holds no files, deepest first.
/// `root` itself and anything in `excluded` are kept.
pub fn prune_empty_dirs(
    root: &Path,
    excluded: &[PathBuf],
    reporter: &dyn SweepReporter,
) -> io::Result<PruneStats> {
    let mut stats = PruneStats::default();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if is_real_dir(&path) {
            prune_dir(&path, excluded, reporter, &mut stats);
        }
    }
    Ok(stats)
}

/// Returns true when `dir` ended up empty and was removed.
fn prune_dir(
    dir: &Path,
    excluded: &[PathBuf],
    reporter: &dyn SweepReporter,
    stats: &mut PruneStats,
) -> bool {
    if excluded.iter().any(|ex| ex == dir) {
        return false;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Cannot read directory {}: {}", dir.display(), err);
            return false;
        }
    };

    let mut empty = true;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!("Cannot read entry in {}: {}", dir.display(), err);
                empty = false;
                continue;
            }
        };

        if is_real_dir(&path) {
            if !prune_dir(&path, excluded, reporter, stats) {
                empty = false;
            }
        } else {
            empty = false;
        }
    }

    if !empty {
        return false;
    }

    record_removal(dir, remove_dir(dir), reporter, stats)
}

/// Count one removal attempt. Returns true when `dir` is gone afterwards.
fn record_removal(
    dir: &Path,
    result: Result<(), RemoveDirError>,
    reporter: &dyn SweepReporter,
    stats: &mut PruneStats,
) -> bool {
    match result {
        Ok(()) => {
            info!(target: FILE_EVENTS, "Removed empty directory {}", dir.display());
            reporter.on_dir_removed(dir);
            stats.removed += 1;
            true
        }
        Err(RemoveDirError::AlreadyRemoved) => {
            debug!("{} was already removed", dir.display());
            true
        }
        Err(err) => {
            warn!("Could not remove {}: {}", dir.display(), err);
            stats.failed += 1;
            false
        }
    }
}

pub fn remove_dir(dir: &Path) -> Result<(), RemoveDirError> {
    fs::remove_dir(dir).map_err(RemoveDirError::from)
}

/// A directory that is not a symlink to one.
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use tempfile::tempdir;

    #[test]
    fn test_prunes_nested_empty_dirs_but_keeps_root() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("2022/01")).unwrap();
        fs::create_dir_all(root.join("2023/05")).unwrap();
        fs::create_dir_all(root.join("2023/06")).unwrap();
        fs::write(root.join("2023/06/keep.jpg"), "x").unwrap();

        let stats = prune_empty_dirs(root, &[], &SilentReporter).unwrap();

        assert_eq!(stats, PruneStats { removed: 3, failed: 0 });
        assert!(root.exists());
        assert!(!root.join("2022").exists());
        assert!(!root.join("2023/05").exists());
        assert!(root.join("2023/06/keep.jpg").exists());
    }

    #[test]
    fn test_hidden_file_keeps_directory() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("2023/05")).unwrap();
        fs::write(root.join("2023/05/.htaccess"), "deny from all").unwrap();

        let stats = prune_empty_dirs(root, &[], &SilentReporter).unwrap();
        assert_eq!(stats.removed, 0);
        assert!(root.join("2023/05/.htaccess").exists());
    }

    #[test]
    fn test_excluded_dir_is_left_alone() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("sites/2/2023/05")).unwrap();

        let stats = prune_empty_dirs(root, &[root.join("sites")], &SilentReporter).unwrap();
        assert_eq!(stats.removed, 0);
        assert!(root.join("sites/2/2023/05").exists());
    }

    #[test]
    fn test_already_removed_is_not_counted() {
        let mut stats = PruneStats::default();
        let gone = record_removal(
            Path::new("/srv/uploads/2023/05"),
            Err(RemoveDirError::AlreadyRemoved),
            &SilentReporter,
            &mut stats,
        );
        assert!(gone);
        assert_eq!(stats, PruneStats::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_removal_failure_is_counted_and_run_continues() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let locked = root.join("locked");
        fs::create_dir_all(locked.join("2023/05")).unwrap();
        fs::create_dir_all(root.join("2022/01")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores permission bits; nothing to check there.
        if fs::write(locked.join("write-check"), "x").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = prune_empty_dirs(root, &[], &SilentReporter);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let stats = result.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.removed, 3);
        assert!(locked.join("2023").exists());
        assert!(!root.join("2022").exists());
    }

    #[test]
    fn test_remove_dir_error_kinds() {
        let tmp = tempdir().unwrap();
        let gone = tmp.path().join("gone");
        assert!(matches!(remove_dir(&gone), Err(RemoveDirError::AlreadyRemoved)));

        let full = tmp.path().join("full");
        fs::create_dir(&full).unwrap();
        fs::write(full.join("file"), "x").unwrap();
        assert!(matches!(remove_dir(&full), Err(RemoveDirError::NotEmpty)));
    }
}
