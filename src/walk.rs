use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file sitting in a dated `YYYY/MM/` uploads folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub file_name: String,
}

/// Every regular file under `root`, depth-first in directory-listing order.
///
/// The sequence is lazy and can be restarted by calling this again. Symlinks are
/// not followed and never yielded, and anything under `excluded` is skipped.
pub fn files<'a>(
    root: &Path,
    excluded: &'a [PathBuf],
) -> impl Iterator<Item = io::Result<PathBuf>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| !excluded.iter().any(|dir| entry.path() == dir))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(err) => Some(Err(io::Error::from(err))),
        })
}

/// File count for sizing the progress bar. Unreadable entries are not counted.
pub fn count_files(root: &Path, excluded: &[PathBuf]) -> u64 {
    files(root, excluded).filter(|f| f.is_ok()).count() as u64
}

/// Match `<root>/.../<YYYY>/<MM>/<filename>` and pull out the filename.
pub fn candidate(root: &Path, path: &Path) -> Option<Candidate> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let file_name = relative.file_name()?.to_str()?;
    let month_dir = relative.parent()?;
    let year_dir = month_dir.parent()?;

    if is_digits(month_dir.file_name()?, 2) && is_digits(year_dir.file_name()?, 4) {
        Some(Candidate {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
        })
    } else {
        None
    }
}

fn is_digits(name: &OsStr, len: usize) -> bool {
    name.to_str()
        .map(|s| s.len() == len && s.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}
