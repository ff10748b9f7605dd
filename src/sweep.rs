use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::progress::{SweepReporter, FILE_EVENTS};
use crate::walk;

/// What happened to one visited file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Not in a dated folder.
    Skipped,
    /// Matched an ignore pattern.
    Ignored,
    Kept,
    Deleted,
    Failed(io::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub files_visited: u64,
    pub candidates: u64,
    pub kept: u64,
    pub deleted: u64,
    pub ignored: u64,
    pub failed: u64,
}

impl SweepStats {
    fn record(&mut self, outcome: &FileOutcome) {
        self.files_visited += 1;
        match outcome {
            FileOutcome::Skipped => {}
            FileOutcome::Ignored => self.ignored += 1,
            FileOutcome::Kept => {
                self.candidates += 1;
                self.kept += 1;
            }
            FileOutcome::Deleted => {
                self.candidates += 1;
                self.deleted += 1;
            }
            FileOutcome::Failed(_) => {
                self.candidates += 1;
                self.failed += 1;
            }
        }
    }
}

pub fn compile_patterns(globs: &[String]) -> Result<Vec<Pattern>, Error> {
    globs
        .iter()
        .map(String::as_str)
        .map(Pattern::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Case-sensitive substring test against the raw dump text.
pub fn is_orphan(dump: &str, file_name: &str) -> bool {
    !dump.contains(file_name)
}

/// Deletes orphaned uploads under one root against one dump.
pub struct Sweeper<'a> {
    root: &'a Path,
    excluded: &'a [PathBuf],
    dump: &'a str,
    ignore: &'a [Pattern],
}

impl<'a> Sweeper<'a> {
    pub fn new(root: &'a Path, dump: &'a str) -> Self {
        Self {
            root,
            excluded: &[],
            dump,
            ignore: &[],
        }
    }

    pub fn with_excluded(mut self, excluded: &'a [PathBuf]) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn with_ignore_patterns(mut self, ignore: &'a [Pattern]) -> Self {
        self.ignore = ignore;
        self
    }

    /// Walk the tree once to size the progress bar, then again to check and delete.
    pub fn run(&self, reporter: &dyn SweepReporter) -> Result<SweepStats, Error> {
        reporter.on_walk_start(walk::count_files(self.root, self.excluded));

        let mut stats = SweepStats::default();
        for entry in walk::files(self.root, self.excluded) {
            let path = match entry {
                Ok(path) => path,
                Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                    error!("Access denied while walking {}: {}", self.root.display(), err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            reporter.on_file_visited(&path);
            let outcome = self.check_file(&path);
            match &outcome {
                FileOutcome::Deleted => reporter.on_file_deleted(&path),
                FileOutcome::Failed(err) => reporter.on_file_failed(&path, err),
                _ => {}
            }
            stats.record(&outcome);
        }

        reporter.on_walk_complete();
        Ok(stats)
    }

    pub fn check_file(&self, path: &Path) -> FileOutcome {
        let Some(candidate) = walk::candidate(self.root, path) else {
            return FileOutcome::Skipped;
        };

        let relative = path.strip_prefix(self.root).unwrap_or(path);
        if self.ignore.iter().any(|p| p.matches_path(relative)) {
            debug!("Ignored: {}", path.display());
            return FileOutcome::Ignored;
        }

        if !is_orphan(self.dump, &candidate.file_name) {
            return FileOutcome::Kept;
        }

        match fs::remove_file(&candidate.path) {
            Ok(()) => {
                info!(target: FILE_EVENTS, "Deleted {}", path.display());
                FileOutcome::Deleted
            }
            Err(err) => {
                warn!(target: FILE_EVENTS, "Could not remove {}: {}", path.display(), err);
                FileOutcome::Failed(err)
            }
        }
    }
}
