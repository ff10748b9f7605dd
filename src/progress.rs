use std::path::Path;

use crate::engine::SiteReport;

/// Log target for per-file deletions and directory removals. The CLI keeps it off
/// the terminal, where the reporter already prints those lines.
pub const FILE_EVENTS: &str = "wp_clean_uploads::files";

/// `EnvFilter` directives for the terminal: `level` with the per-file target muted.
pub fn terminal_directives(level: &str) -> String {
    format!("{},{}=off", level, FILE_EVENTS)
}

/// Trait for reporting sweep progress.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations.
pub trait SweepReporter {
    fn on_dump_start(&self, _label: &str) {}
    fn on_dump_complete(&self, _bytes: usize) {}
    fn on_walk_start(&self, _total_files: u64) {}
    fn on_file_visited(&self, _path: &Path) {}
    fn on_file_deleted(&self, _path: &Path) {}
    fn on_file_failed(&self, _path: &Path, _error: &std::io::Error) {}
    fn on_walk_complete(&self) {}
    fn on_prune_start(&self) {}
    fn on_dir_removed(&self, _path: &Path) {}
    fn on_sweep_complete(&self, _report: &SiteReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl SweepReporter for SilentReporter {}
