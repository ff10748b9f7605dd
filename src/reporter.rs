use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;
use wp_clean_uploads::{SiteReport, SweepReporter};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Dump: spinner (mysqldump gives no progress)
/// - Walk: bar sized by the file-count pre-pass, one tick per visited file
/// - Prune: spinner
pub struct CliReporter {
    bar: RefCell<Option<ProgressBar>>,
    verbose: bool,
}

impl CliReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            bar: RefCell::new(None),
            verbose,
        }
    }

    fn spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Some(old) = self.bar.replace(Some(pb)) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }

    /// Print above the bar instead of through it.
    fn line(&self, text: String) {
        match self.bar.borrow().as_ref() {
            Some(pb) => pb.println(text),
            None => eprintln!("{}", text),
        }
    }
}

impl SweepReporter for CliReporter {
    fn on_dump_start(&self, label: &str) {
        self.spinner(format!("Requesting database dump for {}...", label));
    }

    fn on_dump_complete(&self, bytes: usize) {
        self.finish_bar();
        eprintln!("  {} Database dump: {} bytes", "✓".green(), bytes);
    }

    fn on_walk_start(&self, total_files: u64) {
        let pb = ProgressBar::new(total_files);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Processing files [{bar:30.cyan/dim}] {pos}/{len} ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_file_visited(&self, _path: &Path) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.inc(1);
        }
    }

    fn on_file_deleted(&self, path: &Path) {
        if self.verbose {
            self.line(format!("  {} {}", "deleted".red(), path.display()));
        }
    }

    fn on_file_failed(&self, path: &Path, error: &std::io::Error) {
        self.line(format!("  {} {}: {}", "could not remove".yellow(), path.display(), error));
    }

    fn on_walk_complete(&self) {
        self.finish_bar();
    }

    fn on_prune_start(&self) {
        self.spinner("Removing empty folders...".to_string());
    }

    fn on_dir_removed(&self, path: &Path) {
        if self.verbose {
            self.line(format!("  {} {}", "removed".red(), path.display()));
        }
    }

    fn on_sweep_complete(&self, report: &SiteReport) {
        self.finish_bar();
        eprintln!(
            "  {} {} ({}, {} byte dump): {} files checked, {} deleted, {} kept, {} folders removed in {:.2}s",
            "✓".green(),
            report.label,
            report.uploads_root.display(),
            report.dump_bytes,
            report.sweep.files_visited,
            report.sweep.deleted.to_string().red(),
            report.sweep.kept.to_string().green(),
            report.prune.removed,
            report.duration.as_secs_f64(),
        );
    }
}
