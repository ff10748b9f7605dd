use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::database::SiteDatabase;
use crate::error::Error;
use crate::progress::SweepReporter;
use crate::prune::{self, PruneStats};
use crate::site::{self, SweepPlan};
use crate::sweep::{self, SweepStats, Sweeper};

pub struct CleanEngine<D: SiteDatabase> {
    settings: Settings,
    db: D,
}

#[derive(Debug)]
pub struct SiteReport {
    pub label: String,
    pub uploads_root: PathBuf,
    pub dump_bytes: usize,
    pub sweep: SweepStats,
    pub prune: PruneStats,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub sites: Vec<SiteReport>,
}

impl CleanReport {
    pub fn total_deleted(&self) -> u64 {
        self.sites.iter().map(|s| s.sweep.deleted).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.sites.iter().map(|s| s.sweep.failed).sum()
    }

    pub fn total_dirs_removed(&self) -> usize {
        self.sites.iter().map(|s| s.prune.removed).sum()
    }
}

impl<D: SiteDatabase> CleanEngine<D> {
    pub fn new(settings: Settings, db: D) -> Self {
        Self { settings, db }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    /// One plan for a single site, one per distinct uploads root in a network.
    pub fn plans(&self) -> Result<Vec<SweepPlan>, Error> {
        if !self.settings.multisite {
            return Ok(vec![SweepPlan::single_site(&self.settings)]);
        }

        let blog_ids = self.db.list_site_ids(&self.settings.table_prefix)?;
        info!("Network has {} sites", blog_ids.len());
        Ok(site::plan_network(&self.settings, &blog_ids))
    }

    /// Run every sweep in turn: dump, delete orphans, prune empty directories.
    pub fn run(&self, reporter: &dyn SweepReporter) -> Result<CleanReport, Error> {
        let ignore = sweep::compile_patterns(&self.settings.ignore_patterns)?;
        let plans = self.plans()?;

        let mut report = CleanReport::default();
        for plan in &plans {
            if !plan.uploads_root.is_dir() {
                if plan.sites.is_empty() || plan.uploads_root == self.settings.uploads_dir {
                    return Err(Error::UploadsMissing(plan.uploads_root.clone()));
                }
                // Sites that never uploaded anything have no folder yet.
                info!(
                    "Skipping {}: {} does not exist",
                    plan.label,
                    plan.uploads_root.display()
                );
                continue;
            }

            let site_report = self.sweep(plan, &ignore, reporter)?;
            reporter.on_sweep_complete(&site_report);
            report.sites.push(site_report);
        }

        Ok(report)
    }

    fn sweep(
        &self,
        plan: &SweepPlan,
        ignore: &[glob::Pattern],
        reporter: &dyn SweepReporter,
    ) -> Result<SiteReport, Error> {
        let start = Instant::now();
        info!(
            "Cleaning {} in {}",
            plan.label,
            plan.uploads_root.display()
        );

        // Fail early on an unreadable root, before anything is dumped.
        fs::read_dir(&plan.uploads_root)?;

        reporter.on_dump_start(&plan.label);
        let dump = self.acquire_dump(plan)?;
        reporter.on_dump_complete(dump.len());

        info!("Processing files...");
        let sweep = Sweeper::new(&plan.uploads_root, &dump)
            .with_excluded(&plan.excluded_dirs)
            .with_ignore_patterns(ignore)
            .run(reporter)?;
        debug!(
            "{} files visited, {} candidates, {} deleted, {} failed",
            sweep.files_visited, sweep.candidates, sweep.deleted, sweep.failed
        );

        info!("Removing empty folders...");
        reporter.on_prune_start();
        let prune = prune::prune_empty_dirs(&plan.uploads_root, &plan.excluded_dirs, reporter)?;

        Ok(SiteReport {
            label: plan.label.clone(),
            uploads_root: plan.uploads_root.clone(),
            dump_bytes: dump.len(),
            sweep,
            prune,
            duration: start.elapsed(),
        })
    }

    fn acquire_dump(&self, plan: &SweepPlan) -> Result<String, Error> {
        info!("Requesting database dump...");
        let selection = if plan.sites.is_empty() {
            plan.select_tables(&[])?
        } else {
            let tables = self.db.list_tables()?;
            plan.select_tables(&tables)?
        };

        let dump = self.db.dump(&selection)?;
        if dump.trim().is_empty() {
            if !self.settings.allow_empty_dump {
                return Err(Error::EmptyDump);
            }
            warn!(
                "Database dump for {} is empty; every dated upload will be deleted",
                plan.label
            );
        }
        Ok(dump)
    }
}
