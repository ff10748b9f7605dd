mod commands;
mod logging;
mod reporter;

use std::process;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use reporter::CliReporter;
use tracing::{debug, error, info};
use wp_clean_uploads::config::load_configuration;
use wp_clean_uploads::{CleanEngine, MysqlClient};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let guard = logging::init_logger(args.verbose);

    let result = run(&args);
    if let Err(err) = &result {
        error!("Error: {:#}", err);
    }

    // Flush the file log before exiting.
    drop(guard);
    if result.is_err() {
        process::exit(1);
    }
}

fn run(args: &Cli) -> anyhow::Result<()> {
    let settings = load_configuration(&args.config)
        .context("Error loading configuration")?
        .resolve()?;
    debug!("Settings: {:?}", settings);

    let db = MysqlClient::new(settings.credentials.clone())
        .with_tools(&settings.mysqldump_path, &settings.mysql_path);
    let engine = CleanEngine::new(settings, db);
    let reporter = CliReporter::new(args.verbose);

    let report = engine.run(&reporter)?;

    info!(
        "{} files deleted, {} could not be removed, {} empty folders removed",
        format!("{}", report.total_deleted()).red(),
        format!("{}", report.total_failed()).yellow(),
        format!("{}", report.total_dirs_removed()).cyan(),
    );
    println!("{} Finished!", "Success:".green().bold());

    Ok(())
}
