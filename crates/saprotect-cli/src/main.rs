mod commands;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use saprotect_core::storage::Database;
use saprotect_core::{report, AppConfig, Error, RemediationEngine, Resolution, ScanEngine};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let guard = logging::init_logger();

    let args = Cli::parse();

    let mut config = match saprotect_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };
    if let Some(db) = &args.db {
        config.database_path = db.to_string_lossy().into_owned();
    }

    let db_path = config.resolved_database_path();
    let db = match Database::open(&db_path) {
        Ok(db) => db,
        Err(err) => {
            error!("{}", err);
            eprintln!("Exiting");
            drop(guard);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Protect(protect)) => {
            run_protect(&db, &config, &protect.targets, protect.add_only, args.clean)
        }
        Some(Commands::RemediateOld(remediate)) => {
            run_remediate(&db, &config, &remediate.targets, Resolution::KeepOld)
        }
        Some(Commands::RemediateNew(remediate)) => {
            run_remediate(&db, &config, &remediate.targets, Resolution::KeepNew)
        }
        Some(Commands::ListMismatches { paths_only }) => {
            run_list_mismatches(&db, !paths_only, args.clean)
        }
        Some(Commands::ShowDuplicates { file }) => run_show_duplicates(&db, &file, args.clean),
        Some(Commands::History { limit }) => run_history(&db, limit, args.clean),
        Some(Commands::Dump) => run_dump(&db),
        Some(Commands::Info) | None => run_info(&db, args.clean),
    };

    db.close().context("closing integrity store")?;
    result
}

fn run_protect(
    db: &Database,
    config: &AppConfig,
    targets: &[PathBuf],
    add_only: bool,
    clean: bool,
) -> anyhow::Result<()> {
    let engine = ScanEngine::new(config);
    let reporter = CliReporter::new();

    let result = match engine.scan(db, targets, add_only, &reporter) {
        Ok(result) => result,
        Err(Error::PendingMismatch(_)) => {
            println!("{}", "ERROR: Remediate mismatches below first!".red().bold());
            print!("{}", report::render_mismatches(&report::mismatches(db)?, false, clean));
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if !result.failures.is_empty() {
        eprintln!(
            "{}",
            format!("{} file(s) could not be read:", result.failures.len()).yellow()
        );
        for failure in &result.failures {
            eprintln!("  {}: {}", failure.path.display(), failure.error);
        }
    }
    print!("{}", report::render_session(&result.session, clean));
    if result.session.files_mismatched > 0 && !clean {
        println!(
            "{}",
            "Run `saprotect list-mismatches` to review the changed files.".red()
        );
    }
    Ok(())
}

fn run_remediate(
    db: &Database,
    config: &AppConfig,
    targets: &[PathBuf],
    resolution: Resolution,
) -> anyhow::Result<()> {
    let engine = RemediationEngine::new(config);
    let reporter = CliReporter::new();
    let result = engine.remediate(db, targets, resolution, &reporter)?;
    info!(
        "{} record(s) remediated, {} skipped",
        result.remediated.len(),
        result.skipped.len()
    );
    Ok(())
}

fn run_list_mismatches(db: &Database, show_hashes: bool, clean: bool) -> anyhow::Result<()> {
    let records = report::mismatches(db)?;
    print!("{}", report::render_mismatches(&records, show_hashes, clean));
    Ok(())
}

fn run_show_duplicates(db: &Database, filename: &str, clean: bool) -> anyhow::Result<()> {
    let records = report::duplicates(db, filename)?;
    print!("{}", report::render_duplicates(filename, &records, clean));
    Ok(())
}

fn run_info(db: &Database, clean: bool) -> anyhow::Result<()> {
    match report::last_session(db)? {
        Some(session) => print!("{}", report::render_session(&session, clean)),
        None => {
            if !clean {
                println!("No scans recorded yet. Run `saprotect protect TARGET...` first.");
            }
        }
    }
    Ok(())
}

fn run_history(db: &Database, limit: usize, clean: bool) -> anyhow::Result<()> {
    for session in report::session_history(db, limit)? {
        if clean {
            println!(
                "{} {} {} {} {} {}",
                session.start.to_rfc3339(),
                session.end.to_rfc3339(),
                session.files_scanned,
                session.files_added,
                session.files_updated,
                session.files_mismatched
            );
        } else {
            println!(
                "{}  {} scanned, {} added, {} updated, {}",
                report::format_local(&session.start).cyan(),
                session.files_scanned,
                session.files_added,
                session.files_updated,
                if session.files_mismatched > 0 {
                    format!("{} mismatched", session.files_mismatched).red()
                } else {
                    "0 mismatched".green()
                }
            );
        }
    }
    Ok(())
}

fn run_dump(db: &Database) -> anyhow::Result<()> {
    print!("{}", report::render_dump(&db.all_records()?));
    Ok(())
}
