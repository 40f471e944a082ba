mod commands;
mod logging;
mod progress;
mod render;

use clap::Parser;
use commands::{Cli, Commands};
use periscope_core::engine::ScanOptions;
use periscope_core::query::{InfoOptions, LsOptions, TreeOptions};
use periscope_core::remove::RmOptions;
use periscope_core::{config, engine, finish, forget, hash, query, refresh, remove};
use periscope_core::{Database, Error, Result};
use progress::CliReporter;
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);
    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprint!("{}", render::render_error(&err, cli.debug));
            process::exit(1);
        }
    }
}

fn open_db(debug: bool) -> Result<Database> {
    let path = config::db_path()?;
    tracing::debug!("opening catalog at '{}'", path.display());
    Database::open(&path, debug)
}

/// Dispatch one subcommand. `Ok(false)` means per-item errors were printed
/// and the process should exit non-zero without further output.
fn run(cli: &Cli) -> Result<bool> {
    let debug = cli.debug;
    match &cli.command {
        Commands::Scan {
            paths,
            minimum,
            maximum,
        } => {
            let mut db = open_db(debug)?;
            let options = ScanOptions {
                minimum: minimum.unwrap_or(0),
                maximum: maximum.unwrap_or(0),
            };
            engine::scan(&mut db, paths, &options, &CliReporter::new())?;
            Ok(true)
        }
        Commands::Report { path, relative } => {
            let db = open_db(debug)?;
            let sets = query::report(&db, path.as_deref())?;
            render::print_report(&sets, *relative, path.as_deref())?;
            Ok(true)
        }
        Commands::Summary => {
            let db = open_db(debug)?;
            render::print_summary(&query::summary(&db)?);
            Ok(true)
        }
        Commands::Ls {
            paths,
            all,
            verbose,
            duplicate,
            unique,
            relative,
            recursive,
            files,
        } => {
            let db = open_db(debug)?;
            let options = LsOptions {
                all: *all,
                verbose: *verbose,
                duplicate: *duplicate,
                unique: *unique,
                relative: *relative,
                recursive: *recursive,
                files_only: *files,
            };
            let (listings, errors) = query::ls(&db, paths, &options)?;
            render::print_listings(&listings, paths.len() > 1 || options.recursive);
            Ok(report_errors(&errors, debug))
        }
        Commands::Info { paths, relative } => {
            let db = open_db(debug)?;
            let options = InfoOptions {
                relative: *relative,
            };
            let (reports, errors) = query::info(&db, paths, &options)?;
            render::print_info(&reports);
            Ok(report_errors(&errors, debug))
        }
        Commands::Tree { path, all } => {
            let db = open_db(debug)?;
            let entries = query::tree(&db, path, &TreeOptions { all: *all })?;
            render::print_tree(&entries);
            Ok(true)
        }
        Commands::Rm {
            paths,
            recursive,
            verbose,
            dry_run,
            contained,
            arbitrary,
        } => {
            let mut db = open_db(debug)?;
            let options = RmOptions {
                recursive: *recursive,
                dry_run: *dry_run,
                contained: contained.clone(),
                arbitrary: *arbitrary,
            };
            let report = remove::rm(&mut db, paths, &options)?;
            if *verbose || *dry_run {
                for path in &report.removed {
                    println!("rm {}", path.display());
                }
            }
            Ok(report_errors(&report.errors, debug))
        }
        Commands::Forget { paths } => {
            let mut db = open_db(debug)?;
            let report = forget::forget(&mut db, paths)?;
            for path in &report.forgotten {
                let shown = path.display().to_string();
                if shown.ends_with(std::path::MAIN_SEPARATOR) {
                    println!("forgot {shown}*");
                } else {
                    println!("forgot {shown}{}*", std::path::MAIN_SEPARATOR);
                }
            }
            Ok(report_errors(&report.errors, debug))
        }
        Commands::Hash { paths } => {
            let mut db = open_db(debug)?;
            let report = hash::hash(&mut db, paths)?;
            for hashed in &report.hashed {
                println!("{}  {}", render::hex(&hashed.full_hash), hashed.path.display());
            }
            Ok(report_errors(&report.errors, debug))
        }
        Commands::Refresh => {
            let mut db = open_db(debug)?;
            let removed = refresh::refresh(&mut db, &CliReporter::new())?;
            println!("removed {removed} files from the database");
            Ok(true)
        }
        Commands::Export => {
            let db = open_db(debug)?;
            let document = query::export(&db)?;
            let rendered = serde_json::to_string_pretty(&document)
                .map_err(|err| Error::internal(format!("cannot encode export: {err}")))?;
            println!("{rendered}");
            Ok(true)
        }
        Commands::Finish => {
            if let Some(path) = finish::finish()? {
                println!("rm {}", path.display());
            }
            Ok(true)
        }
    }
}

fn report_errors(errors: &[Error], debug: bool) -> bool {
    for err in errors {
        eprint!("{}", render::render_error(err, debug));
    }
    errors.is_empty()
}
