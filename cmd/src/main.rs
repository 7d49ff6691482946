/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod error;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use uuid::Uuid;

use alert_migration::{AlertRule, Dialect, Migrator, SourceAlert};

use error::{Error, Result};

/// Run alert migration operations from the command line.
#[derive(clap::Parser)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    Translate(TranslateArgs),
    Query(QueryArgs),
}

/// Translate an alert export into provisionable alert rules.
#[derive(clap::Args)]
struct TranslateArgs {
    /// Target query dialect.
    #[clap(long, default_value_t = Dialect::Prometheus)]
    dialect: Dialect,
    /// Uid of the target datasource.
    #[clap(long, default_value = "default")]
    datasource_uid: String,
    /// Write one json file per rule into this directory instead of
    /// printing to standard output.
    #[clap(long)]
    out_dir: Option<PathBuf>,
    /// Assign a fresh uid to every generated rule.
    #[clap(long)]
    assign_uids: bool,
    /// Paths to alert export files (a json array of alert records, or a
    /// single record).
    inputs: Vec<PathBuf>,
}

/// Translate a single query expression and print the result.
#[derive(clap::Args)]
struct QueryArgs {
    /// Target query dialect.
    #[clap(long, default_value_t = Dialect::Prometheus)]
    dialect: Dialect,
    /// The source query expression.
    expr: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let res = match &args.cmd {
        Command::Translate(args) => translate(args),
        Command::Query(args) => query(args),
    };

    if let Err(e) = res {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn translate(args: &TranslateArgs) -> Result<()> {
    let migrator = Migrator::new(args.dialect, args.datasource_uid.clone());

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir).map_err(|e| Error::CreateOutDir(dir.clone(), e))?;
    }

    let mut migrated = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for path in &args.inputs {
        // No bad file, record or write may abort the batch.
        let records = match read_records(path) {
            Ok(records) => records,
            Err(e) => {
                log::error!("{e}");
                failed += 1;
                continue;
            }
        };
        for (index, record) in records.into_iter().enumerate() {
            let alert = match serde_json::from_value::<SourceAlert>(record) {
                Ok(alert) => alert,
                Err(e) => {
                    log::error!(
                        "{}: skipping undecodable record {index}: {e}",
                        path.display()
                    );
                    failed += 1;
                    continue;
                }
            };
            let Some(mut rule) = migrator.migrate(&alert) else {
                skipped += 1;
                continue;
            };
            if args.assign_uids {
                rule.uid = Some(Uuid::new_v4().to_string());
            }
            let res = match &args.out_dir {
                Some(dir) => {
                    let name = alert.id.clone().unwrap_or_else(|| index.to_string());
                    write_rule(&dir.join(format!("alert_{name}.json")), &rule)
                }
                None => serde_json::to_string_pretty(&rule)
                    .map_err(Error::EncodeRule)
                    .map(|s| println!("{s}")),
            };
            if let Err(e) = res {
                log::error!("{e}");
                failed += 1;
                continue;
            }
            migrated += 1;
        }
    }

    eprintln!("Migrated {migrated} alert(s); {skipped} skipped, {failed} failed.");
    Ok(())
}

fn write_rule(path: &Path, rule: &AlertRule) -> Result<()> {
    let file =
        std::fs::File::create(path).map_err(|e| Error::WriteRule(path.to_path_buf(), e))?;
    serde_json::to_writer_pretty(file, rule).map_err(Error::EncodeRule)
}

fn read_records(path: &PathBuf) -> Result<Vec<serde_json::Value>> {
    let data = std::fs::read_to_string(path).map_err(|e| Error::ReadExport(path.clone(), e))?;
    let value = serde_json::from_str::<serde_json::Value>(&data)
        .map_err(|e| Error::DecodeExport(path.clone(), e))?;
    Ok(match value {
        serde_json::Value::Array(records) => records,
        record => vec![record],
    })
}

fn query(args: &QueryArgs) -> Result<()> {
    println!(
        "{}",
        alert_migration::translate(&args.expr, args.dialect).text
    );
    Ok(())
}
