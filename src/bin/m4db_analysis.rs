use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use m4db_analysis::app::{App, ExportResult, ProgressSinkKind, RetrieveOptions, RetrieveResult};
use m4db_analysis::catalog::SqliteCatalog;
use m4db_analysis::codec;
use m4db_analysis::config::{ConfigLoader, ResolvedConfig};
use m4db_analysis::domain::{MissingArchivePolicy, ModelFilter};
use m4db_analysis::error::M4dbError;
use m4db_analysis::output::{JsonOutput, OutputMode};
use m4db_analysis::store::SourceTree;
use m4db_analysis::tui::Tui;

#[derive(Parser)]
#[command(name = "m4db-analysis")]
#[command(about = "Retrieve and export finished models from an m4db catalog")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Config file (defaults to ./m4db-analysis.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Catalog database file, overrides the config
    #[arg(long, global = true)]
    catalog: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Copy model archives for a user/project into a destination tree")]
    RetrieveModels(RetrieveArgs),
    #[command(about = "Export a user/project's model statistics as CSV")]
    ModelStats(StatsArgs),
    #[command(about = "Count the rows of a catalog table")]
    Count(CountArgs),
    #[command(about = "Print the archive directory of a unique id")]
    UidToDir(UidToDirArgs),
    #[command(about = "Print the unique id of an archive directory")]
    DirToUid(DirToUidArgs),
}

#[derive(Args)]
struct RetrieveArgs {
    /// User name pattern (SQL LIKE)
    db_user: String,
    /// Project name pattern (SQL LIKE)
    project_name: String,
    destination_dir: Utf8PathBuf,

    #[arg(long)]
    source_dir: Option<Utf8PathBuf>,

    /// Skip models whose archive is missing instead of aborting
    #[arg(long)]
    skip_missing: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct StatsArgs {
    db_user: String,
    project_name: String,
    output_csv: Utf8PathBuf,
}

#[derive(Args)]
struct CountArgs {
    #[arg(default_value = "model")]
    table: String,
}

#[derive(Args)]
struct UidToDirArgs {
    uid: String,

    /// Print the full archive path under the source root
    #[arg(long)]
    archive: bool,
}

#[derive(Args)]
struct DirToUidArgs {
    path: Utf8PathBuf,
}

#[derive(Serialize)]
struct CodecResult {
    unique_id: String,
    path: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<M4dbError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &M4dbError) -> u8 {
    match error {
        M4dbError::InvalidUidFormat(_)
        | M4dbError::InvalidSegmentCount(_)
        | M4dbError::InvalidHexPair(_)
        | M4dbError::InvalidTableName(_)
        | M4dbError::MissingConfig(_) => 2,
        M4dbError::CatalogUnavailable(_) | M4dbError::QueryFailed(_) => 3,
        M4dbError::SourceArchiveMissing { .. }
        | M4dbError::SourceReadFailed { .. }
        | M4dbError::OutputWriteFailed { .. }
        | M4dbError::InvalidPathComponent(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(catalog) = cli.catalog {
        resolved.catalog.path = catalog;
    }

    match cli.command {
        Commands::RetrieveModels(args) => run_retrieve(args, resolved, output_mode),
        Commands::ModelStats(args) => run_stats(args, resolved, output_mode),
        Commands::Count(args) => run_count(args, resolved, output_mode),
        Commands::UidToDir(args) => run_uid_to_dir(args, resolved, output_mode),
        Commands::DirToUid(args) => run_dir_to_uid(args, resolved, output_mode),
    }
}

fn run_retrieve(
    args: RetrieveArgs,
    mut resolved: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let RetrieveArgs {
        db_user,
        project_name,
        destination_dir,
        source_dir,
        skip_missing,
        dry_run,
    } = args;

    if let Some(source_dir) = source_dir {
        resolved.source_root = source_dir;
    }
    let options = RetrieveOptions {
        on_missing_archive: if skip_missing {
            MissingArchivePolicy::Skip
        } else {
            resolved.on_missing_archive
        },
        dry_run,
    };
    let filter = ModelFilter::new(db_user, project_name);
    let catalog = SqliteCatalog::open(&resolved.catalog)?;
    let app = App::new(catalog, SourceTree::new(resolved.source_root));

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.retrieve(&filter, &destination_dir, options, &JsonOutput)?;
            JsonOutput::print_value(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new(ProgressSinkKind::Retrieve);
            let result =
                tui.run(move |sink| app.retrieve(&filter, &destination_dir, options, sink))?;
            print_retrieve_summary(&result);
            Ok(())
        }
    }
}

fn run_stats(
    args: StatsArgs,
    resolved: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let filter = ModelFilter::new(args.db_user, args.project_name);
    let catalog = SqliteCatalog::open(&resolved.catalog)?;
    let app = App::new(catalog, SourceTree::new(resolved.source_root));
    let output_csv = args.output_csv;

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.export(&filter, &output_csv, &JsonOutput)?;
            JsonOutput::print_value(&result).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new(ProgressSinkKind::Export);
            let result = tui.run(move |sink| app.export(&filter, &output_csv, sink))?;
            print_export_summary(&result);
            Ok(())
        }
    }
}

fn run_count(
    args: CountArgs,
    resolved: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let catalog = SqliteCatalog::open(&resolved.catalog)?;
    let app = App::new(catalog, SourceTree::new(resolved.source_root));
    let result = app.count_rows(&args.table)?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_value(&result).into_diagnostic(),
        OutputMode::Interactive => {
            println!("There are {} rows in '{}'.", result.rows, result.table);
            Ok(())
        }
    }
}

fn run_uid_to_dir(
    args: UidToDirArgs,
    resolved: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let path = if args.archive {
        SourceTree::new(resolved.source_root).archive_path(&args.uid)?
    } else {
        codec::uid_to_dir(&args.uid)?
    };
    print_codec(
        CodecResult {
            unique_id: args.uid,
            path: path.to_string(),
        },
        output_mode,
        |result| result.path.clone(),
    )
}

fn run_dir_to_uid(
    args: DirToUidArgs,
    resolved: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let unique_id = codec::dir_to_uid_under(&resolved.source_root, &args.path)?;
    print_codec(
        CodecResult {
            unique_id,
            path: args.path.to_string(),
        },
        output_mode,
        |result| result.unique_id.clone(),
    )
}

fn print_codec(
    result: CodecResult,
    output_mode: OutputMode,
    line: impl Fn(&CodecResult) -> String,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_value(&result).into_diagnostic(),
        OutputMode::Interactive => {
            println!("{}", line(&result));
            Ok(())
        }
    }
}

fn print_retrieve_summary(result: &RetrieveResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}I retrieved {} objects{reset}", result.matched);
    if result.dry_run {
        println!(
            "{yellow}dry run: {} archives would be copied{reset}",
            result.retrieved
        );
    } else {
        println!("{green}copied {} archives{reset}", result.retrieved);
    }
    if !result.skipped.is_empty() {
        println!(
            "{yellow}skipped {} models with missing archives:{reset}",
            result.skipped.len()
        );
        for uid in &result.skipped {
            println!("{yellow}   {uid}{reset}");
        }
    }
}

fn print_export_summary(result: &ExportResult) {
    let green = "\x1b[32m";
    let reset = "\x1b[0m";
    println!(
        "{green}I retrieved {} objects, written to {}{reset}",
        result.rows, result.output_path
    );
}
