use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use starlight_convert_config::{LoadOptions, MigrationConfig};
use starlight_convert_ops::{FolderReport, Migration, Phases, RunOptions, RunReport};
use tracing_subscriber::EnvFilter;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut load = LoadOptions::default();
    if let Some(path) = cli.config {
        load = load.with_override_path(path);
    }
    if let Some(path) = cli.source_root {
        load = load.with_source_root(path);
    }
    if let Some(path) = cli.target_root {
        load = load.with_target_root(path);
    }
    let config = MigrationConfig::load(load)?;
    tracing::info!(config = %config.source, folders = config.folders.len(), "loaded configuration");
    let migration = Migration::new(config);

    match cli.command {
        Command::Run(args) => handle_run(&migration, Phases::All, args),
        Command::Copy(args) => handle_run(&migration, Phases::CopyOnly, args.into()),
        Command::Rewrite(args) => handle_run(&migration, Phases::RewriteOnly, args),
        Command::Params(args) => handle_params(&migration, args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_run(migration: &Migration, phases: Phases, args: RunArgs) -> Result<i32> {
    let RunArgs { folder, diff, json } = args;
    let options = RunOptions {
        phases,
        folders: folder,
        capture_diffs: diff,
    };

    // A deleted stub's mapping is printed even if a later file fails.
    let mut pending = Vec::new();
    let result = migration.run_with(&options, |record| {
        if json {
            pending.push(record.to_string());
        } else {
            println!("{record}");
        }
    });
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            for line in &pending {
                eprintln!("{line}");
            }
            return Err(err.into());
        }
    };

    if json {
        emit(&serde_json::to_string_pretty(&report)?);
        return Ok(0);
    }

    emit(&render_report(&report, diff));
    Ok(0)
}

fn handle_params(migration: &Migration, args: ParamsArgs) -> Result<i32> {
    let site = migration.site_config(&args.mount)?;
    if let Some(origin) = site.origin() {
        tracing::info!(path = %origin.display(), "site configuration");
    }

    if site.is_empty() {
        tracing::warn!(mount = %args.mount, "folder has no site parameters");
        return Ok(0);
    }

    let mut out = String::new();
    for (name, value) in site.entries() {
        out.push_str(&format!("{name} = {value}\n"));
    }
    emit(&out);
    Ok(0)
}

fn render_report(report: &RunReport, with_diffs: bool) -> String {
    let mut out = String::new();
    for folder in &report.folders {
        out.push_str(&summary_line(folder));
        out.push('\n');
    }

    if with_diffs {
        for folder in &report.folders {
            for diff in &folder.diffs {
                out.push('\n');
                out.push_str(&diff.diff);
            }
        }
    }
    out
}

fn summary_line(folder: &FolderReport) -> String {
    let mut parts = Vec::new();
    if let Some(copied) = folder.copied {
        parts.push(format!(
            "copied {} files ({} directories created)",
            copied.files_copied, copied.directories_created
        ));
    }
    if let Some(stats) = folder.rewrite {
        parts.push(format!(
            "rewrote {} of {} files ({} unchanged, {} renamed, {} redirects removed)",
            stats.rewritten, stats.scanned, stats.unchanged, stats.renamed, stats.deleted
        ));
    }
    format!("{}: {}", folder.mount, parts.join("; "))
}

fn emit(content: &str) {
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Migrate Hugo documentation folders to Starlight",
    propagate_version = true
)]
struct Cli {
    /// Use this config file instead of `.starlight-convert.toml`
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the Hugo documentation root
    #[arg(long = "source-root", global = true, value_name = "PATH")]
    source_root: Option<PathBuf>,
    /// Override the Starlight content root
    #[arg(long = "target-root", global = true, value_name = "PATH")]
    target_root: Option<PathBuf>,
    /// Log progress at info level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy each folder and rewrite its content
    Run(RunArgs),
    /// Copy source folders into the target tree only
    Copy(CopyArgs),
    /// Rewrite an already copied target tree
    Rewrite(RunArgs),
    /// Print the flattened site parameters of one folder
    Params(ParamsArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Limit the run to a folder mount path (repeatable)
    #[arg(long, value_name = "MOUNT", action = ArgAction::Append)]
    folder: Vec<String>,
    /// Print unified diffs of rewritten files
    #[arg(long)]
    diff: bool,
    /// Print the run report as JSON
    #[arg(long, conflicts_with = "diff")]
    json: bool,
}

#[derive(Args)]
struct CopyArgs {
    /// Limit the copy to a folder mount path (repeatable)
    #[arg(long, value_name = "MOUNT", action = ArgAction::Append)]
    folder: Vec<String>,
    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

impl From<CopyArgs> for RunArgs {
    fn from(args: CopyArgs) -> Self {
        RunArgs {
            folder: args.folder,
            diff: false,
            json: args.json,
        }
    }
}

#[derive(Args)]
struct ParamsArgs {
    /// Folder mount path, e.g. `bff/v3`
    #[arg(value_name = "MOUNT")]
    mount: String,
}
