use anyhow::{Context, Result};
use branch_sweep::{
    config, AnalyzeProgress, BranchInfo, BranchStatus, DeleteResult, FastForwardResult, Sweeper,
};
use clap::Parser;
use colored::*;
use serde::Serialize;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "Read settings from this file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Trunk branch to compare against (default: main)")]
    trunk: Option<String>,

    #[arg(long, help = "Remote to compare against (default: origin)")]
    remote: Option<String>,

    #[arg(long, help = "Skip `git fetch --prune` before analysis")]
    no_fetch: bool,

    #[arg(long, help = "Fast-forward branches that are strictly behind their upstream")]
    fast_forward: bool,

    #[arg(long, help = "Delete branches already merged into trunk")]
    delete_merged: bool,

    #[arg(long, help = "With --delete-merged, only list what would be deleted")]
    dry_run: bool,

    #[arg(long, help = "Print results as JSON")]
    json: bool,

    #[arg(short, long, action, help = "Enable verbose output")]
    verbose: bool,
}

#[derive(Serialize)]
struct Report {
    trunk: String,
    remote: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fast_forwarded: Vec<FastForwardResult>,
    branches: Vec<BranchInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deleted: Vec<DeleteResult>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let mut settings = config::load_config(&cwd, cli.config.as_deref())?;
    if let Some(trunk) = cli.trunk {
        settings.trunk = trunk;
    }
    if let Some(remote) = cli.remote {
        settings.remote = remote;
    }

    let sweeper = Sweeper::open(cwd.clone(), settings);
    sweeper.ensure_environment()?;

    if !cli.no_fetch {
        sweeper
            .fetch()
            .with_context(|| format!("Failed to fetch from '{}'", sweeper.remote()))?;
    }

    let fast_forwarded = if cli.fast_forward {
        sweeper.plan_fast_forwards()?
    } else {
        Vec::new()
    };

    let show_progress = !cli.json && std::io::stderr().is_terminal();
    let progress = |event: &AnalyzeProgress| {
        if show_progress {
            let mut err = std::io::stderr().lock();
            let _ = write!(
                err,
                "\r\x1b[2KAnalyzing {}/{} {}",
                event.current, event.total, event.branch
            );
            let _ = err.flush();
        }
    };
    let branches = sweeper.classify_all(&progress)?;
    if show_progress {
        eprint!("\r\x1b[2K");
    }

    let deleted = if cli.delete_merged && !cli.dry_run {
        let worktrees = sweeper.list_worktrees()?;
        let requests = sweeper.deletion_requests(&branches, &worktrees, BranchStatus::Merged);
        sweeper.delete_branches(&requests)
    } else {
        Vec::new()
    };

    let failures = fast_forwarded.iter().filter(|r| r.error.is_some()).count()
        + deleted.iter().filter(|r| !r.deleted).count();

    let report = Report {
        trunk: sweeper.trunk().to_string(),
        remote: sweeper.remote().to_string(),
        fast_forwarded,
        branches,
        deleted,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cli.delete_merged && cli.dry_run);
    }

    if failures > 0 {
        anyhow::bail!("{failures} branch operation(s) failed");
    }
    Ok(())
}

fn status_label(status: BranchStatus) -> ColoredString {
    let label = format!("{:<12}", status.as_str());
    match status {
        BranchStatus::Merged => label.green(),
        BranchStatus::Unpushed => label.red(),
        BranchStatus::NeedsRebase => label.yellow(),
        BranchStatus::Active => label.cyan(),
    }
}

fn print_report(report: &Report, dry_run: bool) {
    for ff in &report.fast_forwarded {
        match (&ff.error, ff.updated) {
            (Some(e), _) => println!("{} {}: {}", "✗".red(), ff.branch, e),
            (None, true) => println!("{} fast-forwarded {}", "↑".green(), ff.branch),
            (None, false) => {}
        }
    }

    if report.branches.is_empty() {
        println!("No branches besides {}.", report.trunk.bold());
    }
    for info in &report.branches {
        println!("{} {}", status_label(info.status), info.name);
    }

    if dry_run {
        let merged: Vec<&str> = report
            .branches
            .iter()
            .filter(|b| b.status == BranchStatus::Merged)
            .map(|b| b.name.as_str())
            .collect();
        if !merged.is_empty() {
            println!("\nWould delete: {}", merged.join(", ").yellow());
        }
    }

    for d in &report.deleted {
        match &d.error {
            None => println!("{} deleted {}", "✓".green(), d.branch),
            Some(e) => println!("{} {}: {}", "✗".red(), d.branch, e),
        }
    }
}
