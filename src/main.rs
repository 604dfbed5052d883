//! Command-line entry point.
//!
//! ```bash
//! cyberset run                       # all phases
//! cyberset run --phase 5 --skip-malware
//! NVD_API_KEY=... cyberset cve --year 2024
//! cyberset progress
//! ```

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use cyberset::acquire::GitAcquirer;
use cyberset::catalog::Phase;
use cyberset::manager::{LIVE_MALWARE_PHRASE, PhaseResults, RunSummary};
use cyberset::models::PartitionOutcome;
use cyberset::progress::{self, format_size};
use cyberset::sources::CveSource;
use cyberset::sources::nvd::NvdClient;
use cyberset::store::FileStore;
use cyberset::{Config, CveDownloader, HarvestManager};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Errors listed in the terminal summary before the rest are elided.
const SHOWN_ERRORS: usize = 5;

#[derive(Parser)]
#[command(name = "cyberset", version, about = "Download cybersecurity datasets for AI/ML training")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download every phase, or a single one
    Run(RunArgs),
    /// Download the NVD CVE database
    Cve(CveArgs),
    /// Show what has been downloaded so far
    Progress(DirArg),
}

#[derive(Args)]
struct DirArg {
    /// Base directory for datasets
    #[arg(long, value_name = "DIR", env = "CYBERSET_BASE_DIR")]
    dir: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// Run only this phase
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    phase: Option<u8>,

    #[command(flatten)]
    dir: DirArg,

    /// Pull repositories that already exist
    #[arg(long)]
    update: bool,

    /// Never download live malware samples
    #[arg(long)]
    skip_malware: bool,
}

#[derive(Args)]
struct CveArgs {
    /// Download a single publication year
    #[arg(long)]
    year: Option<i32>,

    #[command(flatten)]
    dir: DirArg,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    let _guard = cyberset::logging::init_logging(&config);

    match cli.command {
        Command::Run(args) => {
            apply_dir(&mut config, args.dir);
            config.update |= args.update;
            config.skip_malware |= args.skip_malware;
            run(config, args.phase).await
        }
        Command::Cve(args) => {
            apply_dir(&mut config, args.dir);
            cve(config, args.year).await
        }
        Command::Progress(args) => {
            apply_dir(&mut config, args);
            print_progress(&config);
            Ok(())
        }
    }
}

fn apply_dir(config: &mut Config, arg: DirArg) {
    if let Some(dir) = arg.dir {
        config.base_dir = dir;
    }
}

fn nvd_client(config: &Config) -> anyhow::Result<Arc<NvdClient>> {
    let client = NvdClient::new(config.nvd_api_key.clone()).context("building NVD client")?;
    if client.uses_credential() {
        println!("NVD API key: configured");
    } else {
        println!("NVD API key: not set (requests paced at one per 6 seconds)");
    }
    Ok(Arc::new(client))
}

async fn run(config: Config, phase: Option<u8>) -> anyhow::Result<()> {
    let phases = match phase {
        Some(n) => vec![Phase::from_number(n).context("phase must be between 1 and 5")?],
        None => Phase::ALL.to_vec(),
    };

    println!("Base directory: {}", config.base_dir.display());
    if config.update {
        println!("Update mode: existing repositories will be pulled");
    }
    if config.skip_malware {
        println!("Skip malware mode: live malware samples will be skipped");
    }

    let git = match GitAcquirer::from_path() {
        Some(git) => {
            println!("git: {}", git.git_path().display());
            git
        }
        None if phases.iter().any(|p| p.needs_git()) => {
            bail!("git is not installed or not on PATH")
        }
        // Only the CVE phase is selected; the acquirer is never called.
        None => GitAcquirer::new(PathBuf::from("git")),
    };
    let git = git.with_timeout(config.clone_timeout);

    let confirmed = phases.contains(&Phase::AdvancedThreats)
        && !config.skip_malware
        && confirm_live_malware()?;

    let source = nvd_client(&config)?;
    let manager =
        HarvestManager::new(config, Arc::new(git), source).with_live_malware_confirmed(confirmed);

    let mut summary = manager.run_phases(&phases).await;
    match summary.save().await {
        Ok(path) => println!("\nSummary saved to: {}", path.display()),
        Err(e) => eprintln!("\nCould not save summary: {e}"),
    }
    print_summary(&summary);
    Ok(())
}

/// Ask for [`LIVE_MALWARE_PHRASE`] on stdin. End of input counts as a refusal.
fn confirm_live_malware() -> anyhow::Result<bool> {
    println!();
    println!("DANGER: phase 5 includes repositories with LIVE MALWARE SAMPLES.");
    println!("Only continue inside an isolated VM without network access.");
    println!("Archives are password-protected (password: 'infected').");
    print!("Type '{LIVE_MALWARE_PHRASE}' to continue (anything else skips them): ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    let read = std::io::stdin().lock().read_line(&mut line)?;
    let confirmed = read > 0 && line.trim() == LIVE_MALWARE_PHRASE;
    if !confirmed {
        println!("Skipping live malware samples (safety check not confirmed)");
    }
    Ok(confirmed)
}

async fn cve(config: Config, year: Option<i32>) -> anyhow::Result<()> {
    let dir = config.cve_dir();
    let downloader = CveDownloader::new(nvd_client(&config)?, Arc::new(FileStore::new(&dir)));

    // A single year is a one-partition run; the aggregate reports are left alone.
    let (years, recent_days) = match year {
        Some(year) => (vec![year], None),
        None => (
            config.cve_years.clone(),
            (config.recent_days > 0).then_some(config.recent_days),
        ),
    };

    let report = downloader.run(&years, recent_days).await;
    for outcome in &report.partitions {
        print_partition(outcome);
    }
    if year.is_none() {
        match report.save(&dir).await {
            Ok(stats) => println!("\nTotal CVEs: {} across {} files", stats.total_cves, stats.files),
            Err(e) => eprintln!("\nCould not save CVE reports: {e}"),
        }
    }
    print_errors(report.errors.iter().map(String::as_str));
    Ok(())
}

fn print_partition(outcome: &PartitionOutcome) {
    match outcome {
        PartitionOutcome::Downloaded(r) => println!("  downloaded {}: {} CVEs", r.file, r.cve_count),
        PartitionOutcome::AlreadyExists(r) => {
            println!("  already exists {}: {} CVEs", r.file, r.cve_count)
        }
        PartitionOutcome::Failed { selector, error } => println!("  failed {selector}: {error}"),
    }
}

fn print_errors<'a>(errors: impl ExactSizeIterator<Item = &'a str>) {
    let total = errors.len();
    if total == 0 {
        return;
    }
    println!("\nErrors: {total}");
    for error in errors.take(SHOWN_ERRORS) {
        println!("  - {error}");
    }
    if total > SHOWN_ERRORS {
        println!("  ... and {} more", total - SHOWN_ERRORS);
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\nFINAL SUMMARY");
    println!(
        "  Phases completed: {}/{}",
        summary.successful_phases(),
        summary.phases.len()
    );
    println!("  Total time: {:.1} minutes", summary.total_elapsed_seconds / 60.0);
    if summary.disk_usage_gb > 0.0 {
        println!("  Total disk usage: {:.2} GB", summary.disk_usage_gb);
    }

    for phase in &summary.phases {
        let mark = if phase.is_success() { "ok" } else { "FAILED" };
        let detail = match &phase.results {
            Some(PhaseResults::Repos(r)) => format!("{}/{} repositories", r.succeeded(), r.attempted()),
            Some(PhaseResults::Cve(r)) => format!("{} CVEs", r.total_cves),
            None => String::new(),
        };
        println!(
            "  [{mark}] Phase {}: {} ({:.1} min) {detail}",
            phase.phase.number(),
            phase.name,
            phase.elapsed_seconds / 60.0
        );
    }

    let errors = summary.errors();
    print_errors(errors.into_iter());
    println!("\nDataset location: {}", summary.base_directory.display());
}

fn print_progress(config: &Config) {
    let report = progress::inspect(&config.base_dir);
    println!("Base directory: {}", report.base_dir.display());
    if !report.exists {
        println!("Dataset directory does not exist. Run 'cyberset run' to start downloading.");
        return;
    }

    for phase in &report.phases {
        match phase.files {
            Some(files) => println!(
                "  [done]    {:40} {files} files, {}",
                phase.phase.name(),
                format_size(phase.bytes)
            ),
            None => println!("  [pending] {:40} not started", phase.phase.name()),
        }
    }
    println!(
        "  Total: {} files, {}",
        report.total_files,
        format_size(report.total_bytes)
    );

    if let Some(last) = &report.last_run {
        println!("\nLast download: {}", last.download_date.format("%Y-%m-%d %H:%M:%S"));
        println!("  Total time: {:.1} minutes", last.total_elapsed_seconds / 60.0);
        println!("  Disk usage: {:.2} GB", last.disk_usage_gb);
        println!(
            "  Phases complete: {}/{}",
            last.successful_phases(),
            last.phases.len()
        );
    }
}
