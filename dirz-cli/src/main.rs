use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use dirz_cli::{extract::run_extract, logger};
use dirz_core::progress::Progress;
use dirz_core::report::{compress_if_exists, ActionContext, TestStatus, WebhookRequest};
use dirz_core::{compress_directory_with, read_archive, verify_against_source, CompressOptions, RestoreOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Status { Success, Failed }

impl From<Status> for TestStatus {
    fn from(s: Status) -> Self {
        match s { Status::Success => TestStatus::Success, Status::Failed => TestStatus::Failed }
    }
}

#[derive(Parser)]
#[command(name="dirz", version, about="Self-verifying directory archives")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Worker threads (0 = one per CPU, 1 = sequential)
    #[arg(long, global = true, env = "DIRZ_JOBS", default_value_t = 0)]
    jobs: usize,
    /// Log periodic progress while working
    #[arg(long, global = true, default_value_t = false)]
    progress: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Archive a directory into <output>/<name>_compressed_<millis>.gz
    Compress {
        source: PathBuf,
        /// Defaults to the system temp directory
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 9, value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,
    },
    /// Restore an archive (default output: ./extracted)
    Extract { archive: PathBuf, output: Option<PathBuf> },
    /// Check an archive against its source directory
    Verify { archive: PathBuf, source: PathBuf },
    /// Print archive metadata and entries
    List { archive: PathBuf },
    /// Compress a test-artifact directory and print the webhook request
    Report {
        #[arg(long)]
        working_dir: PathBuf,
        #[arg(long, default_value = "bbout")]
        dir_name: String,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Status::Success)]
        status: Status,
        #[arg(long)]
        message: Option<String>,
        #[arg(long, env = "GITHUB_REPOSITORY_OWNER", default_value = "")]
        repo_owner: String,
        /// `owner/name` or just `name`
        #[arg(long, env = "GITHUB_REPOSITORY", default_value = "")]
        repo: String,
        #[arg(long, env = "GITHUB_RUN_ID", default_value = "")]
        run_id: String,
        #[arg(long, env = "GITHUB_SHA", default_value = "")]
        sha: String,
        #[arg(long, env = "GITHUB_WORKFLOW", default_value = "")]
        workflow: String,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logger::init(&cli.log_level) {
        eprintln!("logging disabled: {e:#}");
    }
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let progress = cli.progress.then(|| Progress::new(true));
    match cli.cmd {
        Cmd::Compress { source, output, level } => {
            let output = output.unwrap_or_else(std::env::temp_dir);
            let opts = CompressOptions { level, jobs: cli.jobs, progress };
            let arc = compress_directory_with(&source, &output, &opts)
                .with_context(|| format!("compress {}", source.display()))?;
            println!("{}", arc.path.display());
        }
        Cmd::Extract { archive, output } => {
            run_extract(&archive, output, &RestoreOptions { jobs: cli.jobs, progress })?;
        }
        Cmd::Verify { archive, source } => {
            let report = verify_against_source(&archive, &source)
                .with_context(|| format!("verify {}", archive.display()))?;
            println!("OK ({} files)", report.files_checked);
        }
        Cmd::List { archive } => list(&archive)?,
        Cmd::Report { working_dir, dir_name, output, status, message, repo_owner, repo, run_id, sha, workflow } => {
            let output = output.unwrap_or_else(std::env::temp_dir);
            let opts = CompressOptions { jobs: cli.jobs, progress, ..Default::default() };
            let Some(report) = compress_if_exists(&working_dir, &dir_name, &output, status.into(), message, &opts)? else {
                return Ok(());
            };
            let (owner_part, name_part) = repo.split_once('/').unwrap_or(("", repo.as_str()));
            let ctx = ActionContext {
                repo_owner: if repo_owner.is_empty() { owner_part.to_string() } else { repo_owner },
                repo_name: name_part.to_string(),
                run_id,
                commit_sha: sha,
                workflow_name: workflow,
            };
            let req = WebhookRequest::simulate_test(&ctx, &report)?;
            println!("{}", serde_json::to_string_pretty(&req)?);
        }
    }
    Ok(())
}

fn list(archive: &Path) -> Result<()> {
    let mf = read_archive(archive).with_context(|| format!("read {}", archive.display()))?;
    let m = &mf.metadata;
    println!("timestamp: {}", m.timestamp);
    println!("files: {}", m.file_count);
    println!("original: {} bytes", m.total_original_size);
    println!("compressed: {} bytes ({:.2}%)", m.total_compressed_size, m.ratio_pct());
    for (key, rec) in &mf.files {
        println!("{}\t{}\t{}", rec.original_size, rec.compressed_size, key);
    }
    Ok(())
}
