//! One-shot maintenance bot for extension repositories.
//!
//! Reads the repository checklist from a tracking issue and, one repository at
//! a time, applies a patch and opens (or updates) a pull request.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use patchbot::core::types::RepoRef;
use patchbot::io::config::{BotConfig, DEFAULT_CONFIG_PATH, load_config, write_config};
use patchbot::io::gh::GhCli;
use patchbot::io::git::GitCli;
use patchbot::io::page::{PageSource, list_repos};
use patchbot::io::workspace::create_work_dir;
use patchbot::logging;
use patchbot::patch::PatchKind;
use patchbot::pipeline::{Pipeline, RepoOutcome};
use patchbot::publish::{PublishOutcome, PublishSettings};
use patchbot::retry::{FixedDecision, RetryOutcome, RetryPolicy, TerminalPrompt, run_with_retry};

#[derive(Parser)]
#[command(
    name = "patchbot",
    version,
    about = "Patch every repository listed in a tracking issue and open pull requests"
)]
struct Cli {
    /// Bot configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the repositories listed on the issue page.
    List {
        /// Read the page from a local HTML file instead of `issue_url`.
        #[arg(long)]
        page: Option<PathBuf>,
    },
    /// Patch every listed repository and open pull requests.
    Run {
        #[arg(long, value_enum)]
        patch: PatchKind,
        /// Read the page from a local HTML file instead of `issue_url`.
        #[arg(long)]
        page: Option<PathBuf>,
        /// Only process these repositories (`owner/name`, repeatable).
        #[arg(long)]
        only: Vec<String>,
        /// Commit locally but do not push or open pull requests.
        #[arg(long)]
        dry_run: bool,
        /// Abandon failed repositories instead of asking whether to retry.
        #[arg(long)]
        no_prompt: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::List { page } => cmd_list(&cli.config, page),
        Command::Run {
            patch,
            page,
            only,
            dry_run,
            no_prompt,
        } => cmd_run(
            &cli.config,
            RunOptions {
                patch,
                page,
                only,
                dry_run,
                no_prompt,
            },
        ),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &BotConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(())
}

fn cmd_list(config_path: &Path, page: Option<PathBuf>) -> Result<()> {
    let cfg = load_config(config_path)?;
    let source = PageSource::choose(page, &cfg.issue_url)?;
    for repo in list_repos(&source)? {
        println!("{repo}");
    }
    Ok(())
}

struct RunOptions {
    patch: PatchKind,
    page: Option<PathBuf>,
    only: Vec<String>,
    dry_run: bool,
    no_prompt: bool,
}

fn cmd_run(config_path: &Path, opts: RunOptions) -> Result<()> {
    let cfg = load_config(config_path)?;
    let source = PageSource::choose(opts.page, &cfg.issue_url)?;
    let repos = select_repos(list_repos(&source)?, &opts.only);
    if repos.is_empty() {
        println!("no repositories to process");
        return Ok(());
    }

    let patch = opts.patch.build(&cfg)?;
    let workspace = create_work_dir(&cfg.work_dir)
        .with_context(|| format!("prepare work dir {}", cfg.work_dir.display()))?;
    let limits = cfg.process_limits();
    let hosting = GhCli::new(limits);
    let vcs = GitCli::new(limits);
    let settings = PublishSettings::from_config(&cfg, opts.dry_run);
    let pipeline = Pipeline::new(
        &hosting,
        &vcs,
        &workspace,
        patch.as_ref(),
        &cfg.port,
        &settings,
    );
    let mut policy: Box<dyn RetryPolicy> = if opts.no_prompt {
        Box::new(FixedDecision(false))
    } else {
        Box::new(TerminalPrompt::stdin())
    };

    info!(count = repos.len(), patch = patch.name(), "starting run");
    let mut summary = Vec::with_capacity(repos.len());
    for repo in &repos {
        let outcome = run_with_retry(repo, policy.as_mut(), || pipeline.process(repo));
        summary.push((repo.clone(), outcome));
    }

    println!();
    for (repo, outcome) in &summary {
        println!("{}", summary_line(repo, outcome));
    }
    Ok(())
}

/// Keep only the repositories named by `--only` (all of them when empty).
fn select_repos(repos: Vec<RepoRef>, only: &[String]) -> Vec<RepoRef> {
    if only.is_empty() {
        return repos;
    }
    repos
        .into_iter()
        .filter(|repo| {
            let full_name = repo.full_name();
            only.iter()
                .any(|wanted| wanted.trim_matches('/').eq_ignore_ascii_case(&full_name))
        })
        .collect()
}

fn summary_line(listed: &RepoRef, outcome: &RetryOutcome<RepoOutcome>) -> String {
    match outcome {
        RetryOutcome::Completed { value, attempts } => {
            let name = if value.repo.full_name() == listed.full_name() {
                listed.to_string()
            } else {
                format!("{listed} -> {}", value.repo)
            };
            let status = match &value.publish {
                PublishOutcome::Opened { url, .. } => format!("opened {url}"),
                PublishOutcome::Updated { branch } => format!("updated {branch}"),
                PublishOutcome::Skipped => "unchanged".to_string(),
                PublishOutcome::DryRun { branch } => format!("committed on {branch} (dry run)"),
            };
            if *attempts > 1 {
                format!("{name}: {status} after {attempts} attempts")
            } else {
                format!("{name}: {status}")
            }
        }
        RetryOutcome::Abandoned {
            attempts,
            last_error,
        } => format!("{listed}: abandoned after {attempts} attempt(s): {last_error}"),
    }
}
