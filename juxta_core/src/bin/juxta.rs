use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use juxta_core::boundary::RequestError;
use juxta_core::config::Config;
use juxta_core::diff::{DiffEngine, DiffLimits, DiffOptions};
use juxta_core::excerpt::HunkPaginator;
use juxta_core::repository::{Git2Backend, Repository};
use juxta_core::resolver::{CompareOptions, CompareResolver};
use juxta_core::{CompareSummary, Diff, ExcerptWindow, ExpandDirection, PullRequestDraft, WhitespaceMode};
use juxta_directory::{ManifestError, StaticDirectory};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "juxta",
    version,
    about = "Resolve compare requests and expand diff context for hosted repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file
    #[arg(long, global = true, env = "JUXTA_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a compare fragment such as `main...bob:feature`
    Compare(CompareArgs),
    /// Reveal collapsed lines of a file
    Excerpt(ExcerptArgs),
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Directory manifest (TOML)
    #[arg(long)]
    directory: Utf8PathBuf,

    /// Base repository
    #[arg(long, value_name = "OWNER/NAME")]
    repo: String,

    /// Acting user; anonymous when omitted
    #[arg(long)]
    actor: Option<String>,

    /// Skip commit listing and candidate repositories
    #[arg(long)]
    file_only: bool,

    /// Include the rendered diff
    #[arg(long)]
    diff: bool,

    /// show-all, ignore-all, ignore-change or ignore-eol
    #[arg(long)]
    whitespace: Option<String>,

    /// Omit files sorting before this path
    #[arg(long)]
    skip_to: Option<String>,

    /// `base...[owner[/repo]:]head` or `base..head`
    fragment: String,
}

#[derive(Args, Debug)]
struct ExcerptArgs {
    /// Repository location
    #[arg(long)]
    repo_path: Utf8PathBuf,

    /// Commit the file is read at
    #[arg(long)]
    commit: String,

    /// Repository-relative file path
    #[arg(long)]
    path: Utf8PathBuf,

    #[arg(long)]
    last_left: u32,
    #[arg(long)]
    last_right: u32,
    #[arg(long)]
    left: u32,
    #[arg(long)]
    right: u32,
    #[arg(long, default_value_t = 0)]
    left_hunk_size: u32,
    #[arg(long, default_value_t = 0)]
    right_hunk_size: u32,

    #[arg(long, value_enum)]
    direction: Direction,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for ExpandDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
        }
    }
}

#[derive(Serialize)]
struct CompareOutput {
    #[serde(flatten)]
    summary: CompareSummary,
    heading: String,
    before_commit_id: String,
    after_commit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pull_request: Option<PullRequestDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_empty_pull_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<Diff>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(err))
        }
    }
}

/// 0 success, 1 internal or backend failure, 2 malformed request or
/// configuration, 3 not found.
fn exit_code(err: anyhow::Error) -> u8 {
    if err.is::<ManifestError>() {
        return 2;
    }
    match err.downcast::<juxta_core::Error>() {
        Ok(err) => RequestError::from(err).exit_code(),
        Err(_) => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Compare(args) => compare(&config, args),
        Command::Excerpt(args) => excerpt(&config, &args),
    }
}

fn compare(config: &Config, args: CompareArgs) -> Result<()> {
    let directory = StaticDirectory::from_manifest_path(&args.directory)?;
    let Some((owner, name)) = args.repo.split_once('/') else {
        return Err(juxta_core::Error::MalformedRequest {
            fragment: args.repo.clone(),
            reason: "repository must be written as owner/name",
        }
        .into());
    };

    let resolver = CompareResolver::new(Arc::new(directory), Arc::new(Git2Backend::new()));
    let base = resolver.open_base(owner, name, args.actor.as_deref())?;
    let comparison = resolver.resolve(
        &args.fragment,
        &base,
        CompareOptions {
            file_only: args.file_only,
        },
    )?;

    let diff = if args.diff && !comparison.nothing_to_compare {
        let options = DiffOptions {
            whitespace: args
                .whitespace
                .as_deref()
                .map_or(config.diff.whitespace, WhitespaceMode::from_flag),
            skip_to: args.skip_to,
        };
        let engine = DiffEngine::new(DiffLimits::from_config(&config.diff));
        Some(engine.diff(
            &*comparison.head_git,
            comparison.before_commit_id(),
            comparison.after_commit_id(),
            &options,
        )?)
    } else {
        None
    };

    let output = CompareOutput {
        summary: comparison.summary(),
        heading: comparison.heading(),
        before_commit_id: comparison.before_commit_id().to_owned(),
        after_commit_id: comparison.after_commit_id().to_owned(),
        pull_request: (!comparison.nothing_to_compare).then(|| comparison.pull_request_draft()),
        allow_empty_pull_request: comparison
            .nothing_to_compare
            .then(|| comparison.allow_empty_pull_request()),
        diff,
    };
    print_json(&output)
}

fn excerpt(config: &Config, args: &ExcerptArgs) -> Result<()> {
    let repo = Repository::open(&args.repo_path)?;
    let window = ExcerptWindow {
        last_left: args.last_left,
        last_right: args.last_right,
        left: args.left,
        right: args.right,
        left_hunk_size: args.left_hunk_size,
        right_hunk_size: args.right_hunk_size,
    };
    let excerpt = HunkPaginator::from_config(&config.excerpt).expand_blob(
        &repo,
        &args.commit,
        &args.path,
        window,
        args.direction.into(),
    )?;
    print_json(&excerpt)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("failed to encode output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_request_outcome() {
        let not_found = anyhow::Error::from(juxta_core::Error::PermissionDenied {
            owner: "alice".into(),
            name: "secret".into(),
        });
        assert_eq!(exit_code(not_found), 3);

        let malformed = anyhow::Error::from(juxta_core::Error::MalformedRequest {
            fragment: "main".into(),
            reason: "missing range separator",
        });
        assert_eq!(exit_code(malformed), 2);

        assert_eq!(exit_code(anyhow::anyhow!("something else")), 1);
    }

    #[test]
    fn cli_parses_compare_flags() {
        let cli = Cli::try_parse_from([
            "juxta",
            "-vv",
            "compare",
            "--directory",
            "dir.toml",
            "--repo",
            "alice/widget",
            "--file-only",
            "main...bob:feature",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert!(args.file_only);
        assert_eq!(args.fragment, "main...bob:feature");
    }
}
