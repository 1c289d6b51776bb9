//! scrivener - CLI entry point.

use std::env;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scrivener::checks::CommandCheckRunner;
use scrivener::config::{CheckScope, Config};
use scrivener::flow::{BatchOrchestrator, BatchSummary, ProcessResult, collect_files};
use scrivener::git::CommitRequest;
use scrivener::{
    Backend, CliBackend, CommitPipeline, DialoguerOperator, FixedOperator, GitCli, Operator,
    PipelineOptions, Provider, Stage, Vcs,
};

/// Write conventional commit messages for staged changes.
#[derive(Parser, Debug)]
#[command(name = "scrivener")]
#[command(about = "Write conventional commit messages for staged changes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a message for everything staged and commit it
    Commit {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Commit each changed file separately
    Flow {
        /// Maximum number of files to process (0 = all)
        #[arg(default_value_t = 0)]
        count: usize,

        /// Only consider changes under this path
        #[arg(long, default_value = ".")]
        path: String,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Run external checks for this scope
    #[arg(long, value_enum)]
    check: Option<CheckScope>,

    /// Disable external checks even if configured
    #[arg(long, conflicts_with = "check")]
    no_check: bool,

    /// Run AI code review before generating the message
    #[arg(long)]
    review: bool,

    /// Commit date passed to `git commit --date`
    #[arg(long)]
    date: Option<String>,

    /// Generation backend
    #[arg(long, value_enum)]
    provider: Option<Provider>,

    /// Model passed to the backend CLI
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl CommonArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.generation.provider = provider;
        }
        if let Some(model) = &self.model {
            config.generation.model = Some(model.clone());
        }
        if let Some(date) = &self.date {
            config.commit.date = Some(date.clone());
        }
    }

    fn pipeline_options(&self, config: &Config) -> PipelineOptions {
        let defaults = PipelineOptions::from_config(config);
        PipelineOptions {
            skip_confirmation: self.yes,
            check: if self.no_check {
                None
            } else {
                self.check.or(defaults.check)
            },
            review: self.review || defaults.review,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = match &cli.command {
        Command::Commit { common } | Command::Flow { common, .. } => common,
    };
    init_tracing(common.verbose);

    let cwd = env::current_dir().context("Cannot read the current directory")?;
    let vcs = GitCli::discover(&cwd)
        .context("Not a git repository. Run scrivener from within a git repository.")?;

    let mut config = Config::load(vcs.root()).context("Failed to load configuration")?;
    common.apply(&mut config);
    let options = common.pipeline_options(&config);

    let backend = build_backend(
        config.generation.provider,
        &config.generation.language,
        config.generation.api_key_env.as_deref(),
    );
    backend
        .check_installed()
        .await
        .with_context(|| format!("The {} CLI is required", backend.name()))?;

    let judge = config.review.judge.as_ref().map(|judge| {
        build_backend(
            judge.provider,
            &config.generation.language,
            judge.api_key_env.as_deref(),
        )
        .with_name(format!("{} (judge)", judge.provider.as_str()))
    });

    let checks = CommandCheckRunner::new(vcs.root(), config.checks.tools.clone());
    let operator: Box<dyn Operator> = if common.yes {
        Box::new(FixedOperator::declining())
    } else {
        Box::new(DialoguerOperator)
    };

    let mut pipeline =
        CommitPipeline::new(&config, &vcs, &backend, operator.as_ref()).with_checks(&checks);
    if let Some(judge) = &judge {
        pipeline = pipeline.with_judge(judge);
    }

    match &cli.command {
        Command::Commit { .. } => {
            let progress = |stage: Stage| eprintln!("{}...", stage);
            let pipeline = pipeline.with_progress(&progress);
            commit_staged(&config, &vcs, &pipeline, operator.as_ref(), &options).await
        }
        Command::Flow { count, path, .. } => {
            let files = collect_files(&vcs, path, *count).context("Failed to list changed files")?;
            if files.is_empty() {
                println!("No changed files under {}. Nothing to commit.", path);
                return Ok(());
            }
            println!("Processing {} file(s)", files.len());

            let confirm = |file: &str, message: &str| {
                operator
                    .confirm(&format!("Commit {} as:\n\n{}\n", file, message))
                    .unwrap_or(false)
            };
            let mut orchestrator = BatchOrchestrator::new(&config, &vcs, pipeline)
                .context("Failed to prepare batch")?;
            if !common.yes {
                orchestrator = orchestrator.with_confirm(&confirm);
            }

            let report = |result: &ProcessResult| println!("{}", result);
            let results = orchestrator.run(&files, &options, Some(&report)).await;
            let summary = BatchSummary::from_results(&results);
            println!("\n{}", summary);

            if summary.failed > 0 {
                bail!("{} file(s) failed", summary.failed);
            }
            Ok(())
        }
    }
}

/// Single-change mode: generate, confirm, commit everything staged.
async fn commit_staged(
    config: &Config,
    vcs: &GitCli,
    pipeline: &CommitPipeline<'_>,
    operator: &dyn Operator,
    options: &PipelineOptions,
) -> Result<()> {
    let output = pipeline.run(&[], options).await?;

    if let Some(review) = &output.review
        && review.has_issues
    {
        println!("{}", review);
    }
    println!("\n{}\n", output.message);

    if !options.skip_confirmation && !operator.confirm("Commit with this message?")? {
        println!("Commit cancelled.");
        return Ok(());
    }

    let summary = vcs
        .commit(&CommitRequest {
            message: output.message.as_str(),
            pathspec: &[],
            date: config.commit.date.as_deref(),
        })
        .context("Failed to create commit")?;
    println!("✓ {}", summary.trim());
    Ok(())
}

fn build_backend(provider: Provider, language: &str, api_key_env: Option<&str>) -> CliBackend {
    let backend = CliBackend::new(provider, language);
    match api_key_env.and_then(|name| env::var(name).ok()) {
        Some(key) if !key.trim().is_empty() => backend.with_credential(key.trim()),
        _ => backend,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
