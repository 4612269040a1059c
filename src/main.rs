use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use daypost_core::{AppConfig, CoreError, Credentials, ErrorReporter};
use graph_client::SocialPublisher;
use llm_interface::OpenAiProvider;
use post_agent::{CmsArticleSource, DailyAgent, ImageStudio, PostOrchestrator, RunOutcome};
use post_store::{JsonPostStore, MemoryPostStore, PostStore, UploadTracker};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "daypost=info,post_agent=info,graph_client=info,llm_interface=info,post_store=info,daypost_core=info";

#[derive(Parser)]
#[command(name = "daypost", version, about = "Generates and publishes one social media post a day")]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, global = true, env = "DAYPOST_CONFIG", default_value = "config/daypost.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce, illustrate and publish today's post
    Run {
        /// Run as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Generate and snapshot the post without publishing or touching history
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the holiday falling on a date, if any
    Holiday {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Drop upload tracking entries older than N days
    PurgeUploads {
        #[arg(long)]
        days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CoreError>() {
                Some(core) => ErrorReporter::new().report_error(core),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config).map_err(CoreError::from)?;

    match cli.command {
        Command::Run { date, dry_run } => {
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            daily_run(config, today, dry_run).await
        }
        Command::Holiday { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            match config.holiday_calendar().detect(date) {
                Some(holiday) => println!("{}: {} ({})", date, holiday.name, holiday.category),
                None => println!("{}: no holiday", date),
            }
            Ok(())
        }
        Command::PurgeUploads { days } => {
            let days = days.unwrap_or(config.graph.upload_retention_days);
            let path = config.storage.uploads_path();
            let mut uploads = UploadTracker::open(&path)?;
            let removed = uploads
                .purge_older_than(days)
                .with_context(|| format!("purging {}", path.display()))?;
            println!("Removed {} upload entries older than {} days", removed, days);
            Ok(())
        }
    }
}

async fn daily_run(config: AppConfig, today: NaiveDate, dry_run: bool) -> Result<()> {
    info!("Starting daily run for {}{}", today, if dry_run { " (dry run)" } else { "" });

    let credentials = Credentials::from_env();
    let api_key = credentials.require_openai_key().map_err(CoreError::from)?;
    let provider = OpenAiProvider::new(api_key, &config.generation.model, &config.image.model)?;
    let articles = CmsArticleSource::new(&config.blog)?;
    let studio = ImageStudio::new(
        &provider,
        config.image.clone(),
        config.storage.images_dir.clone(),
    )?;
    let history = JsonPostStore::open(config.storage.history_path())?;

    if dry_run {
        let store = MemoryPostStore::with_posts(history.posts().to_vec());
        let orchestrator = PostOrchestrator::new(config, &provider, articles, store);
        let agent = DailyAgent::new(orchestrator, Some(studio), None::<SocialPublisher>).dry_run(true);
        return finish(agent, today).await;
    }

    let publisher = SocialPublisher::new(credentials, &config.graph, &config.storage)?;
    let orchestrator = PostOrchestrator::new(config, &provider, articles, history);
    finish(DailyAgent::new(orchestrator, Some(studio), Some(publisher)), today).await
}

async fn finish<S: PostStore>(
    mut agent: DailyAgent<&OpenAiProvider, &OpenAiProvider, CmsArticleSource, S, SocialPublisher>,
    today: NaiveDate,
) -> Result<()> {
    match agent.run(today).await? {
        RunOutcome::Posted {
            post,
            report,
            snapshot_path,
        } => {
            println!("{}", post.full_post());
            if let Some(path) = &post.image_path {
                println!("\nImage: {}", path.display());
            }
            if let Some(report) = report {
                for result in report.platforms.values() {
                    match (&result.error, &result.post_id) {
                        (Some(err), _) => println!("{}: failed ({})", result.platform, err),
                        (None, id) => println!(
                            "{}: posted {}",
                            result.platform,
                            id.as_deref().unwrap_or("")
                        ),
                    }
                }
            }
            info!("Snapshot written to {}", snapshot_path.display());
        }
        RunOutcome::Skipped => println!("Nothing to post for {}", today),
    }
    Ok(())
}
