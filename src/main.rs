use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gerrit_auto_abandon::config::DEFAULT_CONFIG_PATH;
use gerrit_auto_abandon::{load_projects, Config, GerritClient, GerritQuery, Janitor};

#[derive(Parser)]
#[command(name = "gerrit-auto-abandon")]
#[command(about = "Abandon Gerrit changes with long-unaddressed negative feedback")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, env = "AUTO_ABANDON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Only log what would be abandoned, whatever the config says
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("gerrit_auto_abandon=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if cli.dry_run {
        config.dryrun = true;
    }
    config.validate().context("Invalid configuration")?;

    let project_file = config
        .project_file
        .as_ref()
        .context("project_file must be set")?;
    let projects = load_projects(project_file)?;

    let query = GerritQuery::new(&config)?;
    let mut changes = query.fetch_open_changes(&projects).await?;

    let janitor = Janitor::new(GerritClient::new(&config), config.abandon_after_days);
    let summary = janitor.process_changes(&mut changes).await?;

    info!(
        examined = summary.examined,
        abandoned = summary.abandoned,
        dryrun = config.dryrun,
        "Done"
    );

    Ok(())
}
