mod logging;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use rcs_storage::{Selection, SyncTarget};
use rcs_sync::{SelectionPlan, SyncConfig, SyncError};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "rcs-cli")]
#[command(about = "Route classification and crawl-table sync")]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Table pair to sync: crawl (spp_route) or purchasing (spp_route_purchasing).
    /// Overrides RCS_SYNC_TARGET.
    #[arg(long, global = true)]
    target: Option<SyncTarget>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify selected spp_route rows and upsert them into spp_crawl_route.
    Sync(SelectionArgs),
    /// Copy spp_crawl_route rows from the crawl database into the source database.
    Replicate {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
    },
    /// Run a sync on the RCS_SYNC_CRON schedule until interrupted.
    Schedule(SelectionArgs),
}

#[derive(Debug, Default, Args)]
#[command(group(ArgGroup::new("selection").args(["ids", "since_hours", "after_last_crawled", "all"])))]
struct SelectionArgs {
    /// Comma-separated spp_route ids.
    #[arg(long, value_delimiter = ',')]
    ids: Vec<i64>,
    /// Routes updated within the last N hours.
    #[arg(long)]
    since_hours: Option<i64>,
    /// Routes with ids above the highest crawled id (the default).
    #[arg(long)]
    after_last_crawled: bool,
    #[arg(long)]
    all: bool,
}

impl SelectionArgs {
    fn plan(&self) -> SelectionPlan {
        if !self.ids.is_empty() {
            SelectionPlan::Fixed(Selection::Ids(self.ids.clone()))
        } else if let Some(hours) = self.since_hours {
            SelectionPlan::LastHours(hours)
        } else if self.all {
            SelectionPlan::Fixed(Selection::All)
        } else {
            SelectionPlan::Fixed(Selection::AfterLastCrawled)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut config = SyncConfig::from_env();
    if let Some(target) = cli.target {
        config.target = target;
    }

    match cli.command.unwrap_or(Commands::Sync(SelectionArgs::default())) {
        Commands::Sync(args) => match rcs_sync::run_sync_once(&config, &args.plan()).await {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(err) => fail(&err),
        },
        Commands::Replicate { ids } => match rcs_sync::replicate(&config, &ids).await {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(err) => fail(&err),
        },
        Commands::Schedule(args) => {
            info!(sync_target = ?config.target, "scheduling sync");
            let cron = config.sync_cron.clone();
            let mut sched = rcs_sync::build_scheduler(config, args.plan()).await?;
            sched.start().await.context("starting scheduler")?;
            info!(%cron, "scheduler started; press ctrl-c to stop");
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            sched.shutdown().await.context("stopping scheduler")?;
        }
    }

    Ok(())
}

fn fail(err: &SyncError) -> ! {
    error!(error = %err, "{}", err.operator_message());
    match serde_json::to_string(&err.envelope()) {
        Ok(body) => println!("{body}"),
        Err(encode_err) => error!(error = %encode_err, "failed to encode failure envelope"),
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rcs-cli").chain(args.iter().copied())).unwrap()
    }

    fn sync_plan(args: &[&str]) -> SelectionPlan {
        match parse(args).command {
            Some(Commands::Sync(selection)) => selection.plan(),
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn sync_selection_flags() {
        assert_eq!(
            sync_plan(&["sync", "--ids", "3,5,8"]),
            SelectionPlan::Fixed(Selection::Ids(vec![3, 5, 8]))
        );
        assert_eq!(sync_plan(&["sync", "--since-hours", "6"]), SelectionPlan::LastHours(6));
        assert_eq!(sync_plan(&["sync", "--all"]), SelectionPlan::Fixed(Selection::All));
        assert_eq!(sync_plan(&["sync"]), SelectionPlan::Fixed(Selection::AfterLastCrawled));
    }

    #[test]
    fn selection_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["rcs-cli", "sync", "--all", "--ids", "1"]).is_err());
    }

    #[test]
    fn replicate_requires_ids() {
        assert!(Cli::try_parse_from(["rcs-cli", "replicate"]).is_err());
        match parse(&["--log-level", "debug", "replicate", "--ids", "9"]).command {
            Some(Commands::Replicate { ids }) => assert_eq!(ids, vec![9]),
            other => panic!("expected replicate, got {other:?}"),
        }
    }

    #[test]
    fn target_flag_selects_the_purchasing_tables() {
        let cli = parse(&["sync", "--target", "purchasing", "--ids", "4"]);
        assert_eq!(cli.target, Some(SyncTarget::Purchasing));
        assert_eq!(parse(&["--target", "crawl", "replicate", "--ids", "1"]).target, Some(SyncTarget::Crawl));
        assert_eq!(parse(&["sync"]).target, None);
        assert!(Cli::try_parse_from(["rcs-cli", "sync", "--target", "report"]).is_err());
    }
}
