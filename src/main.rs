//! Feeder entrypoint: search every ready instance for a query and feed the
//! results into AIL.
//!
//! Run the instance lister and the account creator first; this binary reads
//! `readyInstances.txt` and `credentials.txt` from the working directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use ail_feeder_activitypub::ail::AilClient;
use ail_feeder_activitypub::cache::{DedupGate, RedisCache};
use ail_feeder_activitypub::config::ConfigError;
use ail_feeder_activitypub::extract::HttpFetcher;
use ail_feeder_activitypub::files::{self, CREDENTIALS_PATH, READY_INSTANCES_PATH};
use ail_feeder_activitypub::{telemetry, Credentials, Feeder, FeederConfig, MastodonSearch};

#[derive(Debug, Parser)]
#[command(name = "ail-feeder-activitypub", about = "Search ActivityPub instances and feed the results into AIL")]
struct Cli {
    /// Query to search for on every ready instance
    query: String,

    /// Log progress
    #[arg(short, long)]
    verbose: bool,

    /// Process items even if they were already seen
    #[arg(long)]
    nocache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry AIL_FEEDER_CONFIG / RUST_LOG
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let cfg = match FeederConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e @ ConfigError::MissingAil) => {
            error!(error = %e, "AIL is not configured");
            return Err(e.into());
        }
        Err(e) => return Err(e).context("loading feeder config"),
    };

    // 1) collaborators
    let cache = RedisCache::connect(&cfg.redis.url())
        .await
        .context("connecting to redis")?;
    let gate = DedupGate::new(Arc::new(cache), cfg.cache_ttl(), !cli.nocache);

    let sink = AilClient::connect(&cfg.ail.url, &cfg.ail.apikey, cfg.ail.verify_ssl)
        .await
        .context("connecting to AIL")?;
    let fetcher = HttpFetcher::new(cfg.fetch_timeout())?;

    // 2) inputs from the account creator
    let instances = files::read_lines(Path::new(READY_INSTANCES_PATH))?;
    let creds = Credentials::read(Path::new(CREDENTIALS_PATH))?;

    // 3) run
    let search = MastodonSearch::new(&cfg.feeder.client_name, creds, cfg.feeder.resolve);
    let mut feeder = Feeder::new(gate, Arc::new(sink), Arc::new(fetcher), &cfg.uuid, cfg.fetch_timeout());
    let stats = feeder.run(&search, &instances, &cli.query).await;

    println!(
        "Done! {} instances searched, {} accounts, {} statuses, {} URLs forwarded",
        stats.instances_searched, stats.accounts_forwarded, stats.statuses_forwarded, stats.urls_forwarded
    );
    Ok(())
}
