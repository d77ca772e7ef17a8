//! Fetch the public instance list from instances.social into `instances.txt`.
//!
//! Needs `INSTANCES_SOCIAL_TOKEN` in the environment or `.env`.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use ail_feeder_activitypub::directory::DirectoryClient;
use ail_feeder_activitypub::files::{self, INSTANCES_PATH};
use ail_feeder_activitypub::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init(false);

    let directory = DirectoryClient::from_env()?;
    let instances = directory.list_instances().await?;
    let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
    files::write_instances(Path::new(INSTANCES_PATH), &names)?;
    info!(count = names.len(), path = INSTANCES_PATH, "instances written");

    println!("Wrote {} instances to {INSTANCES_PATH}", names.len());
    Ok(())
}
