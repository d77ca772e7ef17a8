//! Register one disposable identity on every instance in `instances.txt`,
//! then confirm the emails and record the instances that are ready to feed.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use ail_feeder_activitypub::files::{self, CREDENTIALS_PATH, INSTANCES_PATH, READY_INSTANCES_PATH};
use ail_feeder_activitypub::mailbox::{Identity, SecMailClient, DEFAULT_MAILBOX_BASE};
use ail_feeder_activitypub::signup::{self, confirm, SignupOutcome, SignupTimings};
use ail_feeder_activitypub::telemetry;
use ail_feeder_activitypub::webdriver::WebDriver;

#[derive(Debug, Parser)]
#[command(name = "account_creator", about = "Create feeder accounts on ActivityPub instances")]
struct Cli {
    /// Password used for every account
    password: String,

    /// Log progress
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    // 1) identity + credentials for the feeder
    let identity = Identity::generate(&cli.password);
    identity
        .credentials()
        .write(Path::new(CREDENTIALS_PATH))
        .context("writing credentials")?;
    info!(email = %identity.email(), "identity generated");

    let instances = files::read_lines(Path::new(INSTANCES_PATH))?;
    let timings = SignupTimings::default();

    // 2) browser session
    let driver = WebDriver::firefox_headless(&WebDriver::url_from_env(), timings.page_load)
        .await
        .context("starting browser session")?;

    let results = signup::register_all(&driver, &identity, &instances, &timings).await;
    let registered = results
        .iter()
        .filter(|(_, o)| matches!(o, SignupOutcome::Registered))
        .count();
    info!(registered, total = results.len(), "registration finished");

    // 3) confirmation emails
    tokio::time::sleep(timings.settle).await;
    let mailbox = SecMailClient::new(DEFAULT_MAILBOX_BASE, &identity);
    let confirmed = match confirm::confirm_all(&driver, &mailbox, Path::new(READY_INSTANCES_PATH), &timings).await {
        Ok(hosts) => hosts.len(),
        Err(e) => {
            error!(error = ?e, "unable to read the mailbox");
            0
        }
    };

    if let Err(e) = driver.quit().await {
        error!(error = %e, "closing browser session failed");
    }

    println!("Done! {registered} registered, {confirmed} confirmed");
    Ok(())
}
