// src/signup/confirm.rs
//! Email confirmation: visit the `/auth/` link of every received message and
//! record the instance as ready.

use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use super::driver::FormDriver;
use super::SignupTimings;
use crate::files;
use crate::mailbox::Mailbox;

static AUTH_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://\S*/auth/\S*").expect("valid regex"));

/// First confirmation link in a message body.
pub fn confirmation_link(text: &str) -> Option<&str> {
    AUTH_LINK_RE.find(text).map(|m| m.as_str())
}

/// Hostname of the instance that sent `link`.
pub fn instance_from_link(link: &str) -> Option<String> {
    let head = link.split("/auth").next()?;
    let host = head.trim_start_matches("https://").trim_end_matches('/');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Process every message in the mailbox. Returns the hosts newly appended to
/// `ready_path`. Only listing the mailbox can fail; per-message problems are
/// logged and the message is dropped.
pub async fn confirm_all<D, M>(
    driver: &D,
    mailbox: &M,
    ready_path: &Path,
    timings: &SignupTimings,
) -> Result<Vec<String>>
where
    D: FormDriver,
    M: Mailbox + ?Sized,
{
    let messages = mailbox.messages().await?;
    info!(count = messages.len(), "starting email verification");

    let mut confirmed = Vec::new();
    for summary in messages {
        let message = match mailbox.read(summary.id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(id = summary.id, error = ?e, "unable to read message");
                continue;
            }
        };

        let Some(link) = confirmation_link(&message.text_body) else {
            error!(id = summary.id, "no link found, skipping");
            continue;
        };
        info!(link, "confirming");

        if let Err(e) = driver.goto(link).await {
            warn!(link, error = %e, "confirmation page did not load");
            continue;
        }
        tokio::time::sleep(timings.before_submit).await;

        let Some(host) = instance_from_link(link) else {
            warn!(link, "cannot derive instance from link");
            continue;
        };
        match files::append_ready(ready_path, &host) {
            Ok(true) => {
                info!(instance = %host, "instance ready");
                confirmed.push(host);
            }
            Ok(false) => info!(instance = %host, "instance already listed as ready"),
            Err(e) => warn!(instance = %host, error = ?e, "unable to record ready instance"),
        }
    }
    Ok(confirmed)
}
