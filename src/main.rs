//! pr-labels probe
//!
//! Loads a page snapshot, mounts every label view that applies to it against
//! the configured labels API and prints the resulting widget activity.
//!
//! Usage: `pr-labels <page-snapshot.json>`, or `pr-labels init-config` to
//! write the effective configuration to the user config file.

use anyhow::{bail, Context, Result};
use pr_labels::api::HttpLabelsApi;
use pr_labels::config::LabelsConfig;
use pr_labels::host::StaticPage;
use pr_labels::views::{mount_applicable, MountOutcome};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pr_labels=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: pr-labels <page-snapshot.json> | pr-labels init-config");
    };

    let config = LabelsConfig::load().context("failed to load configuration")?;
    if path == "init-config" {
        config.save().context("failed to save configuration")?;
        tracing::info!("configuration written");
        return Ok(());
    }

    let api = Arc::new(HttpLabelsApi::new(&config)?);

    let snapshot = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read page snapshot {path}"))?;
    let page = Arc::new(StaticPage::from_json(&snapshot).context("invalid page snapshot")?);
    let context = Arc::new(page.context().clone());

    let mounted = mount_applicable(context, api, page.clone(), config.avatar_size());
    if mounted.is_empty() {
        tracing::info!("no label view applies to this page");
    }

    // A snapshot never changes again, so end the page subscriptions once the
    // initial signals are queued.
    page.close_observers();

    let mut failed = false;
    for (name, handle) in mounted {
        match handle.await? {
            Ok(MountOutcome::Unauthorized) => {
                tracing::warn!("{name}: labels api refused access, license notice shown");
            }
            Ok(outcome) => tracing::info!("{name}: {outcome:?}"),
            Err(err) => {
                tracing::error!("{name}: {err}");
                failed = true;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&page.events())?);

    if failed || !page.errors().is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
