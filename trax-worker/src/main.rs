use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trax_core::repository::JobQueue;
use trax_core::IntegrationRegistry;
use trax_notify::{FanoutScheduler, MarketplaceDispatcher, WebhookDispatcher};
use trax_shared::FanoutJob;
use trax_store::app_config::Config;
use trax_store::{MemoryJobQueue, MemoryNotificationStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trax_worker=debug,trax_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    // Translation tables must be complete before any job is pulled. A carrier
    // or partner drifting its code set is a deploy-time problem, not a
    // per-request one.
    let registry = Arc::new(IntegrationRegistry::with_marketplace_defaults());
    registry.verify_complete()?;
    info!("Status taxonomy verified for {} integration(s)", registry.integrations().count());

    // Local-mode collaborators. Production deployments swap these handles for
    // the document store and queue runtime clients.
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryJobQueue::new());
    let notifications = Arc::new(MemoryNotificationStore::new());

    let scheduler = Arc::new(
        FanoutScheduler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            queue.clone(),
            notifications.clone(),
        )
        .with_page_limit(config.notify.page_limit)
        .register(Arc::new(WebhookDispatcher))
        .register(Arc::new(MarketplaceDispatcher::new(registry))),
    );

    // Local mode: accept fan-out job JSON, one per line, on stdin.
    tokio::spawn(intake_stdin(queue.clone()));

    info!(
        poll_interval_ms = config.worker.poll_interval_ms,
        page_limit = config.notify.page_limit,
        "Fan-out worker started"
    );

    let poll_interval = Duration::from_millis(config.worker.poll_interval_ms);
    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stop signal received; finishing in-flight work");
                break;
            }
            _ = sleep(poll_interval) => {
                while let Some(job) = queue.dequeue().await? {
                    if let Err(err) = scheduler.run(job).await {
                        // The queue runtime owns retry policy; here we only
                        // report the failure.
                        error!("Fan-out job failed: {err}");
                    }
                }
            }
        }
    }

    Ok(())
}

async fn intake_stdin(queue: Arc<MemoryJobQueue>) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FanoutJob>(&line) {
            Ok(job) => {
                if let Err(err) = queue.enqueue(vec![job]).await {
                    error!("Failed to enqueue job: {err}");
                }
            }
            Err(err) => warn!("Ignoring malformed job line: {err}"),
        }
    }
}
