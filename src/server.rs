//! Service wiring: store, scheduler, execution client, background loops and
//! the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use dqjobs_api::{ApiConfig, ApiServer, ApiState};
use dqjobs_config::Config;
use dqjobs_core::{BackgroundSweeps, ExecutionStatusPoller, InstanceLauncher, JobLifecycleManager};
use dqjobs_executor_livy::{LivyClient, LivyOptions};
use dqjobs_scheduler_cron::CronScheduler;
use dqjobs_store_sqlite::SqliteStore;

/// How long background loops get to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn livy_options(config: &Config) -> LivyOptions {
    let livy = &config.livy;
    let mut options = LivyOptions::new(livy.uri.clone(), livy.spark_uri.clone());
    options.timeout = livy.timeout();
    options.file = livy.file.clone();
    options.class_name = livy.class_name.clone();
    options.conf = livy.conf.clone();
    options
}

/// Run the service until Ctrl-C.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting dqjobs v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SqliteStore::open(&config.store.path).await?);
    let scheduler = Arc::new(CronScheduler::new().with_tick(config.scheduler.tick()));
    let executor = Arc::new(LivyClient::new(livy_options(&config))?);

    let lifecycle = Arc::new(JobLifecycleManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        scheduler.clone(),
        config.scheduler.group.clone(),
    ));
    let launcher = Arc::new(InstanceLauncher::new(
        store.clone(),
        store.clone(),
        store.clone(),
        scheduler.clone(),
        executor.clone(),
        config.scheduler.predicate_group.clone(),
        config.instance.retention(),
    ));
    let poller = Arc::new(ExecutionStatusPoller::new(store, executor));

    let restored = lifecycle.restore_triggers().await?;
    info!("Scheduler ready with {} restored triggers", restored);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = vec![tokio::spawn(
        scheduler.run(launcher, shutdown_rx.clone()),
    )];
    tasks.extend(
        BackgroundSweeps::new(
            lifecycle.clone(),
            poller,
            config.instance.expiry_sweep_interval(),
            config.instance.poll_interval(),
        )
        .spawn(shutdown_rx.clone()),
    );

    // Dropping the sender stops every loop, so aborting this task after the
    // server exits shuts everything down.
    let signal_task = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let server = ApiServer::new(
        ApiConfig::new(config.server.host.clone(), config.server.port),
        Arc::new(ApiState::new(lifecycle)),
    );
    let result = server.run(shutdown_rx).await;
    signal_task.abort();

    for task in tasks {
        match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Background task failed: {}", e),
            Err(_) => warn!("Background task did not stop within {:?}", DRAIN_TIMEOUT),
        }
    }

    info!("dqjobs stopped");
    result
}
