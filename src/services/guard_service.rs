//! Periodic validation service
//!
//! Each cycle pulls a batch, evaluates it, then rewrites both result files
//! from the current sets. A running batch is never cut short; shutdown is
//! observed between cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use crate::guard::{ResultWriter, WorkerPool};
use crate::models::{BatchReport, GuardStatus};
use crate::services::batch_source::BatchSource;

/// Drives the worker pool over successive batches
pub struct GuardService {
    source: Arc<dyn BatchSource>,
    pool: WorkerPool,
    writer: ResultWriter,
    interval: Duration,
    status_tx: watch::Sender<GuardStatus>,
}

impl GuardService {
    pub fn new(
        source: Arc<dyn BatchSource>,
        pool: WorkerPool,
        writer: ResultWriter,
        interval: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(GuardStatus::default());
        Self {
            source,
            pool,
            writer,
            interval,
            status_tx,
        }
    }

    /// Progress published after every cycle
    pub fn status(&self) -> watch::Receiver<GuardStatus> {
        self.status_tx.subscribe()
    }

    /// Run until shutdown is signalled (call in a spawned task)
    #[instrument(skip(self, shutdown), fields(source = %self.source.describe()))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting proxy guard with {}s interval",
            self.interval.as_secs()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Proxy guard shutting down");
    }

    /// One batch: fetch, evaluate, persist, publish status
    pub async fn run_cycle(&self) -> BatchReport {
        info!("Starting proxy validation...");

        let batch = match self.source.next_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                error!("Failed to load batch from {}: {}", self.source.describe(), e);
                Vec::new()
            }
        };

        let report = self.pool.run_batch(batch).await;

        let classifier = self.pool.classifier();
        let snapshot = classifier.store().snapshot();
        let persisted_at = match self.writer.persist(&snapshot).await {
            Ok(()) => Some(Utc::now()),
            Err(e) => {
                error!("Failed to persist result sets: {}", e);
                None
            }
        };

        let checked = classifier.checked().len();
        self.status_tx.send_modify(|status| {
            status.cycles += 1;
            status.checked = checked;
            status.last_batch = Some(report.clone());
            if persisted_at.is_some() {
                status.last_persisted_at = persisted_at;
            }
        });

        report
    }
}
