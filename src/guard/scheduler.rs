//! Bounded-concurrency batch execution

use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info, instrument};

use crate::guard::classifier::Classifier;
use crate::models::{BatchReport, Disposition, Endpoint};

/// Default ceiling on concurrent evaluations
pub const DEFAULT_MAX_WORKERS: usize = 50;

/// Runs the classifier over a batch with at most `max_workers` in flight
pub struct WorkerPool {
    classifier: Arc<Classifier>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(classifier: Arc<Classifier>, max_workers: usize) -> Self {
        Self {
            classifier,
            max_workers: max_workers.max(1),
        }
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// Concurrency used for a batch of `len` candidates
    pub fn concurrency_for(&self, len: usize) -> usize {
        self.max_workers.min(len)
    }

    /// Evaluate every candidate; completions are collected as they finish.
    ///
    /// Each evaluation runs in its own task so a panic in one pipeline is
    /// counted as `failed` and does not disturb the rest of the batch.
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    pub async fn run_batch(&self, batch: Vec<Endpoint>) -> BatchReport {
        let mut report = BatchReport::new(batch.len());
        let workers = self.concurrency_for(batch.len());
        if workers == 0 {
            return report.finish();
        }

        info!("Checking {} proxies with {} workers", batch.len(), workers);

        let mut completions = futures::stream::iter(batch)
            .map(|endpoint| {
                let classifier = self.classifier.clone();
                async move {
                    let handle = tokio::spawn({
                        let endpoint = endpoint.clone();
                        async move { classifier.evaluate(&endpoint).await }
                    });
                    (endpoint, handle.await)
                }
            })
            .buffer_unordered(workers);

        while let Some((endpoint, outcome)) = completions.next().await {
            match outcome {
                Ok(Some(disposition)) => {
                    if disposition == Disposition::Clean {
                        info!("Successfully verified proxy: {}", endpoint);
                    }
                    report.record(disposition);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    // still claimed, so this is its only chance at a terminal state
                    error!("Evaluation of {} aborted: {}", endpoint, e);
                    self.classifier
                        .store()
                        .record(&endpoint, Disposition::NonForwarding);
                    report.failed += 1;
                }
            }
        }

        let report = report.finish();
        info!(
            "Batch complete: {} evaluated ({} clean, {} malicious, {} unreachable, {} not forwarding), {} skipped, {} failed",
            report.evaluated(),
            report.clean,
            report.malicious,
            report.unreachable,
            report.non_forwarding,
            report.skipped,
            report.failed
        );
        report
    }
}
