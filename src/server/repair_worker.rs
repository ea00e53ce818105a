use crate::application_port::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Periodically drains the repair queue until cancelled.
pub struct RepairWorker {
    reconcile_service: Arc<dyn ReconcileService>,
    interval: Duration,
    batch_size: usize,
    worker_id: String,
    cancellation_token: CancellationToken,
}

impl RepairWorker {
    pub fn new(
        reconcile_service: Arc<dyn ReconcileService>,
        interval: Duration,
        batch_size: usize,
        worker_id: &str,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            reconcile_service,
            interval,
            batch_size,
            worker_id: worker_id.to_owned(),
            cancellation_token,
        }
    }

    async fn tick_once(&self) -> anyhow::Result<()> {
        let report = self.reconcile_service.drain(self.batch_size).await?;

        if report.repaired > 0 || report.requeued > 0 {
            tracing::info!(
                worker = %self.worker_id,
                repaired = report.repaired,
                requeued = report.requeued,
                "repair batch done"
            );
        }

        // idle, or only failing tickets left
        if report.repaired == 0 {
            tokio::time::sleep(self.interval).await;
        }
        Ok(())
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!(worker = %self.worker_id, "repair worker shutting down...");
                    break;
                }
                result = self.tick_once() => {
                    if let Err(e) = result {
                        tracing::error!(worker = %self.worker_id, "repair worker error: {:#?}", e);
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }
        Ok(())
    }
}
