use crate::domain_model::*;
use crate::domain_port::{RepairQueueError, StoreError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("queue error: {0}")]
    Queue(#[from] RepairQueueError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub repaired: usize,
    pub requeued: usize,
}

#[async_trait::async_trait]
pub trait ReconcileService: Send + Sync {
    /// Takes up to `limit` repair tickets and drives each pair to its intent.
    /// Tickets that fail are requeued. Every popped ticket is handled before
    /// an error from requeueing is returned.
    async fn drain(&self, limit: usize) -> Result<ReconcileReport, ReconcileError>;

    /// Scans every user document for broken relationship invariants.
    async fn audit(&self) -> Result<Vec<Anomaly>, ReconcileError>;

    /// Fixes anomalies found by `audit`, returning how many documents changed.
    async fn repair(&self, anomalies: &[Anomaly]) -> Result<usize, ReconcileError>;
}
