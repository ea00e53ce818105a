use crate::domain_model::RepairTicket;

#[derive(Debug, thiserror::Error)]
pub enum RepairQueueError {
    #[error("repair queue backend error: {0}")]
    Backend(String),
    #[error("repair ticket codec error: {0}")]
    Codec(String),
}

/// Pairs left asymmetric by a stranded two-document update, waiting for
/// reconciliation. A pair is queued at most once: pushing a ticket for a queued
/// pair keeps whichever of the two has the later `recorded_at`.
#[async_trait::async_trait]
pub trait RepairQueue: Send + Sync {
    async fn push(&self, ticket: RepairTicket) -> Result<(), RepairQueueError>;

    async fn pop_batch(&self, limit: usize) -> Result<Vec<RepairTicket>, RepairQueueError>;

    async fn len(&self) -> Result<usize, RepairQueueError>;
}
