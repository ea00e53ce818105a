use crate::domain_model::RepairTicket;
use crate::domain_port::*;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryRepairQueue {
    tickets: Mutex<VecDeque<RepairTicket>>,
}

impl MemoryRepairQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<RepairTicket>>, RepairQueueError> {
        self.tickets
            .lock()
            .map_err(|e| RepairQueueError::Backend(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RepairQueue for MemoryRepairQueue {
    async fn push(&self, ticket: RepairTicket) -> Result<(), RepairQueueError> {
        let mut tickets = self.lock()?;
        match tickets.iter_mut().find(|t| t.pair == ticket.pair) {
            Some(queued) if queued.recorded_at > ticket.recorded_at => {
                tracing::debug!(pair = %ticket.pair, "newer ticket already queued, keeping it");
            }
            Some(queued) => *queued = ticket,
            None => tickets.push_back(ticket),
        }
        Ok(())
    }

    async fn pop_batch(&self, limit: usize) -> Result<Vec<RepairTicket>, RepairQueueError> {
        let mut tickets = self.lock()?;
        let n = limit.min(tickets.len());
        Ok(tickets.drain(..n).collect())
    }

    async fn len(&self) -> Result<usize, RepairQueueError> {
        Ok(self.lock()?.len())
    }
}
