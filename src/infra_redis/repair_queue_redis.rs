use crate::domain_model::RepairTicket;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
const REPAIR_PUSH: &str = include_str!("repair_push.lua");
const REPAIR_POP: &str = include_str!("repair_pop.lua");

/// Tickets live in a hash keyed by pair; a list keeps first-recorded order and
/// a second hash holds each ticket's `recorded_at` so an older ticket never
/// overwrites a newer one. Payloads that fail to decode go to a dead list.
pub struct RedisRepairQueue {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisRepairQueue {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRepairQueue {
            conn,
            prefix: prefix.into(),
        }
    }

    fn order_key(&self) -> String {
        format!("{}:order", self.prefix)
    }

    fn tickets_key(&self) -> String {
        format!("{}:tickets", self.prefix)
    }

    fn recorded_key(&self) -> String {
        format!("{}:recorded", self.prefix)
    }

    fn dead_key(&self) -> String {
        format!("{}:dead", self.prefix)
    }
}

/// Decodes each payload on its own so one corrupt entry cannot take the rest
/// of the batch with it. Returns the tickets and the payloads that failed.
fn decode_tickets(raw: Vec<String>) -> (Vec<RepairTicket>, Vec<String>) {
    let mut tickets = Vec::with_capacity(raw.len());
    let mut bad = Vec::new();
    for payload in raw {
        match serde_json::from_str::<RepairTicket>(&payload) {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => {
                tracing::error!(%payload, "undecodable repair ticket: {e}");
                bad.push(payload);
            }
        }
    }
    (tickets, bad)
}

#[async_trait::async_trait]
impl RepairQueue for RedisRepairQueue {
    async fn push(&self, ticket: RepairTicket) -> Result<(), RepairQueueError> {
        let payload =
            serde_json::to_string(&ticket).map_err(|e| RepairQueueError::Codec(e.to_string()))?;
        let mut conn = self.conn.clone();
        let script = Script::new(REPAIR_PUSH);
        let _: i64 = script
            .key(self.order_key())
            .key(self.tickets_key())
            .key(self.recorded_key())
            .arg(ticket.pair.to_string())
            .arg(payload)
            .arg(ticket.recorded_at.timestamp_micros())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RepairQueueError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn pop_batch(&self, limit: usize) -> Result<Vec<RepairTicket>, RepairQueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let script = Script::new(REPAIR_POP);
        let raw: Vec<String> = script
            .key(self.order_key())
            .key(self.tickets_key())
            .key(self.recorded_key())
            .arg(limit)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RepairQueueError::Backend(e.to_string()))?;

        let (tickets, bad) = decode_tickets(raw);
        if !bad.is_empty() {
            let dead = self.dead_key();
            if let Err(e) = conn.rpush::<_, _, i64>(&dead, &bad).await {
                tracing::error!(count = bad.len(), %dead, "could not dead-letter tickets: {e}");
            }
        }
        Ok(tickets)
    }

    async fn len(&self) -> Result<usize, RepairQueueError> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .hlen(self.tickets_key())
            .await
            .map_err(|e| RepairQueueError::Backend(e.to_string()))?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;

    #[test]
    fn corrupt_payload_does_not_drop_the_batch() {
        let pair = UserPair::new(UserId::new_v4(), UserId::new_v4());
        let good = RepairTicket::new(pair, PairIntent::Unrelated, "stranded remove");
        let raw = vec![
            "{not json".to_string(),
            serde_json::to_string(&good).unwrap(),
        ];

        let (tickets, bad) = decode_tickets(raw);
        assert_eq!(tickets, vec![good]);
        assert_eq!(bad, vec!["{not json".to_string()]);
    }
}
