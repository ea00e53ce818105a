use crate::domain_model::{ListField, UserId, UserPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State a stranded pair has to be driven to by reconciliation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairIntent {
    Friends,
    Unrelated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairTicket {
    pub pair: UserPair,
    pub intent: PairIntent,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl RepairTicket {
    pub fn new(pair: UserPair, intent: PairIntent, reason: impl Into<String>) -> Self {
        RepairTicket {
            pair,
            intent,
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Inconsistency found by scanning user documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// `user` lists `friend`, but not the other way around.
    AsymmetricFriend { user: UserId, friend: UserId },
    SelfReference { user: UserId, field: ListField },
    DuplicateEntry { user: UserId, field: ListField, other: UserId },
    RequestOfFriend { user: UserId, other: UserId },
    DanglingReference { user: UserId, field: ListField, missing: UserId },
}

impl Anomaly {
    pub fn user(&self) -> UserId {
        match *self {
            Anomaly::AsymmetricFriend { user, .. }
            | Anomaly::SelfReference { user, .. }
            | Anomaly::DuplicateEntry { user, .. }
            | Anomaly::RequestOfFriend { user, .. }
            | Anomaly::DanglingReference { user, .. } => user,
        }
    }
}
