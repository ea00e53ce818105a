use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::{Instrument, pair_span};
use futures_util::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const AUDIT_CHUNK: usize = 256;

pub struct RealReconcileService {
    user_store: Arc<dyn UserStore>,
    repair_queue: Arc<dyn RepairQueue>,
}

impl RealReconcileService {
    pub fn new(user_store: Arc<dyn UserStore>, repair_queue: Arc<dyn RepairQueue>) -> Self {
        Self {
            user_store,
            repair_queue,
        }
    }

    async fn find_optional(&self, id: UserId) -> Result<Option<User>, StoreError> {
        match self.user_store.find_by_id(id).await {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn reconcile_pair(&self, pair: UserPair, intent: PairIntent) -> Result<(), StoreError> {
        let a = self.find_optional(pair.min()).await?;
        let b = self.find_optional(pair.max()).await?;

        // a friendship with a deleted account cannot be completed
        let intent = match (&a, &b) {
            (Some(_), Some(_)) => intent,
            _ => PairIntent::Unrelated,
        };

        for (user, other) in [(a, pair.max()), (b, pair.min())] {
            let Some(user) = user else { continue };
            let updates = match intent {
                PairIntent::Friends => vec![
                    UserUpdate::AddToSet(ListField::Friends, other),
                    UserUpdate::Pull(ListField::Requests, other),
                ],
                PairIntent::Unrelated => vec![UserUpdate::Pull(ListField::Friends, other)],
            };
            self.user_store.update_by_id(user.id, &updates).await?;
        }

        tracing::info!(%pair, ?intent, "pair reconciled");
        Ok(())
    }
}

fn audit_user(user: &User, known: &HashMap<UserId, &User>, out: &mut Vec<Anomaly>) {
    for field in [ListField::Friends, ListField::Requests] {
        let mut seen = HashSet::new();
        for &other in list_of(user, field) {
            if other == user.id {
                out.push(Anomaly::SelfReference {
                    user: user.id,
                    field,
                });
                continue;
            }
            if !seen.insert(other) {
                out.push(Anomaly::DuplicateEntry {
                    user: user.id,
                    field,
                    other,
                });
                continue;
            }
            match known.get(&other) {
                None => out.push(Anomaly::DanglingReference {
                    user: user.id,
                    field,
                    missing: other,
                }),
                Some(friend) if field == ListField::Friends && !friend.has_friend(user.id) => {
                    out.push(Anomaly::AsymmetricFriend {
                        user: user.id,
                        friend: other,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for &other in &user.requests {
        if other != user.id && user.has_friend(other) {
            out.push(Anomaly::RequestOfFriend {
                user: user.id,
                other,
            });
        }
    }
}

/// The single update that fixes `anomaly`. Duplicates are collapsed in place,
/// every other anomaly drops the offending entry.
fn fix_for(anomaly: &Anomaly) -> UserUpdate {
    match *anomaly {
        // friendship needs both sides' consent, so the lone edge is dropped
        Anomaly::AsymmetricFriend { friend, .. } => UserUpdate::Pull(ListField::Friends, friend),
        Anomaly::SelfReference { user, field } => UserUpdate::Pull(field, user),
        Anomaly::DuplicateEntry { field, other, .. } => UserUpdate::Dedup(field, other),
        Anomaly::RequestOfFriend { other, .. } => UserUpdate::Pull(ListField::Requests, other),
        Anomaly::DanglingReference { field, missing, .. } => UserUpdate::Pull(field, missing),
    }
}

/// Groups fixes into one batch per user. Each `(field, id)` gets one update;
/// a pull of the entry wins over collapsing its duplicates.
fn repair_batches(anomalies: &[Anomaly]) -> Vec<(UserId, Vec<UserUpdate>)> {
    let mut batches: Vec<(UserId, Vec<UserUpdate>)> = Vec::new();
    for anomaly in anomalies {
        let user = anomaly.user();
        let fix = fix_for(anomaly);
        let i = match batches.iter().position(|(id, _)| *id == user) {
            Some(i) => i,
            None => {
                batches.push((user, Vec::new()));
                batches.len() - 1
            }
        };
        let batch = &mut batches[i].1;

        match batch.iter().position(|u| u.target() == fix.target()) {
            None => batch.push(fix),
            Some(i) => {
                if matches!(fix, UserUpdate::Pull(..)) {
                    batch[i] = fix;
                }
            }
        }
    }
    batches
}

#[async_trait::async_trait]
impl ReconcileService for RealReconcileService {
    async fn drain(&self, limit: usize) -> Result<ReconcileReport, ReconcileError> {
        let tickets = self.repair_queue.pop_batch(limit).await?;
        let mut report = ReconcileReport::default();
        let mut push_error = None;

        for ticket in tickets {
            let e = match self
                .reconcile_pair(ticket.pair, ticket.intent)
                .instrument(pair_span(ticket.pair, "reconcile"))
                .await
            {
                Ok(()) => {
                    report.repaired += 1;
                    continue;
                }
                Err(e) => e,
            };
            tracing::warn!(pair = %ticket.pair, "reconcile failed, requeueing: {e}");
            // the ticket is off the queue now, so a failed push only gets logged
            match self.repair_queue.push(ticket.clone()).await {
                Ok(()) => report.requeued += 1,
                Err(push) => {
                    tracing::error!(
                        pair = %ticket.pair,
                        intent = ?ticket.intent,
                        reason = %ticket.reason,
                        recorded_at = %ticket.recorded_at,
                        "repair ticket lost, could not requeue: {push}"
                    );
                    push_error.get_or_insert(push);
                }
            }
        }

        match push_error {
            Some(e) => Err(e.into()),
            None => Ok(report),
        }
    }

    async fn audit(&self) -> Result<Vec<Anomaly>, ReconcileError> {
        let ids = self.user_store.list_ids().await?;
        let users: Vec<User> = try_join_all(
            ids.chunks(AUDIT_CHUNK)
                .map(|chunk| self.user_store.find_by_ids(chunk)),
        )
        .await?
        .into_iter()
        .flatten()
        .collect();

        let known: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
        let mut anomalies = Vec::new();
        for user in &users {
            audit_user(user, &known, &mut anomalies);
        }

        tracing::info!(
            users = users.len(),
            anomalies = anomalies.len(),
            "audit finished"
        );
        Ok(anomalies)
    }

    async fn repair(&self, anomalies: &[Anomaly]) -> Result<usize, ReconcileError> {
        let batches = repair_batches(anomalies);

        let mut changed = 0;
        for (user, updates) in batches {
            match self.user_store.update_by_id(user, &updates).await {
                Ok(_) => changed += 1,
                Err(StoreError::NotFound(_)) => {
                    tracing::debug!(%user, "user vanished before repair");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(changed)
    }
}
