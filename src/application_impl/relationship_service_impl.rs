use crate::application_impl::{PairSaga, PairStep, SagaOutcome};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::{Instrument, pair_span};
use std::sync::Arc;

pub struct RealRelationshipService {
    user_store: Arc<dyn UserStore>,
    repair_queue: Arc<dyn RepairQueue>,
}

impl RealRelationshipService {
    pub fn new(user_store: Arc<dyn UserStore>, repair_queue: Arc<dyn RepairQueue>) -> Self {
        Self {
            user_store,
            repair_queue,
        }
    }

    async fn run_saga(
        &self,
        saga: PairSaga,
        pre_image: &User,
        pair: UserPair,
        intent: PairIntent,
    ) -> Result<(), RelationError> {
        let op = match intent {
            PairIntent::Friends => "accept_friend",
            PairIntent::Unrelated => "remove_friend",
        };
        let outcome = saga
            .run(&*self.user_store, pre_image)
            .instrument(pair_span(pair, op))
            .await?;
        match outcome {
            SagaOutcome::Committed => Ok(()),
            SagaOutcome::RolledBack(e) => Err(e.into()),
            SagaOutcome::Stranded {
                step2,
                compensation,
            } => {
                let mut reason = format!("{step2}; compensation failed: {compensation}");
                tracing::error!(%pair, ?intent, "pair left inconsistent: {reason}");

                let ticket = RepairTicket::new(pair, intent, reason.clone());
                let ticket_recorded = match self.repair_queue.push(ticket).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(%pair, "could not record repair ticket: {e}");
                        reason.push_str(&format!("; repair ticket not recorded: {e}"));
                        false
                    }
                };

                Err(RelationError::PartialFailure {
                    pair,
                    intent,
                    reason,
                    ticket_recorded,
                })
            }
        }
    }
}

fn validate_id(id: UserId) -> Result<(), RelationError> {
    if id.is_nil() {
        return Err(RelationError::Validation("nil user id".to_string()));
    }
    Ok(())
}

fn validate_pair(a: UserId, b: UserId) -> Result<(), RelationError> {
    validate_id(a)?;
    validate_id(b)?;
    if a == b {
        return Err(RelationError::Validation(format!(
            "user {a} cannot relate to itself"
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn add_friend(&self, target: UserId, requester: UserId) -> Result<(), RelationError> {
        validate_pair(target, requester)?;

        let target_user = self.user_store.find_by_id(target).await?;
        self.user_store.find_by_id(requester).await?;

        if target_user.has_friend(requester) {
            tracing::debug!(%target, %requester, "already friends, request ignored");
            return Ok(());
        }

        self.user_store
            .update_by_id(target, &[UserUpdate::AddToSet(ListField::Requests, requester)])
            .await?;
        tracing::info!(%target, %requester, "friend request recorded");

        Ok(())
    }

    async fn reject_friend(&self, user: UserId, requester: UserId) -> Result<(), RelationError> {
        validate_pair(user, requester)?;

        self.user_store
            .update_by_id(user, &[UserUpdate::Pull(ListField::Requests, requester)])
            .await?;
        tracing::info!(%user, %requester, "friend request rejected");

        Ok(())
    }

    async fn accept_friend(&self, user: UserId, requester: UserId) -> Result<(), RelationError> {
        validate_pair(user, requester)?;

        let me = self.user_store.find_by_id(user).await?;
        self.user_store.find_by_id(requester).await?;

        // a retry after success finds the friendship instead of the request
        if !me.has_request_from(requester) && !me.has_friend(requester) {
            return Err(RelationError::RequestNotFound { user, requester });
        }

        // order matters: the accepting side is written first so a failure
        // never shows a friendship only on the requester's side
        let saga = PairSaga::new(
            PairStep::new(
                user,
                vec![
                    UserUpdate::Pull(ListField::Requests, requester),
                    UserUpdate::AddToSet(ListField::Friends, requester),
                ],
            ),
            Some(PairStep::new(
                requester,
                vec![
                    UserUpdate::AddToSet(ListField::Friends, user),
                    UserUpdate::Pull(ListField::Requests, user),
                ],
            )),
        );
        self.run_saga(saga, &me, UserPair::new(user, requester), PairIntent::Friends)
            .await?;
        tracing::info!(%user, %requester, "friend request accepted");

        Ok(())
    }

    async fn remove_friend(&self, user: UserId, other: UserId) -> Result<(), RelationError> {
        validate_pair(user, other)?;

        let me = self.user_store.find_by_id(user).await?;
        let second = match self.user_store.find_by_id(other).await {
            Ok(_) => Some(PairStep::new(
                other,
                vec![UserUpdate::Pull(ListField::Friends, user)],
            )),
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(%user, %other, "removing dangling friend reference");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let saga = PairSaga::new(
            PairStep::new(user, vec![UserUpdate::Pull(ListField::Friends, other)]),
            second,
        );
        self.run_saga(saga, &me, UserPair::new(user, other), PairIntent::Unrelated)
            .await?;
        tracing::info!(%user, %other, "friendship removed");

        Ok(())
    }

    async fn get_friends(
        &self,
        user: UserId,
        search_term: Option<&str>,
    ) -> Result<FriendList, RelationError> {
        validate_id(user)?;

        let me = self.user_store.find_by_id(user).await?;
        let mut friends = self.user_store.find_by_ids(&me.friends).await?;
        if friends.len() != me.friends.len() {
            tracing::warn!(
                %user,
                missing = me.friends.len() - friends.len(),
                "friend list has dangling references"
            );
        }

        if let Some(term) = search_term.filter(|t| !t.is_empty()) {
            friends.retain(|friend| friend.matches(term));
        }

        Ok(FriendList::expand(me, friends))
    }

    async fn list_requests(&self, user: UserId) -> Result<Vec<User>, RelationError> {
        validate_id(user)?;

        let me = self.user_store.find_by_id(user).await?;
        Ok(self.user_store.find_by_ids(&me.requests).await?)
    }

    async fn relation_state(&self, a: UserId, b: UserId) -> Result<RelationState, RelationError> {
        validate_pair(a, b)?;

        let a = self.user_store.find_by_id(a).await?;
        let b = self.user_store.find_by_id(b).await?;
        Ok(RelationState::classify(&a, &b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::*;

    struct Fixture {
        store: Arc<MemoryUserStore>,
        queue: Arc<MemoryRepairQueue>,
        service: RealRelationshipService,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryUserStore::new());
            let queue = Arc::new(MemoryRepairQueue::new());
            let service = RealRelationshipService::new(store.clone(), queue.clone());
            Fixture {
                store,
                queue,
                service,
            }
        }

        async fn user(&self, email: &str, name: &str) -> UserId {
            self.store
                .create(NewUser {
                    email: email.to_string(),
                    name: name.to_string(),
                })
                .await
                .unwrap()
                .id
        }

        async fn get(&self, id: UserId) -> User {
            self.store.find_by_id(id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn rejects_self_relation_and_nil_ids() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let nil = UserId(uuid::Uuid::nil());

        assert!(matches!(
            f.service.add_friend(a, a).await,
            Err(RelationError::Validation(_))
        ));
        assert!(matches!(
            f.service.accept_friend(a, nil).await,
            Err(RelationError::Validation(_))
        ));
        assert!(matches!(
            f.service.get_friends(nil, None).await,
            Err(RelationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn add_friend_requires_both_users() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let ghost = UserId::new_v4();

        assert!(matches!(
            f.service.add_friend(a, ghost).await,
            Err(RelationError::NotFound(id)) if id == ghost
        ));
        assert!(matches!(
            f.service.add_friend(ghost, a).await,
            Err(RelationError::NotFound(id)) if id == ghost
        ));
        assert!(f.get(a).await.requests.is_empty());
    }

    #[tokio::test]
    async fn add_friend_is_idempotent() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;

        for _ in 0..3 {
            f.service.add_friend(a, b).await.unwrap();
        }
        assert_eq!(f.get(a).await.requests, vec![b]);
    }

    #[tokio::test]
    async fn add_friend_between_friends_is_ignored() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;
        f.service.add_friend(a, b).await.unwrap();
        f.service.accept_friend(a, b).await.unwrap();

        f.service.add_friend(a, b).await.unwrap();
        assert!(f.get(a).await.requests.is_empty());
        assert_eq!(
            f.service.relation_state(a, b).await.unwrap(),
            RelationState::Friends
        );
    }

    #[tokio::test]
    async fn accept_without_request_is_rejected() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;

        assert!(matches!(
            f.service.accept_friend(a, b).await,
            Err(RelationError::RequestNotFound { .. })
        ));
        assert!(f.get(a).await.friends.is_empty());
        assert!(f.get(b).await.friends.is_empty());
    }

    #[tokio::test]
    async fn accept_is_idempotent_on_retry() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;
        f.service.add_friend(a, b).await.unwrap();

        f.service.accept_friend(a, b).await.unwrap();
        f.service.accept_friend(a, b).await.unwrap();

        assert_eq!(f.get(a).await.friends, vec![b]);
        assert_eq!(f.get(b).await.friends, vec![a]);
    }

    #[tokio::test]
    async fn accept_clears_crossed_request() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;
        f.service.add_friend(a, b).await.unwrap();
        f.service.add_friend(b, a).await.unwrap();

        f.service.accept_friend(a, b).await.unwrap();
        assert!(f.get(a).await.requests.is_empty());
        assert!(f.get(b).await.requests.is_empty());
    }

    #[tokio::test]
    async fn reject_leaves_friends_untouched() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;
        let c = f.user("c@test.com", "c").await;
        f.service.add_friend(a, b).await.unwrap();
        f.service.accept_friend(a, b).await.unwrap();
        f.service.add_friend(a, c).await.unwrap();

        f.service.reject_friend(a, c).await.unwrap();
        f.service.reject_friend(a, c).await.unwrap();

        let a_doc = f.get(a).await;
        assert!(a_doc.requests.is_empty());
        assert_eq!(a_doc.friends, vec![b]);
    }

    #[tokio::test]
    async fn remove_non_friend_is_noop() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;

        f.service.remove_friend(a, b).await.unwrap();
        assert_eq!(
            f.service.relation_state(a, b).await.unwrap(),
            RelationState::Unrelated
        );
        assert_eq!(f.queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_drops_dangling_reference() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let ghost = UserId::new_v4();
        f.store
            .update_by_id(a, &[UserUpdate::AddToSet(ListField::Friends, ghost)])
            .await
            .unwrap();

        f.service.remove_friend(a, ghost).await.unwrap();
        assert!(f.get(a).await.friends.is_empty());
    }

    #[tokio::test]
    async fn get_friends_filters_in_insertion_order() {
        let f = Fixture::new();
        let me = f.user("me@test.com", "me").await;
        let x = f.user("xavier@test.com", "Xavier").await;
        let y = f.user("yasmin@test.com", "Yasmin").await;
        let z = f.user("zed@other.org", "Zed").await;
        for other in [z, x, y] {
            f.service.add_friend(me, other).await.unwrap();
            f.service.accept_friend(me, other).await.unwrap();
        }

        let all = f.service.get_friends(me, Some("")).await.unwrap();
        let ids: Vec<UserId> = all.friends.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![z, x, y]);
        assert_eq!(all.email, "me@test.com");

        let by_email = f.service.get_friends(me, Some("test.com")).await.unwrap();
        let ids: Vec<UserId> = by_email.friends.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![x, y]);

        let by_name = f.service.get_friends(me, Some("Zed")).await.unwrap();
        assert_eq!(by_name.friends.len(), 1);
        assert_eq!(by_name.friends[0].id, z);

        let case_sensitive = f.service.get_friends(me, Some("zED")).await.unwrap();
        assert!(case_sensitive.friends.is_empty());
    }

    #[tokio::test]
    async fn list_requests_resolves_requesters() {
        let f = Fixture::new();
        let a = f.user("a@test.com", "a").await;
        let b = f.user("b@test.com", "b").await;
        let c = f.user("c@test.com", "c").await;
        f.service.add_friend(a, c).await.unwrap();
        f.service.add_friend(a, b).await.unwrap();

        let requests = f.service.list_requests(a).await.unwrap();
        let emails: Vec<&str> = requests.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["c@test.com", "b@test.com"]);
    }
}
