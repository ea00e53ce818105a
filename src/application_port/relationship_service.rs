use crate::domain_model::*;
use crate::domain_port::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("invalid argument: {0}")]
    Validation(String),
    #[error("user not found: {0}")]
    NotFound(UserId),
    #[error("no pending request from {requester} to {user}")]
    RequestNotFound { user: UserId, requester: UserId },
    /// `ticket_recorded` is false when the repair ticket could not be queued;
    /// the pair is then only found again by an audit.
    #[error("pair {pair} left inconsistent (intended {intent:?}): {reason}")]
    PartialFailure {
        pair: UserPair,
        intent: PairIntent,
        reason: String,
        ticket_recorded: bool,
    },
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for RelationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => RelationError::NotFound(id),
            other => RelationError::Store(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    /// Records a pending request from `requester` on `target`.
    async fn add_friend(&self, target: UserId, requester: UserId) -> Result<(), RelationError>;

    async fn reject_friend(&self, user: UserId, requester: UserId) -> Result<(), RelationError>;

    async fn accept_friend(&self, user: UserId, requester: UserId) -> Result<(), RelationError>;

    async fn remove_friend(&self, user: UserId, other: UserId) -> Result<(), RelationError>;

    /// `search_term` filters friends by case-sensitive substring of email or
    /// name. `None` or an empty term returns every friend.
    async fn get_friends(
        &self,
        user: UserId,
        search_term: Option<&str>,
    ) -> Result<FriendList, RelationError>;

    async fn list_requests(&self, user: UserId) -> Result<Vec<User>, RelationError>;

    async fn relation_state(&self, a: UserId, b: UserId) -> Result<RelationState, RelationError>;
}
