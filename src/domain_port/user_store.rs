use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found: {0}")]
    NotFound(UserId),
    #[error("no user with email {0}")]
    NotFoundByEmail(String),
    #[error("duplicate user: {0}")]
    Duplicate(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistent collection of user documents.
///
/// `update_by_id` applies its whole batch as one atomic read-modify-write on a
/// single document. Nothing is atomic across documents.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Resolves `ids` in the given order. Ids without a document are omitted.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError>;

    async fn update_by_id(&self, id: UserId, updates: &[UserUpdate]) -> Result<User, StoreError>;

    async fn list_ids(&self) -> Result<Vec<UserId>, StoreError>;
}
