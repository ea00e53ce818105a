use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

/// In-process user store. A document update holds the shard lock for the whole
/// batch, which gives the same per-document atomicity as the MySQL store.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<UserId, User>,
    emails: DashMap<String, UserId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed document, bypassing registration. Used to seed
    /// broken states for reconciliation.
    pub fn put(&self, user: User) {
        self.emails.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user);
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let id = UserId::new_v4();
        let owner = *self.emails.entry(new_user.email.clone()).or_insert(id);
        if owner != id {
            return Err(StoreError::Duplicate(new_user.email));
        }

        let user = User::new(id, new_user);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let id = self
            .emails
            .get(email)
            .map(|e| *e.value())
            .ok_or_else(|| StoreError::NotFoundByEmail(email.to_string()))?;
        self.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }

    async fn update_by_id(&self, id: UserId, updates: &[UserUpdate]) -> Result<User, StoreError> {
        let mut user = self.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        for update in updates {
            update.apply(&mut user);
        }
        Ok(user.clone())
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.users.iter().map(|e| *e.key()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: email.to_string(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@test.com")).await.unwrap();
        let err = store.create(new_user("a@test.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn find_by_email_and_id_agree() {
        let store = MemoryUserStore::new();
        let created = store.create(new_user("a@test.com")).await.unwrap();
        let by_email = store.find_by_email("a@test.com").await.unwrap();
        let by_id = store.find_by_id(created.id).await.unwrap();
        assert_eq!(by_email, by_id);
        assert!(matches!(
            store.find_by_email("b@test.com").await,
            Err(StoreError::NotFoundByEmail(_))
        ));
    }

    #[tokio::test]
    async fn update_applies_whole_batch() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@test.com")).await.unwrap();
        let other = UserId::new_v4();
        store
            .update_by_id(user.id, &[UserUpdate::AddToSet(ListField::Requests, other)])
            .await
            .unwrap();

        let updated = store
            .update_by_id(
                user.id,
                &[
                    UserUpdate::Pull(ListField::Requests, other),
                    UserUpdate::AddToSet(ListField::Friends, other),
                ],
            )
            .await
            .unwrap();
        assert!(updated.requests.is_empty());
        assert_eq!(updated.friends, vec![other]);
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let store = MemoryUserStore::new();
        let id = UserId::new_v4();
        let err = store
            .update_by_id(id, &[UserUpdate::Pull(ListField::Friends, id)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn find_by_ids_keeps_order_and_skips_missing() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@test.com")).await.unwrap();
        let b = store.create(new_user("b@test.com")).await.unwrap();
        let found = store
            .find_by_ids(&[b.id, UserId::new_v4(), a.id])
            .await
            .unwrap();
        let ids: Vec<UserId> = found.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
