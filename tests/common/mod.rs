#![allow(dead_code)]

use befriend::application_impl::*;
use befriend::domain_model::*;
use befriend::domain_port::*;
use befriend::infra_memory::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Memory store that fails selected updates, to strand two-document writes.
#[derive(Default)]
pub struct FaultyUserStore {
    inner: MemoryUserStore,
    // user -> (updates still allowed before failing, failures left)
    faults: Mutex<HashMap<UserId, (usize, usize)>>,
}

impl FaultyUserStore {
    /// Lets `skip` more updates to `user` through, then fails the next `count`.
    pub fn fail_updates(&self, user: UserId, skip: usize, count: usize) {
        self.faults.lock().unwrap().insert(user, (skip, count));
    }

    pub fn put(&self, user: User) {
        self.inner.put(user);
    }

    fn should_fail(&self, user: UserId) -> bool {
        let mut faults = self.faults.lock().unwrap();
        match faults.get_mut(&user) {
            Some((skip, _)) if *skip > 0 => {
                *skip -= 1;
                false
            }
            Some((_, count)) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait::async_trait]
impl UserStore for FaultyUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.inner.create(new_user).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        self.inner.find_by_ids(ids).await
    }

    async fn update_by_id(&self, id: UserId, updates: &[UserUpdate]) -> Result<User, StoreError> {
        if self.should_fail(id) {
            return Err(StoreError::Backend(format!("injected failure for {id}")));
        }
        self.inner.update_by_id(id, updates).await
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.list_ids().await
    }
}

/// Memory queue whose pushes can be switched off.
#[derive(Default)]
pub struct FaultyRepairQueue {
    inner: MemoryRepairQueue,
    refuse_pushes: AtomicBool,
}

impl FaultyRepairQueue {
    pub fn refuse_pushes(&self, refuse: bool) {
        self.refuse_pushes.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RepairQueue for FaultyRepairQueue {
    async fn push(&self, ticket: RepairTicket) -> Result<(), RepairQueueError> {
        if self.refuse_pushes.load(Ordering::SeqCst) {
            return Err(RepairQueueError::Backend(format!(
                "injected push failure for {}",
                ticket.pair
            )));
        }
        self.inner.push(ticket).await
    }

    async fn pop_batch(&self, limit: usize) -> Result<Vec<RepairTicket>, RepairQueueError> {
        self.inner.pop_batch(limit).await
    }

    async fn len(&self) -> Result<usize, RepairQueueError> {
        self.inner.len().await
    }
}

pub struct TestEnv {
    pub store: Arc<FaultyUserStore>,
    pub queue: Arc<FaultyRepairQueue>,
    pub relationships: RealRelationshipService,
    pub reconcile: RealReconcileService,
}

impl TestEnv {
    pub fn new() -> Self {
        let store = Arc::new(FaultyUserStore::default());
        let queue = Arc::new(FaultyRepairQueue::default());
        TestEnv {
            relationships: RealRelationshipService::new(store.clone(), queue.clone()),
            reconcile: RealReconcileService::new(store.clone(), queue.clone()),
            store,
            queue,
        }
    }

    /// Registers one fresh user per `(email, name)`.
    pub async fn users(&self, accounts: &[(&str, &str)]) -> Vec<UserId> {
        let mut ids = Vec::with_capacity(accounts.len());
        for (email, name) in accounts {
            let user = self
                .store
                .create(NewUser {
                    email: email.to_string(),
                    name: name.to_string(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        ids
    }

    pub async fn by_email(&self, email: &str) -> User {
        self.store.find_by_email(email).await.unwrap()
    }

    pub async fn get(&self, id: UserId) -> User {
        self.store.find_by_id(id).await.unwrap()
    }
}

pub const TEST_USERS: [(&str, &str); 3] = [
    ("test@test.com", "Tester"),
    ("squanchy@test.com", "Squanchy"),
    ("loser@test.com", "Loser"),
];
