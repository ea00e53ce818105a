use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use anyhow::anyhow;
use nanoid::nanoid;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    /// Exposed for account registration, which lives outside this crate.
    pub user_store: Arc<dyn UserStore>,
    pub relationship_service: Arc<dyn RelationshipService>,
    pub reconcile_service: Arc<dyn ReconcileService>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;
        let user_store: Arc<dyn UserStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryUserStore::new()),
            "mysql" => {
                let mysql_settings = settings
                    .mysql
                    .as_ref()
                    .ok_or_else(|| anyhow!("mysql store selected without [mysql] settings"))?;
                let connected = Pool::<MySql>::connect(&mysql_settings.dsn).await?;
                let value: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&connected).await?;
                debug!("MySQL -> {}", value);
                pool = Some(connected.clone());
                Arc::new(MySqlUserStore::new(connected))
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let repair_queue: Arc<dyn RepairQueue> = match settings.repair.backend.as_str() {
            "memory" => Arc::new(MemoryRepairQueue::new()),
            "redis" => {
                let redis_settings = settings
                    .redis
                    .as_ref()
                    .ok_or_else(|| anyhow!("redis repair queue selected without [redis] settings"))?;
                let redis_client = redis::Client::open(redis_settings.dsn.as_str())?;
                let mut redis_manager = redis_client.get_connection_manager().await?;
                let pong: String = redis::cmd("PING").query_async(&mut redis_manager).await?;
                debug!("PING -> {}", pong);
                Arc::new(RedisRepairQueue::new(
                    redis_manager,
                    settings.repair.prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown repair backend: {}", other)),
        };

        let relationship_service: Arc<dyn RelationshipService> = Arc::new(
            RealRelationshipService::new(user_store.clone(), repair_queue.clone()),
        );
        let reconcile_service: Arc<dyn ReconcileService> =
            Arc::new(RealReconcileService::new(user_store.clone(), repair_queue));

        info!(
            store = %settings.store.backend,
            repair = %settings.repair.backend,
            "server started"
        );

        Ok(Self {
            user_store,
            relationship_service,
            reconcile_service,
            worker_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
            pool,
        })
    }

    pub fn spawn_repair_worker(&self, interval: Duration, batch_size: usize) -> anyhow::Result<()> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let worker_id = nanoid!(10, &alphabet);

        let mut lock = self
            .worker_handle
            .lock()
            .map_err(|e| anyhow!("worker handle poisoned: {e}"))?;
        if lock.is_some() {
            return Err(anyhow!("repair worker already running"));
        }

        let worker = RepairWorker::new(
            self.reconcile_service.clone(),
            interval,
            batch_size,
            &worker_id,
            self.cancel.clone(),
        );
        *lock = Some(tokio::spawn(async move {
            let _ = worker.run().await;
        }));
        info!(worker = %worker_id, "repair worker spawned");

        Ok(())
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.worker_handle.lock().ok().and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("repair worker handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
