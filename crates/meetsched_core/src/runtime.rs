//! Process-level wiring of pool, store and services.
//!
//! # Responsibility
//! - Open the connection pool once, before any request is served.
//! - Inject one shared store into the scheduling and query services.
//! - Drain the pool on shutdown.

use crate::config::CoreConfig;
use crate::db::{DbPool, DbResult};
use crate::repo::store::SqliteMeetingStore;
use crate::service::query_service::MeetingQueryService;
use crate::service::scheduling_service::SchedulingService;
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// Long-lived handles shared by every request of the process.
pub struct MeetingRuntime {
    pool: Arc<DbPool>,
    scheduler: SchedulingService<SqliteMeetingStore>,
    queries: MeetingQueryService<SqliteMeetingStore>,
}

impl MeetingRuntime {
    /// Opens the configured database and builds the services over it.
    pub fn start(config: &CoreConfig) -> DbResult<Self> {
        let pool = DbPool::open(&config.db_path, config.pool_options())?;
        info!(
            "event=runtime_start module=core status=ok pool_size={} store_timeout_ms={}",
            pool.size(),
            pool.store_timeout().as_millis()
        );
        Ok(Self::with_pool(Arc::new(pool)))
    }

    /// Builds the services over an already opened pool.
    pub fn with_pool(pool: Arc<DbPool>) -> Self {
        let store = SqliteMeetingStore::new(Arc::clone(&pool));
        Self {
            scheduler: SchedulingService::new(store.clone()),
            queries: MeetingQueryService::new(store),
            pool,
        }
    }

    pub fn scheduler(&self) -> &SchedulingService<SqliteMeetingStore> {
        &self.scheduler
    }

    pub fn queries(&self) -> &MeetingQueryService<SqliteMeetingStore> {
        &self.queries
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }

    /// Stops new storage work and waits up to `grace` for in-flight requests.
    pub fn shutdown(self, grace: Duration) -> DbResult<()> {
        info!("event=runtime_shutdown module=core status=start");
        self.pool.shutdown(grace)
    }
}
