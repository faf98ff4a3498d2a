use sqlx::PgPool;
use std::sync::Arc;

use crate::access::{AccessDirectory, AccessPolicy, PgAccessDirectory};
use crate::middleware::AccessGuard;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub directory: Arc<dyn AccessDirectory>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let directory = Arc::new(PgAccessDirectory::new(pool.clone()));
        Self { pool, directory }
    }

    /// Use a different membership/plan source than the database
    pub fn with_directory(pool: PgPool, directory: Arc<dyn AccessDirectory>) -> Self {
        Self { pool, directory }
    }

    /// Guard state for one procedure tier
    pub fn guard(&self, policy: AccessPolicy) -> AccessGuard {
        AccessGuard::new(self.directory.clone(), policy)
    }
}
