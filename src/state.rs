use std::sync::Arc;

use sqlx::SqlitePool;

use crate::security::NonceVerifier;

/// Shared handles the dispatch boundary needs: the store pool and the
/// host's anti-forgery verifier. No entity state is cached here; every
/// operation re-reads the store.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub nonces: Arc<dyn NonceVerifier>,
}

impl AppState {
    pub fn new(pool: SqlitePool, nonces: Arc<dyn NonceVerifier>) -> Self {
        AppState { pool, nonces }
    }

    pub fn pool_clone(&self) -> SqlitePool {
        self.pool.clone()
    }
}
