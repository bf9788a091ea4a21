#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use haulboard::{
    auth::{Principal, Role},
    migrate,
    security::InMemoryNonces,
    state::AppState,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON;").execute(&pool).await?;
    migrate::apply_migrations(&pool).await?;
    Ok(pool)
}

pub fn test_state(pool: SqlitePool) -> (AppState, Arc<InMemoryNonces>) {
    let nonces = Arc::new(InMemoryNonces::new());
    (AppState::new(pool, nonces.clone()), nonces)
}

pub fn driver() -> Principal {
    Principal::new("drv-1", Role::Driver)
}

pub fn manager() -> Principal {
    Principal::new("lm-1", Role::LogisticManager)
}

pub fn admin() -> Principal {
    Principal::new("adm-1", Role::Administrator)
}

pub fn anonymous() -> Principal {
    Principal::new("", Role::Unauthenticated)
}
