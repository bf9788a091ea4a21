#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Developer sanity probe: drives one full client-list + trip cycle
//! through the dispatch boundary against a throwaway database and prints
//! each structured response.

use std::sync::Arc;

use anyhow::Result;
use haulboard::{
    auth::{Principal, Role},
    dispatch::{self, ActionRequest, ActionResponse},
    logging, migrate,
    security::{InMemoryNonces, NonceFamily},
    state::AppState,
    time,
};

fn show(label: &str, response: &ActionResponse) -> Result<()> {
    println!("== {label}\n{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let dir = std::env::temp_dir().join(format!("haulboard-smoke-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let db = dir.join("smoke.sqlite3");

    let pool = migrate::open_pool(&db).await?;
    migrate::apply_migrations(&pool).await?;

    let nonces = Arc::new(InMemoryNonces::new());
    let state = AppState::new(pool, nonces.clone());

    let manager = Principal::new("lm-1", Role::LogisticManager);
    let driver = Principal::new("drv-1", Role::Driver);

    let grid_nonce = nonces.issue(NonceFamily::ClientList);
    let create = |action: &str| ActionRequest::new(action, manager.clone()).with_nonce(grid_nonce.clone());

    let created = dispatch::handle(
        &state,
        create("create_matrix_row")
            .with_param("origin", "Accra")
            .with_param("destination", "Kumasi")
            .with_param("client_name", "Acme Cement")
            .with_param("unit_name", "Truck 7")
            .with_param("rate", "120.5"),
    )
    .await;
    show("create", &created)?;
    let row_id = created
        .data
        .as_ref()
        .and_then(|d| d.get("id"))
        .and_then(|v| v.as_str())
        .expect("created row id")
        .to_string();

    let reused = dispatch::handle(
        &state,
        create("create_matrix_row")
            .with_param("origin", "Accra")
            .with_param("destination", "Kumasi")
            .with_param("client_name", "Acme Cement")
            .with_param("unit_name", "Truck 7")
            .with_param("rate", "999"),
    )
    .await;
    show("reuse (same tuple, rate ignored)", &reused)?;

    let rate = dispatch::handle(
        &state,
        create("update_matrix_rate")
            .with_param("id", row_id.clone())
            .with_param("rate", "99"),
    )
    .await;
    show("update rate", &rate)?;

    let trip_nonce = nonces.issue(NonceFamily::SubmitTrip);
    let submitted = dispatch::handle(
        &state,
        ActionRequest::new("submit_trip", driver.clone())
            .with_nonce(trip_nonce)
            .with_param("matrix_row_id", row_id.clone())
            .with_param("trip_date", time::today())
            .with_param("weight", "12.75")
            .with_param("bill_number", "BILL-0001"),
    )
    .await;
    show("submit trip", &submitted)?;

    let deleted = dispatch::handle(&state, create("delete_matrix_row").with_param("id", row_id)).await;
    show("soft delete", &deleted)?;

    let selectable = dispatch::handle(&state, ActionRequest::new("list_selectable", driver)).await;
    show("list selectable after delete (empty)", &selectable)?;

    let report = dispatch::handle(&state, ActionRequest::new("list_trips", manager)).await;
    show("trips report (snapshot survives delete)", &report)?;

    std::fs::remove_dir_all(&dir).ok();
    Ok(())
}
