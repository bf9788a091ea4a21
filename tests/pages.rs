use anyhow::Result;
use haulboard::{
    auth::UserDirectory,
    matrix, pages, trips,
};

#[path = "util.rs"]
mod util;

struct StaticDirectory;

impl UserDirectory for StaticDirectory {
    fn display_name(&self, user_id: &str) -> Option<String> {
        (user_id == "drv-1").then(|| "Dana Driver".to_string())
    }
}

#[tokio::test]
async fn trip_form_lists_selectable_rows_and_embeds_the_nonce() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "10").await?;

    let html = pages::render_trip_form(&pool, &util::driver(), "nonce-123").await?;
    assert!(html.contains("Submit Trip"));
    assert!(html.contains(&row.id));
    assert!(html.contains(r#"value="nonce-123""#));
    assert!(html.contains("ClientX"));
    assert!(!html.contains("No client list rows yet"));
    Ok(())
}

#[tokio::test]
async fn trip_form_hints_when_the_selector_is_empty() -> Result<()> {
    let pool = util::memory_pool().await?;
    let html = pages::render_trip_form(&pool, &util::driver(), "n").await?;
    assert!(html.contains("No client list rows yet"));
    Ok(())
}

#[tokio::test]
async fn trip_form_gates_by_authentication() -> Result<()> {
    let pool = util::memory_pool().await?;
    let html = pages::render_trip_form(&pool, &util::anonymous(), "n").await?;
    assert!(html.contains("Please login"));
    Ok(())
}

#[tokio::test]
async fn rendered_values_are_escaped() -> Result<()> {
    let pool = util::memory_pool().await?;
    matrix::create_or_reuse(&pool, "<script>", "B", "C&Co", "U", "").await?;

    let html = pages::render_trip_form(&pool, &util::driver(), "n").await?;
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("C&amp;Co"));
    Ok(())
}

#[tokio::test]
async fn client_list_is_manager_only_and_formats_rates() -> Result<()> {
    let pool = util::memory_pool().await?;
    matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "12.5").await?;

    let denied = pages::render_client_list(&pool, &util::driver(), "n").await?;
    assert!(denied.contains("Access denied"));

    let html = pages::render_client_list(&pool, &util::manager(), "n").await?;
    assert!(html.contains("Client List"));
    assert!(html.contains(r#"value="12.50""#));
    assert!(html.contains("ClientX"));
    Ok(())
}

#[tokio::test]
async fn report_resolves_driver_names_through_the_directory() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "").await?;
    trips::submit_trip(&pool, &row.id, "2026-08-07", 1.0, "BILL-1", "drv-1").await?;
    trips::submit_trip(&pool, &row.id, "2026-08-06", 2.0, "BILL-2", "ghost").await?;

    let denied = pages::render_trips_report(&pool, &util::driver(), &StaticDirectory).await?;
    assert!(denied.contains("Access denied"));

    let html = pages::render_trips_report(&pool, &util::manager(), &StaticDirectory).await?;
    assert!(html.contains("Dana Driver"));
    assert!(html.contains("Unknown"));
    assert!(html.contains("BILL-1"));
    Ok(())
}

#[tokio::test]
async fn report_shows_an_empty_state() -> Result<()> {
    let pool = util::memory_pool().await?;
    let html = pages::render_trips_report(&pool, &util::admin(), &StaticDirectory).await?;
    assert!(html.contains("No trips recorded yet."));
    Ok(())
}
