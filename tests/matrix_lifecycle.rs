use anyhow::Result;
use haulboard::matrix::{self, MatrixError};

#[path = "util.rs"]
mod util;

#[tokio::test]
async fn create_persists_a_complete_active_row() -> Result<()> {
    let pool = util::memory_pool().await?;

    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "100.00").await?;
    assert!(row.is_complete);
    assert!(row.active);
    assert_eq!(row.rate, Some(100.0));
    assert_eq!(row.rate_text(), "100.00");

    let fetched = matrix::get(&pool, &row.id).await?.expect("row persisted");
    assert_eq!(fetched, row);
    Ok(())
}

#[tokio::test]
async fn create_trims_key_fields_before_storing() -> Result<()> {
    let pool = util::memory_pool().await?;

    let row = matrix::create_or_reuse(&pool, "  A ", " B", "ClientX  ", " Truck ", "").await?;
    assert_eq!(row.origin, "A");
    assert_eq!(row.destination, "B");
    assert_eq!(row.client_name, "ClientX");
    assert_eq!(row.unit_name, "Truck");
    assert_eq!(row.rate, None);
    Ok(())
}

#[tokio::test]
async fn identical_tuple_reuses_the_existing_row() -> Result<()> {
    let pool = util::memory_pool().await?;

    let first = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "100.00").await?;
    // Untrimmed spelling of the same tuple, different rate: the existing
    // row wins and the new rate is ignored.
    let second = matrix::create_or_reuse(&pool, " A ", "B", "ClientX", "Truck", "250.00").await?;

    assert_eq!(first.id, second.id);
    assert_eq!(second.rate, Some(100.0));

    let all = matrix::list_active(&pool).await?;
    assert_eq!(all.len(), 1);
    Ok(())
}

#[tokio::test]
async fn differing_tuple_inserts_a_second_row() -> Result<()> {
    let pool = util::memory_pool().await?;

    let first = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "").await?;
    // Case matters for the business key.
    let second = matrix::create_or_reuse(&pool, "a", "B", "ClientX", "Truck", "").await?;

    assert_ne!(first.id, second.id);
    assert_eq!(matrix::list_active(&pool).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn missing_key_field_is_rejected_and_nothing_is_inserted() -> Result<()> {
    let pool = util::memory_pool().await?;

    let err = matrix::create_or_reuse(&pool, "A", "B", "", "Truck", "")
        .await
        .expect_err("blank client must fail");
    match err {
        MatrixError::MissingField { field } => assert_eq!(field, "Client"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = matrix::create_or_reuse(&pool, "A", "B", "   ", "Truck", "")
        .await
        .expect_err("blank-only client must fail");
    assert!(matches!(err, MatrixError::MissingField { field: "Client" }));

    assert!(matrix::list_active(&pool).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleted_row_does_not_satisfy_reuse() -> Result<()> {
    let pool = util::memory_pool().await?;

    let first = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "10").await?;
    matrix::soft_delete(&pool, &first.id).await?;

    let second = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "20").await?;
    assert_ne!(first.id, second.id);
    assert_eq!(second.rate, Some(20.0));
    Ok(())
}

#[tokio::test]
async fn rate_round_trips_with_two_decimal_formatting() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "").await?;

    assert_eq!(matrix::update_rate(&pool, &row.id, "12.5").await?, "12.50");
    let fetched = matrix::get(&pool, &row.id).await?.expect("row");
    assert_eq!(fetched.rate, Some(12.5));
    assert_eq!(fetched.rate_text(), "12.50");

    assert_eq!(matrix::update_rate(&pool, &row.id, "").await?, "");
    let cleared = matrix::get(&pool, &row.id).await?.expect("row");
    assert_eq!(cleared.rate, None);
    Ok(())
}

#[tokio::test]
async fn rate_of_a_deactivated_row_stays_editable() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "5").await?;
    matrix::soft_delete(&pool, &row.id).await?;

    assert_eq!(matrix::update_rate(&pool, &row.id, "7").await?, "7.00");
    let fetched = matrix::get(&pool, &row.id).await?.expect("row");
    assert!(!fetched.active);
    assert_eq!(fetched.rate, Some(7.0));
    Ok(())
}

#[tokio::test]
async fn update_rate_on_unknown_id_is_not_found() -> Result<()> {
    let pool = util::memory_pool().await?;
    let err = matrix::update_rate(&pool, "no-such-row", "12")
        .await
        .expect_err("unknown id");
    assert!(matches!(err, MatrixError::NotFound));
    Ok(())
}

#[tokio::test]
async fn malformed_rate_text_is_rejected_without_a_write() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "50").await?;

    let err = matrix::update_rate(&pool, &row.id, "twelve")
        .await
        .expect_err("malformed rate");
    assert!(matches!(err, MatrixError::InvalidRate));

    let fetched = matrix::get(&pool, &row.id).await?.expect("row");
    assert_eq!(fetched.rate, Some(50.0));
    Ok(())
}

#[tokio::test]
async fn soft_delete_is_idempotent_but_unknown_ids_fail() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "").await?;

    assert_eq!(matrix::soft_delete(&pool, &row.id).await?, row.id);
    // Deleting again is a no-op success, not an error.
    assert_eq!(matrix::soft_delete(&pool, &row.id).await?, row.id);

    let err = matrix::soft_delete(&pool, "no-such-row")
        .await
        .expect_err("unknown id");
    assert!(matches!(err, MatrixError::NotFound));

    let fetched = matrix::get(&pool, &row.id).await?.expect("row kept");
    assert!(!fetched.active);
    Ok(())
}

#[tokio::test]
async fn key_fields_never_change_after_creation() -> Result<()> {
    let pool = util::memory_pool().await?;
    let row = matrix::create_or_reuse(&pool, "A", "B", "ClientX", "Truck", "1").await?;

    matrix::update_rate(&pool, &row.id, "2").await?;
    matrix::soft_delete(&pool, &row.id).await?;
    matrix::update_rate(&pool, &row.id, "").await?;

    let fetched = matrix::get(&pool, &row.id).await?.expect("row");
    assert_eq!(fetched.origin, row.origin);
    assert_eq!(fetched.destination, row.destination);
    assert_eq!(fetched.client_name, row.client_name);
    assert_eq!(fetched.unit_name, row.unit_name);
    assert!(fetched.is_complete);
    Ok(())
}

#[tokio::test]
async fn listings_order_by_the_key_tuple() -> Result<()> {
    let pool = util::memory_pool().await?;

    matrix::create_or_reuse(&pool, "B", "A", "C1", "U1", "").await?;
    matrix::create_or_reuse(&pool, "A", "Z", "C1", "U1", "").await?;
    matrix::create_or_reuse(&pool, "A", "B", "C2", "U1", "").await?;
    matrix::create_or_reuse(&pool, "A", "B", "C1", "U2", "").await?;
    matrix::create_or_reuse(&pool, "A", "B", "C1", "U1", "").await?;

    let rows = matrix::list_selectable(&pool).await?;
    let keys: Vec<(String, String, String, String)> = rows
        .iter()
        .map(|r| {
            (
                r.origin.clone(),
                r.destination.clone(),
                r.client_name.clone(),
                r.unit_name.clone(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(rows.len(), 5);
    Ok(())
}

#[tokio::test]
async fn selectable_excludes_deactivated_rows() -> Result<()> {
    let pool = util::memory_pool().await?;

    let keep = matrix::create_or_reuse(&pool, "A", "B", "C1", "U1", "").await?;
    let removed = matrix::create_or_reuse(&pool, "A", "B", "C2", "U1", "").await?;
    matrix::soft_delete(&pool, &removed.id).await?;

    let rows = matrix::list_selectable(&pool).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, keep.id);
    assert!(rows.iter().all(|r| r.active && r.is_complete));
    Ok(())
}
