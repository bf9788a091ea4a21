use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use thiserror::Error;

use crate::{id::new_uuid_v7, time::now_ms, AppError};

const MISSING_FIELD_CODE: &str = "VALIDATION/MISSING_FIELD";
const INVALID_RATE_CODE: &str = "VALIDATION/RATE";
const NOT_FOUND_CODE: &str = "MATRIX/NOT_FOUND";

const ROW_COLUMNS: &str =
    "id, origin, destination, client_name, unit_name, rate, is_complete, active, created_at";

/// A reusable (route, client, unit, rate) reference tuple. Key fields are
/// immutable once the row exists; only the rate changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub client_name: String,
    pub unit_name: String,
    pub rate: Option<f64>,
    pub is_complete: bool,
    pub active: bool,
    pub created_at: i64,
}

impl MatrixRow {
    /// The rate as the boundary renders it: two decimals, or empty when unset.
    pub fn rate_text(&self) -> String {
        format_rate(self.rate)
    }
}

impl TryFrom<&SqliteRow> for MatrixRow {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            origin: row.try_get("origin").map_err(AppError::from)?,
            destination: row.try_get("destination").map_err(AppError::from)?,
            client_name: row.try_get("client_name").map_err(AppError::from)?,
            unit_name: row.try_get("unit_name").map_err(AppError::from)?,
            rate: row
                .try_get::<Option<f64>, _>("rate")
                .map_err(AppError::from)?,
            is_complete: row
                .try_get::<i64, _>("is_complete")
                .map(|value| value != 0)
                .map_err(AppError::from)?,
            active: row
                .try_get::<i64, _>("active")
                .map(|value| value != 0)
                .map_err(AppError::from)?,
            created_at: row.try_get("created_at").map_err(AppError::from)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Please fill {field} before saving.")]
    MissingField { field: &'static str },
    #[error("Rate must be a decimal number.")]
    InvalidRate,
    #[error("Row not found.")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<MatrixError> for AppError {
    fn from(err: MatrixError) -> Self {
        match err {
            MatrixError::MissingField { field } => {
                AppError::new(MISSING_FIELD_CODE, format!("Please fill {field} before saving."))
                    .with_context("field", field)
            }
            MatrixError::InvalidRate => {
                AppError::new(INVALID_RATE_CODE, "Rate must be a decimal number.")
            }
            MatrixError::NotFound => AppError::new(NOT_FOUND_CODE, "Row not found."),
            MatrixError::Db(e) => AppError::store(AppError::from(e)),
        }
    }
}

/// Complete iff all four key fields are non-empty after trimming. The
/// rate never participates.
pub fn is_complete(origin: &str, destination: &str, client_name: &str, unit_name: &str) -> bool {
    !(origin.trim().is_empty()
        || destination.trim().is_empty()
        || client_name.trim().is_empty()
        || unit_name.trim().is_empty())
}

/// Blank text means "not yet priced"; anything else must parse as a finite
/// decimal and is held at two-decimal precision.
pub fn parse_rate(text: &str) -> Result<Option<f64>, MatrixError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: f64 = trimmed.parse().map_err(|_| MatrixError::InvalidRate)?;
    if !value.is_finite() {
        return Err(MatrixError::InvalidRate);
    }
    Ok(Some((value * 100.0).round() / 100.0))
}

pub fn format_rate(rate: Option<f64>) -> String {
    rate.map(|r| format!("{r:.2}")).unwrap_or_default()
}

fn require_field(field: &'static str, value: &str) -> Result<(), MatrixError> {
    if value.trim().is_empty() {
        Err(MatrixError::MissingField { field })
    } else {
        Ok(())
    }
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<MatrixRow>, MatrixError> {
    let sql = format!("SELECT {ROW_COLUMNS} FROM client_matrix WHERE id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    decode_optional(row)
}

async fn find_active_match(
    pool: &SqlitePool,
    origin: &str,
    destination: &str,
    client_name: &str,
    unit_name: &str,
) -> Result<Option<MatrixRow>, MatrixError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM client_matrix \
         WHERE active = 1 AND is_complete = 1 \
           AND origin = ? AND destination = ? AND client_name = ? AND unit_name = ? \
         LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(origin)
        .bind(destination)
        .bind(client_name)
        .bind(unit_name)
        .fetch_optional(pool)
        .await?;
    decode_optional(row)
}

fn decode_optional(row: Option<SqliteRow>) -> Result<Option<MatrixRow>, MatrixError> {
    match row {
        Some(r) => MatrixRow::try_from(&r)
            .map(Some)
            .map_err(|e| MatrixError::Db(sqlx::Error::Decode(e.to_string().into()))),
        None => Ok(None),
    }
}

/// Create a row, or hand back the active+complete row that already carries
/// this exact (trimmed, case-sensitive) key tuple. On reuse the caller's
/// rate is ignored; the existing row wins. Idempotent under duplicate
/// submission. The concurrent first-insert race is accepted and tolerated.
pub async fn create_or_reuse(
    pool: &SqlitePool,
    origin: &str,
    destination: &str,
    client_name: &str,
    unit_name: &str,
    rate_text: &str,
) -> Result<MatrixRow, MatrixError> {
    let origin = origin.trim();
    let destination = destination.trim();
    let client_name = client_name.trim();
    let unit_name = unit_name.trim();

    require_field("Origin", origin)?;
    require_field("Destination", destination)?;
    require_field("Client", client_name)?;
    require_field("Unit", unit_name)?;

    if let Some(existing) =
        find_active_match(pool, origin, destination, client_name, unit_name).await?
    {
        return Ok(existing);
    }

    let rate = parse_rate(rate_text)?;
    let id = new_uuid_v7();
    sqlx::query(
        "INSERT INTO client_matrix \
           (id, origin, destination, client_name, unit_name, rate, is_complete, active, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, 1, 1, ?)",
    )
    .bind(&id)
    .bind(origin)
    .bind(destination)
    .bind(client_name)
    .bind(unit_name)
    .bind(rate)
    .bind(now_ms())
    .execute(pool)
    .await?;

    get(pool, &id).await?.ok_or(MatrixError::NotFound)
}

/// Overwrite the rate unconditionally (last writer wins). Works on inactive
/// rows too; a deactivated row's rate stays editable. Blank text clears the
/// rate. Returns the stored rate as boundary text.
pub async fn update_rate(
    pool: &SqlitePool,
    id: &str,
    rate_text: &str,
) -> Result<String, MatrixError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM client_matrix WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(MatrixError::NotFound);
    }

    let rate = parse_rate(rate_text)?;
    sqlx::query("UPDATE client_matrix SET rate = ? WHERE id = ?")
        .bind(rate)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(format_rate(rate))
}

/// Deactivate a row, keeping it (and the trips that copied from it) intact.
/// Deleting an already-inactive row succeeds as a no-op; an id that never
/// existed is an error.
pub async fn soft_delete(pool: &SqlitePool, id: &str) -> Result<String, MatrixError> {
    let res = sqlx::query("UPDATE client_matrix SET active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM client_matrix WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(MatrixError::NotFound);
        }
    }

    Ok(id.to_string())
}

/// Rows the trip form may offer: active and complete, ordered by the key
/// tuple alone (case-sensitive, no further tiebreak).
pub async fn list_selectable(pool: &SqlitePool) -> Result<Vec<MatrixRow>, MatrixError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM client_matrix \
         WHERE active = 1 AND is_complete = 1 \
         ORDER BY origin ASC, destination ASC, client_name ASC, unit_name ASC"
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    decode_rows(rows)
}

/// Every active row, same ordering; feeds the editing grid.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<MatrixRow>, MatrixError> {
    let sql = format!(
        "SELECT {ROW_COLUMNS} FROM client_matrix \
         WHERE active = 1 \
         ORDER BY origin ASC, destination ASC, client_name ASC, unit_name ASC"
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    decode_rows(rows)
}

fn decode_rows(rows: Vec<SqliteRow>) -> Result<Vec<MatrixRow>, MatrixError> {
    rows.iter()
        .map(|r| {
            MatrixRow::try_from(r)
                .map_err(|e| MatrixError::Db(sqlx::Error::Decode(e.to_string().into())))
        })
        .collect()
}
