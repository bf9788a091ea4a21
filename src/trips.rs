use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use thiserror::Error;

use crate::{id::new_uuid_v7, time::now_ms, AppError};

const INVALID_SELECTION_CODE: &str = "TRIP/INVALID_SELECTION";
const INVALID_WEIGHT_CODE: &str = "VALIDATION/WEIGHT";

/// The all-trips report shows the latest records only.
pub const DEFAULT_REPORT_LIMIT: i64 = 500;

/// One driver's movement, frozen at submission time. Origin and destination
/// are copied from the selected matrix row, never referenced, so later
/// edits or deactivation leave past trips untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub id: String,
    pub user_id: String,
    pub trip_date: String,
    pub origin: String,
    pub destination: String,
    pub weight: f64,
    pub bill_number: String,
    pub created_at: i64,
}

impl TryFrom<&SqliteRow> for Trip {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            user_id: row.try_get("user_id").map_err(AppError::from)?,
            trip_date: row.try_get("trip_date").map_err(AppError::from)?,
            origin: row.try_get("origin").map_err(AppError::from)?,
            destination: row.try_get("destination").map_err(AppError::from)?,
            weight: row.try_get("weight").map_err(AppError::from)?,
            bill_number: row.try_get("bill_number").map_err(AppError::from)?,
            created_at: row.try_get("created_at").map_err(AppError::from)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum TripError {
    #[error("Invalid or inactive Client List selection.")]
    InvalidSelection,
    #[error("Weight must be a non-negative number.")]
    InvalidWeight,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        match err {
            TripError::InvalidSelection => AppError::new(
                INVALID_SELECTION_CODE,
                "Invalid or inactive Client List selection.",
            ),
            TripError::InvalidWeight => {
                AppError::new(INVALID_WEIGHT_CODE, "Weight must be a non-negative number.")
            }
            TripError::Db(e) => AppError::store(AppError::from(e)),
        }
    }
}

/// Persist a trip against a matrix row that is active and complete at this
/// very moment: the row's state is re-read here no matter what the form
/// displayed, closing the render/submit race. trip_date and bill_number
/// are opaque pass-through text; non-blankness is the dispatch boundary's
/// job.
pub async fn submit_trip(
    pool: &SqlitePool,
    matrix_row_id: &str,
    trip_date: &str,
    weight: f64,
    bill_number: &str,
    user_id: &str,
) -> Result<Trip, TripError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(TripError::InvalidWeight);
    }

    let selected = sqlx::query(
        "SELECT origin, destination FROM client_matrix \
         WHERE id = ? AND active = 1 AND is_complete = 1",
    )
    .bind(matrix_row_id)
    .fetch_optional(pool)
    .await?;
    let Some(selected) = selected else {
        return Err(TripError::InvalidSelection);
    };
    let origin: String = selected.try_get("origin")?;
    let destination: String = selected.try_get("destination")?;

    let trip = Trip {
        id: new_uuid_v7(),
        user_id: user_id.to_string(),
        trip_date: trip_date.to_string(),
        origin,
        destination,
        weight,
        bill_number: bill_number.to_string(),
        created_at: now_ms(),
    };

    sqlx::query(
        "INSERT INTO trips \
           (id, user_id, trip_date, origin, destination, weight, bill_number, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&trip.id)
    .bind(&trip.user_id)
    .bind(&trip.trip_date)
    .bind(&trip.origin)
    .bind(&trip.destination)
    .bind(trip.weight)
    .bind(&trip.bill_number)
    .bind(trip.created_at)
    .execute(pool)
    .await?;

    Ok(trip)
}

/// Latest trips for the report, newest trip dates first; time-ordered ids
/// break ties within a date.
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Trip>, TripError> {
    let rows = sqlx::query(
        "SELECT id, user_id, trip_date, origin, destination, weight, bill_number, created_at \
         FROM trips ORDER BY trip_date DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Trip::try_from(r).map_err(|e| TripError::Db(sqlx::Error::Decode(e.to_string().into())))
        })
        .collect()
}
