use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::{
    auth::{self, Operation, Principal},
    matrix::{self, MatrixRow},
    security::NonceFamily,
    state::AppState,
    trips::{self, Trip},
    util::dispatch_async_app_result,
    AppError, AppResult,
};

pub const UNKNOWN_ACTION_CODE: &str = "DISPATCH/UNKNOWN_ACTION";
pub const BAD_NONCE_CODE: &str = "AUTH/BAD_NONCE";
const MISSING_FIELD_CODE: &str = "VALIDATION/MISSING_FIELD";
const INVALID_WEIGHT_CODE: &str = "VALIDATION/WEIGHT";

/// One named operation as the host dispatcher hands it over: an action
/// name, the authenticated principal, the anti-forgery token, and the
/// form-encoded parameters.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub action: String,
    pub principal: Principal,
    pub nonce: Option<String>,
    pub params: HashMap<String, String>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, principal: Principal) -> Self {
        ActionRequest {
            action: action.into(),
            principal,
            nonce: None,
            params: HashMap::new(),
        }
    }

    pub fn with_nonce(mut self, token: impl Into<String>) -> Self {
        self.nonce = Some(token.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    fn required_param(&self, key: &str) -> AppResult<&str> {
        let value = self.param(key).trim();
        if value.is_empty() {
            Err(
                AppError::new(MISSING_FIELD_CODE, format!("{key} is required"))
                    .with_context("field", key.to_string()),
            )
        } else {
            Ok(value)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Structured success/failure envelope. Failures carry the code and the
/// user-facing message only; context and causes stay server-side.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ActionResponse {
    pub fn success(data: Value) -> Self {
        ActionResponse {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(err: &AppError) -> Self {
        ActionResponse {
            ok: false,
            data: None,
            error: Some(ErrorBody {
                code: err.code().to_string(),
                message: err.message().to_string(),
            }),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// Entry point for the host dispatcher. Every handler runs behind the
/// panic fence and every error becomes a structured failure; nothing
/// propagates uncaught to the presentation layer.
pub async fn handle(state: &AppState, req: ActionRequest) -> ActionResponse {
    let action = req.action.clone();
    let result = dispatch_async_app_result(|| route(state, req)).await;
    match result {
        Ok(data) => ActionResponse::success(data),
        Err(err) => {
            if err.code() == AppError::STORE_CODE || err.code() == "RUNTIME/PANIC" {
                error!(
                    target: "haulboard",
                    event = "action_failed",
                    action = %action,
                    error = %err,
                    cause = ?err.cause(),
                );
            } else {
                debug!(target: "haulboard", event = "action_rejected", action = %action, code = %err.code());
            }
            ActionResponse::failure(&err)
        }
    }
}

async fn route(state: &AppState, req: ActionRequest) -> AppResult<Value> {
    match req.action.as_str() {
        "ping" => {
            if !req.principal.is_authenticated() {
                return Err(AppError::new(auth::DENIED_CODE, "Access denied"));
            }
            Ok(json!({ "pong": true, "user": req.principal.user_id }))
        }
        "list_selectable" => {
            auth::authorize(&req.principal, Operation::ViewMatrixSelector)?;
            let rows = matrix::list_selectable(&state.pool).await?;
            Ok(Value::Array(rows.iter().map(row_payload).collect()))
        }
        "list_trips" => {
            auth::authorize(&req.principal, Operation::ViewTripsReport)?;
            let rows = trips::list_recent(&state.pool, trips::DEFAULT_REPORT_LIMIT).await?;
            Ok(Value::Array(rows.iter().map(trip_payload).collect()))
        }
        "create_matrix_row" => {
            auth::authorize(&req.principal, Operation::EditMatrix)?;
            verify_nonce(state, &req, NonceFamily::ClientList)?;
            let row = matrix::create_or_reuse(
                &state.pool,
                req.param("origin"),
                req.param("destination"),
                req.param("client_name"),
                req.param("unit_name"),
                req.param("rate"),
            )
            .await?;
            Ok(row_payload(&row))
        }
        "update_matrix_rate" => {
            auth::authorize(&req.principal, Operation::EditMatrix)?;
            verify_nonce(state, &req, NonceFamily::ClientList)?;
            let id = req.required_param("id")?;
            let rate = matrix::update_rate(&state.pool, id, req.param("rate")).await?;
            Ok(json!({ "rate": rate }))
        }
        "delete_matrix_row" => {
            auth::authorize(&req.principal, Operation::EditMatrix)?;
            verify_nonce(state, &req, NonceFamily::ClientList)?;
            let id = req.required_param("id")?;
            let deleted = matrix::soft_delete(&state.pool, id).await?;
            Ok(json!({ "id": deleted }))
        }
        "submit_trip" => {
            auth::authorize(&req.principal, Operation::SubmitTrip)?;
            verify_nonce(state, &req, NonceFamily::SubmitTrip)?;
            let matrix_row_id = req.required_param("matrix_row_id")?;
            let trip_date = req.required_param("trip_date")?;
            let bill_number = req.required_param("bill_number")?;
            let weight: f64 = req.required_param("weight")?.parse().map_err(|_| {
                AppError::new(INVALID_WEIGHT_CODE, "Weight must be a non-negative number.")
            })?;
            let trip = trips::submit_trip(
                &state.pool,
                matrix_row_id,
                trip_date,
                weight,
                bill_number,
                &req.principal.user_id,
            )
            .await?;
            Ok(json!({ "id": trip.id }))
        }
        other => Err(AppError::new(UNKNOWN_ACTION_CODE, "Unknown action")
            .with_context("action", other.to_string())),
    }
}

fn verify_nonce(state: &AppState, req: &ActionRequest, family: NonceFamily) -> AppResult<()> {
    let token = req.nonce.as_deref().unwrap_or("");
    if state.nonces.verify(family, token) {
        Ok(())
    } else {
        Err(AppError::new(BAD_NONCE_CODE, "Security check failed."))
    }
}

fn row_payload(row: &MatrixRow) -> Value {
    json!({
        "id": row.id,
        "origin": row.origin,
        "destination": row.destination,
        "client_name": row.client_name,
        "unit_name": row.unit_name,
        "rate": row.rate_text(),
    })
}

fn trip_payload(trip: &Trip) -> Value {
    json!({
        "id": trip.id,
        "user_id": trip.user_id,
        "trip_date": trip.trip_date,
        "origin": trip.origin,
        "destination": trip.destination,
        "weight": trip.weight,
        "bill_number": trip.bill_number,
        "created_at": trip.created_at,
    })
}
