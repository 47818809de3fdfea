//! RPC facade: binds procedures to service calls.
//!
//! DESIGN
//! ======
//! A request frame names a procedure in `syscall` and carries its input in
//! `data`. `call` resolves the procedure, validates the input against the
//! same types the services take, runs the service, and wraps the result in a
//! `done` frame (or an `error` frame carrying `{code, message, retryable}`).
//! Invalid input short-circuits before any query is issued.
//!
//! The HTTP layer only decodes frames and maps error codes to status codes;
//! the reply body is always a frame whose `parent_id` is the request id.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use protocol::input::{
    CanvasIdInput, CreateCanvasInput, CreateShapeInput, IdInput, RemoveCursorInput, UpdateCanvasInput,
    UpdateCursorInput, UpdateShapeInput,
};
use protocol::{ErrorCode, Frame, Health, Procedure, Status, ValidationError, codes, parse_input};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::services::canvas::{self, CanvasError};
use crate::services::cursor::{self, CursorError};
use crate::services::shape::{self, ShapeError};
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ErrorCode for RpcError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Canvas(e) => e.error_code(),
            Self::Shape(e) => e.error_code(),
            Self::Cursor(e) => e.error_code(),
            Self::Encode(_) => codes::ENCODE,
        }
    }
}

/// HTTP status for a reply frame.
pub(crate) fn reply_status(reply: &Frame) -> StatusCode {
    if reply.status != Status::Error {
        return StatusCode::OK;
    }
    match reply.error_code() {
        Some(codes::VALIDATION | codes::INVALID_FRAME) => StatusCode::BAD_REQUEST,
        Some(codes::UNKNOWN_PROCEDURE | codes::CANVAS_NOT_FOUND) => StatusCode::NOT_FOUND,
        Some(codes::METHOD_NOT_ALLOWED) => StatusCode::METHOD_NOT_ALLOWED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

fn encode(value: &impl Serialize) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(value)?)
}

/// Run one procedure against the store and return its encoded output.
///
/// # Errors
///
/// Returns a validation error before touching the store when `data` does not
/// satisfy the procedure's input, otherwise whatever the service reports.
pub async fn dispatch(state: &AppState, procedure: Procedure, data: &Value) -> Result<Value, RpcError> {
    let pool = &state.pool;
    match procedure {
        Procedure::Healthcheck => encode(&Health::ok()),

        Procedure::CreateCanvas => {
            let input = parse_input::<CreateCanvasInput>(data)?;
            encode(&canvas::create_canvas(pool, &input).await?)
        }
        Procedure::GetCanvases => encode(&canvas::list_canvases(pool).await?),
        Procedure::GetCanvas => {
            let input = parse_input::<IdInput>(data)?;
            encode(&canvas::get_canvas_with_shapes(pool, input.id).await?)
        }
        Procedure::UpdateCanvas => {
            let input = parse_input::<UpdateCanvasInput>(data)?;
            encode(&canvas::update_canvas(pool, &input).await?)
        }
        Procedure::DeleteCanvas => {
            let input = parse_input::<IdInput>(data)?;
            encode(&canvas::delete_canvas(pool, input.id).await?)
        }

        Procedure::CreateShape => {
            let input = parse_input::<CreateShapeInput>(data)?;
            encode(&shape::create_shape(pool, &input).await?)
        }
        Procedure::GetShapes => {
            let input = parse_input::<CanvasIdInput>(data)?;
            encode(&shape::list_shapes(pool, input.canvas_id).await?)
        }
        Procedure::UpdateShape => {
            let input = parse_input::<UpdateShapeInput>(data)?;
            encode(&shape::update_shape(pool, &input).await?)
        }
        Procedure::DeleteShape => {
            let input = parse_input::<IdInput>(data)?;
            encode(&shape::delete_shape(pool, input.id).await?)
        }

        Procedure::UpdateCursor => {
            let input = parse_input::<UpdateCursorInput>(data)?;
            encode(&cursor::upsert_cursor(pool, &input).await?)
        }
        Procedure::GetCursors => {
            let input = parse_input::<CanvasIdInput>(data)?;
            encode(&cursor::list_active_cursors(pool, input.canvas_id).await?)
        }
        Procedure::RemoveCursor => {
            let input = parse_input::<RemoveCursorInput>(data)?;
            encode(&cursor::remove_cursor(pool, input.canvas_id, &input.user_id).await?)
        }
    }
}

/// Answer a request frame with a terminal frame.
pub async fn call(state: &AppState, req: &Frame) -> Frame {
    let Some(procedure) = req.procedure() else {
        warn!(syscall = %req.syscall, "unknown procedure");
        return req.error(codes::UNKNOWN_PROCEDURE, format!("unknown procedure: {}", req.syscall));
    };

    match dispatch(state, procedure, &req.data).await {
        Ok(data) => {
            info!(%procedure, "rpc done");
            req.done_with(data)
        }
        Err(e) => {
            let code = e.error_code();
            if code == codes::DATABASE || code == codes::ENCODE {
                error!(%procedure, error = %e, "rpc failed");
            } else {
                warn!(%procedure, code, error = %e, "rpc rejected");
            }
            req.error_from(&e)
        }
    }
}

/// Error reply for input that never became a request frame.
fn invalid_frame(message: impl Into<String>) -> Frame {
    let mut reply = Frame::request("", Value::Null).error(codes::INVALID_FRAME, message);
    reply.parent_id = None;
    reply
}

fn respond(reply: Frame) -> Response {
    (reply_status(&reply), Json(reply)).into_response()
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /rpc`: body is a request frame.
pub async fn post_rpc(State(state): State<AppState>, body: String) -> Response {
    let req = match serde_json::from_str::<Frame>(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "rejected malformed frame");
            return respond(invalid_frame(format!("invalid frame: {e}")));
        }
    };

    if req.status != Status::Request {
        warn!(id = %req.id, status = ?req.status, "rejected non-request frame");
        return respond(req.error(codes::INVALID_FRAME, "expected a request frame"));
    }

    respond(call(&state, &req).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct RpcQuery {
    /// JSON-encoded procedure input.
    pub input: Option<String>,
}

/// `GET /rpc/{procedure}?input=<json>`: queries only.
pub async fn get_rpc(
    State(state): State<AppState>,
    Path(procedure): Path<String>,
    Query(query): Query<RpcQuery>,
) -> Response {
    let data = match query.input.as_deref() {
        None | Some("") => Value::Null,
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(data) => data,
            Err(e) => {
                warn!(%procedure, error = %e, "rejected malformed query input");
                return respond(invalid_frame(format!("invalid input: {e}")));
            }
        },
    };

    let req = Frame::request(procedure, data);
    if let Some(procedure) = req.procedure() {
        if !procedure.is_query() {
            return respond(req.error(
                codes::METHOD_NOT_ALLOWED,
                format!("{procedure} is a mutation; use POST /rpc"),
            ));
        }
    }

    respond(call(&state, &req).await)
}

#[cfg(test)]
#[path = "rpc_test.rs"]
mod tests;
