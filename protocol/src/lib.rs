//! Shared RPC contract for `vectorboard`.
//!
//! This crate owns everything the server and its clients must agree on: the
//! frame envelope carried over `/rpc`, the procedure catalogue, record types,
//! and the input payloads together with their validation rules.
//!
//! Payloads stay flexible (`serde_json::Value`) on the envelope; the typed
//! layer lives in [`input`] and [`model`].

pub mod input;
pub mod model;
pub mod procedure;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use input::{Validate, ValidationError, parse_input};
pub use model::{Canvas, CanvasWithShapes, Health, Shape, ShapeType, UnknownShapeType, UserCursor};
pub use procedure::{Procedure, ProcedureKind};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

/// Error codes carried in the `code` field of error frames.
pub mod codes {
    pub const VALIDATION: &str = "E_VALIDATION";
    pub const CANVAS_NOT_FOUND: &str = "E_CANVAS_NOT_FOUND";
    pub const DATABASE: &str = "E_DATABASE";
    pub const UNKNOWN_PROCEDURE: &str = "E_UNKNOWN_PROCEDURE";
    pub const INVALID_FRAME: &str = "E_INVALID_FRAME";
    pub const METHOD_NOT_ALLOWED: &str = "E_METHOD_NOT_ALLOWED";
    pub const ENCODE: &str = "E_ENCODE";
}

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle position of a frame in a request/response exchange.
///
/// Every exchange is `request → done` or `request → error`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Initial request frame sent by the client.
    #[default]
    Request,
    /// Successful terminal response.
    Done,
    /// Error terminal response.
    Error,
}

impl Status {
    /// Terminal statuses end an exchange.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error)
    }
}

/// A single message on the RPC wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this frame.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// ID of the request frame this is responding to, if any.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since the Unix epoch when the frame was created.
    #[serde(default)]
    pub ts: i64,
    /// Procedure name, e.g. `"createShape"`.
    pub syscall: String,
    /// Lifecycle position of the frame.
    #[serde(default)]
    pub status: Status,
    /// Input on requests, output on `done`, `{code, message, retryable}` on `error`.
    #[serde(default)]
    pub data: Value,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Entry point for every procedure call.
    pub fn request(syscall: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create a done response carrying the procedure output. Terminal.
    #[must_use]
    pub fn done_with(&self, data: Value) -> Self {
        self.reply(Status::Done, data)
    }

    /// Create an error response from a code and message. Terminal.
    #[must_use]
    pub fn error(&self, code: &str, message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert(FRAME_CODE.into(), Value::String(code.to_owned()));
        data.insert(FRAME_MESSAGE.into(), Value::String(message.into()));
        data.insert(FRAME_RETRYABLE.into(), Value::Bool(false));
        self.reply(Status::Error, Value::Object(data))
    }

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Map::new();
        data.insert(FRAME_CODE.into(), Value::String(err.error_code().to_owned()));
        data.insert(FRAME_MESSAGE.into(), Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), Value::Bool(err.retryable()));
        self.reply(Status::Error, Value::Object(data))
    }

    /// Build a reply frame. Inherits `syscall` and points `parent_id` at the request.
    fn reply(&self, status: Status, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl Frame {
    /// Error code of an error frame, if present.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.data.get(FRAME_CODE).and_then(Value::as_str)
    }

    /// Error message of an error frame, if present.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.data.get(FRAME_MESSAGE).and_then(Value::as_str)
    }

    /// Resolve the procedure named by `syscall`.
    #[must_use]
    pub fn procedure(&self) -> Option<Procedure> {
        Procedure::from_name(&self.syscall)
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
