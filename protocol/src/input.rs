//! Input payloads and their validation rules.
//!
//! DESIGN
//! ======
//! Each procedure that takes input has one struct here. The server parses a
//! frame's `data` with [`parse_input`], which deserializes and then runs
//! [`Validate::validate`]; a failure never reaches a handler. Clients build
//! the same structs and serialize them into request frames.
//!
//! Numbers arrive as JSON numbers. Integer fields (`id`, `canvas_id`,
//! `z_index`) accept integral floats such as `2.0` and reject `2.5`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ErrorCode;
use crate::model::ShapeType;

/// Largest magnitude a NUMERIC(10,2) column can hold.
pub const MAX_COORDINATE: f64 = 99_999_999.99;

/// Smallest size that survives rounding to two decimal places.
pub const MIN_DIMENSION: f64 = 0.005;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid input: {0}")]
    Malformed(String),
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be greater than zero at two decimal places")]
    NotPositive { field: &'static str },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be within ±99999999.99")]
    OutOfRange { field: &'static str },
    #[error("color must be a valid hex color (#RRGGBB), got {0:?}")]
    InvalidColor(String),
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        crate::codes::VALIDATION
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Post-deserialization constraints for an input payload.
pub trait Validate {
    /// # Errors
    ///
    /// Returns the first violated constraint.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Deserialize `data` into `T` and validate it.
///
/// # Errors
///
/// Returns `Malformed` when the payload does not match `T`'s shape, or the
/// first constraint `T::validate` rejects.
pub fn parse_input<T>(data: &Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let input = T::deserialize(data).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    input.validate()?;
    Ok(input)
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

fn coordinate(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value.abs() > MAX_COORDINATE {
        return Err(ValidationError::OutOfRange { field });
    }
    Ok(())
}

fn dimension(field: &'static str, value: f64) -> Result<(), ValidationError> {
    coordinate(field, value)?;
    if value < MIN_DIMENSION {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

/// `#RRGGBB` with hex digits in either case.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

fn hex_color(value: &str) -> Result<(), ValidationError> {
    if !is_hex_color(value) {
        return Err(ValidationError::InvalidColor(value.to_owned()));
    }
    Ok(())
}

// =============================================================================
// FIELD DESERIALIZERS
// =============================================================================

#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn integral_i32(value: f64) -> Option<i32> {
    if value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}

fn integer<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    integral_i32(value).ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

/// Optional integer field: may be omitted, but never `null`.
fn optional_integer<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    integer(deserializer).map(Some)
}

/// Marks a field as present. With `T = Option<_>` this separates omitted
/// from `null`; with a non-optional `T` it rejects `null` outright.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// =============================================================================
// CANVAS INPUTS
// =============================================================================

/// `createCanvas` input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCanvasInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for CreateCanvasInput {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("name", &self.name)
    }
}

/// `updateCanvas` input. `description: Some(None)` clears the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCanvasInput {
    #[serde(deserialize_with = "integer")]
    pub id: i32,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl Validate for UpdateCanvasInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            non_empty("name", name)?;
        }
        Ok(())
    }
}

/// Input naming a single record by id (`getCanvas`, `deleteCanvas`, `deleteShape`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdInput {
    #[serde(deserialize_with = "integer")]
    pub id: i32,
}

impl Validate for IdInput {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Input naming a canvas (`getShapes`, `getCursors`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasIdInput {
    #[serde(alias = "canvasId", deserialize_with = "integer")]
    pub canvas_id: i32,
}

impl Validate for CanvasIdInput {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// =============================================================================
// SHAPE INPUTS
// =============================================================================

/// `createShape` input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShapeInput {
    #[serde(alias = "canvasId", deserialize_with = "integer")]
    pub canvas_id: i32,
    #[serde(rename = "type")]
    pub kind: ShapeType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    #[serde(default, deserialize_with = "optional_integer", skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl Validate for CreateShapeInput {
    fn validate(&self) -> Result<(), ValidationError> {
        coordinate("x", self.x)?;
        coordinate("y", self.y)?;
        dimension("width", self.width)?;
        dimension("height", self.height)?;
        hex_color(&self.color)
    }
}

/// `updateShape` input. Only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateShapeInput {
    #[serde(deserialize_with = "integer")]
    pub id: i32,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "optional_integer", skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl UpdateShapeInput {
    /// True when no mutable field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.color.is_none()
            && self.z_index.is_none()
    }
}

impl Validate for UpdateShapeInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(x) = self.x {
            coordinate("x", x)?;
        }
        if let Some(y) = self.y {
            coordinate("y", y)?;
        }
        if let Some(width) = self.width {
            dimension("width", width)?;
        }
        if let Some(height) = self.height {
            dimension("height", height)?;
        }
        if let Some(color) = &self.color {
            hex_color(color)?;
        }
        Ok(())
    }
}

// =============================================================================
// CURSOR INPUTS
// =============================================================================

/// `updateCursor` input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCursorInput {
    #[serde(alias = "canvasId", deserialize_with = "integer")]
    pub canvas_id: i32,
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(alias = "userName")]
    pub user_name: String,
    pub x: f64,
    pub y: f64,
}

impl Validate for UpdateCursorInput {
    fn validate(&self) -> Result<(), ValidationError> {
        coordinate("x", self.x)?;
        coordinate("y", self.y)
    }
}

/// `removeCursor` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveCursorInput {
    #[serde(alias = "canvasId", deserialize_with = "integer")]
    pub canvas_id: i32,
    #[serde(alias = "userId")]
    pub user_id: String,
}

impl Validate for RemoveCursorInput {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "input_test.rs"]
mod tests;
