//! Record types returned by procedures.
//!
//! Positions and sizes are plain `f64` here; the store keeps them at two
//! decimal places and the server converts at the SQL boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Closed set of shape primitives. Mirrors the `shape_type` Postgres enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rectangle,
    Square,
    Triangle,
}

impl ShapeType {
    pub const ALL: [ShapeType; 3] = [ShapeType::Rectangle, ShapeType::Square, ShapeType::Triangle];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Square => "square",
            Self::Triangle => "triangle",
        }
    }

}

/// Rejected `shape_type` text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shape type: {0:?}")]
pub struct UnknownShapeType(pub String);

impl FromStr for ShapeType {
    type Err = UnknownShapeType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rectangle" => Ok(Self::Rectangle),
            "square" => Ok(Self::Square),
            "triangle" => Ok(Self::Triangle),
            _ => Err(UnknownShapeType(value.to_owned())),
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named drawing surface. Mirrors the `canvases` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A positioned primitive on one canvas. Mirrors the `shapes` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: i32,
    pub canvas_id: i32,
    #[serde(rename = "type")]
    pub kind: ShapeType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub z_index: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// `getCanvas` output: the canvas fields plus its shapes in stacking order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasWithShapes {
    #[serde(flatten)]
    pub canvas: Canvas,
    pub shapes: Vec<Shape>,
}

/// A user's last reported pointer position. Mirrors the `user_cursors` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserCursor {
    pub id: i32,
    pub canvas_id: i32,
    pub user_id: String,
    pub user_name: String,
    pub x: f64,
    pub y: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// `healthcheck` output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Health {
    #[must_use]
    pub fn ok() -> Self {
        Self { status: "ok".to_owned(), timestamp: OffsetDateTime::now_utc() }
    }
}
