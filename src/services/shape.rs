//! Shape service: CRUD for shapes placed on a canvas.
//!
//! DESIGN
//! ======
//! Coordinates live in `NUMERIC(10,2)` columns and are read back through a
//! `float8` cast, so callers only ever see `f64`. The `type` column is the
//! `shape_type` enum; it is bound as text with an explicit cast and read back
//! as text.
//!
//! ERROR HANDLING
//! ==============
//! `create_shape` checks the canvas before inserting so a missing parent is
//! reported as `CanvasNotFound` rather than a persistence failure. A
//! foreign-key violation from the insert itself (canvas deleted in between)
//! maps to the same error.

use protocol::input::{CreateShapeInput, UpdateShapeInput};
use protocol::{Shape, ShapeType};
use sqlx::PgPool;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::db::is_foreign_key_violation;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("canvas not found: {0}")]
    CanvasNotFound(i32),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl protocol::ErrorCode for ShapeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::CanvasNotFound(_) => protocol::codes::CANVAS_NOT_FOUND,
            Self::Database(_) => protocol::codes::DATABASE,
        }
    }
}

type ShapeRow = (i32, i32, String, f64, f64, f64, f64, String, i32, OffsetDateTime, OffsetDateTime);

const SHAPE_COLUMNS: &str = "id, canvas_id, type::text, x::float8, y::float8, width::float8, height::float8, \
                             color, z_index, created_at, updated_at";

fn shape_from_row(row: ShapeRow) -> Result<Shape, sqlx::Error> {
    let (id, canvas_id, kind, x, y, width, height, color, z_index, created_at, updated_at) = row;
    let kind = kind.parse::<ShapeType>().map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(Shape { id, canvas_id, kind, x, y, width, height, color, z_index, created_at, updated_at })
}

/// Load every shape on a canvas, sorted by `order_by`.
pub(crate) async fn fetch_shapes(
    pool: &PgPool,
    canvas_id: i32,
    order_by: &'static str,
) -> Result<Vec<Shape>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ShapeRow>(&format!(
        "SELECT {SHAPE_COLUMNS} FROM shapes WHERE canvas_id = $1 ORDER BY {order_by}"
    ))
    .bind(canvas_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(shape_from_row).collect()
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a shape on an existing canvas. `z_index` defaults to 0.
///
/// # Errors
///
/// Returns `CanvasNotFound` if the canvas does not exist, or a database
/// error if the insert fails.
pub async fn create_shape(pool: &PgPool, input: &CreateShapeInput) -> Result<Shape, ShapeError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM canvases WHERE id = $1)")
        .bind(input.canvas_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ShapeError::CanvasNotFound(input.canvas_id));
    }

    let row = sqlx::query_as::<_, ShapeRow>(&format!(
        "INSERT INTO shapes (canvas_id, type, x, y, width, height, color, z_index)
         VALUES ($1, $2::shape_type, $3, $4, $5, $6, $7, $8)
         RETURNING {SHAPE_COLUMNS}"
    ))
    .bind(input.canvas_id)
    .bind(input.kind.as_str())
    .bind(input.x)
    .bind(input.y)
    .bind(input.width)
    .bind(input.height)
    .bind(&input.color)
    .bind(input.z_index.unwrap_or(0))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            ShapeError::CanvasNotFound(input.canvas_id)
        } else {
            ShapeError::Database(e)
        }
    })?;

    Ok(shape_from_row(row)?)
}

/// List the shapes on a canvas. An unknown canvas yields an empty list.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_shapes(pool: &PgPool, canvas_id: i32) -> Result<Vec<Shape>, ShapeError> {
    Ok(fetch_shapes(pool, canvas_id, "id ASC").await?)
}

/// Apply a partial update. `updated_at` is always refreshed.
/// Returns `None` if the shape does not exist.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn update_shape(pool: &PgPool, input: &UpdateShapeInput) -> Result<Option<Shape>, ShapeError> {
    let mut builder = QueryBuilder::new("UPDATE shapes SET updated_at = clock_timestamp()");
    for (column, value) in [
        ("x", input.x),
        ("y", input.y),
        ("width", input.width),
        ("height", input.height),
    ] {
        if let Some(value) = value {
            builder.push(format!(", {column} = "));
            builder.push_bind(value);
        }
    }
    if let Some(color) = &input.color {
        builder.push(", color = ");
        builder.push_bind(color);
    }
    if let Some(z_index) = input.z_index {
        builder.push(", z_index = ");
        builder.push_bind(z_index);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(input.id);
    builder.push(" RETURNING ");
    builder.push(SHAPE_COLUMNS);

    let row = builder
        .build_query_as::<ShapeRow>()
        .fetch_optional(pool)
        .await?;

    Ok(row.map(shape_from_row).transpose()?)
}

/// Delete a shape. Returns whether a row was removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_shape(pool: &PgPool, id: i32) -> Result<bool, ShapeError> {
    let result = sqlx::query("DELETE FROM shapes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[path = "shape_test.rs"]
mod tests;
