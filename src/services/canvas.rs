//! Canvas service: CRUD and canvas snapshots.
//!
//! DESIGN
//! ======
//! Every operation is one statement against `canvases` (plus one for the
//! shapes on `get_canvas_with_shapes`). Lookups by id that find nothing
//! return `None`/`false`; only persistence failures are errors.

use protocol::input::{CreateCanvasInput, UpdateCanvasInput};
use protocol::{Canvas, CanvasWithShapes};
use sqlx::PgPool;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::services::shape;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl protocol::ErrorCode for CanvasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => protocol::codes::DATABASE,
        }
    }
}

type CanvasRow = (i32, String, Option<String>, OffsetDateTime, OffsetDateTime);

const CANVAS_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn canvas_from_row((id, name, description, created_at, updated_at): CanvasRow) -> Canvas {
    Canvas { id, name, description, created_at, updated_at }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a canvas. An empty description is stored as `NULL`.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_canvas(pool: &PgPool, input: &CreateCanvasInput) -> Result<Canvas, CanvasError> {
    let description = input.description.as_deref().filter(|d| !d.is_empty());
    let row = sqlx::query_as::<_, CanvasRow>(&format!(
        "INSERT INTO canvases (name, description) VALUES ($1, $2) RETURNING {CANVAS_COLUMNS}"
    ))
    .bind(&input.name)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(canvas_from_row(row))
}

/// List every canvas.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_canvases(pool: &PgPool) -> Result<Vec<Canvas>, CanvasError> {
    let rows = sqlx::query_as::<_, CanvasRow>(&format!("SELECT {CANVAS_COLUMNS} FROM canvases ORDER BY id"))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(canvas_from_row).collect())
}

/// Load a canvas and its shapes in stacking order. `None` if the canvas is absent.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn get_canvas_with_shapes(pool: &PgPool, id: i32) -> Result<Option<CanvasWithShapes>, CanvasError> {
    let Some(row) = sqlx::query_as::<_, CanvasRow>(&format!("SELECT {CANVAS_COLUMNS} FROM canvases WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let shapes = shape::fetch_shapes(pool, id, "z_index ASC, id ASC").await?;
    Ok(Some(CanvasWithShapes { canvas: canvas_from_row(row), shapes }))
}

/// Apply a partial update. `updated_at` is always refreshed.
/// Returns `None` if the canvas does not exist.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn update_canvas(pool: &PgPool, input: &UpdateCanvasInput) -> Result<Option<Canvas>, CanvasError> {
    let mut builder = QueryBuilder::new("UPDATE canvases SET updated_at = clock_timestamp()");
    if let Some(name) = &input.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(description) = &input.description {
        builder.push(", description = ");
        builder.push_bind(description.as_deref());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(input.id);
    builder.push(" RETURNING ");
    builder.push(CANVAS_COLUMNS);

    let row = builder
        .build_query_as::<CanvasRow>()
        .fetch_optional(pool)
        .await?;

    Ok(row.map(canvas_from_row))
}

/// Delete a canvas along with its shapes and cursors.
/// Returns whether a row was removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_canvas(pool: &PgPool, id: i32) -> Result<bool, CanvasError> {
    let result = sqlx::query("DELETE FROM canvases WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
