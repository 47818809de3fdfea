//! Cursor service: per-user pointer positions on a canvas.
//!
//! DESIGN
//! ======
//! One row per (canvas, user), enforced by a unique index so the upsert is a
//! single `INSERT ... ON CONFLICT` and the row id stays stable across moves.
//! Staleness is a read-time filter against [`ACTIVE_WINDOW`]; stale rows stay
//! in storage until removed explicitly or swept by the reaper.

use std::time::Duration;

use protocol::UserCursor;
use protocol::input::UpdateCursorInput;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::is_foreign_key_violation;

/// Cursors updated within this window are reported by `list_active_cursors`.
pub const ACTIVE_WINDOW: Duration = Duration::from_secs(30);

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("canvas not found: {0}")]
    CanvasNotFound(i32),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl protocol::ErrorCode for CursorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::CanvasNotFound(_) => protocol::codes::CANVAS_NOT_FOUND,
            Self::Database(_) => protocol::codes::DATABASE,
        }
    }
}

type CursorRow = (i32, i32, String, String, f64, f64, OffsetDateTime);

const CURSOR_COLUMNS: &str = "id, canvas_id, user_id, user_name, x::float8, y::float8, updated_at";

fn cursor_from_row((id, canvas_id, user_id, user_name, x, y, updated_at): CursorRow) -> UserCursor {
    UserCursor { id, canvas_id, user_id, user_name, x, y, updated_at }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Insert or refresh the cursor for `(canvas_id, user_id)`.
///
/// # Errors
///
/// Returns `CanvasNotFound` if the canvas does not exist, or a database
/// error if the upsert fails.
pub async fn upsert_cursor(pool: &PgPool, input: &UpdateCursorInput) -> Result<UserCursor, CursorError> {
    let row = sqlx::query_as::<_, CursorRow>(&format!(
        "INSERT INTO user_cursors (canvas_id, user_id, user_name, x, y, updated_at)
         VALUES ($1, $2, $3, $4, $5, clock_timestamp())
         ON CONFLICT (canvas_id, user_id) DO UPDATE SET
             user_name = EXCLUDED.user_name,
             x = EXCLUDED.x,
             y = EXCLUDED.y,
             updated_at = EXCLUDED.updated_at
         RETURNING {CURSOR_COLUMNS}"
    ))
    .bind(input.canvas_id)
    .bind(&input.user_id)
    .bind(&input.user_name)
    .bind(input.x)
    .bind(input.y)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            CursorError::CanvasNotFound(input.canvas_id)
        } else {
            CursorError::Database(e)
        }
    })?;

    Ok(cursor_from_row(row))
}

/// Cursors on a canvas updated within [`ACTIVE_WINDOW`].
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_active_cursors(pool: &PgPool, canvas_id: i32) -> Result<Vec<UserCursor>, CursorError> {
    let rows = sqlx::query_as::<_, CursorRow>(&format!(
        "SELECT {CURSOR_COLUMNS}
         FROM user_cursors
         WHERE canvas_id = $1 AND updated_at >= now() - make_interval(secs => $2)
         ORDER BY id"
    ))
    .bind(canvas_id)
    .bind(ACTIVE_WINDOW.as_secs_f64())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(cursor_from_row).collect())
}

/// Remove the cursor for `(canvas_id, user_id)`. Returns whether a row was removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn remove_cursor(pool: &PgPool, canvas_id: i32, user_id: &str) -> Result<bool, CursorError> {
    let result = sqlx::query("DELETE FROM user_cursors WHERE canvas_id = $1 AND user_id = $2")
        .bind(canvas_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete cursors idle for longer than `retention`. Returns the number removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn reap_stale_cursors(pool: &PgPool, retention: Duration) -> Result<u64, CursorError> {
    let result = sqlx::query("DELETE FROM user_cursors WHERE updated_at < now() - make_interval(secs => $1)")
        .bind(retention.as_secs_f64())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
