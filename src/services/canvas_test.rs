use super::*;
use protocol::ErrorCode;
#[cfg(feature = "live-db-tests")]
use crate::state::test_helpers::integration_pool;
#[cfg(feature = "live-db-tests")]
use protocol::ShapeType;
#[cfg(feature = "live-db-tests")]
use protocol::input::{CreateShapeInput, UpdateCursorInput};

#[test]
fn canvas_error_maps_to_database_code() {
    let err = CanvasError::Database(sqlx::Error::PoolTimedOut);
    assert_eq!(err.error_code(), "E_DATABASE");
    assert!(!err.retryable());
}

#[test]
fn canvas_from_row_copies_every_column() {
    let ts = time::macros::datetime!(2025-01-01 0:00 UTC);
    let canvas = canvas_from_row((7, "Plan".into(), None, ts, ts));
    assert_eq!(canvas.id, 7);
    assert_eq!(canvas.name, "Plan");
    assert!(canvas.description.is_none());
    assert_eq!(canvas.updated_at, ts);
}

#[cfg(feature = "live-db-tests")]
fn canvas_input(name: &str, description: Option<&str>) -> CreateCanvasInput {
    CreateCanvasInput { name: name.to_owned(), description: description.map(str::to_owned) }
}

#[cfg(feature = "live-db-tests")]
fn shape_input(canvas_id: i32, z_index: i32) -> CreateShapeInput {
    CreateShapeInput {
        canvas_id,
        kind: ShapeType::Square,
        x: 1.5,
        y: 2.25,
        width: 10.0,
        height: 10.0,
        color: "#112233".into(),
        z_index: Some(z_index),
    }
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn create_without_description_stores_null() {
    let (pool, _guard) = integration_pool().await;

    let omitted = create_canvas(&pool, &canvas_input("A", None))
        .await
        .expect("create_canvas should succeed");
    let empty = create_canvas(&pool, &canvas_input("B", Some("")))
        .await
        .expect("create_canvas should succeed");
    let described = create_canvas(&pool, &canvas_input("C", Some("notes")))
        .await
        .expect("create_canvas should succeed");

    assert!(omitted.description.is_none());
    assert!(empty.description.is_none());
    assert_eq!(described.description.as_deref(), Some("notes"));
    assert!(described.id > omitted.id);

    let listed = list_canvases(&pool).await.expect("list_canvases should succeed");
    let names: Vec<_> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "C"]);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn get_canvas_orders_shapes_by_z_index() {
    let (pool, _guard) = integration_pool().await;
    let canvas = create_canvas(&pool, &canvas_input("Stack", None))
        .await
        .expect("create_canvas should succeed");

    for z in [2, 1, 3] {
        shape::create_shape(&pool, &shape_input(canvas.id, z))
            .await
            .expect("create_shape should succeed");
    }

    let loaded = get_canvas_with_shapes(&pool, canvas.id)
        .await
        .expect("get_canvas_with_shapes should succeed")
        .expect("canvas should exist");
    let order: Vec<i32> = loaded.shapes.iter().map(|s| s.z_index).collect();
    assert_eq!(order, [1, 2, 3]);
    assert_eq!(loaded.canvas.id, canvas.id);
    assert!((loaded.shapes[0].y - 2.25).abs() < f64::EPSILON);

    let missing = get_canvas_with_shapes(&pool, canvas.id + 1000)
        .await
        .expect("missing canvas is not an error");
    assert!(missing.is_none());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn partial_update_keeps_omitted_fields_and_bumps_timestamp() {
    let (pool, _guard) = integration_pool().await;
    let canvas = create_canvas(&pool, &canvas_input("Before", Some("keep me")))
        .await
        .expect("create_canvas should succeed");

    let renamed = update_canvas(&pool, &UpdateCanvasInput { id: canvas.id, name: Some("After".into()), description: None })
        .await
        .expect("update_canvas should succeed")
        .expect("canvas should exist");
    assert_eq!(renamed.name, "After");
    assert_eq!(renamed.description.as_deref(), Some("keep me"));
    assert!(renamed.updated_at > canvas.updated_at);
    assert_eq!(renamed.created_at, canvas.created_at);

    let cleared = update_canvas(&pool, &UpdateCanvasInput { id: canvas.id, name: None, description: Some(None) })
        .await
        .expect("update_canvas should succeed")
        .expect("canvas should exist");
    assert_eq!(cleared.name, "After");
    assert!(cleared.description.is_none());
    assert!(cleared.updated_at > renamed.updated_at);

    let missing = update_canvas(&pool, &UpdateCanvasInput { id: canvas.id + 1000, name: Some("x".into()), description: None })
        .await
        .expect("missing canvas is not an error");
    assert!(missing.is_none());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn delete_cascades_to_shapes_and_cursors() {
    let (pool, _guard) = integration_pool().await;
    let canvas = create_canvas(&pool, &canvas_input("Doomed", None))
        .await
        .expect("create_canvas should succeed");
    shape::create_shape(&pool, &shape_input(canvas.id, 0))
        .await
        .expect("create_shape should succeed");
    crate::services::cursor::upsert_cursor(
        &pool,
        &UpdateCursorInput { canvas_id: canvas.id, user_id: "u1".into(), user_name: "Ada".into(), x: 0.0, y: 0.0 },
    )
    .await
    .expect("upsert_cursor should succeed");

    assert!(delete_canvas(&pool, canvas.id).await.expect("delete_canvas should succeed"));
    assert!(!delete_canvas(&pool, canvas.id).await.expect("second delete is not an error"));

    let shapes = shape::list_shapes(&pool, canvas.id).await.expect("list_shapes should succeed");
    assert!(shapes.is_empty());
    let cursors = crate::services::cursor::list_active_cursors(&pool, canvas.id)
        .await
        .expect("list_active_cursors should succeed");
    assert!(cursors.is_empty());
}
