use super::*;
use crate::state::test_helpers;
use serde_json::json;
#[cfg(feature = "live-db-tests")]
use crate::state::test_helpers::integration_pool;

async fn read_frame(response: Response) -> (StatusCode, Frame) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let frame = serde_json::from_slice::<Frame>(&bytes).expect("reply should be a frame");
    (status, frame)
}

fn query(input: Option<&str>) -> Query<RpcQuery> {
    Query(RpcQuery { input: input.map(str::to_owned) })
}

// =============================================================================
// CALL
// =============================================================================

#[tokio::test]
async fn healthcheck_replies_done_with_parent_id() {
    let state = test_helpers::test_app_state();
    let req = Frame::request("healthcheck", Value::Null);

    let reply = call(&state, &req).await;
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.parent_id, Some(req.id));
    assert_eq!(reply.syscall, "healthcheck");
    assert_eq!(reply.data["status"], "ok");
    assert!(reply.data["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_procedure_is_an_error_frame() {
    let state = test_helpers::test_app_state();
    let reply = call(&state, &Frame::request("dropTables", Value::Null)).await;

    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.error_code(), Some("E_UNKNOWN_PROCEDURE"));
    assert_eq!(reply_status(&reply), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn procedure_names_are_case_sensitive() {
    let state = test_helpers::test_app_state();
    let reply = call(&state, &Frame::request("CreateCanvas", json!({"name": "x"}))).await;
    assert_eq!(reply.error_code(), Some("E_UNKNOWN_PROCEDURE"));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_store() {
    // The lazy pool points at nothing; a database error here would mean the
    // handler ran before validation.
    let state = test_helpers::test_app_state();
    let cases = [
        ("createCanvas", json!({"name": ""})),
        ("getCanvas", json!({"id": 1.5})),
        ("updateCanvas", json!({"id": 1, "name": ""})),
        ("deleteCanvas", json!({})),
        ("createShape", json!({"canvas_id": 1, "type": "rectangle", "x": 0, "y": 0, "width": 0, "height": 1, "color": "#000000"})),
        ("createShape", json!({"canvas_id": 1, "type": "hexagon", "x": 0, "y": 0, "width": 1, "height": 1, "color": "#000000"})),
        ("getShapes", json!({"canvas_id": "one"})),
        ("createShape", json!({"canvas_id": 1, "type": "square", "x": 0, "y": 0, "width": 0.001, "height": 0.004, "color": "#000000"})),
        ("updateShape", json!({"id": 1, "color": "red"})),
        ("updateShape", json!({"id": 1, "width": 0.004})),
        ("updateShape", json!({"id": 1, "x": null})),
        ("deleteShape", Value::Null),
        ("updateCursor", json!({"canvas_id": 1, "user_id": "u", "x": 0, "y": 0})),
        ("getCursors", json!({})),
        ("removeCursor", json!({"canvas_id": 1})),
    ];

    for (syscall, data) in cases {
        let reply = call(&state, &Frame::request(syscall, data)).await;
        assert_eq!(reply.error_code(), Some("E_VALIDATION"), "{syscall}: {:?}", reply.data);
        assert_eq!(reply.data["retryable"], false);
        assert_eq!(reply_status(&reply), StatusCode::BAD_REQUEST);
    }
}

#[test]
fn rpc_error_delegates_codes() {
    let validation = RpcError::from(ValidationError::Empty { field: "name" });
    assert_eq!(validation.error_code(), "E_VALIDATION");
    assert_eq!(validation.to_string(), "name must not be empty");

    let missing = RpcError::from(ShapeError::CanvasNotFound(7));
    assert_eq!(missing.error_code(), "E_CANVAS_NOT_FOUND");

    let db = RpcError::from(CanvasError::Database(sqlx::Error::PoolTimedOut));
    assert_eq!(db.error_code(), "E_DATABASE");

    let cursor = RpcError::from(CursorError::CanvasNotFound(7));
    assert_eq!(cursor.error_code(), "E_CANVAS_NOT_FOUND");
}

#[test]
fn reply_status_maps_codes() {
    let req = Frame::request("getCanvas", Value::Null);
    assert_eq!(reply_status(&req.done_with(Value::Null)), StatusCode::OK);
    assert_eq!(reply_status(&req.error("E_INVALID_FRAME", "x")), StatusCode::BAD_REQUEST);
    assert_eq!(reply_status(&req.error("E_CANVAS_NOT_FOUND", "x")), StatusCode::NOT_FOUND);
    assert_eq!(reply_status(&req.error("E_METHOD_NOT_ALLOWED", "x")), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply_status(&req.error("E_DATABASE", "x")), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply_status(&req.error("E_ENCODE", "x")), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn post_rejects_malformed_body() {
    let state = test_helpers::test_app_state();
    let response = post_rpc(State(state), "{not json".to_owned()).await;

    let (status, frame) = read_frame(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(frame.error_code(), Some("E_INVALID_FRAME"));
    assert!(frame.parent_id.is_none());
}

#[tokio::test]
async fn post_rejects_non_request_status() {
    let state = test_helpers::test_app_state();
    let body = json!({"syscall": "healthcheck", "status": "done"}).to_string();

    let (status, frame) = read_frame(post_rpc(State(state), body).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(frame.error_code(), Some("E_INVALID_FRAME"));
}

#[tokio::test]
async fn post_fills_frame_defaults() {
    let state = test_helpers::test_app_state();
    let id = uuid::Uuid::new_v4();
    let body = json!({"id": id, "syscall": "healthcheck"}).to_string();

    let (status, frame) = read_frame(post_rpc(State(state), body).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame.status, Status::Done);
    assert_eq!(frame.parent_id, Some(id));
}

#[tokio::test]
async fn post_validation_failure_is_bad_request() {
    let state = test_helpers::test_app_state();
    let body = serde_json::to_string(&Frame::request("createCanvas", json!({"name": ""}))).expect("encode frame");

    let (status, frame) = read_frame(post_rpc(State(state), body).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(frame.error_code(), Some("E_VALIDATION"));
    assert_eq!(frame.error_message(), Some("name must not be empty"));
}

#[tokio::test]
async fn get_serves_queries() {
    let state = test_helpers::test_app_state();
    let response = get_rpc(State(state), Path("healthcheck".to_owned()), query(None)).await;

    let (status, frame) = read_frame(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame.data["status"], "ok");
}

#[tokio::test]
async fn get_refuses_mutations() {
    let state = test_helpers::test_app_state();
    let response = get_rpc(
        State(state),
        Path("deleteCanvas".to_owned()),
        query(Some(r#"{"id":1}"#)),
    )
    .await;

    let (status, frame) = read_frame(response).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(frame.error_code(), Some("E_METHOD_NOT_ALLOWED"));
}

#[tokio::test]
async fn get_rejects_malformed_input() {
    let state = test_helpers::test_app_state();
    let response = get_rpc(State(state), Path("getCanvas".to_owned()), query(Some("{id:"))).await;

    let (status, frame) = read_frame(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(frame.error_code(), Some("E_INVALID_FRAME"));
}

#[tokio::test]
async fn get_validates_query_input() {
    let state = test_helpers::test_app_state();
    let response = get_rpc(State(state), Path("getShapes".to_owned()), query(Some(r#"{"canvasId":2.5}"#))).await;

    let (status, frame) = read_frame(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(frame.error_code(), Some("E_VALIDATION"));
}

#[tokio::test]
async fn get_unknown_procedure_is_not_found() {
    let state = test_helpers::test_app_state();
    let response = get_rpc(State(state), Path("nope".to_owned()), query(None)).await;

    let (status, _) = read_frame(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// LIVE
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn canvas_shape_cursor_flow_over_rpc() {
    let (pool, _guard) = integration_pool().await;
    let state = AppState::new(pool);

    let created = call(&state, &Frame::request("createCanvas", json!({"name": "Flow"}))).await;
    assert_eq!(created.status, Status::Done);
    assert!(created.data["description"].is_null());
    let canvas_id = created.data["id"].as_i64().expect("canvas id");

    let shape = call(
        &state,
        &Frame::request(
            "createShape",
            json!({"canvasId": canvas_id, "type": "triangle", "x": 1, "y": 2, "width": 3, "height": 4, "color": "#abcdef"}),
        ),
    )
    .await;
    assert_eq!(shape.status, Status::Done);
    assert_eq!(shape.data["type"], "triangle");
    assert_eq!(shape.data["z_index"], 0);

    let snapshot = call(&state, &Frame::request("getCanvas", json!({"id": canvas_id}))).await;
    assert_eq!(snapshot.data["name"], "Flow");
    assert_eq!(snapshot.data["shapes"].as_array().map(Vec::len), Some(1));

    let orphan = call(
        &state,
        &Frame::request(
            "createShape",
            json!({"canvas_id": canvas_id + 100, "type": "square", "x": 0, "y": 0, "width": 1, "height": 1, "color": "#000000"}),
        ),
    )
    .await;
    assert_eq!(orphan.error_code(), Some("E_CANVAS_NOT_FOUND"));
    assert_eq!(reply_status(&orphan), StatusCode::NOT_FOUND);

    let moved = call(
        &state,
        &Frame::request("updateCursor", json!({"canvas_id": canvas_id, "userId": "u1", "userName": "Ada", "x": 5, "y": 6})),
    )
    .await;
    assert_eq!(moved.status, Status::Done);
    let cursors = call(&state, &Frame::request("getCursors", json!({"canvas_id": canvas_id}))).await;
    assert_eq!(cursors.data.as_array().map(Vec::len), Some(1));

    let missing = call(&state, &Frame::request("getCanvas", json!({"id": canvas_id + 100}))).await;
    assert_eq!(missing.status, Status::Done);
    assert!(missing.data.is_null());

    let deleted = call(&state, &Frame::request("deleteCanvas", json!({"id": canvas_id}))).await;
    assert_eq!(deleted.data, json!(true));
    let again = call(&state, &Frame::request("deleteCanvas", json!({"id": canvas_id}))).await;
    assert_eq!(again.data, json!(false));
}
