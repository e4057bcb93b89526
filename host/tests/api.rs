use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use texcompile_host::server::api::create_router;
use texcompile_host::test_util;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_terminal(state: &texcompile_host::HostState, source_id: &str, checksum: &str) -> Value {
    let router = create_router(64).with_state(state.clone());
    for _ in 0..200 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/{source_id}/{checksum}/pdf"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            let task = body_json(response).await;
            if task["status"] != "in_progress" {
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task never reached a terminal state");
}

#[tokio::test]
async fn new_compile_returns_202_then_completes() {
    let state = test_util::state("new_compile_returns_202_then_completes");
    let router = create_router(64).with_state(state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(
                    json!({"source_id": "54", "checksum": "a1b2c3d4=", "output_format": "pdf"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let location = response.headers().get("location").unwrap().to_str().unwrap().to_string();
    assert_eq!(location, "/54/a1b2c3d4%3D/pdf");

    let task = wait_for_terminal(&state, "54", "a1b2c3d4%3D").await;
    assert_eq!(task["status"], "completed");
}

#[tokio::test]
async fn duplicate_compile_returns_303_with_same_location() {
    let state = test_util::state("duplicate_compile_returns_303_with_same_location");
    let router = create_router(64).with_state(state.clone());

    let body = json!({"source_id": "54", "checksum": "a1b2c3d4=", "output_format": "pdf"}).to_string();
    let first = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    let first_location = first.headers().get("location").unwrap().to_str().unwrap().to_string();

    let second = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::SEE_OTHER);
    let second_location = second.headers().get("location").unwrap().to_str().unwrap().to_string();
    assert_eq!(first_location, second_location);
}

#[tokio::test]
async fn invalid_source_id_is_rejected() {
    let state = test_util::state("invalid_source_id_is_rejected");
    let router = create_router(64).with_state(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(
                    json!({"source_id": "bad/id", "checksum": "a1b2c3d4=", "output_format": "pdf"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unauthorized_read_is_forbidden() {
    let state = test_util::state("unauthorized_read_is_forbidden");
    let router = create_router(64).with_state(state.clone());

    state
        .store
        .set_status(&texcompile_lib::Task {
            source_id: "54".to_string(),
            checksum: "a1b2c3d4=".to_string(),
            output_format: texcompile_lib::Format::Pdf,
            status: texcompile_lib::Status::Completed,
            reason: texcompile_lib::Reason::None,
            description: String::new(),
            size_bytes: 0,
            owner: Some("84843".to_string()),
        })
        .await
        .unwrap();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/54/a1b2c3d4%3D/pdf")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let state = test_util::state("unknown_task_is_not_found");
    let router = create_router(64).with_state(state);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/999/deadbeef/pdf")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_endpoint_reports_all_dependencies_available() {
    let state = test_util::state("status_endpoint_reports_all_dependencies_available");
    let router = create_router(64).with_state(state);

    let response = router
        .oneshot(Request::builder().uri("/status").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["store"], true);
    assert_eq!(body["compiler"], true);
    assert_eq!(body["filemanager"], true);
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text_format() {
    let state = test_util::state("metrics_endpoint_exposes_prometheus_text_format");
    let router = create_router(64).with_state(state);

    let response = router
        .oneshot(Request::builder().uri("/metrics").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
