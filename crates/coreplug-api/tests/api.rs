//! API route tests.
//!
//! Drives the router in-process against a simulated pool.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use coreplug_api::build_router;
use coreplug_controller::sim::{ScriptedLoad, SimulatedPool};
use coreplug_controller::{CoreControl, ScalingController};
use coreplug_core::PlugConfig;
use tokio::sync::watch;
use tower::ServiceExt;

const CONFIG: &str = r#"
[window]
sentinel = 12.0

[sampling]
idle = "10s"
busy = "5s"
"#;

fn test_controller() -> (ScalingController, Arc<SimulatedPool>) {
    let config = PlugConfig::from_toml_str(CONFIG).unwrap();
    let pool = Arc::new(SimulatedPool::new(4, 1));
    let load = Arc::new(ScriptedLoad::new(12.0));
    let ctrl = ScalingController::from_config(&config, pool.clone(), load).unwrap();
    (ctrl, pool)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let resp = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn status_reports_snapshot() {
    let (ctrl, _pool) = test_controller();
    let router = build_router(ctrl);

    let (status, body) = call(&router, "GET", "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["pool_size"], 4);
    assert_eq!(body["data"]["online"], 1);
    assert_eq!(body["data"]["running"], false);
    assert_eq!(body["data"]["state"], "active");
}

#[tokio::test]
async fn signals_are_rejected_before_start() {
    let (ctrl, pool) = test_controller();
    let router = build_router(ctrl);

    for uri in ["/api/v1/suspend", "/api/v1/resume", "/api/v1/activity"] {
        let (status, body) = call(&router, "POST", uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT, "{uri}");
        assert_eq!(body["success"], false);
    }

    let (status, _) = call(&router, "PUT", "/api/v1/enabled", Some(r#"{"enabled":false}"#)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(pool.online_count(), 1);
}

/// Load 12 sits in the two-unit band, so ticks after resume leave two
/// units online.
#[tokio::test]
async fn suspend_and_resume_round_trip() {
    let (ctrl, _pool) = test_controller();
    let (_tx, rx) = watch::channel(false);
    ctrl.spawn(rx).unwrap();
    let router = build_router(ctrl);

    let (status, body) = call(&router, "POST", "/api/v1/suspend", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "suspended");
    assert_eq!(body["data"]["online"], 1);

    let (status, body) = call(&router, "POST", "/api/v1/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "active");
    assert_eq!(body["data"]["online"], 2);
}

#[tokio::test]
async fn disabling_brings_every_unit_online() {
    let (ctrl, pool) = test_controller();
    let (_tx, rx) = watch::channel(false);
    ctrl.spawn(rx).unwrap();
    let router = build_router(ctrl);

    let (status, body) = call(&router, "PUT", "/api/v1/enabled", Some(r#"{"enabled":false}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], false);
    assert_eq!(pool.online_count(), 4);

    let (_, body) = call(&router, "GET", "/api/v1/enabled", None).await;
    assert_eq!(body["data"]["enabled"], false);

    let (_, body) = call(&router, "POST", "/api/v1/activity", None).await;
    assert_eq!(body["data"]["scheduled"], false);
}

#[tokio::test]
async fn activity_schedules_fast_tick() {
    let (ctrl, _pool) = test_controller();
    let (_tx, rx) = watch::channel(false);
    ctrl.spawn(rx).unwrap();
    let router = build_router(ctrl);

    let (status, body) = call(&router, "POST", "/api/v1/activity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["scheduled"], true);
}

#[tokio::test]
async fn malformed_enable_body_is_rejected() {
    let (ctrl, _pool) = test_controller();
    let router = build_router(ctrl);

    let (status, _) = call(&router, "PUT", "/api/v1/enabled", Some(r#"{"enabled":"yes"}"#)).await;
    assert!(status.is_client_error());
}
