//! coreplug-api — REST control surface for the scaling controller.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status` | Controller status snapshot |
//! | GET | `/api/v1/enabled` | Current enable switch |
//! | PUT | `/api/v1/enabled` | Set the enable switch |
//! | POST | `/api/v1/suspend` | Collapse the pool and stop ticking |
//! | POST | `/api/v1/resume` | Leave suspension |
//! | POST | `/api/v1/activity` | Request a fast re-evaluation |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use coreplug_controller::{ScalingController, SignalCoordinator};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: ScalingController,
    pub signals: SignalCoordinator,
}

/// Build the API router.
pub fn build_router(controller: ScalingController) -> Router {
    let state = ApiState {
        signals: controller.signals(),
        controller,
    };

    let api_routes = Router::new()
        .route("/status", get(handlers::status))
        .route("/enabled", get(handlers::get_enabled).put(handlers::set_enabled))
        .route("/suspend", post(handlers::suspend))
        .route("/resume", post(handlers::resume))
        .route("/activity", post(handlers::activity))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
