use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics_handler));

    // Vertex AI schedule endpoints
    let vertex_routes = Router::new()
        .route("/uiConfig", get(handlers::vertex::ui_config))
        .route(
            "/createJobScheduler",
            post(handlers::vertex::create_job_scheduler),
        )
        .route("/listSchedules", get(handlers::vertex::list_schedules))
        .route("/getSchedule", get(handlers::vertex::get_schedule))
        .route("/pauseSchedule", get(handlers::vertex::pause_schedule))
        .route("/resumeSchedule", get(handlers::vertex::resume_schedule))
        .route("/triggerSchedule", get(handlers::vertex::trigger_schedule))
        .route("/deleteSchedule", delete(handlers::vertex::delete_schedule))
        .route(
            "/listNotebookExecutionJobs",
            get(handlers::vertex::list_notebook_execution_jobs),
        );

    // Cloud Storage endpoints
    let storage_routes = Router::new()
        .route("/listBucket", get(handlers::storage::list_buckets))
        .route("/createNewBucket", post(handlers::storage::create_new_bucket));

    // Protected routes (token guard when configured)
    let protected_routes = Router::new()
        .nest("/api/vertex", vertex_routes)
        .nest("/api/storage", storage_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
