use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::authorization::authorize_request;
use crate::app_state::SharedAppState;

async fn health_checker_handler() -> &'static str {
    "OK"
}

pub struct ApiRoutes;

impl ApiRoutes {
    /// Static files from `api.root_folder`, guarded by the authorization
    /// middleware.
    pub fn create(state: SharedAppState) -> Router {
        Router::new()
            .route("/_health", get(health_checker_handler))
            .fallback_service(ServeDir::new(&state.settings.api.root_folder))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                authorize_request,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
