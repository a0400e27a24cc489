pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth;
use crate::batch::handlers as batch_handlers;
use crate::export::handlers as export_handlers;
use crate::prompt::handlers as prompt_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // every data endpoint sits behind the bearer-token guard
    let protected = Router::new()
        .route(
            "/api/parse-variables",
            post(prompt_handlers::handle_parse_variables),
        )
        .route("/api/execute", post(prompt_handlers::handle_execute))
        .route(
            "/api/upload-excel",
            post(batch_handlers::handle_upload_excel),
        )
        .route(
            "/api/execute-batch",
            post(batch_handlers::handle_execute_batch),
        )
        .route(
            "/api/download-excel",
            post(export_handlers::handle_download_excel),
        )
        .route(
            "/api/download-row",
            post(export_handlers::handle_download_row),
        )
        .route(
            "/api/download-zip",
            post(export_handlers::handle_download_zip),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/login", post(auth::handle_login))
        .route("/api/logout", post(auth::handle_logout))
        .merge(protected)
        .with_state(state)
}
