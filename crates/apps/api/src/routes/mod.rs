pub mod analyze;
mod api_doc;
pub mod root;

use crate::analyze::router::analyze_router;
use crate::api_state::ApiContext;
use crate::root::router::root_public_router;
use crate::routes::api_doc::ApiDoc;
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// --- Router Construction ---
pub fn create_router(api_state: ApiContext) -> Router {
    let prefix = api_state.settings.api.route_prefix();
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .merge(root_public_router())
        .nest(&prefix, analyze_router())
        .with_state(api_state)
}
