use crate::root::interfaces::{Endpoints, RootResponse};
use app_state::ApiSettings;
use axum::Json;
use axum::extract::State;

/// API information and status.
#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    responses(
        (status = 200, description = "API name, version and endpoints", body = RootResponse)
    )
)]
pub async fn root(State(api): State<ApiSettings>) -> Json<RootResponse> {
    Json(RootResponse {
        name: api.app_name.clone(),
        version: api.api_version.clone(),
        status: "operational".to_string(),
        docs: "/docs".to_string(),
        endpoints: Endpoints {
            analyze: format!("{}/analyze", api.route_prefix()),
        },
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "API is up", body = String)
    )
)]
pub async fn health_check() -> &'static str {
    "OK"
}
