use crate::analyze::handlers::analyze_image;
use crate::api_state::ApiContext;
use axum::{Router, routing::post};

pub fn analyze_router() -> Router<ApiContext> {
    Router::new().route("/analyze", post(analyze_image))
}
