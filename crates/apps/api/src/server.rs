use crate::api_state::ApiContext;
use crate::create_router;
use app_state::{AppSettings, ApiSettings};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use http::{HeaderName, HeaderValue, Method};
use outfit_analysis::{OutfitAnalyzer, VisionModel, llama_client};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Wire the analyzer to the configured model backend.
pub fn build_context(settings: AppSettings) -> Result<ApiContext> {
    let client = llama_client(&settings.model).wrap_err("could not build the model client")?;
    let model: Arc<dyn VisionModel> = Arc::new(client);
    let analyzer = OutfitAnalyzer::from_settings(model, &settings)?;
    info!(
        "Analysis plan: {}",
        analyzer
            .plan()
            .stages
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(ApiContext {
        settings,
        analyzer: Arc::new(analyzer),
    })
}

fn parse_list<T>(values: &[String], what: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    values
        .iter()
        .filter_map(|s| {
            let parsed = parse(s);
            if parsed.is_none() {
                error!("Invalid CORS {what} configured: {s}");
            }
            parsed
        })
        .collect()
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// CORS from `api.allowed_*`; `"*"` allows anything.
#[must_use]
pub fn cors_layer(api: &ApiSettings) -> CorsLayer {
    let origins = if is_wildcard(&api.allowed_origins) {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_list(&api.allowed_origins, "origin", |s| {
            HeaderValue::from_str(s).ok()
        }))
    };
    let methods = if is_wildcard(&api.allowed_methods) {
        AllowMethods::any()
    } else {
        AllowMethods::list(parse_list(&api.allowed_methods, "method", |s| {
            Method::from_bytes(s.as_bytes()).ok()
        }))
    };
    let headers = if is_wildcard(&api.allowed_headers) {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(parse_list(&api.allowed_headers, "header", |s| {
            HeaderName::from_bytes(s.as_bytes()).ok()
        }))
    };
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}

/// The router with its middleware stack.
pub fn create_app(api_state: ApiContext) -> Router {
    let max_upload = api_state.settings.api.max_upload_bytes;
    let cors = cors_layer(&api_state.settings.api);
    create_router(api_state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn serve(settings: AppSettings) -> Result<()> {
    info!("🚀 Initializing server...");
    let addr: SocketAddr = settings
        .api
        .bind_address()
        .parse()
        .wrap_err("invalid api.host / api.port")?;
    let app = create_app(build_context(settings)?);

    let listener = TcpListener::bind(addr).await?;
    info!("👕 Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
