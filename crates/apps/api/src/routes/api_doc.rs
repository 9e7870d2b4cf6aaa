use crate::routes::{analyze, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::handlers::root,
        root::handlers::health_check,
        analyze::handlers::analyze_image,
    ),
    components(schemas(root::interfaces::RootResponse, root::interfaces::Endpoints)),
    tags(
        (name = "System", description = "Status endpoints"),
        (name = "Analysis", description = "Clothing and weather analysis of a photo"),
    )
)]
pub struct ApiDoc;
