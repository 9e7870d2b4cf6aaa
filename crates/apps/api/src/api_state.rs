use app_state::{AppSettings, ApiSettings};
use axum::extract::FromRef;
use outfit_analysis::{OutfitAnalyzer, VisionModel};
use std::sync::Arc;

pub type SharedAnalyzer = Arc<OutfitAnalyzer<Arc<dyn VisionModel>>>;

#[derive(Clone)]
pub struct ApiContext {
    pub settings: AppSettings,
    pub analyzer: SharedAnalyzer,
}

impl FromRef<ApiContext> for AppSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.clone()
    }
}

impl FromRef<ApiContext> for ApiSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.api.clone()
    }
}

impl FromRef<ApiContext> for SharedAnalyzer {
    fn from_ref(state: &ApiContext) -> Self {
        state.analyzer.clone()
    }
}
