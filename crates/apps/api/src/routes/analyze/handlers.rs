use crate::analyze::error::AnalyzeError;
use crate::api_state::SharedAnalyzer;
use axum::Json;
use axum::extract::{Multipart, State};
use outfit_analysis::AnalysisResult;
use tracing::{info, instrument};

const FILE_FIELD: &str = "file";

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AnalyzeError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.starts_with("image/"));
        if !is_image {
            return Err(AnalyzeError::NotAnImage);
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload { file_name, bytes });
    }
    Err(AnalyzeError::MissingFile)
}

/// Analyze the clothing in a photo
///
/// Returns the clothing attributes plus a description and a thermal and
/// weather assessment of the outfit.
#[utoipa::path(
    post,
    path = "/api/{api_version}/analyze",
    tag = "Analysis",
    params(("api_version" = String, Path, description = "API version, e.g. v1")),
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 200, description = "Validated analysis result"),
        (status = 400, description = "The upload is not an image."),
        (status = 502, description = "The model answered with unusable output."),
        (status = 503, description = "The model backend is unavailable."),
    )
)]
#[instrument(skip_all, err(Debug))]
pub async fn analyze_image(
    State(analyzer): State<SharedAnalyzer>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AnalyzeError> {
    let upload = read_upload(&mut multipart).await?;
    info!("Analyzing upload {} ({} bytes)", upload.file_name, upload.bytes.len());
    let result = analyzer.analyze(&upload.bytes, &upload.file_name).await?;
    Ok(Json(result))
}
