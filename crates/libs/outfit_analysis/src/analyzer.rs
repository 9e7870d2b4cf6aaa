use crate::error::{AnalysisError, ErrorKind};
use crate::merger::CandidateRecord;
use crate::model::VisionModel;
use crate::parser::{ParseStatus, PassResult, PassTarget, parse};
use crate::prompts::prompt_for;
use crate::registry::schema_for;
use crate::sink::{JsonFileSink, RawResponseSink};
use crate::stages::AnalysisPlan;
use crate::staging::StagedImage;
use crate::structs::AnalysisResult;
use crate::validator::validate;
use app_state::AppSettings;
use bon::bon;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// One photo to analyse. Construction rejects anything that is not an image.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    image_bytes: &'a [u8],
    image_identifier: &'a str,
    extension: &'static str,
}

impl<'a> AnalysisRequest<'a> {
    pub fn new(image_bytes: &'a [u8], image_identifier: &'a str) -> Result<Self, AnalysisError> {
        if image_bytes.is_empty() {
            return Err(AnalysisError::InvalidInput("empty upload".to_string()));
        }
        let kind = infer::get(image_bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .ok_or_else(|| {
                AnalysisError::InvalidInput("content is not a recognised image format".to_string())
            })?;
        Ok(Self {
            image_bytes,
            image_identifier,
            extension: kind.extension(),
        })
    }

    #[must_use]
    pub const fn image_identifier(&self) -> &str {
        self.image_identifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Parsed,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassTiming {
    pub stage: String,
    pub elapsed: Duration,
    pub outcome: PassOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisTimings {
    pub passes: Vec<PassTiming>,
    pub total: Duration,
}

impl AnalysisTimings {
    /// Summary like `primary=812ms eyewear-focus=430ms narrative=1204ms`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.passes
            .iter()
            .map(|p| format!("{}={}ms", p.stage, p.elapsed.as_millis()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A successful analysis plus how it was reached.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub timings: AnalysisTimings,
    /// Stages whose output was unusable and therefore ignored.
    pub degraded: Vec<String>,
}

/// Runs the primary pass and the refinement plan against a vision model.
/// Holds no per-request state and can be shared between concurrent requests.
pub struct OutfitAnalyzer<M> {
    model: M,
    plan: AnalysisPlan,
    sink: Option<Arc<dyn RawResponseSink>>,
    staging_dir: Option<PathBuf>,
}

#[bon]
impl<M: VisionModel> OutfitAnalyzer<M> {
    #[builder]
    pub fn new(
        #[builder(start_fn)] model: M,
        plan: Option<AnalysisPlan>,
        sink: Option<Arc<dyn RawResponseSink>>,
        #[builder(into)] staging_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            model,
            plan: plan.unwrap_or_default(),
            sink,
            staging_dir,
        }
    }

    /// An analyzer following the configured plan, writing raw responses when
    /// `output.raw_response_dir` is set.
    pub fn from_settings(model: M, settings: &AppSettings) -> color_eyre::Result<Self> {
        let plan = AnalysisPlan::from_settings(&settings.model, &settings.analysis)?;
        let sink = settings
            .output
            .raw_response_dir
            .as_ref()
            .map(|dir| Arc::new(JsonFileSink::new(dir)) as Arc<dyn RawResponseSink>);
        Ok(Self::builder(model).plan(plan).maybe_sink(sink).build())
    }

    #[must_use]
    pub const fn plan(&self) -> &AnalysisPlan {
        &self.plan
    }

    pub async fn analyze(
        &self,
        image_bytes: &[u8],
        image_identifier: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let report = self.analyze_with_report(image_bytes, image_identifier).await?;
        Ok(report.result)
    }

    pub async fn analyze_with_report(
        &self,
        image_bytes: &[u8],
        image_identifier: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        let request = AnalysisRequest::new(image_bytes, image_identifier)?;
        let now = Instant::now();

        let staged = StagedImage::stage(
            request.image_bytes,
            request.extension,
            self.staging_dir.as_deref(),
        )
        .map_err(|e| {
            error!("Staging {image_identifier} failed: {e}");
            AnalysisError::ModelUnavailable("could not stage image for inference".to_string())
        })?;
        let outcome = self.run(&request, staged.path()).await;
        staged.release();

        let mut report = match outcome {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    kind = ?e.kind(),
                    "Analysis of {image_identifier} failed after {:?}: {e}",
                    now.elapsed()
                );
                return Err(e);
            }
        };
        report.timings.total = now.elapsed();
        info!(
            "Analysed {image_identifier} in {:?} ({})",
            report.timings.total,
            report.timings.summary()
        );
        Ok(report)
    }

    async fn run(
        &self,
        request: &AnalysisRequest<'_>,
        image: &Path,
    ) -> Result<AnalysisReport, AnalysisError> {
        let mut timings = AnalysisTimings::default();
        let mut degraded = Vec::new();

        let primary = self
            .run_pass(
                image,
                "primary",
                PassTarget::Primary,
                self.plan.primary_temperature,
                &mut timings,
            )
            .await?;
        let mut candidate = CandidateRecord::from_primary(&primary).inspect_err(|e| {
            warn!("{e}. Raw model output: {}", primary.raw_text);
        })?;

        for stage in &self.plan.stages {
            if !stage.trigger.fires(&candidate) {
                debug!(stage = %stage.name, "Trigger not met, skipping");
                continue;
            }
            let pass = self
                .run_pass(image, &stage.name, stage.target, stage.temperature, &mut timings)
                .await?;
            if !candidate.apply(&pass) {
                let reason = match &pass.status {
                    ParseStatus::Malformed { reason } => reason.as_str(),
                    ParseStatus::Ok(_) => "nothing to merge",
                };
                warn!(
                    kind = ?ErrorKind::SupplementaryPassDegraded,
                    stage = %stage.name,
                    "Ignoring {} output: {reason}. Raw model output: {}",
                    request.image_identifier(),
                    pass.raw_text
                );
                degraded.push(stage.name.clone());
            }
        }
        candidate.finalize(&self.plan.fallback_narrative);

        let result = validate(&candidate).inspect_err(|e| {
            warn!("Merged candidate failed validation: {e}");
        })?;
        if let Some(sink) = &self.sink {
            match candidate.to_json() {
                Ok(merged) => sink.record(request.image_identifier(), &merged),
                Err(e) => warn!(
                    "Could not serialize raw response of {}: {e}",
                    request.image_identifier()
                ),
            }
        }

        Ok(AnalysisReport {
            result,
            timings,
            degraded,
        })
    }

    async fn run_pass(
        &self,
        image: &Path,
        stage: &str,
        target: PassTarget,
        temperature: f32,
        timings: &mut AnalysisTimings,
    ) -> Result<PassResult, AnalysisError> {
        let prompt = prompt_for(target);
        let schema = schema_for(target);
        let now = Instant::now();

        let raw_text = self
            .model
            .infer(image, &prompt, Some(&schema), temperature)
            .await
            .inspect_err(|e| error!(stage, model = self.model.name(), "Inference failed: {e}"))?;
        let pass = parse(target, raw_text);

        let elapsed = now.elapsed();
        debug!(stage, ?elapsed, parsed = pass.is_ok(), "Pass finished");
        timings.passes.push(PassTiming {
            stage: stage.to_string(),
            elapsed,
            outcome: if pass.is_ok() {
                PassOutcome::Parsed
            } else {
                PassOutcome::Malformed
            },
        });
        Ok(pass)
    }
}
