use async_trait::async_trait;
use outfit_analysis::{
    AnalysisError, AnalysisPlan, Category, ErrorKind, Eyewear, EyewearType, FALLBACK_NARRATIVE,
    FrameStyle, JsonFileSink, ModelError, Observation, OutfitAnalyzer, RefinementStage,
    VisionModel, build_primary_prompt,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

const PRIMARY_NO_EYEWEAR: &str = r#"{"clothing_info": {
    "upper_body": {"visible": true, "items": [{"type": "long sleeve outwear", "sleeve_length": "long"}]},
    "lower_body": {"visible": true, "type": "pants", "length": "ankle length"},
    "full_body": {"visible": false, "type": "unknown", "sleeve_length": "unknown", "length": "unknown"},
    "eyewear": {"wearing": false, "type": "unknown", "frame_style": "unknown"},
    "headwear": {"wearing": true, "type": "beanie"},
    "accessories": {"items": ["scarf"]}
}}"#;

const PRIMARY_UPPER_ONLY: &str = r#"```json
{"clothing_info": {
    "upper_body": {"visible": true, "items": [{"type": "sweater", "sleeve_length": "long"}]},
    "lower_body": {"visible": false, "type": "not applicable", "length": "not applicable"},
    "full_body": {"visible": false, "type": "not applicable", "sleeve_length": "not applicable", "length": "not applicable"},
    "eyewear": {"wearing": true, "type": "glasses", "frame_style": "thick"},
    "headwear": {"wearing": false, "type": "unknown"},
    "accessories": {"items": []}
}}
```"#;

const EYEWEAR_FOUND: &str =
    r#"{"eyewear": {"wearing": true, "type": "glasses", "frame_style": "thin"}}"#;

const NARRATIVE: &str = r#"{
    "description": "A dark wool coat over trousers, with a beanie and scarf.",
    "thermal_properties": "Well insulated; the wool layers trap heat.",
    "weather_appropriateness": "Suited to cold, dry winter days around 0 to 8 degrees."
}"#;

#[derive(Debug)]
struct Call {
    prompt: String,
    temperature: f32,
    constrained: bool,
    image_was_staged: bool,
}

/// Replays canned responses in order and records every call.
struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedModel {
    fn new(script: impl IntoIterator<Item = Result<&'static str, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|step| step.map(str::to_string))
                    .collect(),
            ),
            calls: Mutex::default(),
        })
    }

    fn replying(responses: &[&'static str]) -> Arc<Self> {
        Self::new(responses.iter().map(|r| Ok(*r)))
    }

    fn calls(&self) -> std::sync::MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn infer(
        &self,
        image: &Path,
        prompt: &str,
        schema: Option<&Value>,
        temperature: f32,
    ) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(Call {
            prompt: prompt.to_string(),
            temperature,
            constrained: schema.is_some(),
            image_was_staged: image.is_file(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Backend("script exhausted".into())))
    }
}

fn analyzer(model: &Arc<ScriptedModel>, staging: &TempDir) -> OutfitAnalyzer<Arc<ScriptedModel>> {
    OutfitAnalyzer::builder(model.clone())
        .staging_dir(staging.path())
        .build()
}

fn assert_nothing_staged(staging: &TempDir) {
    let left: Vec<_> = std::fs::read_dir(staging.path()).unwrap().collect();
    assert!(left.is_empty(), "staged files left behind: {left:?}");
}

#[tokio::test]
async fn eyewear_refinement_overwrites_primary() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_NO_EYEWEAR, EYEWEAR_FOUND, NARRATIVE]);

    let report = analyzer(&model, &staging)
        .analyze_with_report(PNG, "street.png")
        .await
        .unwrap();

    assert_eq!(
        report.result.clothing_info.eyewear,
        Observation::Present(Eyewear {
            kind: EyewearType::Glasses,
            frame_style: Some(FrameStyle::Thin),
        })
    );
    assert!(report.degraded.is_empty());
    let stages: Vec<&str> = report.timings.passes.iter().map(|p| p.stage.as_str()).collect();
    assert_eq!(stages, ["primary", "eyewear-focus", "narrative"]);

    let calls = model.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].prompt, build_primary_prompt());
    assert!(calls[1].prompt.contains("eyewear"));
    assert!(calls.iter().all(|c| c.constrained && c.image_was_staged));
    assert_nothing_staged(&staging);
}

#[tokio::test]
async fn passes_use_their_own_temperature() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_NO_EYEWEAR, EYEWEAR_FOUND, NARRATIVE]);
    analyzer(&model, &staging).analyze(PNG, "a.png").await.unwrap();

    let temperatures: Vec<f32> = model.calls().iter().map(|c| c.temperature).collect();
    assert_eq!(temperatures, [0.0, 0.2, 0.3]);
}

#[tokio::test]
async fn confident_eyewear_skips_refinement() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_UPPER_ONLY, NARRATIVE]);

    let result = analyzer(&model, &staging).analyze(PNG, "a.png").await.unwrap();

    assert_eq!(model.calls().len(), 2);
    assert!(result.clothing_info.eyewear.is_present());
}

#[tokio::test]
async fn out_of_frame_regions_are_never_guessed() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_UPPER_ONLY, NARRATIVE]);

    let result = analyzer(&model, &staging).analyze(PNG, "a.png").await.unwrap();

    assert_eq!(result.clothing_info.lower_body, Observation::Unknown);
    assert_eq!(result.clothing_info.full_body, Observation::Unknown);
    assert!(result.clothing_info.upper_body.is_present());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["clothing_info"]["lower_body"], Value::Null);
}

#[tokio::test]
async fn malformed_primary_stops_the_pipeline() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&["not json", EYEWEAR_FOUND, NARRATIVE]);

    let err = analyzer(&model, &staging).analyze(PNG, "a.png").await.unwrap_err();

    assert!(matches!(err, AnalysisError::MalformedPrimaryResponse(_)));
    assert_eq!(model.calls().len(), 1);
    assert_nothing_staged(&staging);
}

#[tokio::test]
async fn unreachable_backend_is_model_unavailable() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::new([Err(ModelError::Unreachable("connection refused".into()))]);

    let err = analyzer(&model, &staging).analyze(PNG, "a.png").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    assert_eq!(model.calls().len(), 1);
    assert_nothing_staged(&staging);
}

#[tokio::test]
async fn failing_supplementary_call_is_model_unavailable() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::new([Ok(PRIMARY_NO_EYEWEAR), Err(ModelError::Timeout)]);

    let err = analyzer(&model, &staging).analyze(PNG, "a.png").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    assert_nothing_staged(&staging);
}

#[tokio::test]
async fn failed_narrative_falls_back() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_UPPER_ONLY, "Sorry, I can't help with that."]);

    let report = analyzer(&model, &staging)
        .analyze_with_report(PNG, "a.png")
        .await
        .unwrap();

    let narrative = &report.result.narrative;
    assert_eq!(narrative.description, FALLBACK_NARRATIVE);
    assert_eq!(narrative.thermal_properties, FALLBACK_NARRATIVE);
    assert_eq!(narrative.weather_appropriateness, FALLBACK_NARRATIVE);
    assert_eq!(report.degraded, ["narrative"]);
}

#[tokio::test]
async fn malformed_eyewear_pass_keeps_primary_value() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_NO_EYEWEAR, "glasses, probably", NARRATIVE]);

    let report = analyzer(&model, &staging)
        .analyze_with_report(PNG, "a.png")
        .await
        .unwrap();

    assert_eq!(report.result.clothing_info.eyewear, Observation::Absent);
    assert_eq!(report.degraded, ["eyewear-focus"]);
    assert!(report.result.narrative.description.contains("wool coat"));
}

#[tokio::test]
async fn invalid_eyewear_pass_keeps_primary_value() {
    for reply in [
        r#"{"eyewear": "glasses"}"#,
        r#"{"eyewear": 42}"#,
        r#"{"eyewear": {"wearing": true, "type": "monocle"}}"#,
    ] {
        let staging = TempDir::new().unwrap();
        let model = ScriptedModel::replying(&[PRIMARY_NO_EYEWEAR, reply, NARRATIVE]);

        let report = analyzer(&model, &staging)
            .analyze_with_report(PNG, "a.png")
            .await
            .unwrap_or_else(|e| panic!("{reply} failed the request: {e}"));

        assert_eq!(report.result.clothing_info.eyewear, Observation::Absent, "{reply}");
        assert_eq!(report.degraded, ["eyewear-focus"], "{reply}");
        assert_nothing_staged(&staging);
    }
}

#[tokio::test]
async fn primary_narrative_survives_a_failed_narrative_pass() {
    let staging = TempDir::new().unwrap();
    let primary = PRIMARY_NO_EYEWEAR.replacen(
        "{\"clothing_info\"",
        "{\"description\": \"A wool coat over pants.\", \"clothing_info\"",
        1,
    );
    let primary: &'static str = Box::leak(primary.into_boxed_str());
    let model = ScriptedModel::replying(&[primary, EYEWEAR_FOUND, "no idea"]);

    let report = analyzer(&model, &staging)
        .analyze_with_report(PNG, "a.png")
        .await
        .unwrap();

    let narrative = &report.result.narrative;
    assert_eq!(narrative.description, "A wool coat over pants.");
    assert_eq!(narrative.thermal_properties, FALLBACK_NARRATIVE);
    assert_eq!(report.degraded, ["narrative"]);
}

#[tokio::test]
async fn out_of_taxonomy_value_is_a_schema_violation() {
    let staging = TempDir::new().unwrap();
    let sink_dir = TempDir::new().unwrap();
    let primary = PRIMARY_NO_EYEWEAR.replace("\"pants\"", "\"leggings\"");
    let model = ScriptedModel::new([
        Ok(Box::leak(primary.into_boxed_str()) as &'static str),
        Ok(EYEWEAR_FOUND),
        Ok(NARRATIVE),
    ]);
    let analyzer = OutfitAnalyzer::builder(model.clone())
        .staging_dir(staging.path())
        .sink(Arc::new(JsonFileSink::new(sink_dir.path())))
        .build();

    let err = analyzer.analyze(PNG, "a.png").await.unwrap_err();

    let AnalysisError::SchemaViolation(violation) = err else {
        panic!("expected a schema violation");
    };
    assert_eq!(violation.field, "clothing_info.lower_body.type");
    assert_eq!(violation.value, "\"leggings\"");
    assert_eq!(std::fs::read_dir(sink_dir.path()).unwrap().count(), 0);
    assert_nothing_staged(&staging);
}

#[tokio::test]
async fn non_image_is_rejected_before_any_call() {
    let staging = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_NO_EYEWEAR]);

    let err = analyzer(&model, &staging)
        .analyze(b"name,age\nbob,3\n", "people.csv")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn sink_receives_merged_response() {
    let staging = TempDir::new().unwrap();
    let sink_dir = TempDir::new().unwrap();
    let model = ScriptedModel::replying(&[PRIMARY_NO_EYEWEAR, EYEWEAR_FOUND, NARRATIVE]);
    let analyzer = OutfitAnalyzer::builder(model)
        .staging_dir(staging.path())
        .sink(Arc::new(JsonFileSink::new(sink_dir.path())))
        .build();

    analyzer.analyze(PNG, "photos/IMG_0042.png").await.unwrap();

    let written = std::fs::read_to_string(sink_dir.path().join("IMG_0042.json")).unwrap();
    let merged: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(merged["clothing_info"]["eyewear"]["frame_style"], "thin");
    assert_eq!(merged["clothing_info"]["lower_body"]["type"], "pants");
    assert!(merged["thermal_properties"].as_str().unwrap().contains("wool"));
}

#[tokio::test]
async fn headwear_refinement_is_a_plan_change() {
    let staging = TempDir::new().unwrap();
    let primary = PRIMARY_NO_EYEWEAR.replace(
        r#"{"wearing": true, "type": "beanie"}"#,
        r#"{"wearing": true, "type": "unknown"}"#,
    );
    let model = ScriptedModel::new([
        Ok(Box::leak(primary.into_boxed_str()) as &'static str),
        Ok(r#"{"headwear": {"wearing": true, "type": "hood"}}"#),
        Ok(NARRATIVE),
    ]);
    let plan = AnalysisPlan {
        stages: vec![
            RefinementStage::focus(Category::Headwear, 0.1),
            RefinementStage::narrative(0.3),
        ],
        ..AnalysisPlan::default()
    };
    let analyzer = OutfitAnalyzer::builder(model.clone())
        .plan(plan)
        .staging_dir(staging.path())
        .build();

    let result = analyzer.analyze(PNG, "a.png").await.unwrap();

    assert!(result.clothing_info.headwear.is_present());
    assert_eq!(model.calls().len(), 3);
    assert!(model.calls()[1].prompt.contains("headwear"));
}

/// Answers by pass rather than by order, so concurrent requests can share it.
struct ByPromptModel;

#[async_trait]
impl VisionModel for ByPromptModel {
    fn name(&self) -> &str {
        "by-prompt"
    }

    async fn infer(
        &self,
        image: &Path,
        prompt: &str,
        _schema: Option<&Value>,
        _temperature: f32,
    ) -> Result<String, ModelError> {
        assert!(image.is_file());
        tokio::task::yield_now().await;
        let reply = if prompt == build_primary_prompt() {
            PRIMARY_UPPER_ONLY
        } else {
            NARRATIVE
        };
        Ok(reply.to_string())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_the_analyzer() {
    let staging = TempDir::new().unwrap();
    let analyzer = Arc::new(
        OutfitAnalyzer::builder(ByPromptModel)
            .staging_dir(staging.path())
            .build(),
    );

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let analyzer = analyzer.clone();
            tokio::spawn(async move { analyzer.analyze(PNG, &format!("{i}.png")).await })
        })
        .collect();
    for task in tasks {
        let result = task.await.unwrap().unwrap();
        assert!(result.clothing_info.eyewear.is_present());
    }
    assert_nothing_staged(&staging);
}

mod properties {
    use super::*;
    use outfit_analysis::{AnalysisResult, Category, UNKNOWN};
    use proptest::prelude::*;

    fn category_value(category: Category) -> impl Strategy<Value = Value> {
        let kinds: Vec<String> = category
            .type_values()
            .iter()
            .map(ToString::to_string)
            .chain([UNKNOWN.to_string(), "not applicable".to_string()])
            .collect();
        prop_oneof![
            Just(Value::Null),
            Just(Value::Bool(false)),
            (prop::sample::select(kinds), any::<bool>(), "[a-z ]{0,10}").prop_map(
                |(kind, flag, junk)| {
                    let claimed = if junk.len() > 8 { junk } else { kind.clone() };
                    serde_json::json!({
                        "visible": flag,
                        "wearing": flag,
                        "type": claimed,
                        "items": [kind],
                        "length": "unknown",
                        "sleeve_length": "unknown",
                        "frame_style": "unknown"
                    })
                }
            ),
        ]
    }

    fn primary_response() -> impl Strategy<Value = String> {
        let categories = Category::ALL.map(category_value);
        prop_oneof![
            ".{0,40}",
            categories.prop_map(|values| {
                let info: serde_json::Map<String, Value> = Category::ALL
                    .iter()
                    .zip(values)
                    .map(|(c, v)| (c.key().to_string(), v))
                    .collect();
                serde_json::json!({ "clothing_info": info }).to_string()
            }),
        ]
    }

    fn within_taxonomy(result: &AnalysisResult) -> bool {
        let json = serde_json::to_value(result).unwrap();
        Category::ALL.iter().all(|c| {
            let value = &json["clothing_info"][c.key()];
            let kinds: Vec<&Value> = match value.get("items") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| item.get("type").unwrap_or(item))
                    .collect(),
                _ => value.get("type").into_iter().collect(),
            };
            kinds
                .iter()
                .all(|kind| kind.as_str().is_some_and(|k| c.type_values().contains(&k)))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn results_stay_within_taxonomy(primary in primary_response()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let staging = TempDir::new().unwrap();
            let leaked: &'static str = Box::leak(primary.into_boxed_str());
            let model = ScriptedModel::replying(&[leaked, "{}", NARRATIVE]);

            let outcome = runtime.block_on(analyzer(&model, &staging).analyze(PNG, "p.png"));

            match outcome {
                Ok(result) => {
                    prop_assert!(within_taxonomy(&result));
                    prop_assert!(!result.narrative.description.trim().is_empty());
                    prop_assert!(!result.narrative.thermal_properties.trim().is_empty());
                    prop_assert!(!result.narrative.weather_appropriateness.trim().is_empty());
                }
                Err(err) => prop_assert!(matches!(
                    err.kind(),
                    ErrorKind::MalformedPrimaryResponse | ErrorKind::SchemaViolation
                )),
            }
            prop_assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
        }
    }
}
