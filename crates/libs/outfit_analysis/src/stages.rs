//! The refinement plan: an explicit, ordered list of supplementary passes run
//! after the primary pass. Adding a focused pass is a data change.

use crate::merger::CandidateRecord;
use crate::parser::PassTarget;
use crate::taxonomy::Category;
use app_state::{AnalysisSettings, ModelSettings};
use color_eyre::eyre::{Result, WrapErr};

pub const DEFAULT_PRIMARY_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_FOCUS_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_NARRATIVE_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run when the candidate holds no valid concrete value for the category.
    WhenWeak(Category),
    Always,
}

impl Trigger {
    #[must_use]
    pub fn fires(self, candidate: &CandidateRecord) -> bool {
        match self {
            Self::WhenWeak(category) => candidate.is_weak(category),
            Self::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementStage {
    pub name: String,
    pub target: PassTarget,
    pub trigger: Trigger,
    pub temperature: f32,
}

impl RefinementStage {
    /// A focused re-examination of one category, run when it is weak.
    #[must_use]
    pub fn focus(category: Category, temperature: f32) -> Self {
        Self {
            name: PassTarget::Focus(category).to_string(),
            target: PassTarget::Focus(category),
            trigger: Trigger::WhenWeak(category),
            temperature,
        }
    }

    #[must_use]
    pub fn narrative(temperature: f32) -> Self {
        Self {
            name: PassTarget::Narrative.to_string(),
            target: PassTarget::Narrative,
            trigger: Trigger::Always,
            temperature,
        }
    }
}

/// Sampling of the primary pass plus the stages that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan {
    pub primary_temperature: f32,
    pub stages: Vec<RefinementStage>,
    /// Substituted for narrative fields no pass produced.
    pub fallback_narrative: String,
}

impl Default for AnalysisPlan {
    /// Eyewear refinement when weak, then the narrative pass.
    fn default() -> Self {
        Self {
            primary_temperature: DEFAULT_PRIMARY_TEMPERATURE,
            stages: vec![
                RefinementStage::focus(Category::Eyewear, DEFAULT_FOCUS_TEMPERATURE),
                RefinementStage::narrative(DEFAULT_NARRATIVE_TEMPERATURE),
            ],
            fallback_narrative: crate::structs::FALLBACK_NARRATIVE.to_string(),
        }
    }
}

impl AnalysisPlan {
    /// One focus stage per configured category, in order, then the narrative stage.
    pub fn from_settings(model: &ModelSettings, analysis: &AnalysisSettings) -> Result<Self> {
        let mut stages = Vec::with_capacity(analysis.focus_categories.len() + 1);
        for key in &analysis.focus_categories {
            let category: Category = key
                .parse()
                .wrap_err_with(|| format!("invalid entry in analysis.focus_categories: {key}"))?;
            if stages
                .iter()
                .any(|s: &RefinementStage| s.target == PassTarget::Focus(category))
            {
                continue;
            }
            stages.push(RefinementStage::focus(category, model.focus_temperature));
        }
        stages.push(RefinementStage::narrative(model.narrative_temperature));

        Ok(Self {
            primary_temperature: model.primary_temperature,
            stages,
            fallback_narrative: analysis.fallback_narrative.clone(),
        })
    }
}
