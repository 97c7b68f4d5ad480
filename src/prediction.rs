//! Prediction exchange types
//!
//! Closed sum type over the prediction kinds a pipeline can produce. The
//! enumeration mirrors the stage capability interface: a stage declares its
//! output prediction kind and the matching `Prediction` variant is what
//! callers read back after `predict`.

use serde::{Deserialize, Serialize};

/// Type tag for a prediction kind, as declared by a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionKind {
    Scalar,
    Scalars,
    ActionScores,
    ActionProbs,
    DecisionScores,
    Multiclass,
    Multilabels,
    Pdf,
    ActionPdfValue,
    ActiveMulticlass,
    NoPred,
}

/// One (action, score) entry of an action-scores prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionScore {
    pub action: u32,
    pub score: f32,
}

/// One segment of a probability density function prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfSegment {
    pub left: f32,
    pub right: f32,
    pub pdf_value: f32,
}

/// A stage's output prediction, one variant per supported kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    Scalar(f32),
    Scalars(Vec<f32>),
    /// Also carries action-probability predictions, which share the layout
    ActionScores(Vec<ActionScore>),
    DecisionScores(Vec<Vec<ActionScore>>),
    Multiclass(u32),
    Multilabels(Vec<u32>),
    Pdf(Vec<PdfSegment>),
    ActionPdfValue { action: f32, pdf_value: f32 },
    ActiveMulticlass {
        class: u32,
        more_info_required_for_classes: Vec<u32>,
    },
    /// No prediction produced
    None,
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::None
    }
}

impl Prediction {
    /// The kind tag matching this prediction's variant
    ///
    /// `ActionScores` answers for both the score and probability kinds since
    /// they share a payload.
    pub fn kind(&self) -> PredictionKind {
        match self {
            Prediction::Scalar(_) => PredictionKind::Scalar,
            Prediction::Scalars(_) => PredictionKind::Scalars,
            Prediction::ActionScores(_) => PredictionKind::ActionScores,
            Prediction::DecisionScores(_) => PredictionKind::DecisionScores,
            Prediction::Multiclass(_) => PredictionKind::Multiclass,
            Prediction::Multilabels(_) => PredictionKind::Multilabels,
            Prediction::Pdf(_) => PredictionKind::Pdf,
            Prediction::ActionPdfValue { .. } => PredictionKind::ActionPdfValue,
            Prediction::ActiveMulticlass { .. } => PredictionKind::ActiveMulticlass,
            Prediction::None => PredictionKind::NoPred,
        }
    }
}
