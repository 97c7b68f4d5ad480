//! Label exchange types
//!
//! A closed sum type over every label kind the pipeline can declare.
//! Adding a new kind is a compile-time-checked change everywhere labels are
//! handled: `LabelKind` tags and `Label` payloads must stay in lockstep.

use serde::{Deserialize, Serialize};

/// Type tag for a label kind, as declared by a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    /// Simple regression label
    Simple,
    /// Multiclass classification label
    Multiclass,
    /// Cost-sensitive classification label
    CostSensitive,
    /// Contextual bandit label
    ContextualBandit,
    /// Conditional contextual bandit label
    ConditionalContextualBandit,
    /// No label (prediction-only pipelines)
    NoLabel,
}

/// One (action, cost, probability) entry of a contextual bandit label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CbClass {
    pub action: u32,
    pub cost: f32,
    pub probability: f32,
}

/// Contextual bandit label payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CbLabel {
    pub costs: Vec<CbClass>,
    pub weight: f32,
}

/// One (class, cost) entry of a cost-sensitive label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CsClass {
    pub class: u32,
    pub cost: f32,
}

/// Cost-sensitive label payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CsLabel {
    pub costs: Vec<CsClass>,
}

/// Role of a record within a conditional contextual bandit example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CcbExampleType {
    Unset,
    Shared,
    Action,
    Slot,
}

/// Observed outcome for a conditional contextual bandit slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcbOutcome {
    pub cost: f32,
    /// (action, probability) pairs, highest probability first
    pub action_probs: Vec<(u32, f32)>,
}

/// Conditional contextual bandit label payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcbLabel {
    pub example_type: CcbExampleType,
    pub outcome: Option<CcbOutcome>,
    pub explicit_included_actions: Vec<u32>,
    pub weight: f32,
}

impl Default for CcbLabel {
    fn default() -> Self {
        CcbLabel {
            example_type: CcbExampleType::Unset,
            outcome: None,
            explicit_included_actions: Vec::new(),
            weight: 1.0,
        }
    }
}

/// A record's label, one variant per supported kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Label {
    Simple {
        value: f32,
        weight: f32,
        initial: f32,
    },
    Multiclass {
        class: u32,
        weight: f32,
    },
    CostSensitive(CsLabel),
    ContextualBandit(CbLabel),
    ConditionalContextualBandit(CcbLabel),
    /// Unlabeled record
    None,
}

impl Default for Label {
    fn default() -> Self {
        Label::None
    }
}

impl Label {
    /// The kind tag matching this label's variant
    pub fn kind(&self) -> LabelKind {
        match self {
            Label::Simple { .. } => LabelKind::Simple,
            Label::Multiclass { .. } => LabelKind::Multiclass,
            Label::CostSensitive(_) => LabelKind::CostSensitive,
            Label::ContextualBandit(_) => LabelKind::ContextualBandit,
            Label::ConditionalContextualBandit(_) => LabelKind::ConditionalContextualBandit,
            Label::None => LabelKind::NoLabel,
        }
    }

    /// Label-to-weight rule applied during record setup
    ///
    /// Simple and multiclass labels carry an explicit importance weight.
    /// Every other kind weighs 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Label::Simple { weight, .. } => *weight,
            Label::Multiclass { weight, .. } => *weight,
            Label::CostSensitive(_)
            | Label::ContextualBandit(_)
            | Label::ConditionalContextualBandit(_)
            | Label::None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_kind_matches_variant() {
        assert_eq!(
            Label::Simple {
                value: 1.0,
                weight: 1.0,
                initial: 0.0
            }
            .kind(),
            LabelKind::Simple
        );
        assert_eq!(
            Label::Multiclass { class: 3, weight: 1.0 }.kind(),
            LabelKind::Multiclass
        );
        assert_eq!(
            Label::CostSensitive(CsLabel::default()).kind(),
            LabelKind::CostSensitive
        );
        assert_eq!(
            Label::ContextualBandit(CbLabel::default()).kind(),
            LabelKind::ContextualBandit
        );
        assert_eq!(
            Label::ConditionalContextualBandit(CcbLabel::default()).kind(),
            LabelKind::ConditionalContextualBandit
        );
        assert_eq!(Label::None.kind(), LabelKind::NoLabel);
    }

    #[test]
    fn test_weight_rule() {
        let simple = Label::Simple {
            value: -1.0,
            weight: 2.5,
            initial: 0.0,
        };
        assert_eq!(simple.weight(), 2.5);

        let multi = Label::Multiclass { class: 1, weight: 0.5 };
        assert_eq!(multi.weight(), 0.5);

        assert_eq!(Label::None.weight(), 1.0);
        assert_eq!(Label::CostSensitive(CsLabel::default()).weight(), 1.0);
    }

    #[test]
    fn test_default_is_unlabeled() {
        assert_eq!(Label::default(), Label::None);
    }
}
