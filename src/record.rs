//! Record and batch data model
//!
//! A `Record` is one processable unit of work: named feature groups, a
//! label, a prediction, and the bookkeeping a pipeline mutates while the
//! record is inside a setup/unsetup bracket. Batches are ordered slices of
//! records sharing one logical example.

use crate::label::Label;
use crate::prediction::Prediction;
use std::sync::Arc;

/// Namespace reserved for the synthetic bias feature injected during setup
pub const BIAS_NAMESPACE: u8 = 128;

/// Fixed index of the synthetic bias feature (pre-multiplication)
pub const BIAS_FEATURE_INDEX: u64 = 11_650_396;

/// One (index, value) feature entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    pub index: u64,
    pub value: f32,
}

/// An ordered list of features under one namespace
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGroup {
    pub namespace: u8,
    pub features: Vec<Feature>,
}

impl FeatureGroup {
    pub fn new(namespace: u8) -> Self {
        FeatureGroup {
            namespace,
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Process-wide interaction specification shared by all records inside a
/// setup/unsetup bracket
///
/// Each term is a sequence of namespace identifiers whose feature groups
/// are crossed with each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionSet {
    pub terms: Vec<Vec<u8>>,
}

/// One unit of work flowing through the pipeline
///
/// A record's `interactions` handle is `Some` exactly while it is inside an
/// active setup/unsetup bracket. Violating that invariant signals a bug in
/// caller discipline and is surfaced as a fatal error by the setup layer.
#[derive(Debug, Clone, Default)]
pub struct Record {
    groups: Vec<FeatureGroup>,
    pub label: Label,
    pub prediction: Prediction,
    pub weight: f32,
    pub offset: u64,
    pub interactions: Option<Arc<InteractionSet>>,
    pub num_features: u64,
    pub loss: f32,
    pub partial_prediction: f32,
    pub updated_prediction: f32,
    pub reduction_depth: u32,
    pub total_sum_feat_sq: f32,
    pub sorted: bool,
    pub end_pass: bool,
    pub tag: String,
}

impl Record {
    pub fn new() -> Self {
        Record {
            weight: 1.0,
            ..Record::default()
        }
    }

    /// Reset all mutable state for reuse
    ///
    /// Used by the pool on release. The cleared record is indistinguishable
    /// from a freshly constructed one.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.label = Label::default();
        self.prediction = Prediction::default();
        self.weight = 1.0;
        self.offset = 0;
        self.interactions = None;
        self.num_features = 0;
        self.loss = 0.0;
        self.partial_prediction = 0.0;
        self.updated_prediction = 0.0;
        self.reduction_depth = 0;
        self.total_sum_feat_sq = 0.0;
        self.sorted = false;
        self.end_pass = false;
        self.tag.clear();
    }

    /// Feature groups in namespace insertion order
    pub fn groups(&self) -> &[FeatureGroup] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [FeatureGroup] {
        &mut self.groups
    }

    /// Look up the feature group for a namespace, if present
    pub fn group(&self, namespace: u8) -> Option<&FeatureGroup> {
        self.groups.iter().find(|g| g.namespace == namespace)
    }

    /// Append a feature, creating the namespace's group on first use
    pub fn push_feature(&mut self, namespace: u8, index: u64, value: f32) {
        let pos = match self.groups.iter().position(|g| g.namespace == namespace) {
            Some(pos) => pos,
            None => {
                self.groups.push(FeatureGroup::new(namespace));
                self.groups.len() - 1
            }
        };
        self.groups[pos].features.push(Feature { index, value });
    }

    /// Remove a namespace's group entirely, returning it if it was present
    pub fn remove_group(&mut self, namespace: u8) -> Option<FeatureGroup> {
        let pos = self.groups.iter().position(|g| g.namespace == namespace)?;
        Some(self.groups.remove(pos))
    }

    /// Total feature count across all groups
    pub fn feature_count(&self) -> u64 {
        self.groups.iter().map(|g| g.len() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_feature_groups_by_namespace() {
        let mut record = Record::new();
        record.push_feature(b'a', 1, 1.0);
        record.push_feature(b'a', 2, 0.5);
        record.push_feature(b'b', 7, 2.0);

        assert_eq!(record.groups().len(), 2);
        assert_eq!(record.group(b'a').unwrap().len(), 2);
        assert_eq!(record.group(b'b').unwrap().len(), 1);
        assert_eq!(record.feature_count(), 3);
    }

    #[test]
    fn test_groups_preserve_insertion_order() {
        let mut record = Record::new();
        record.push_feature(b'z', 1, 1.0);
        record.push_feature(b'a', 2, 1.0);

        let namespaces: Vec<u8> = record.groups().iter().map(|g| g.namespace).collect();
        assert_eq!(namespaces, vec![b'z', b'a']);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut record = Record::new();
        record.push_feature(b'a', 5, 1.0);
        record.label = Label::Simple {
            value: 1.0,
            weight: 2.0,
            initial: 0.0,
        };
        record.prediction = Prediction::Scalar(0.3);
        record.tag = "tagged".to_string();
        record.sorted = true;
        record.end_pass = true;
        record.interactions = Some(Arc::new(InteractionSet::default()));
        record.offset = 17;
        record.loss = 0.1;

        record.clear();

        assert!(record.groups().is_empty());
        assert_eq!(record.label, Label::None);
        assert_eq!(record.prediction, Prediction::None);
        assert_eq!(record.weight, 1.0);
        assert_eq!(record.offset, 0);
        assert!(record.interactions.is_none());
        assert!(record.tag.is_empty());
        assert!(!record.sorted);
        assert!(!record.end_pass);
        assert_eq!(record.loss, 0.0);
    }

    #[test]
    fn test_remove_group() {
        let mut record = Record::new();
        record.push_feature(b'a', 1, 1.0);
        record.push_feature(BIAS_NAMESPACE, BIAS_FEATURE_INDEX, 1.0);

        let removed = record.remove_group(BIAS_NAMESPACE).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.features[0].index, BIAS_FEATURE_INDEX);
        assert!(record.group(BIAS_NAMESPACE).is_none());
        assert_eq!(record.groups().len(), 1);

        assert!(record.remove_group(BIAS_NAMESPACE).is_none());
    }
}
