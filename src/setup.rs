//! Record setup and unsetup
//!
//! Bridges between the owned record representation callers read and write
//! (unmultiplied indices, no bias feature, no interaction handle) and the
//! pipeline-ready representation (indices expanded by the pipeline's
//! feature-width/stride multiplier, synthetic bias feature injected, live
//! interaction handle attached). Every pipeline entry point brackets the
//! stage call with `setup_record`/`unsetup_record` so that callers see
//! stable, stage-count-independent feature indices.

use crate::label::{Label, LabelKind};
use crate::pipeline::PipelineConfig;
use crate::prediction::Prediction;
use crate::record::{Record, BIAS_FEATURE_INDEX, BIAS_NAMESPACE};
use std::sync::Arc;
use thiserror::Error;

/// Programming-invariant violations in the setup/unsetup bracket
///
/// Every variant indicates a bug in pipeline assembly or caller discipline.
/// None of these are retryable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("record has either already been set up, or was never unset. This should never happen and is a bug")]
    AlreadySetup,
    #[error("record has either already been unset, or was never set up. This should never happen and is a bug")]
    AlreadyUnsetup,
    #[error("bias feature not found during unsetup. This should not happen")]
    BiasFeatureMissing,
    #[error("expected exactly one bias feature during unsetup, found {0}")]
    BiasFeatureCount(usize),
    #[error("record label kind {actual:?} does not match the pipeline's declared label kind {declared:?}")]
    LabelKindMismatch {
        declared: LabelKind,
        actual: LabelKind,
    },
}

/// Make a record pipeline-ready
///
/// Resets per-call scalars, recomputes the importance weight from the
/// label, injects the synthetic bias feature (when enabled), expands every
/// feature index by the pipeline multiplier to reserve low bits for
/// per-stage sub-indexing, and attaches the pipeline's interaction set.
///
/// Fails with [`SetupError::AlreadySetup`] if the record is already inside
/// a bracket.
pub fn setup_record(config: &PipelineConfig, record: &mut Record) -> Result<(), SetupError> {
    record.partial_prediction = 0.0;
    record.num_features = 0;
    record.total_sum_feat_sq = 0.0;
    record.loss = 0.0;
    record.reduction_depth = 0;

    record.weight = record.label.weight();

    if config.add_bias {
        record.push_feature(BIAS_NAMESPACE, BIAS_FEATURE_INDEX, 1.0);
    }

    let multiplier = config.multiplier();
    if multiplier != 1 {
        // Make room for per-stage information in the low index bits.
        for group in record.groups_mut() {
            for feature in &mut group.features {
                feature.index *= multiplier;
            }
        }
    }
    record.num_features = record.feature_count();

    if record.interactions.is_some() {
        return Err(SetupError::AlreadySetup);
    }
    record.interactions = Some(Arc::clone(&config.interactions));

    Ok(())
}

/// Reverse [`setup_record`], restoring the owned representation
///
/// The label value is preserved through an exhaustive match over the
/// pipeline's declared label kind; a record whose stored label variant
/// disagrees with the declared kind is a fatal error. The prediction is
/// reset, exactly one bias feature is removed (when enabled), and every
/// feature index is divided back down by the multiplier.
///
/// Fails with [`SetupError::AlreadyUnsetup`] if the record is not inside a
/// bracket.
pub fn unsetup_record(config: &PipelineConfig, record: &mut Record) -> Result<(), SetupError> {
    if record.interactions.is_none() {
        return Err(SetupError::AlreadyUnsetup);
    }
    record.interactions = None;

    // Keep the label that was passed in, but force the variant to agree
    // with what the pipeline declares. A disagreement here means a stage
    // overwrote label storage it did not own.
    match config.label_kind {
        LabelKind::NoLabel => record.label = Label::None,
        declared => {
            let actual = record.label.kind();
            if actual != declared {
                return Err(SetupError::LabelKindMismatch { declared, actual });
            }
        }
    }
    record.prediction = Prediction::default();

    if config.add_bias {
        let bias = record
            .remove_group(BIAS_NAMESPACE)
            .ok_or(SetupError::BiasFeatureMissing)?;
        if bias.len() != 1 {
            return Err(SetupError::BiasFeatureCount(bias.len()));
        }
    }

    let multiplier = config.multiplier();
    if multiplier != 1 {
        for group in record.groups_mut() {
            for feature in &mut group.features {
                feature.index /= multiplier;
            }
        }
    }

    Ok(())
}

/// Element-wise setup for a batch; the first failure aborts the operation
pub fn setup_batch(config: &PipelineConfig, records: &mut [Record]) -> Result<(), SetupError> {
    for record in records {
        setup_record(config, record)?;
    }
    Ok(())
}

/// Element-wise unsetup for a batch; the first failure aborts the operation
pub fn unsetup_batch(config: &PipelineConfig, records: &mut [Record]) -> Result<(), SetupError> {
    for record in records {
        unsetup_record(config, record)?;
    }
    Ok(())
}
