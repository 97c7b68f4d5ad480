//! Pipeline stage capability interface
//!
//! A stage is one unit of a composable processing pipeline. Stages are
//! chained: a stage may hold the next stage down and invoke it from its own
//! `learn`/`predict`. The tracing interceptor wraps this trait and must
//! preserve the full capability surface of whatever it wraps.

use crate::label::LabelKind;
use crate::prediction::PredictionKind;
use crate::record::Record;
use anyhow::{bail, Result};

/// A single record or an ordered batch handed to a stage
#[derive(Debug)]
pub enum StageInput<'a> {
    Single(&'a mut Record),
    Batch(&'a mut [Record]),
}

impl StageInput<'_> {
    /// Reborrow the input so it can be forwarded to a wrapped stage while
    /// the caller keeps its own borrow for snapshotting afterwards
    pub fn reborrow(&mut self) -> StageInput<'_> {
        match self {
            StageInput::Single(record) => StageInput::Single(record),
            StageInput::Batch(records) => StageInput::Batch(records),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, StageInput::Batch(_))
    }

    pub fn record_count(&self) -> usize {
        match self {
            StageInput::Single(_) => 1,
            StageInput::Batch(records) => records.len(),
        }
    }

    /// Iterate the records in order
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        match self {
            StageInput::Single(record) => std::slice::from_ref(&**record).iter(),
            StageInput::Batch(records) => records.iter(),
        }
    }

    /// The record whose prediction stands for the whole input: the single
    /// record, or the first element of a batch
    pub fn primary(&self) -> Option<&Record> {
        match self {
            StageInput::Single(record) => Some(&**record),
            StageInput::Batch(records) => records.first(),
        }
    }
}

/// Capability interface consumed by the interceptor and the pipeline driver
pub trait Stage {
    /// Stage name, used for trace nodes and double-wrap detection
    fn name(&self) -> &str;

    /// Whether this stage consumes batches rather than single records
    fn is_batch_oriented(&self) -> bool;

    /// Label kind this stage expects on input records
    fn input_label_kind(&self) -> LabelKind;

    /// Prediction kind this stage writes on output
    fn output_prediction_kind(&self) -> PredictionKind;

    /// Whether `learn` leaves a usable prediction on the record, making a
    /// separate `predict` pass unnecessary
    fn learn_returns_prediction(&self) -> bool {
        false
    }

    fn learn(&mut self, input: StageInput<'_>) -> Result<()>;

    fn predict(&mut self, input: StageInput<'_>) -> Result<()>;

    /// The next stage down the chain, if any
    fn base(&self) -> Option<&dyn Stage> {
        None
    }

    fn base_mut(&mut self) -> Option<&mut dyn Stage> {
        None
    }

    /// Whether this stage registers a finalization handler
    fn has_finalizer(&self) -> bool {
        false
    }

    /// Per-invocation finalization (statistics update and similar).
    /// Only invoked when [`Stage::has_finalizer`] returns true.
    fn finalize(&mut self, _input: StageInput<'_>) -> Result<()> {
        Ok(())
    }
}

/// Walk the stage chain until a finalization handler is found
///
/// Finalization falls through to the next stage down when a stage does not
/// register its own handler. The chain is explicit: running off the end
/// with no handler registered anywhere is a fatal assembly error, as is
/// crossing a batch/single-record boundary on the way down.
pub fn finalize_chain(stage: &mut dyn Stage, input: StageInput<'_>) -> Result<()> {
    if stage.has_finalizer() {
        return stage.finalize(input);
    }

    let batch_oriented = stage.is_batch_oriented();
    match stage.base_mut() {
        Some(base) => {
            if base.is_batch_oriented() != batch_oriented {
                bail!("cannot forward finalization across a batch/single-record boundary");
            }
            finalize_chain(base, input)
        }
        None => bail!("no finalization handler registered in the stage chain"),
    }
}
