//! Pipeline assembly and top-level entry points
//!
//! A `Pipeline` owns one assembled stage chain together with the context
//! that used to be process-global in older designs: the record pool and the
//! tracer state. Every entry point brackets the stage invocation with
//! record setup/unsetup so callers never observe the pipeline-internal
//! index layout.

use crate::debug_tree::{SharedNode, TracerHandle, TracerState};
use crate::interceptor::wrap_stage;
use crate::label::LabelKind;
use crate::prediction::Prediction;
use crate::record::{InteractionSet, Record};
use crate::record_pool::{PoolStats, RecordPool, RecordPoolConfig};
use crate::setup::{setup_batch, setup_record, unsetup_batch, unsetup_record};
use crate::stage::{finalize_chain, Stage, StageInput};
use anyhow::{bail, ensure, Result};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Static configuration shared by every record bracket of one pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of interleaved weight vectors across stacked stages
    pub total_feature_width: u32,
    /// Per-weight stride, as a shift amount
    pub stride_shift: u32,
    /// Whether setup injects the synthetic bias feature
    pub add_bias: bool,
    /// Label kind the innermost stage expects
    pub label_kind: LabelKind,
    /// Interaction set attached to records inside a bracket
    pub interactions: Arc<InteractionSet>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            total_feature_width: 1,
            stride_shift: 0,
            add_bias: true,
            label_kind: LabelKind::Simple,
            interactions: Arc::new(InteractionSet::default()),
        }
    }
}

impl PipelineConfig {
    /// Index-expansion factor applied during setup
    pub fn multiplier(&self) -> u64 {
        u64::from(self.total_feature_width) << self.stride_shift
    }
}

/// Constructor for one stage, receiving the stage below it in the chain
pub type StageCtor = Box<dyn FnOnce(Option<Box<dyn Stage>>) -> Result<Box<dyn Stage>>>;

/// Assembles a stage chain from the innermost stage outward
///
/// When tracing is enabled, every constructed stage is wrapped with the
/// tracing interceptor before the next stage is stacked on top, placing an
/// interceptor immediately after every stage of the chain.
pub struct PipelineBuilder {
    config: PipelineConfig,
    pool_config: RecordPoolConfig,
    stages: Vec<StageCtor>,
    trace_enabled: bool,
    input_extension: Option<String>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        PipelineBuilder {
            config,
            pool_config: RecordPoolConfig::default(),
            stages: Vec::new(),
            trace_enabled: false,
            input_extension: None,
        }
    }

    /// Stack a stage on top of the chain built so far
    pub fn push_stage(
        mut self,
        ctor: impl FnOnce(Option<Box<dyn Stage>>) -> Result<Box<dyn Stage>> + 'static,
    ) -> Self {
        self.stages.push(Box::new(ctor));
        self
    }

    /// Enable per-stage tracing for this pipeline instance
    pub fn enable_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// Register a custom input extension by name
    ///
    /// The extension occupies the same instrumentation slot the tracer
    /// needs, so it cannot be combined with tracing.
    pub fn with_input_extension(mut self, name: impl Into<String>) -> Self {
        self.input_extension = Some(name.into());
        self
    }

    pub fn with_pool_config(mut self, pool_config: RecordPoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        if self.trace_enabled {
            if let Some(extension) = &self.input_extension {
                bail!(
                    "tracing cannot be enabled alongside input extension '{extension}': \
                     both occupy the pipeline's instrumentation slot"
                );
            }
        }
        ensure!(!self.stages.is_empty(), "pipeline requires at least one stage");

        let tracer: Option<TracerHandle> = self
            .trace_enabled
            .then(|| Rc::new(RefCell::new(TracerState::new())));

        let mut stage: Option<Box<dyn Stage>> = None;
        for ctor in self.stages {
            let mut built = ctor(stage.take())?;
            if let Some(tracer) = &tracer {
                built = wrap_stage(built, tracer);
            }
            stage = Some(built);
        }
        let stage = stage.expect("stage chain is non-empty");

        tracing::debug!(
            stage = stage.name(),
            trace = self.trace_enabled,
            "assembled pipeline"
        );

        Ok(Pipeline {
            config: self.config,
            stage,
            tracer,
            pool: RecordPool::new(self.pool_config),
        })
    }
}

/// One assembled pipeline instance with its pool and tracer state
///
/// `Debug` is implemented manually because `Box<dyn Stage>` has no `Debug`
/// bound; only the stage name and tracer presence are shown.
pub struct Pipeline {
    config: PipelineConfig,
    stage: Box<dyn Stage>,
    tracer: Option<TracerHandle>,
    pool: RecordPool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stage", &self.stage.name())
            .field("trace_enabled", &self.tracer.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_batch_oriented(&self) -> bool {
        self.stage.is_batch_oriented()
    }

    pub fn trace_enabled(&self) -> bool {
        self.tracer.is_some()
    }

    /// Acquire a cleared record from this pipeline's pool
    pub fn acquire_record(&mut self) -> Record {
        self.pool.acquire()
    }

    /// Clear a record and return it to this pipeline's pool
    pub fn release_record(&mut self, record: Record) {
        self.pool.release(record);
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Learn from a single record
    pub fn learn_one(&mut self, record: &mut Record) -> Result<()> {
        ensure!(
            !self.stage.is_batch_oriented(),
            "pipeline is batch-oriented; use learn_batch"
        );
        setup_record(&self.config, record)?;
        let result = self
            .stage
            .learn(StageInput::Single(&mut *record))
            .and_then(|()| finalize_chain(self.stage.as_mut(), StageInput::Single(&mut *record)));
        let unsetup = unsetup_record(&self.config, record);
        result?;
        unsetup?;
        Ok(())
    }

    /// Predict on a single record, returning the output prediction
    pub fn predict_one(&mut self, record: &mut Record) -> Result<Prediction> {
        ensure!(
            !self.stage.is_batch_oriented(),
            "pipeline is batch-oriented; use predict_batch"
        );
        setup_record(&self.config, record)?;
        let result = self
            .stage
            .predict(StageInput::Single(&mut *record))
            .and_then(|()| finalize_chain(self.stage.as_mut(), StageInput::Single(&mut *record)));
        // Capture before unsetup resets the prediction.
        let prediction = record.prediction.clone();
        let unsetup = unsetup_record(&self.config, record);
        result?;
        unsetup?;
        Ok(prediction)
    }

    /// Predict then learn in one bracket
    ///
    /// When the stage chain reports that `learn` leaves a usable
    /// prediction, the separate predict pass is skipped.
    pub fn predict_then_learn_one(&mut self, record: &mut Record) -> Result<Prediction> {
        ensure!(
            !self.stage.is_batch_oriented(),
            "pipeline is batch-oriented; use batch entry points"
        );
        setup_record(&self.config, record)?;
        let result = if self.stage.learn_returns_prediction() {
            self.stage.learn(StageInput::Single(&mut *record))
        } else {
            self.stage
                .predict(StageInput::Single(&mut *record))
                .and_then(|()| self.stage.learn(StageInput::Single(&mut *record)))
        }
        .and_then(|()| finalize_chain(self.stage.as_mut(), StageInput::Single(&mut *record)));
        let prediction = record.prediction.clone();
        let unsetup = unsetup_record(&self.config, record);
        result?;
        unsetup?;
        Ok(prediction)
    }

    /// Learn from one multi-record logical example
    pub fn learn_batch(&mut self, records: &mut [Record]) -> Result<()> {
        ensure!(
            self.stage.is_batch_oriented(),
            "pipeline is single-record; use learn_one"
        );
        ensure!(!records.is_empty(), "batch must contain at least one record");
        setup_batch(&self.config, records)?;
        let result = self
            .stage
            .learn(StageInput::Batch(&mut *records))
            .and_then(|()| finalize_chain(self.stage.as_mut(), StageInput::Batch(&mut *records)));
        let unsetup = unsetup_batch(&self.config, records);
        result?;
        unsetup?;
        Ok(())
    }

    /// Predict on one multi-record logical example
    ///
    /// The first record's prediction stands for the whole batch.
    pub fn predict_batch(&mut self, records: &mut [Record]) -> Result<Prediction> {
        ensure!(
            self.stage.is_batch_oriented(),
            "pipeline is single-record; use predict_one"
        );
        ensure!(!records.is_empty(), "batch must contain at least one record");
        setup_batch(&self.config, records)?;
        let result = self
            .stage
            .predict(StageInput::Batch(&mut *records))
            .and_then(|()| finalize_chain(self.stage.as_mut(), StageInput::Batch(&mut *records)));
        let prediction = records[0].prediction.clone();
        let unsetup = unsetup_batch(&self.config, records);
        result?;
        unsetup?;
        Ok(prediction)
    }

    /// Drain the root of the most recent trace and reset tracer state
    ///
    /// Returns `None` when tracing is disabled or no traced invocation has
    /// completed since the last drain. Must be called between traced
    /// top-level invocations to avoid leaking trace state into the next
    /// one.
    pub fn take_trace(&mut self) -> Option<SharedNode> {
        self.tracer
            .as_ref()
            .and_then(|tracer| tracer.borrow_mut().take_root())
    }
}
