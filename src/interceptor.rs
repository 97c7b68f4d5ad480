//! Tracing interceptor
//!
//! Wraps any stage with an identically shaped stage that records one debug
//! tree node per invocation before forwarding the call. The pipeline
//! assembler inserts one interceptor immediately after every stage when
//! tracing is enabled, so the resulting tree mirrors the stage chain.

use crate::debug_tree::{DebugNode, Observed, SharedNode, StageFunction, TracerHandle};
use crate::label::LabelKind;
use crate::prediction::{Prediction, PredictionKind};
use crate::record::Record;
use crate::stage::{Stage, StageInput};
use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Suffix appended to the wrapped stage's name
pub const TRACE_NAME_SUFFIX: &str = "-trace";

/// Wrap a stage with a tracing interceptor
///
/// Declines to wrap (returns the stage unchanged) when the stage's name
/// already marks it as an instrumentation wrapper, preventing double
/// instrumentation.
pub fn wrap_stage(stage: Box<dyn Stage>, tracer: &TracerHandle) -> Box<dyn Stage> {
    if stage.name().contains("trace") {
        tracing::debug!(stage = stage.name(), "declining to wrap instrumented stage");
        return stage;
    }
    let name = format!("{}{}", stage.name(), TRACE_NAME_SUFFIX);
    Box::new(TraceInterceptor {
        name,
        inner: stage,
        tracer: Rc::clone(tracer),
    })
}

/// Render one interaction term: printable namespace bytes as characters,
/// everything else as a `\xHH` escape
pub fn interaction_to_string(term: &[u8]) -> String {
    let mut out = String::with_capacity(term.len());
    for &ns in term {
        if (32..=126).contains(&ns) {
            out.push(ns as char);
        } else {
            out.push_str(&format!("\\x{ns:x}"));
        }
    }
    out
}

fn render_interactions(record: &Record) -> Vec<String> {
    match &record.interactions {
        Some(set) => set.terms.iter().map(|t| interaction_to_string(t)).collect(),
        None => Vec::new(),
    }
}

fn observe<T>(input: &StageInput<'_>, f: impl Fn(&Record) -> T) -> Observed<T> {
    match input {
        StageInput::Single(record) => Observed::Single(f(&**record)),
        StageInput::Batch(records) => Observed::PerRecord(records.iter().map(|r| f(r)).collect()),
    }
}

/// A stage that performs debug tree bookkeeping around a wrapped stage
pub struct TraceInterceptor {
    name: String,
    inner: Box<dyn Stage>,
    tracer: TracerHandle,
}

impl TraceInterceptor {
    fn traced_call(&mut self, function: StageFunction, mut input: StageInput<'_>) -> Result<()> {
        let overall_start = Instant::now();
        let node: SharedNode = Rc::new(RefCell::new(DebugNode {
            name: self.inner.name().to_string(),
            function,
            is_batch: input.is_batch(),
            record_count: input.record_count(),
            input_labels: observe(&input, |r| r.label.clone()),
            output_prediction: Prediction::None,
            weight: observe(&input, |r| r.weight),
            partial_prediction: observe(&input, |r| r.partial_prediction),
            updated_prediction: observe(&input, |r| r.updated_prediction),
            offset: observe(&input, |r| r.offset),
            interactions: observe(&input, render_interactions),
            overall_start,
            start: overall_start,
            end: overall_start,
            overall_end: overall_start,
            children: Vec::new(),
        }));

        let pushed = {
            let mut tracer = self.tracer.borrow_mut();
            tracer.attach(&node);
            let push = tracer.should_push(self.inner.name());
            if push {
                tracer.push(Rc::clone(&node));
            }
            push
        };

        node.borrow_mut().start = Instant::now();
        let result = match function {
            StageFunction::Learn => self.inner.learn(input.reborrow()),
            StageFunction::Predict => self.inner.predict(input.reborrow()),
        };
        {
            let mut node = node.borrow_mut();
            node.end = Instant::now();
            node.output_prediction = input
                .primary()
                .map(|r| r.prediction.clone())
                .unwrap_or_default();
            node.updated_prediction = observe(&input, |r| r.updated_prediction);
            node.partial_prediction = observe(&input, |r| r.partial_prediction);
        }

        if pushed {
            self.tracer.borrow_mut().pop();
        }
        node.borrow_mut().overall_end = Instant::now();

        result
    }
}

impl Stage for TraceInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_batch_oriented(&self) -> bool {
        self.inner.is_batch_oriented()
    }

    fn input_label_kind(&self) -> LabelKind {
        self.inner.input_label_kind()
    }

    fn output_prediction_kind(&self) -> PredictionKind {
        self.inner.output_prediction_kind()
    }

    fn learn_returns_prediction(&self) -> bool {
        self.inner.learn_returns_prediction()
    }

    fn learn(&mut self, input: StageInput<'_>) -> Result<()> {
        self.traced_call(StageFunction::Learn, input)
    }

    fn predict(&mut self, input: StageInput<'_>) -> Result<()> {
        self.traced_call(StageFunction::Predict, input)
    }

    fn base(&self) -> Option<&dyn Stage> {
        Some(self.inner.as_ref())
    }

    fn base_mut(&mut self) -> Option<&mut dyn Stage> {
        Some(self.inner.as_mut())
    }
}
