//! JSON output format for completed trace trees
//!
//! Serializes a drained debug tree into a stable JSON shape a host can
//! inspect or archive. Durations are reported in nanoseconds with tracer
//! overhead already attributed per node.

use crate::debug_tree::{DebugNode, Observed, SharedNode};
use crate::label::Label;
use crate::prediction::Prediction;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One node of the serialized trace tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTraceNode {
    /// Stage name (without the interceptor suffix)
    pub name: String,
    /// "learn" or "predict"
    pub function: String,
    pub is_batch: bool,
    pub record_count: usize,
    pub input_labels: Observed<Label>,
    pub output_prediction: Prediction,
    pub weight: Observed<f32>,
    pub partial_prediction: Observed<f32>,
    pub updated_prediction: Observed<f32>,
    pub offset: Observed<u64>,
    pub interactions: Observed<Vec<String>>,
    /// Time in the stage's own logic, nanoseconds
    pub self_time_ns: u64,
    /// Wall-clock time minus tracer overhead, nanoseconds
    pub overall_time_ns: u64,
    /// Tracer overhead for this node and descendants, nanoseconds
    pub debug_time_ns: u64,
    pub children: Vec<JsonTraceNode>,
}

/// Convert a debug tree into its serializable form
pub fn to_json_node(node: &DebugNode) -> JsonTraceNode {
    JsonTraceNode {
        name: node.name.clone(),
        function: node.function.as_str().to_string(),
        is_batch: node.is_batch,
        record_count: node.record_count,
        input_labels: node.input_labels.clone(),
        output_prediction: node.output_prediction.clone(),
        weight: node.weight.clone(),
        partial_prediction: node.partial_prediction.clone(),
        updated_prediction: node.updated_prediction.clone(),
        offset: node.offset.clone(),
        interactions: node.interactions.clone(),
        self_time_ns: node.self_time().as_nanos() as u64,
        overall_time_ns: node.overall_time().as_nanos() as u64,
        debug_time_ns: node.debug_time().as_nanos() as u64,
        children: node
            .children
            .iter()
            .map(|child| to_json_node(&child.borrow()))
            .collect(),
    }
}

/// Serialize a drained trace root to pretty-printed JSON
pub fn trace_to_json(root: &SharedNode) -> Result<String> {
    let tree = to_json_node(&root.borrow());
    Ok(serde_json::to_string_pretty(&tree)?)
}
