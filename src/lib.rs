//! Reductrace - reduction-stack tracer and record lifecycle manager
//!
//! This library provides the core instrumentation layer for composable
//! learning pipelines: a pooled record lifecycle (acquire, setup, unsetup,
//! release), a tracing interceptor that can be inserted between every stage
//! of a dynamically assembled pipeline, and the call-tree model used to
//! attribute wall-clock time to individual stages.

pub mod debug_tree;
pub mod interceptor;
pub mod json_output;
pub mod label;
pub mod pipeline;
pub mod prediction;
pub mod record;
pub mod record_pool;
pub mod setup;
pub mod stage;
