//! Debug tree nodes and tracer state
//!
//! Each traced stage invocation is recorded as one `DebugNode` holding the
//! label/prediction/weight/offset state observed at entry and exit, plus
//! four timestamps. The four timestamps bracket the node twice: the outer
//! pair includes this node's own bookkeeping, the inner pair only the
//! wrapped call. Nested stage invocations attach as children, so the tree
//! reconstructs the full call chain of one top-level `learn`/`predict`.
//!
//! Three durations are derived lazily from the timestamps:
//! - self time: the stage's own logic, excluding nested stages
//! - debug time: tracer overhead of this node and all descendants
//! - overall time: wall clock with tracer overhead subtracted recursively

use crate::label::Label;
use crate::prediction::Prediction;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Which stage entry point an invocation went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFunction {
    Learn,
    Predict,
}

impl StageFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageFunction::Learn => "learn",
            StageFunction::Predict => "predict",
        }
    }
}

/// A value observed on a single record, or one value per record of a batch
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Observed<T> {
    Single(T),
    PerRecord(Vec<T>),
}

/// Shared handle to a debug tree node
///
/// Nodes are attached to their parent and simultaneously referenced from
/// the tracer's active stack while they run, so ownership is shared. The
/// model is strictly single-threaded.
pub type SharedNode = Rc<RefCell<DebugNode>>;

/// One recorded stage invocation
#[derive(Debug, Clone)]
pub struct DebugNode {
    pub name: String,
    pub function: StageFunction,
    pub is_batch: bool,
    pub record_count: usize,
    pub input_labels: Observed<Label>,
    pub output_prediction: Prediction,
    pub weight: Observed<f32>,
    pub partial_prediction: Observed<f32>,
    pub updated_prediction: Observed<f32>,
    pub offset: Observed<u64>,
    /// Interaction terms rendered as printable strings, per record
    pub interactions: Observed<Vec<String>>,
    pub overall_start: Instant,
    pub start: Instant,
    pub end: Instant,
    pub overall_end: Instant,
    pub children: Vec<SharedNode>,
}

impl DebugNode {
    /// Time spent in this stage's own logic, excluding every direct
    /// child's full interval (which includes the child's tracer overhead)
    pub fn self_time(&self) -> Duration {
        let mut time = self.end - self.start;
        for child in &self.children {
            let child = child.borrow();
            time = time.saturating_sub(child.overall_end - child.overall_start);
        }
        time
    }

    /// Cumulative tracer overhead contributed by this node and all
    /// descendants
    pub fn debug_time(&self) -> Duration {
        let mut time = (self.overall_end - self.overall_start).saturating_sub(self.end - self.start);
        for child in &self.children {
            time += child.borrow().debug_time();
        }
        time
    }

    /// Wall-clock time attributable to real pipeline work under this node,
    /// with tracer overhead subtracted out recursively
    pub fn overall_time(&self) -> Duration {
        (self.overall_end - self.overall_start).saturating_sub(self.debug_time())
    }
}

/// Mutable tracer state for one pipeline instance
///
/// Holds the stack of currently open invocations and the root of the most
/// recently completed trace. The stack must be empty and the root drained
/// before every top-level invocation; [`TracerState::take_root`] performs
/// the drain-and-reset in one step and is the caller's sole cleanup
/// responsibility.
#[derive(Debug, Default)]
pub struct TracerState {
    active: Vec<SharedNode>,
    root: Option<SharedNode>,
}

/// Shared handle to a pipeline instance's tracer state
pub type TracerHandle = Rc<RefCell<TracerState>>;

impl TracerState {
    pub fn new() -> Self {
        TracerState::default()
    }

    /// Attach a node to the current top of the stack, or install it as the
    /// trace root when the stack is empty
    pub(crate) fn attach(&mut self, node: &SharedNode) {
        match self.active.last() {
            Some(top) => top.borrow_mut().children.push(Rc::clone(node)),
            None => self.root = Some(Rc::clone(node)),
        }
    }

    /// Re-entrancy collapsing rule: a new invocation of the stage already
    /// on top of the stack is treated as a continuation of that stage, not
    /// a new nesting level, so no frame is pushed for it.
    ///
    /// The comparison is by stage name only; two distinct same-named
    /// invocations at different feature offsets merge into one frame. This
    /// is a known approximation.
    /// TODO: collapse by (name, offset) identity instead of name alone.
    pub(crate) fn should_push(&self, name: &str) -> bool {
        match self.active.last() {
            Some(top) => top.borrow().name != name,
            None => true,
        }
    }

    pub(crate) fn push(&mut self, node: SharedNode) {
        self.active.push(node);
    }

    pub(crate) fn pop(&mut self) {
        self.active.pop();
    }

    /// Current open-invocation depth
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Root of the most recently completed trace, if any
    pub fn root(&self) -> Option<&SharedNode> {
        self.root.as_ref()
    }

    /// Drain the root and reset the stack
    ///
    /// Must be called between top-level invocations; failing to do so
    /// leaks trace state into the next invocation.
    pub fn take_root(&mut self) -> Option<SharedNode> {
        self.active.clear();
        self.root.take()
    }

    /// True when no trace state is held (the precondition for a top-level
    /// invocation)
    pub fn is_clean(&self) -> bool {
        self.active.is_empty() && self.root.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(base: Instant, offsets_us: [u64; 4]) -> DebugNode {
        DebugNode {
            name: "stage".to_string(),
            function: StageFunction::Learn,
            is_batch: false,
            record_count: 1,
            input_labels: Observed::Single(Label::None),
            output_prediction: Prediction::None,
            weight: Observed::Single(1.0),
            partial_prediction: Observed::Single(0.0),
            updated_prediction: Observed::Single(0.0),
            offset: Observed::Single(0),
            interactions: Observed::Single(Vec::new()),
            overall_start: base + Duration::from_micros(offsets_us[0]),
            start: base + Duration::from_micros(offsets_us[1]),
            end: base + Duration::from_micros(offsets_us[2]),
            overall_end: base + Duration::from_micros(offsets_us[3]),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_leaf_timing() {
        let base = Instant::now();
        // 2us of bookkeeping on each side of a 10us call
        let node = node_at(base, [0, 2, 12, 14]);

        assert_eq!(node.self_time(), Duration::from_micros(10));
        assert_eq!(node.overall_time(), Duration::from_micros(10));
        assert_eq!(node.debug_time(), Duration::from_micros(4));
    }

    #[test]
    fn test_parent_with_one_child() {
        let base = Instant::now();
        let mut parent = node_at(base, [0, 2, 30, 32]);
        // Child fully inside the parent's [start, end]: 4us of overhead
        // around a 16us call.
        let child = node_at(base, [4, 6, 22, 26]);
        parent.children.push(Rc::new(RefCell::new(child)));

        // (30-2) minus the child's full 22us interval
        assert_eq!(parent.self_time(), Duration::from_micros(6));
        // parent overhead 4us + child overhead 6us
        assert_eq!(parent.debug_time(), Duration::from_micros(10));
        // 32us wall clock minus 10us accumulated overhead
        assert_eq!(parent.overall_time(), Duration::from_micros(22));
    }

    #[test]
    fn test_self_time_never_negative() {
        let base = Instant::now();
        let mut parent = node_at(base, [0, 1, 5, 6]);
        // Child interval larger than the parent's inner window
        let child = node_at(base, [0, 1, 9, 10]);
        parent.children.push(Rc::new(RefCell::new(child)));

        assert_eq!(parent.self_time(), Duration::ZERO);
    }

    #[test]
    fn test_tracer_state_attach_and_collapse() {
        let base = Instant::now();
        let mut state = TracerState::new();
        assert!(state.is_clean());

        let root = Rc::new(RefCell::new(node_at(base, [0, 0, 0, 0])));
        root.borrow_mut().name = "outer".to_string();
        state.attach(&root);
        assert!(state.should_push("outer"));
        state.push(Rc::clone(&root));
        assert_eq!(state.depth(), 1);

        // Same name on top: collapse, no push
        assert!(!state.should_push("outer"));
        // Different name: push
        assert!(state.should_push("inner"));

        let child = Rc::new(RefCell::new(node_at(base, [0, 0, 0, 0])));
        state.attach(&child);
        assert_eq!(root.borrow().children.len(), 1);

        state.pop();
        assert_eq!(state.depth(), 0);
        assert!(state.root().is_some());
    }

    #[test]
    fn test_take_root_resets_state() {
        let base = Instant::now();
        let mut state = TracerState::new();
        let node = Rc::new(RefCell::new(node_at(base, [0, 0, 0, 0])));
        state.attach(&node);
        state.push(node);

        let root = state.take_root();
        assert!(root.is_some());
        assert!(state.is_clean());
        assert!(state.take_root().is_none());
    }
}
