// src/error.rs
//
// Construction-time failures surfaced to callers.
//
// Runtime scheduling anomalies (bad suspensions, negative delays) are NOT
// errors: the scheduler logs and counts them, see `SchedulerStats`.

use crate::graph::NodeId;

/// Error building a route between two nodes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No default policy covers this pair of arities.
    #[error("cannot guess a default route from {source_arity} outputs to {target_arity} inputs")]
    NoDefaultRoute {
        source_arity: usize,
        target_arity: usize,
    },

    /// An explicit weight table whose rows differ in length.
    #[error("route weight table row {row} has {len} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        len: usize,
        expected: usize,
    },

    /// An explicit weight table with no rows or no columns.
    #[error("route weight table is empty")]
    EmptyMatrix,
}

/// Error manipulating or evaluating the node graph.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The node id does not exist (never added, or already removed).
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// A route whose shape does not match the two nodes it connects.
    #[error(
        "route shape {route_source}x{route_target} does not match {source_outputs} source outputs and {target_inputs} target inputs"
    )]
    ShapeMismatch {
        route_source: usize,
        route_target: usize,
        source_outputs: usize,
        target_inputs: usize,
    },

    /// A node was connected to itself.
    #[error("node {0:?} cannot be its own source")]
    SelfLoop(NodeId),

    /// Pull evaluation reached a node that is already being computed.
    #[error("cycle detected while pulling node {0:?}")]
    Cycle(NodeId),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Error driving the engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An interleaved buffer whose length is not `frames * channels`.
    #[error("buffer of {len} samples does not hold whole frames of {channels} channels")]
    FrameMismatch { len: usize, channels: usize },

    /// Input and output buffers describe a different number of frames.
    #[error("input holds {input_frames} frames but output holds {output_frames}")]
    FrameCountMismatch {
        input_frames: usize,
        output_frames: usize,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

pub type EngineResult<T> = Result<T, EngineError>;
