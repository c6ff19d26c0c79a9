//! Flow engine — graph-based workflow execution.
//!
//! A flow is a directed graph of nodes connected by action-labeled edges.
//! Each node runs a three-phase lifecycle (prepare, execute with retry,
//! decide-next); the action returned by the decision step selects the
//! outgoing edge, and the walk ends the first time no edge matches. Batch
//! variants run a node's execute step once per item, or a whole flow once
//! per parameter set, sequentially or concurrently.
//!
//! Nodes come in blocking and cooperative (async) kinds. A blocking
//! [`Flow`] accepts only blocking kinds; an [`AsyncFlow`] walks graphs
//! mixing both, awaiting async lifecycles and calling blocking ones
//! directly in one linear order of steps.

pub mod async_flow;
pub mod async_node;
pub mod batch;
pub mod flow;
pub mod graph;
pub mod node;

pub use async_flow::AsyncFlow;
pub use async_node::{AsyncBatchNode, AsyncNode, AsyncParallelBatchNode};
pub use batch::{fixed_params, AsyncBatchFlow, AsyncParallelBatchFlow, BatchFlow, ParamSource};
pub use flow::{Flow, FlowReport, StepReport};
pub use graph::{FlowBuilder, GraphDescription, GraphNode, NodeId};
pub use node::{BatchNode, Node, RetryPolicy};
