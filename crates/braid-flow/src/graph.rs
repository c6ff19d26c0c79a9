use std::collections::HashMap;

use serde::Serialize;

use braid_core::{Action, BraidError, Params, Result};

use crate::async_node::{AsyncBatchNode, AsyncNode, AsyncParallelBatchNode};
use crate::flow::Flow;
use crate::node::{BatchNode, Node};

/// Index of a registered node in a flow's arena.
///
/// Nodes are arena-addressed and edges are kept in a `(NodeId, Action)`
/// table, so cyclic graphs need no cross-references between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A registered node of any kind.
///
/// The flow walk dispatches on the kind: blocking flows accept only the
/// blocking kinds, async flows accept all five.
pub enum GraphNode {
    Blocking(Box<dyn Node>),
    Batch(Box<dyn BatchNode>),
    Async(Box<dyn AsyncNode>),
    AsyncBatch(Box<dyn AsyncBatchNode>),
    AsyncParallelBatch(Box<dyn AsyncParallelBatchNode>),
}

impl GraphNode {
    pub fn name(&self) -> &str {
        match self {
            GraphNode::Blocking(n) => n.name(),
            GraphNode::Batch(n) => n.name(),
            GraphNode::Async(n) => n.name(),
            GraphNode::AsyncBatch(n) => n.name(),
            GraphNode::AsyncParallelBatch(n) => n.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GraphNode::Blocking(_) => "node",
            GraphNode::Batch(_) => "batch",
            GraphNode::Async(_) => "async",
            GraphNode::AsyncBatch(_) => "async_batch",
            GraphNode::AsyncParallelBatch(_) => "async_parallel_batch",
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(
            self,
            GraphNode::Async(_) | GraphNode::AsyncBatch(_) | GraphNode::AsyncParallelBatch(_)
        )
    }
}

pub(crate) struct Registered {
    pub(crate) node: GraphNode,
    pub(crate) params: Params,
}

/// Builds a [`Flow`] with explicit wiring calls: register nodes (binding
/// their params), mark the start node, connect `(node, action)` pairs to
/// successors, then `build`.
#[derive(Default)]
pub struct FlowBuilder {
    nodes: Vec<Registered>,
    edges: HashMap<(NodeId, Action), NodeId>,
    start: Option<NodeId>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blocking node.
    pub fn add_node(&mut self, node: impl Node + 'static, params: Params) -> NodeId {
        self.push(GraphNode::Blocking(Box::new(node)), params)
    }

    /// Register a blocking batch node.
    pub fn add_batch_node(&mut self, node: impl BatchNode + 'static, params: Params) -> NodeId {
        self.push(GraphNode::Batch(Box::new(node)), params)
    }

    /// Register an async node.
    pub fn add_async_node(&mut self, node: impl AsyncNode + 'static, params: Params) -> NodeId {
        self.push(GraphNode::Async(Box::new(node)), params)
    }

    /// Register an async batch node (sequential items).
    pub fn add_async_batch_node(
        &mut self,
        node: impl AsyncBatchNode + 'static,
        params: Params,
    ) -> NodeId {
        self.push(GraphNode::AsyncBatch(Box::new(node)), params)
    }

    /// Register an async batch node whose items run concurrently.
    pub fn add_async_parallel_batch_node(
        &mut self,
        node: impl AsyncParallelBatchNode + 'static,
        params: Params,
    ) -> NodeId {
        self.push(GraphNode::AsyncParallelBatch(Box::new(node)), params)
    }

    fn push(&mut self, node: GraphNode, params: Params) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Registered { node, params });
        id
    }

    /// Mark the entry node.
    pub fn start(&mut self, id: NodeId) -> &mut Self {
        self.start = Some(id);
        self
    }

    /// Register an edge. Reconnecting an existing `(node, action)` pair
    /// replaces the previous successor.
    pub fn connect(&mut self, from: NodeId, action: impl Into<Action>, to: NodeId) -> &mut Self {
        self.edges.insert((from, action.into()), to);
        self
    }

    /// Register the edge taken for the default action.
    pub fn connect_default(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.connect(from, Action::Default, to)
    }

    /// Validate the wiring and produce the flow.
    pub fn build(self) -> Result<Flow> {
        let start = self.start.ok_or(BraidError::StartNotSet)?;
        let registered = self.nodes.len();
        if start.0 >= registered {
            return Err(BraidError::NodeNotFound(start.0));
        }
        for ((from, _), to) in &self.edges {
            if from.0 >= registered {
                return Err(BraidError::NodeNotFound(from.0));
            }
            if to.0 >= registered {
                return Err(BraidError::NodeNotFound(to.0));
            }
        }
        Ok(Flow {
            nodes: self.nodes,
            edges: self.edges,
            start,
        })
    }
}

/// Serializable snapshot of a flow graph, for debugging.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDescription {
    pub start: usize,
    pub nodes: Vec<NodeDescription>,
    pub edges: Vec<EdgeDescription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDescription {
    pub id: usize,
    pub name: String,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeDescription {
    pub from: usize,
    pub action: Action,
    pub to: usize,
}
