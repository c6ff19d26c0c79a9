use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info};

use braid_core::{Action, BraidError, Context, Params, Result};

use crate::graph::{EdgeDescription, GraphDescription, GraphNode, NodeDescription, NodeId, Registered};

/// Record of one node lifecycle within a flow run.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub node: String,
    pub kind: &'static str,
    pub action: Action,
    pub elapsed_ms: u64,
}

/// Record of a completed flow run, in step order.
///
/// Produced only for runs that finish; a failing lifecycle aborts the run
/// and the original error propagates instead.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub steps: Vec<StepReport>,
    /// The action that had no registered edge and ended the walk.
    pub last_action: Action,
    pub elapsed_ms: u64,
}

/// A directed graph of nodes connected by action-labeled edges.
///
/// A run walks the graph from the start node. Each step is one full node
/// lifecycle; the action it returns selects the outgoing edge, and the
/// walk ends the first time the action has no registered edge. Cycles are
/// permitted and no step limit is imposed; bounding loops is the caller's
/// responsibility.
pub struct Flow {
    pub(crate) nodes: Vec<Registered>,
    pub(crate) edges: HashMap<(NodeId, Action), NodeId>,
    pub(crate) start: NodeId,
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field(
                "nodes",
                &self
                    .nodes
                    .iter()
                    .map(|r| (r.node.name(), r.node.kind()))
                    .collect::<Vec<_>>(),
            )
            .field("edges", &self.edges)
            .field("start", &self.start)
            .finish()
    }
}

impl Flow {
    /// Run the graph to completion against `ctx`.
    ///
    /// Blocking kinds only: encountering an async node aborts with
    /// [`BraidError::AsyncNodeInBlockingFlow`]. Use
    /// [`AsyncFlow`](crate::AsyncFlow) for mixed graphs.
    pub fn run(&self, ctx: &mut Context) -> Result<FlowReport> {
        self.run_with(ctx, None)
    }

    pub(crate) fn run_with(&self, ctx: &mut Context, extra: Option<&Params>) -> Result<FlowReport> {
        let started = Instant::now();
        let mut steps = Vec::new();
        let mut current = self.start;

        loop {
            let entry = &self.nodes[current.0];
            let params = effective_params(&entry.params, extra);
            let step_started = Instant::now();

            info!(node = entry.node.name(), kind = entry.node.kind(), "step start");
            let action = match &entry.node {
                GraphNode::Blocking(node) => node.run(ctx, &params)?,
                GraphNode::Batch(node) => node.run(ctx, &params)?,
                other => {
                    return Err(BraidError::AsyncNodeInBlockingFlow(other.name().to_string()))
                }
            };

            steps.push(StepReport {
                node: entry.node.name().to_string(),
                kind: entry.node.kind(),
                action: action.clone(),
                elapsed_ms: step_started.elapsed().as_millis() as u64,
            });

            match self.edges.get(&(current, action.clone())) {
                Some(next) => current = *next,
                None => {
                    debug!(node = entry.node.name(), action = %action, "no edge registered, flow complete");
                    return Ok(FlowReport {
                        steps,
                        last_action: action,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
        }
    }

    /// Entry node of the graph.
    pub fn start_id(&self) -> NodeId {
        self.start
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serializable snapshot of the graph, for debugging.
    pub fn describe(&self) -> GraphDescription {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, entry)| NodeDescription {
                id,
                name: entry.node.name().to_string(),
                kind: entry.node.kind(),
            })
            .collect();

        let mut edges: Vec<EdgeDescription> = self
            .edges
            .iter()
            .map(|((from, action), to)| EdgeDescription {
                from: from.0,
                action: action.clone(),
                to: to.0,
            })
            .collect();
        edges.sort_by(|a, b| {
            (a.from, a.action.as_str(), a.to).cmp(&(b.from, b.action.as_str(), b.to))
        });

        GraphDescription {
            start: self.start.0,
            nodes,
            edges,
        }
    }
}

pub(crate) fn effective_params(bound: &Params, extra: Option<&Params>) -> Params {
    match extra {
        Some(extra) => bound.overlaid(extra),
        None => bound.clone(),
    }
}
