use std::time::Instant;

use tracing::{debug, info};

use braid_core::{Context, Params, Result};

use crate::flow::{effective_params, Flow, FlowReport, StepReport};
use crate::graph::{GraphDescription, GraphNode};

/// Walks a graph that may mix blocking and async node kinds.
///
/// Each encountered node is dispatched on its kind: async lifecycles are
/// awaited, blocking ones are called directly. Steps stay strictly linear
/// either way: the next node's lifecycle does not begin until the current
/// one fully resolves. A blocking node's retry wait stalls the executing
/// task; schedule such flows accordingly.
pub struct AsyncFlow {
    flow: Flow,
}

impl AsyncFlow {
    pub fn new(flow: Flow) -> Self {
        Self { flow }
    }

    /// Consume the wrapper, returning the underlying flow.
    pub fn into_inner(self) -> Flow {
        self.flow
    }

    /// Serializable snapshot of the graph, for debugging.
    pub fn describe(&self) -> GraphDescription {
        self.flow.describe()
    }

    /// Run the graph to completion against `ctx`.
    pub async fn run(&self, ctx: &mut Context) -> Result<FlowReport> {
        self.run_with(ctx, None).await
    }

    pub(crate) async fn run_with(
        &self,
        ctx: &mut Context,
        extra: Option<&Params>,
    ) -> Result<FlowReport> {
        let started = Instant::now();
        let mut steps = Vec::new();
        let mut current = self.flow.start;

        loop {
            let entry = &self.flow.nodes[current.0];
            let params = effective_params(&entry.params, extra);
            let step_started = Instant::now();

            info!(node = entry.node.name(), kind = entry.node.kind(), "step start");
            let action = match &entry.node {
                GraphNode::Blocking(node) => node.run(ctx, &params)?,
                GraphNode::Batch(node) => node.run(ctx, &params)?,
                GraphNode::Async(node) => node.run(ctx, &params).await?,
                GraphNode::AsyncBatch(node) => node.run(ctx, &params).await?,
                GraphNode::AsyncParallelBatch(node) => node.run_parallel(ctx, &params).await?,
            };

            steps.push(StepReport {
                node: entry.node.name().to_string(),
                kind: entry.node.kind(),
                action: action.clone(),
                elapsed_ms: step_started.elapsed().as_millis() as u64,
            });

            match self.flow.edges.get(&(current, action.clone())) {
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
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures::future::BoxFuture;
    use serde_json::Value;

    use braid_core::{Action, BraidError};

    use crate::graph::FlowBuilder;
    use crate::node::Node;
    use crate::AsyncNode;

    use super::*;

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct SleepyAsync {
        log: EventLog,
        delay: Duration,
    }

    impl AsyncNode for SleepyAsync {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn prepare<'a>(
            &'a self,
            _ctx: &'a mut Context,
            _params: &'a Params,
        ) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async { Ok(Value::Null) })
        }

        fn execute<'a>(
            &'a self,
            _prep: &'a Value,
            _params: &'a Params,
        ) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                self.log.lock().unwrap().push("sleepy:start".into());
                tokio::time::sleep(self.delay).await;
                self.log.lock().unwrap().push("sleepy:end".into());
                Ok(Value::Null)
            })
        }

        fn decide_next<'a>(
            &'a self,
            _ctx: &'a mut Context,
            _prep: &'a Value,
            _exec: &'a Value,
            _params: &'a Params,
        ) -> BoxFuture<'a, Result<Action>> {
            Box::pin(async { Ok(Action::Default) })
        }
    }

    struct LoggingBlocking {
        log: EventLog,
    }

    impl Node for LoggingBlocking {
        fn name(&self) -> &str {
            "blocking"
        }

        fn prepare(&self, _ctx: &mut Context, _params: &Params) -> Result<Value> {
            self.log.lock().unwrap().push("blocking:prepare".into());
            Ok(Value::Null)
        }

        fn execute(&self, _prep: &Value, _params: &Params) -> Result<Value> {
            self.log.lock().unwrap().push("blocking:execute".into());
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_mixed_flow_preserves_step_order() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));

        let mut builder = FlowBuilder::new();
        let a = builder.add_async_node(
            SleepyAsync {
                log: log.clone(),
                delay: Duration::from_millis(50),
            },
            Params::new(),
        );
        let b = builder.add_node(LoggingBlocking { log: log.clone() }, Params::new());
        builder.start(a);
        builder.connect_default(a, b);
        let flow = AsyncFlow::new(builder.build().unwrap());

        let mut ctx = Context::new();
        let report = flow.run(&mut ctx).await.unwrap();

        // The blocking node's lifecycle begins only after the async
        // suspension resolves.
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "sleepy:start",
                "sleepy:end",
                "blocking:prepare",
                "blocking:execute"
            ]
        );
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[0].kind, "async");
        assert_eq!(report.steps[1].kind, "node");
    }

    #[tokio::test]
    async fn test_blocking_flow_rejects_async_node() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));

        let mut builder = FlowBuilder::new();
        let a = builder.add_async_node(
            SleepyAsync {
                log,
                delay: Duration::ZERO,
            },
            Params::new(),
        );
        builder.start(a);
        let flow = builder.build().unwrap();

        let mut ctx = Context::new();
        let err = flow.run(&mut ctx).unwrap_err();

        assert!(matches!(
            err,
            BraidError::AsyncNodeInBlockingFlow(name) if name == "sleepy"
        ));
    }
}
