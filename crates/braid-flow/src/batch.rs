use futures::future::join_all;
use tracing::debug;

use braid_core::{Context, Params, Result};

use crate::async_flow::AsyncFlow;
use crate::flow::{Flow, FlowReport};

/// Produces the ordered parameter sets a batch flow iterates over.
///
/// Implemented for closures over the initial context; use
/// [`fixed_params`] for a list known up front.
pub trait ParamSource: Send + Sync {
    fn param_sets(&self, ctx: &Context) -> Result<Vec<Params>>;
}

impl<F> ParamSource for F
where
    F: Fn(&Context) -> Result<Vec<Params>> + Send + Sync,
{
    fn param_sets(&self, ctx: &Context) -> Result<Vec<Params>> {
        self(ctx)
    }
}

/// A [`ParamSource`] yielding a fixed list, independent of the context.
pub fn fixed_params(sets: Vec<Params>) -> impl ParamSource {
    move |_: &Context| -> Result<Vec<Params>> { Ok(sets.clone()) }
}

/// Runs an entire blocking flow once per parameter set, strictly in
/// sequence. Each iteration's params are overlaid on the node-bound
/// params for that iteration only.
///
/// Context policy is selected by method, never mixed: `run_shared`
/// mutates one live context across iterations, `run_isolated` clones the
/// initial context per iteration and returns the finals for the caller
/// to aggregate.
pub struct BatchFlow {
    flow: Flow,
    source: Box<dyn ParamSource>,
}

impl BatchFlow {
    pub fn new(flow: Flow, source: impl ParamSource + 'static) -> Self {
        Self {
            flow,
            source: Box::new(source),
        }
    }

    /// Iterations mutate one shared context in sequence; later iterations
    /// see earlier iterations' writes.
    pub fn run_shared(&self, ctx: &mut Context) -> Result<Vec<FlowReport>> {
        let sets = self.source.param_sets(ctx)?;
        debug!(iterations = sets.len(), "batch flow start (shared context)");
        let mut reports = Vec::with_capacity(sets.len());
        for params in &sets {
            reports.push(self.flow.run_with(ctx, Some(params))?);
        }
        Ok(reports)
    }

    /// Each iteration runs on a clone of `ctx`; the final contexts are
    /// returned in iteration order for explicit aggregation (for example
    /// via [`Context::merge`]).
    pub fn run_isolated(&self, ctx: &Context) -> Result<Vec<Context>> {
        let sets = self.source.param_sets(ctx)?;
        debug!(iterations = sets.len(), "batch flow start (isolated contexts)");
        let mut contexts = Vec::with_capacity(sets.len());
        for params in &sets {
            let mut iter_ctx = ctx.clone();
            self.flow.run_with(&mut iter_ctx, Some(params))?;
            contexts.push(iter_ctx);
        }
        Ok(contexts)
    }
}

/// Async-aware [`BatchFlow`]: the graph may mix node kinds, iterations
/// stay strictly sequential.
pub struct AsyncBatchFlow {
    flow: AsyncFlow,
    source: Box<dyn ParamSource>,
}

impl AsyncBatchFlow {
    pub fn new(flow: AsyncFlow, source: impl ParamSource + 'static) -> Self {
        Self {
            flow,
            source: Box::new(source),
        }
    }

    /// Iterations mutate one shared context in sequence.
    pub async fn run_shared(&self, ctx: &mut Context) -> Result<Vec<FlowReport>> {
        let sets = self.source.param_sets(ctx)?;
        debug!(iterations = sets.len(), "batch flow start (shared context)");
        let mut reports = Vec::with_capacity(sets.len());
        for params in &sets {
            reports.push(self.flow.run_with(ctx, Some(params)).await?);
        }
        Ok(reports)
    }

    /// Each iteration runs on a clone of `ctx`; finals returned in
    /// iteration order.
    pub async fn run_isolated(&self, ctx: &Context) -> Result<Vec<Context>> {
        let sets = self.source.param_sets(ctx)?;
        debug!(iterations = sets.len(), "batch flow start (isolated contexts)");
        let mut contexts = Vec::with_capacity(sets.len());
        for params in &sets {
            let mut iter_ctx = ctx.clone();
            self.flow.run_with(&mut iter_ctx, Some(params)).await?;
            contexts.push(iter_ctx);
        }
        Ok(contexts)
    }
}

/// Concurrent batch flow: one flow execution per parameter set, all
/// launched before any is awaited.
///
/// Only isolated contexts are offered: one live context shared across
/// concurrently running iterations would race, so the API does not
/// represent it. The batch waits for every iteration to settle and
/// surfaces the first failure in iteration order; running siblings are
/// never cancelled. Fan-out is unbounded (one in-flight flow per
/// parameter set) and there is no backpressure.
pub struct AsyncParallelBatchFlow {
    flow: AsyncFlow,
    source: Box<dyn ParamSource>,
}

impl AsyncParallelBatchFlow {
    pub fn new(flow: AsyncFlow, source: impl ParamSource + 'static) -> Self {
        Self {
            flow,
            source: Box::new(source),
        }
    }

    /// Run all iterations concurrently on clones of `ctx`, returning the
    /// final contexts in iteration order.
    pub async fn run(&self, ctx: &Context) -> Result<Vec<Context>> {
        let sets = self.source.param_sets(ctx)?;
        debug!(iterations = sets.len(), "parallel batch flow start");
        let settled = join_all(sets.into_iter().map(|params| {
            let mut iter_ctx = ctx.clone();
            async move {
                self.flow.run_with(&mut iter_ctx, Some(&params)).await?;
                Ok(iter_ctx)
            }
        }))
        .await;

        settled.into_iter().collect()
    }
}
