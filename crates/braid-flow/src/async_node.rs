use std::future::Future;

use futures::future::{join_all, BoxFuture};
use serde_json::Value;
use tracing::{debug, warn};

use braid_core::{Action, BraidError, Context, Params, Result};

use crate::node::RetryPolicy;

/// A cooperative unit of work; lifecycle calls may suspend.
///
/// Same contract as [`Node`](crate::Node) with `BoxFuture`-returning
/// methods, keeping the trait object-safe without a macro. Retry waits use
/// the tokio timer instead of blocking the thread.
pub trait AsyncNode: Send + Sync {
    /// Identifies the node in logs and reports.
    fn name(&self) -> &str;

    /// Retry policy for `execute`.
    fn retry(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Read from the context and assemble the input for `execute`.
    fn prepare<'a>(
        &'a self,
        ctx: &'a mut Context,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value>>;

    /// Do the work. May be invoked several times with the same prepare
    /// result; must not touch the context.
    fn execute<'a>(&'a self, prep: &'a Value, params: &'a Params) -> BoxFuture<'a, Result<Value>>;

    /// Terminal recovery after every attempt has failed. The default
    /// re-returns the error, making the node's failure fatal.
    fn fallback<'a>(
        &'a self,
        prep: &'a Value,
        err: BraidError,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value>> {
        let _ = (prep, params);
        Box::pin(async move { Err(err) })
    }

    /// Write results back to the context and pick the outgoing edge.
    fn decide_next<'a>(
        &'a self,
        ctx: &'a mut Context,
        prep: &'a Value,
        exec: &'a Value,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Action>> {
        let _ = (ctx, prep, exec, params);
        Box::pin(async { Ok(Action::Default) })
    }

    /// Drive the full lifecycle once.
    fn run<'a>(&'a self, ctx: &'a mut Context, params: &'a Params) -> BoxFuture<'a, Result<Action>> {
        Box::pin(async move {
            let prep = self.prepare(&mut *ctx, params).await?;
            let exec = run_with_retry_async(
                self.name(),
                self.retry(),
                || self.execute(&prep, params),
                |err| self.fallback(&prep, err, params),
            )
            .await?;
            let action = self.decide_next(&mut *ctx, &prep, &exec, params).await?;
            debug!(node = self.name(), action = %action, "node lifecycle complete");
            Ok(action)
        })
    }
}

/// A cooperative node whose execute step runs once per prepared item.
///
/// The provided [`run`](AsyncBatchNode::run) is strictly sequential: a
/// later item's work does not begin until the earlier item's full
/// retry/fallback resolution completes. For concurrent items, opt into
/// [`AsyncParallelBatchNode`].
pub trait AsyncBatchNode: Send + Sync {
    /// Identifies the node in logs and reports.
    fn name(&self) -> &str;

    /// Retry policy applied per item.
    fn retry(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Ordered items to process.
    fn prepare<'a>(
        &'a self,
        ctx: &'a mut Context,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Vec<Value>>>;

    /// Process one item.
    fn execute_item<'a>(
        &'a self,
        item: &'a Value,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value>>;

    /// Terminal per-item recovery; the default re-returns the error.
    fn fallback_item<'a>(
        &'a self,
        item: &'a Value,
        err: BraidError,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Value>> {
        let _ = (item, params);
        Box::pin(async move { Err(err) })
    }

    /// Receives the items and their results, both in input order.
    fn decide_next<'a>(
        &'a self,
        ctx: &'a mut Context,
        items: &'a [Value],
        results: &'a [Value],
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Action>> {
        let _ = (ctx, items, results, params);
        Box::pin(async { Ok(Action::Default) })
    }

    /// Drive the batch lifecycle once, item by item.
    fn run<'a>(&'a self, ctx: &'a mut Context, params: &'a Params) -> BoxFuture<'a, Result<Action>> {
        Box::pin(async move {
            let items = self.prepare(&mut *ctx, params).await?;
            debug!(node = self.name(), items = items.len(), "batch start");
            let mut results = Vec::with_capacity(items.len());
            for item in &items {
                let result = run_with_retry_async(
                    self.name(),
                    self.retry(),
                    || self.execute_item(item, params),
                    |err| self.fallback_item(item, err, params),
                )
                .await?;
                results.push(result);
            }
            self.decide_next(&mut *ctx, &items, &results, params).await
        })
    }
}

/// Opt-in concurrent variant of [`AsyncBatchNode`].
///
/// [`run_parallel`](AsyncParallelBatchNode::run_parallel) starts every
/// item's execute-with-retry before awaiting any of them, then collects
/// results preserving input order regardless of completion order. The
/// batch waits for every launched item to settle and surfaces the first
/// failure in index order; running siblings are never cancelled. Fan-out
/// is unbounded (one in-flight task per item) and there is no
/// backpressure.
pub trait AsyncParallelBatchNode: AsyncBatchNode {
    /// Drive the batch lifecycle once, all items concurrently.
    fn run_parallel<'a>(
        &'a self,
        ctx: &'a mut Context,
        params: &'a Params,
    ) -> BoxFuture<'a, Result<Action>> {
        Box::pin(async move {
            let items = self.prepare(&mut *ctx, params).await?;
            debug!(node = self.name(), items = items.len(), "parallel batch start");
            let settled = join_all(items.iter().map(|item| {
                run_with_retry_async(
                    self.name(),
                    self.retry(),
                    move || self.execute_item(item, params),
                    move |err| self.fallback_item(item, err, params),
                )
            }))
            .await;

            let mut results = Vec::with_capacity(settled.len());
            for outcome in settled {
                results.push(outcome?);
            }
            self.decide_next(&mut *ctx, &items, &results, params).await
        })
    }
}

/// Attempt `op` up to the policy's count, sleeping the policy's wait
/// between attempts, then hand the final error to `recover`.
async fn run_with_retry_async<T, Op, Fut, Rec, RecFut>(
    name: &str,
    policy: RetryPolicy,
    mut op: Op,
    recover: Rec,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    Rec: FnOnce(BraidError) -> RecFut,
    RecFut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries() => {
                warn!(
                    node = name,
                    attempt,
                    max_retries = policy.max_retries(),
                    error = %err,
                    "execute failed, retrying"
                );
                if !policy.wait().is_zero() {
                    tokio::time::sleep(policy.wait()).await;
                }
                attempt += 1;
            }
            Err(err) => {
                debug!(node = name, attempt, "retries exhausted, invoking fallback");
                return recover(err).await;
            }
        }
    }
}
