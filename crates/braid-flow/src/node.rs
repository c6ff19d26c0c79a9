use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use braid_core::{Action, BraidError, Context, Params, Result};

/// Per-node retry configuration: how many times to attempt `execute` and
/// how long to sleep between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    wait: Duration,
}

impl RetryPolicy {
    /// `max_retries` is the total attempt count and is clamped to at
    /// least one.
    pub fn new(max_retries: u32, wait: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            wait,
        }
    }

    /// Single attempt, no wait.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// A blocking unit of work.
///
/// The lifecycle is prepare → execute (retried per [`Node::retry`]) →
/// decide-next. `prepare` and `decide_next` failures are never retried and
/// abort the run; `execute` failures are retried against the same prepare
/// result, then routed to `fallback` once the attempts are exhausted.
pub trait Node: Send + Sync {
    /// Identifies the node in logs and reports.
    fn name(&self) -> &str;

    /// Retry policy for `execute`.
    fn retry(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Read from the context and assemble the input for `execute`.
    fn prepare(&self, ctx: &mut Context, params: &Params) -> Result<Value>;

    /// Do the work. May be invoked several times with the same prepare
    /// result; must not touch the context.
    fn execute(&self, prep: &Value, params: &Params) -> Result<Value>;

    /// Terminal recovery after every attempt has failed. The default
    /// re-returns the error, making the node's failure fatal.
    fn fallback(&self, prep: &Value, err: BraidError, params: &Params) -> Result<Value> {
        let _ = (prep, params);
        Err(err)
    }

    /// Write results back to the context and pick the outgoing edge.
    fn decide_next(
        &self,
        ctx: &mut Context,
        prep: &Value,
        exec: &Value,
        params: &Params,
    ) -> Result<Action> {
        let _ = (ctx, prep, exec, params);
        Ok(Action::Default)
    }

    /// Drive the full lifecycle once.
    fn run(&self, ctx: &mut Context, params: &Params) -> Result<Action> {
        let prep = self.prepare(ctx, params)?;
        let exec = run_with_retry(
            self.name(),
            self.retry(),
            || self.execute(&prep, params),
            |err| self.fallback(&prep, err, params),
        )?;
        let action = self.decide_next(ctx, &prep, &exec, params)?;
        debug!(node = self.name(), action = %action, "node lifecycle complete");
        Ok(action)
    }
}

/// A blocking node whose execute step runs once per prepared item,
/// strictly in sequence. Each item gets the node's own retry/fallback
/// policy; results are collected in item order.
pub trait BatchNode: Send + Sync {
    /// Identifies the node in logs and reports.
    fn name(&self) -> &str;

    /// Retry policy applied per item.
    fn retry(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Ordered items to process.
    fn prepare(&self, ctx: &mut Context, params: &Params) -> Result<Vec<Value>>;

    /// Process one item.
    fn execute_item(&self, item: &Value, params: &Params) -> Result<Value>;

    /// Terminal per-item recovery; the default re-returns the error.
    fn fallback_item(&self, item: &Value, err: BraidError, params: &Params) -> Result<Value> {
        let _ = (item, params);
        Err(err)
    }

    /// Receives the items and their results, both in input order.
    fn decide_next(
        &self,
        ctx: &mut Context,
        items: &[Value],
        results: &[Value],
        params: &Params,
    ) -> Result<Action> {
        let _ = (ctx, items, results, params);
        Ok(Action::Default)
    }

    /// Drive the batch lifecycle once.
    fn run(&self, ctx: &mut Context, params: &Params) -> Result<Action> {
        let items = self.prepare(ctx, params)?;
        debug!(node = self.name(), items = items.len(), "batch start");
        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            let result = run_with_retry(
                self.name(),
                self.retry(),
                || self.execute_item(item, params),
                |err| self.fallback_item(item, err, params),
            )?;
            results.push(result);
        }
        self.decide_next(ctx, &items, &results, params)
    }
}

/// Attempt `op` up to the policy's count, sleeping the policy's wait
/// between attempts, then hand the final error to `recover`.
fn run_with_retry<T>(
    name: &str,
    policy: RetryPolicy,
    mut op: impl FnMut() -> Result<T>,
    recover: impl FnOnce(BraidError) -> Result<T>,
) -> Result<T> {
    let mut attempt = 1;
    loop {
        match op() {
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
                    thread::sleep(policy.wait());
                }
                attempt += 1;
            }
            Err(err) => {
                debug!(node = name, attempt, "retries exhausted, invoking fallback");
                return recover(err);
            }
        }
    }
}
