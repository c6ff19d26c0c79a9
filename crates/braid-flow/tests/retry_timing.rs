//! Timing properties of the retry loop: attempt spacing and wait
//! accounting across blocking and async nodes.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::Value;

use braid_core::{BraidError, Context, Params, Result};
use braid_flow::{AsyncNode, Node, RetryPolicy};

struct TimedFailure {
    attempts: Mutex<Vec<Instant>>,
    wait: Duration,
    retries: u32,
}

impl TimedFailure {
    fn new(wait: Duration, retries: u32) -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            wait,
            retries,
        }
    }

    fn gaps(&self) -> Vec<Duration> {
        let attempts = self.attempts.lock().unwrap();
        attempts.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl Node for TimedFailure {
    fn name(&self) -> &str {
        "timed_failure"
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.wait)
    }

    fn prepare(&self, _ctx: &mut Context, _params: &Params) -> Result<Value> {
        Ok(Value::Null)
    }

    fn execute(&self, _prep: &Value, _params: &Params) -> Result<Value> {
        self.attempts.lock().unwrap().push(Instant::now());
        Err(BraidError::node("timed_failure", "always fails"))
    }

    fn fallback(&self, _prep: &Value, _err: BraidError, _params: &Params) -> Result<Value> {
        Ok(Value::Null)
    }
}

#[test]
fn test_wait_elapses_between_attempts() {
    let wait = Duration::from_millis(50);
    let node = TimedFailure::new(wait, 3);
    let mut ctx = Context::new();

    node.run(&mut ctx, &Params::new()).unwrap();

    let gaps = node.gaps();
    assert_eq!(gaps.len(), 2);
    for gap in gaps {
        assert!(gap >= wait, "attempt gap {gap:?} shorter than wait {wait:?}");
    }
}

#[test]
fn test_zero_wait_does_not_sleep() {
    let node = TimedFailure::new(Duration::ZERO, 3);
    let mut ctx = Context::new();

    let started = Instant::now();
    node.run(&mut ctx, &Params::new()).unwrap();

    assert_eq!(node.attempts.lock().unwrap().len(), 3);
    assert!(started.elapsed() < Duration::from_millis(50));
}

struct TimedAsyncFailure {
    attempts: Mutex<Vec<Instant>>,
    wait: Duration,
}

impl AsyncNode for TimedAsyncFailure {
    fn name(&self) -> &str {
        "timed_async_failure"
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(3, self.wait)
    }

    fn prepare<'a>(
        &'a self,
        _ctx: &'a mut Context,
        _params: &'a Params,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async { Ok(Value::Null) })
    }

    fn execute<'a>(&'a self, _prep: &'a Value, _params: &'a Params) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async {
            self.attempts.lock().unwrap().push(Instant::now());
            Err(BraidError::node("timed_async_failure", "always fails"))
        })
    }

    fn fallback<'a>(
        &'a self,
        _prep: &'a Value,
        _err: BraidError,
        _params: &'a Params,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async { Ok(Value::Null) })
    }
}

#[tokio::test]
async fn test_async_wait_uses_timer_between_attempts() {
    let wait = Duration::from_millis(40);
    let node = TimedAsyncFailure {
        attempts: Mutex::new(Vec::new()),
        wait,
    };
    let mut ctx = Context::new();

    node.run(&mut ctx, &Params::new()).await.unwrap();

    let attempts = node.attempts.lock().unwrap();
    assert_eq!(attempts.len(), 3);
    for pair in attempts.windows(2) {
        assert!(pair[1] - pair[0] >= wait);
    }
}
