use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BraidError, Result};

/// Immutable per-node configuration, bound when a node is added to a graph.
///
/// Distinct from [`Context`](crate::Context): the context is shared and
/// mutated across a whole run, params are scoped to one node's lifecycle
/// calls and never written after construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    data: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create Params from existing data.
    pub fn from_map(data: HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a value as a string, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Get a value as an integer, if present and an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Get a value as a float, if present and numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    /// Get a value as a bool, if present and a bool.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Get a string value, failing on absence or type mismatch.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.require(key)?.as_str().ok_or_else(|| BraidError::TypeMismatch {
            key: key.to_string(),
            expected: "string",
        })
    }

    /// Get an integer value, failing on absence or type mismatch.
    pub fn require_i64(&self, key: &str) -> Result<i64> {
        self.require(key)?.as_i64().ok_or_else(|| BraidError::TypeMismatch {
            key: key.to_string(),
            expected: "integer",
        })
    }

    fn require(&self, key: &str) -> Result<&Value> {
        self.data
            .get(key)
            .ok_or_else(|| BraidError::KeyNotFound(key.to_string()))
    }

    /// Produce the effective params for one batch iteration: `extra` keys
    /// take precedence over node-bound keys on conflict.
    pub fn overlaid(&self, extra: &Params) -> Params {
        let mut data = self.data.clone();
        for (k, v) in &extra.data {
            data.insert(k.clone(), v.clone());
        }
        Params { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the underlying data map.
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }
}
