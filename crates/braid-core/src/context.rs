use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BraidError, Result};

/// Shared store for passing data between nodes in one flow run.
///
/// Keys are strings; values are JSON for maximum flexibility. The engine
/// enforces no schema — key conventions are an agreement between
/// collaborating nodes. The `require_*` accessors fail with
/// [`BraidError::KeyNotFound`] or [`BraidError::TypeMismatch`] instead of
/// silently coercing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    data: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Context from initial data.
    pub fn from_map(data: HashMap<String, Value>) -> Self {
        Self { data }
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

    /// Get a value, failing if the key is absent.
    pub fn require(&self, key: &str) -> Result<&Value> {
        self.data
            .get(key)
            .ok_or_else(|| BraidError::KeyNotFound(key.to_string()))
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

    /// Get a float value, failing on absence or type mismatch.
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.require(key)?.as_f64().ok_or_else(|| BraidError::TypeMismatch {
            key: key.to_string(),
            expected: "number",
        })
    }

    /// Get a bool value, failing on absence or type mismatch.
    pub fn require_bool(&self, key: &str) -> Result<bool> {
        self.require(key)?.as_bool().ok_or_else(|| BraidError::TypeMismatch {
            key: key.to_string(),
            expected: "boolean",
        })
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .insert(key.into(), Value::String(value.into()));
    }

    /// Merge another context into this one (overwrites on conflict).
    ///
    /// This is the aggregation primitive for isolated batch iterations:
    /// the caller folds the per-iteration contexts back together after all
    /// iterations settle.
    pub fn merge(&mut self, other: &Context) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
    }

    /// Get the underlying data map.
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }
}
