use std::fmt;

use serde::{Deserialize, Serialize};

/// Edge label returned by a node's decision step.
///
/// Control actions are closed variants; domain-specific labels use
/// `Custom`. Conversion from a string normalizes `""` and `"default"` to
/// `Default` and `"error"` to `Error`, so an absent decision and the
/// literal default label select the same edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Action {
    Default,
    Error,
    Custom(String),
}

impl Action {
    /// Normalize an optional label; `None` means `Default`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            None => Action::Default,
            Some(s) => Action::from(s),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Default => "default",
            Action::Error => "error",
            Action::Custom(s) => s,
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::Default
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "" | "default" => Action::Default,
            "error" => Action::Error,
            other => Action::Custom(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Action::from(s.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
