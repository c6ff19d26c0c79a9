use thiserror::Error;

#[derive(Debug, Error)]
pub enum BraidError {
    // Context/Params access errors
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Type mismatch for key '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    // Node errors
    #[error("Node '{node}' failed: {message}")]
    Node { node: String, message: String },

    // Graph construction errors
    #[error("Flow has no start node")]
    StartNotSet,

    #[error("Node id {0} is not registered in this flow")]
    NodeNotFound(usize),

    // Execution errors
    #[error("Async node '{0}' cannot run in a blocking flow")]
    AsyncNodeInBlockingFlow(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BraidError {
    /// Node-author failure with the node's name attached.
    pub fn node(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Node {
            node: node.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BraidError>;
