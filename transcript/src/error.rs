use synod::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] synod::Error),

    #[error("malformed request {line:?}: {reason}")]
    Parse { line: String, reason: String },

    #[error("no context {0}")]
    UnknownContext(String),

    #[error("no candidate from {node} for context {context}")]
    NoCandidate { context: String, node: NodeId },

    #[error("answer backend failed: {0}")]
    Oracle(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
