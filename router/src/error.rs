#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] synod::Error),

    #[error("unknown member {0}")]
    UnknownMember(synod::NodeId),

    #[error("could not read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse script: {0}")]
    Script(#[from] serde_json::Error),
}
