use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiPanelError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No tree node matches identity: {0}")]
    UnknownNode(String),

    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CiPanelError>;
