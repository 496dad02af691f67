use protocol::{Identifier, IdentifierError, ProtocolError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("the run has not been started")]
    RunNotStarted,
    #[error("the run is already completed")]
    RunCompleted,
    #[error("question '{0}' requires an answer")]
    AnswerRequired(Identifier),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("invalid identifier: {0}")]
    Identifier(#[from] IdentifierError),
    #[error("protocol file not found: {}", .0.display())]
    ProtocolNotFound(std::path::PathBuf),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read protocol file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write answer file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize answers: {0}")]
    Serialization(serde_json::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
