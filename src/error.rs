use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Document {0} not found")]
    NotFound(String),

    #[error("Document {0} is not a folder")]
    NotAFolder(String),

    #[error("Cannot move {moved} into {destination}: destination is inside the moved set")]
    CyclicMove { moved: String, destination: String },

    #[error("A document with uuid {0} already exists")]
    DuplicateUuid(String),

    #[error("No document tree has been received yet")]
    NoTree,

    #[error("Stale response: computed against revision {expected}, tree is at {current}")]
    Stale { expected: u64, current: u64 },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExplorerError {
    /// Errors raised by structural commands that leave the tree untouched
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ExplorerError::NotFound(_)
                | ExplorerError::NotAFolder(_)
                | ExplorerError::CyclicMove { .. }
                | ExplorerError::DuplicateUuid(_)
                | ExplorerError::NoTree
        )
    }
}
