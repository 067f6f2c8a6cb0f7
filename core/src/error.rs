use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The agent has no program start date and cannot be scheduled.
    /// Batch runs count this as "skipped", never as an error.
    #[error("Agent '{agent_id}' has no starting date")]
    MissingStartDate { agent_id: String },

    #[error("Store read failed during {op}: {message}")]
    StoreRead { op: &'static str, message: String },

    #[error("Store write failed during {op}: {message}")]
    StoreWrite { op: &'static str, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn read(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::StoreRead { op, message: err.to_string() }
    }

    pub fn write(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::StoreWrite { op, message: err.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
