// Error types
//
// The command-stream, register and shader-generation paths are closed
// systems and never fail. Errors only surface at the persistence boundaries:
// save-state snapshots and the on-disk configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Snapshot serialization error: {0}")]
    Serialization(String),

    /// A restored register file does not have the expected number of words.
    #[error("Snapshot {memory} memory has {actual} words, expected {expected}")]
    RegisterMemoryLength {
        memory: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Snapshot gather pipe holds {count} bytes, capacity is {capacity}")]
    GatherPipeOverrun { count: usize, capacity: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for VideoError {
    fn from(err: bincode::Error) -> Self {
        VideoError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for VideoError {
    fn from(err: serde_json::Error) -> Self {
        VideoError::Config(err.to_string())
    }
}

pub type VideoResult<T> = std::result::Result<T, VideoError>;
