//! Error types for locality index generation.

use thiserror::Error;

/// Locality index errors.
#[derive(Error, Debug)]
pub enum LocalityError {
    /// IO error during stream, container or index read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw feature stream could not be decoded.
    #[error("Feature stream decode error at byte {offset}: {message}")]
    FeatureDecode { offset: u64, message: String },

    /// Whitelist file line could not be parsed as a node id.
    #[error("Error while parsing node id at line {line}. Line contents: {content:?}")]
    Whitelist { line: usize, content: String },

    /// Container file is corrupt or has an incompatible version.
    #[error("Container format error: {0}")]
    Container(String),

    /// Requested container section does not exist.
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    /// Index format error (corrupt leaflet, checksum mismatch, bad manifest).
    #[error("Index format error: {0}")]
    FormatError(String),

    /// Serialization error (postcard / JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An area feature produced no border bytes.
    #[error("Empty border geometry for feature {id} is not allowed")]
    EmptyBorder { id: u64 },

    /// A covering worker panicked (fatal invariant violation).
    #[error("Covering worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

impl From<serde_json::Error> for LocalityError {
    fn from(e: serde_json::Error) -> Self {
        LocalityError::Serialization(e.to_string())
    }
}

impl From<postcard::Error> for LocalityError {
    fn from(e: postcard::Error) -> Self {
        LocalityError::Serialization(e.to_string())
    }
}

/// Result type for locality index operations.
pub type Result<T> = std::result::Result<T, LocalityError>;
