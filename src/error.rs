use crate::codec::CodecError;
use crate::data_type::DataType;
use crate::storage::{StorageError, StoreKeyError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad chunk coordinate or unsupported variable-length / flavor combination.
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),
    #[error("cannot write in open mode {0}")]
    ReadOnlyMode(crate::dataset::OpenMode),
    #[error("chunk {0} does not exist")]
    MissingChunk(String),
    #[error("corrupt chunk: {0}")]
    CorruptChunk(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("request has data type {requested}, dataset has {expected}")]
    TypeMismatch {
        expected: DataType,
        requested: DataType,
    },
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    StoreKey(#[from] StoreKeyError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error("{0}")]
    General(String),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub fn invalid_chunk(message: impl Into<String>) -> Self {
        Self::InvalidChunk(message.into())
    }

    pub fn corrupt_chunk(message: impl Into<String>) -> Self {
        Self::CorruptChunk(message.into())
    }
}
