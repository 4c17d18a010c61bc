use crate::encryption::CryptError;
use crate::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The change set handed us the same object number twice.
    #[error("multiple cross-reference entries for object number {0}")]
    DuplicateEntry(u32),

    #[error("failed to encrypt stream {id:?}: {source}")]
    Encryption { id: ObjectId, source: CryptError },
}

pub type Result<T> = std::result::Result<T, Error>;
