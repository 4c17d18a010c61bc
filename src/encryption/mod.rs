//! Per-object encryption applied to stream payloads as they are written.
//!
//! The writer never derives document keys itself; it is handed a
//! [`SecurityManager`] carrying the file encryption key and the crypt
//! filter the document's security handler selected.

mod crypt_filters;
mod rc4;

pub use crypt_filters::{Aes128CryptFilter, CryptFilter, IdentityCryptFilter, Rc4CryptFilter};

use thiserror::Error;

use crate::{Dictionary, Object, ObjectId};

#[derive(Debug, Error)]
pub enum CryptError {
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid ciphertext length")]
    InvalidCipherTextLength,
    #[error("data could not be padded or unpadded")]
    Padding,
}

/// Encryption state of the document being updated: the file decryption key
/// plus the document-wide crypt filter.
#[derive(Debug)]
pub struct SecurityManager {
    key: Vec<u8>,
    filter: Box<dyn CryptFilter>,
}

impl SecurityManager {
    pub fn new(key: Vec<u8>, filter: Box<dyn CryptFilter>) -> SecurityManager {
        SecurityManager { key, filter }
    }

    /// RC4 (method V2) manager, the classic standard security handler.
    pub fn rc4(key: Vec<u8>) -> SecurityManager {
        SecurityManager::new(key, Box::new(Rc4CryptFilter))
    }

    /// AES-128-CBC (method AESV2) manager.
    pub fn aes_128(key: Vec<u8>) -> SecurityManager {
        SecurityManager::new(key, Box::new(Aes128CryptFilter))
    }

    pub fn decryption_key(&self) -> &[u8] {
        &self.key
    }

    pub fn crypt_filter(&self) -> &dyn CryptFilter {
        &*self.filter
    }

    /// Encrypt one stream payload. A stream whose `DecodeParms` name the
    /// Identity crypt filter opts out of the document-wide filter.
    pub fn encrypt_stream(
        &self,
        id: ObjectId,
        decode_parms: Option<&Dictionary>,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptError> {
        if names_identity(decode_parms) {
            return Ok(plaintext.to_vec());
        }
        let key = self.filter.compute_key(&self.key, id)?;
        self.filter.encrypt(&key, plaintext)
    }

    /// Inverse of [`encrypt_stream`](Self::encrypt_stream).
    pub fn decrypt_stream(
        &self,
        id: ObjectId,
        decode_parms: Option<&Dictionary>,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptError> {
        if names_identity(decode_parms) {
            return Ok(ciphertext.to_vec());
        }
        let key = self.filter.compute_key(&self.key, id)?;
        self.filter.decrypt(&key, ciphertext)
    }
}

fn names_identity(decode_parms: Option<&Dictionary>) -> bool {
    decode_parms
        .and_then(|parms| parms.get(b"Name"))
        .and_then(Object::as_name)
        == Some(&b"Identity"[..])
}
