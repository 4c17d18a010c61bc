use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest as _, Md5};
use rand::Rng as _;

use super::rc4::Rc4;
use super::CryptError;
use crate::ObjectId;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// One concrete encryption method. `compute_key` mixes the object identity
/// into the file key; `encrypt`/`decrypt` transform a whole stream payload.
pub trait CryptFilter: std::fmt::Debug + Send + Sync {
    fn method(&self) -> &[u8];
    fn compute_key(&self, key: &[u8], id: ObjectId) -> Result<Vec<u8>, CryptError>;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptError>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptError>;
}

#[derive(Clone, Copy, Debug)]
pub struct IdentityCryptFilter;

impl CryptFilter for IdentityCryptFilter {
    fn method(&self) -> &[u8] {
        b"Identity"
    }

    fn compute_key(&self, key: &[u8], _id: ObjectId) -> Result<Vec<u8>, CryptError> {
        Ok(key.to_vec())
    }

    fn encrypt(&self, _key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, _key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptError> {
        Ok(ciphertext.to_vec())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Rc4CryptFilter;

impl CryptFilter for Rc4CryptFilter {
    fn method(&self) -> &[u8] {
        b"V2"
    }

    fn compute_key(&self, key: &[u8], id: ObjectId) -> Result<Vec<u8>, CryptError> {
        if key.is_empty() || key.len() > 256 {
            return Err(CryptError::InvalidKeyLength);
        }

        // Extend the n-byte file key with the low 3 bytes of the object
        // number and the low 2 bytes of the generation number, low byte
        // first, then hash; the object key is the first min(n + 5, 16)
        // bytes of the digest.
        let mut hasher = Md5::new();
        hasher.update(key);
        hasher.update(&id.0.to_le_bytes()[..3]);
        hasher.update(&id.1.to_le_bytes()[..2]);

        let key_len = std::cmp::min(key.len() + 5, 16);
        Ok(hasher.finalize()[..key_len].to_vec())
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptError> {
        if key.is_empty() || key.len() > 256 {
            return Err(CryptError::InvalidKeyLength);
        }
        Ok(Rc4::new(key).process(plaintext))
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptError> {
        // RC4 is symmetric.
        self.encrypt(key, ciphertext)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Aes128CryptFilter;

impl CryptFilter for Aes128CryptFilter {
    fn method(&self) -> &[u8] {
        b"AESV2"
    }

    fn compute_key(&self, key: &[u8], id: ObjectId) -> Result<Vec<u8>, CryptError> {
        // Same extension as V2, plus the AES marker bytes "sAlT".
        let mut hasher = Md5::new();
        hasher.update(key);
        hasher.update(&id.0.to_le_bytes()[..3]);
        hasher.update(&id.1.to_le_bytes()[..2]);
        hasher.update(b"sAlT");

        let key_len = std::cmp::min(key.len() + 5, 16);
        Ok(hasher.finalize()[..key_len].to_vec())
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptError> {
        if key.len() != 16 {
            return Err(CryptError::InvalidKeyLength);
        }

        let mut iv = [0u8; 16];
        rand::rng().fill(&mut iv[..]);

        let encryptor =
            Aes128CbcEnc::new_from_slices(key, &iv).map_err(|_| CryptError::InvalidKeyLength)?;
        let mut ciphertext = iv.to_vec();
        ciphertext.extend_from_slice(&encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext));
        Ok(ciphertext)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptError> {
        if key.len() != 16 {
            return Err(CryptError::InvalidKeyLength);
        }
        if ciphertext.len() % 16 != 0 {
            return Err(CryptError::InvalidCipherTextLength);
        }
        // Nothing left once the IV is taken off.
        if ciphertext.len() <= 16 {
            return Ok(Vec::new());
        }

        let (iv, data) = ciphertext.split_at(16);
        let decryptor =
            Aes128CbcDec::new_from_slices(key, iv).map_err(|_| CryptError::InvalidKeyLength)?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| CryptError::Padding)
    }
}
