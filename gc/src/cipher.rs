//! Symmetric authenticated encryption used to wrap garbled-table entries.
//!
//! Each call generates a fresh random nonce and prepends it to the
//! ciphertext, so callers never have to manage nonce state themselves.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key as AesKey, Nonce};
use rand::RngCore;
use rand_chacha::ChaCha12Rng;

use crate::error::{GcError, Result};

/// Length in bytes of a key used by this cipher.
pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// A 256-bit symmetric key.
pub type Key = [u8; KEY_LEN];

/// Encrypts `plaintext` under `key`, returning `nonce || ciphertext`.
pub fn encrypt(rng: &mut ChaCha12Rng, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| GcError::CryptoParam("AES-GCM encryption failed".to_string()))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a `nonce || ciphertext` blob produced by [`encrypt`]. Fails
/// with [`GcError::DecryptFailure`]-shaped context left to the caller,
/// since only the caller knows which gate this row belongs to; here we
/// surface a generic [`GcError::CryptoParam`] for malformed input and let
/// callers convert an authentication failure into their own error.
pub fn decrypt(key: &Key, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(GcError::CryptoParam("ciphertext shorter than nonce".to_string()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| GcError::CryptoParam("authentication failed".to_string()))
}
