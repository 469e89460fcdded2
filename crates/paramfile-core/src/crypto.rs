//! Authenticated encryption for stored values.
//!
//! XChaCha20-Poly1305 with a 32-byte key and a random 24-byte nonce per call.
//!
//! Blob layout: `[ nonce (24 bytes) | ciphertext + tag ]`

use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{Key as CipherKey, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{ParamError, Result};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;

pub type Key = [u8; KEY_LEN];

/// Digest a passphrase of any length into a cipher key.
pub fn derive_key(passphrase: &str) -> Zeroizing<Key> {
    let digest = Sha256::digest(passphrase.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&digest);
    key
}

pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn encrypt(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(CipherKey::from_slice(key));
    let nonce = generate_nonce();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| ParamError::Encrypt(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt(key: &Key, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < NONCE_LEN {
        return Err(ParamError::MalformedNonce {
            expected: NONCE_LEN,
            actual: blob.len(),
        });
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(CipherKey::from_slice(key));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| ParamError::Authentication)?;
    Ok(Zeroizing::new(plaintext))
}
