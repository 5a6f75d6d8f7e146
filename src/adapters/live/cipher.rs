//! AES-256-GCM implementation of the `Cipher` port.
//!
//! Sealed values are `base64(nonce || ciphertext)` with a fresh 96-bit nonce
//! per value.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::ports::cipher::{Cipher, KeyContext};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Cipher holding one key per [`KeyContext`].
pub struct AesGcmCipher {
    cookie: Aes256Gcm,
    decrypt: Aes256Gcm,
}

impl AesGcmCipher {
    /// Builds a cipher from two base64-encoded 32-byte keys.
    ///
    /// # Errors
    ///
    /// Returns an error naming the key context whose key is malformed.
    pub fn from_base64(cookie_key: &str, decrypt_key: &str) -> Result<Self, String> {
        Ok(Self {
            cookie: load_key(cookie_key, KeyContext::Cookie)?,
            decrypt: load_key(decrypt_key, KeyContext::Decrypt)?,
        })
    }

    fn cipher_for(&self, context: KeyContext) -> &Aes256Gcm {
        match context {
            KeyContext::Cookie => &self.cookie,
            KeyContext::Decrypt => &self.decrypt,
        }
    }
}

fn load_key(encoded: &str, context: KeyContext) -> Result<Aes256Gcm, String> {
    let raw = BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|e| format!("{context} key is not valid base64: {e}"))?;
    if raw.len() != KEY_LEN {
        return Err(format!("{context} key must be {KEY_LEN} bytes, got {}", raw.len()));
    }
    Aes256Gcm::new_from_slice(&raw).map_err(|_| format!("{context} key rejected by AES-GCM"))
}

impl Cipher for AesGcmCipher {
    fn encrypt(
        &self,
        value: &str,
        context: KeyContext,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher_for(context)
            .encrypt(Nonce::from_slice(&nonce_bytes), value.as_bytes())
            .map_err(|_| format!("encryption failed under {context} key"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    fn decrypt(
        &self,
        value: &str,
        context: KeyContext,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let sealed = BASE64.decode(value.trim().as_bytes())?;
        if sealed.len() <= NONCE_LEN {
            return Err(format!("sealed value too short for {context} key").into());
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher_for(context)
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| format!("value was not sealed under the {context} key"))?;
        Ok(String::from_utf8(plaintext)?)
    }
}
