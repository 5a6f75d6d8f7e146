//! Cipher port for the encrypted credential columns.

use std::fmt;

/// Which key a value was sealed with.
///
/// Legacy credential rows are sealed with the cookie key; current rows,
/// including their encrypted principal names, with the decrypt key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyContext {
    /// Key shared with the session-cookie layer.
    Cookie,
    /// Key dedicated to the current credential table.
    Decrypt,
}

impl KeyContext {
    /// Name of the key context as used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Decrypt => "decrypt",
        }
    }
}

impl fmt::Display for KeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symmetric encryption under one of two named keys.
pub trait Cipher: Send + Sync {
    /// Seals `value` under the key for `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unusable or encryption fails.
    fn encrypt(
        &self,
        value: &str,
        context: KeyContext,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Opens a value sealed under the key for `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed or was sealed under a
    /// different key.
    fn decrypt(
        &self,
        value: &str,
        context: KeyContext,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
