//! Credential resolution across the current and legacy stores.
//!
//! The current store seals every column, including the principal name, so a
//! principal is found by decrypting names until one matches. Matches are
//! memoized in a [`PrincipalCache`] for the life of the process.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::{
    Cipher, CredentialPair, CredentialStore, EncryptedPair, Generation, KeyContext,
};

type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Process-lifetime memo of principal name to current-store row id.
///
/// Entries are added on a successful scan and never invalidated.
#[derive(Debug, Default)]
pub struct PrincipalCache {
    ids: Mutex<HashMap<String, i64>>,
}

impl PrincipalCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, principal: &str) -> Option<i64> {
        self.ids.lock().ok()?.get(principal).copied()
    }

    fn insert(&self, principal: &str, id: i64) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(principal.to_string(), id);
        }
    }

    /// Number of memoized principals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.lock().map_or(0, |ids| ids.len())
    }

    /// Whether nothing has been memoized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves a principal to a full credential pair.
pub struct CredentialResolver<'a> {
    store: &'a dyn CredentialStore,
    cipher: &'a dyn Cipher,
    cache: &'a PrincipalCache,
}

impl<'a> CredentialResolver<'a> {
    /// Creates a resolver over the given store, cipher and memo.
    #[must_use]
    pub fn new(
        store: &'a dyn CredentialStore,
        cipher: &'a dyn Cipher,
        cache: &'a PrincipalCache,
    ) -> Self {
        Self { store, cipher, cache }
    }

    /// Returns the principal's pair, preferring the current store.
    ///
    /// Store and cipher failures are logged and treated as "not found".
    #[must_use]
    pub fn resolve(&self, principal: &str) -> Option<CredentialPair> {
        let principal = principal.trim();
        match self.resolve_current(principal) {
            Ok(Some(pair)) => {
                tracing::debug!(principal, "credentials found in current store");
                return Some(pair);
            }
            Ok(None) => {}
            Err(e) => tracing::error!(principal, error = %e, "current credential store failed"),
        }
        match self.resolve_legacy(principal) {
            Ok(Some(pair)) => {
                tracing::debug!(principal, "credentials found in legacy store");
                Some(pair)
            }
            Ok(None) => {
                tracing::info!(principal, "no credentials in either store");
                None
            }
            Err(e) => {
                tracing::error!(principal, error = %e, "legacy credential store failed");
                None
            }
        }
    }

    /// Row id of the principal in the current store, scanning on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn current_id(&self, principal: &str) -> StoreResult<Option<i64>> {
        let principal = principal.trim();
        if let Some(id) = self.cache.get(principal) {
            return Ok(Some(id));
        }
        for row in self.store.current_principals()? {
            match self.cipher.decrypt(&row.encrypted_name, KeyContext::Decrypt) {
                Ok(name) if name.trim() == principal => {
                    self.cache.insert(principal, row.id);
                    return Ok(Some(row.id));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(id = row.id, error = %e, "undecryptable principal row"),
            }
        }
        Ok(None)
    }

    fn resolve_current(&self, principal: &str) -> StoreResult<Option<CredentialPair>> {
        let Some(id) = self.current_id(principal)? else {
            return Ok(None);
        };
        let Some(sealed) = self.store.current_pair(id)? else {
            return Ok(None);
        };
        self.open(&sealed, KeyContext::Decrypt, Generation::Current, principal)
    }

    fn resolve_legacy(&self, principal: &str) -> StoreResult<Option<CredentialPair>> {
        let Some(sealed) = self.store.legacy_pair(principal)? else {
            return Ok(None);
        };
        self.open(&sealed, KeyContext::Cookie, Generation::Legacy, principal)
    }

    /// Decrypts both halves; a pair with either half empty counts as absent.
    fn open(
        &self,
        sealed: &EncryptedPair,
        context: KeyContext,
        generation: Generation,
        principal: &str,
    ) -> StoreResult<Option<CredentialPair>> {
        let access_key = self.cipher.decrypt(&sealed.access_key, context)?;
        let access_secret = self.cipher.decrypt(&sealed.access_secret, context)?;
        if access_key.is_empty() || access_secret.is_empty() {
            return Ok(None);
        }
        Ok(Some(CredentialPair {
            access_key,
            access_secret,
            generation,
            principal: principal.to_string(),
        }))
    }
}

/// Seals and stores a pair for a principal.
///
/// The current store gets a new row with the name sealed under the decrypt
/// context; the legacy store is keyed by the plain name and sealed under the
/// cookie context.
///
/// # Errors
///
/// Returns an error if encryption or the store write fails.
pub fn store_credentials(
    store: &dyn CredentialStore,
    cipher: &dyn Cipher,
    principal: &str,
    access_key: &str,
    access_secret: &str,
    generation: Generation,
) -> StoreResult<()> {
    let principal = principal.trim();
    match generation {
        Generation::Current => {
            let sealed = EncryptedPair {
                access_key: cipher.encrypt(access_key, KeyContext::Decrypt)?,
                access_secret: cipher.encrypt(access_secret, KeyContext::Decrypt)?,
            };
            let name = cipher.encrypt(principal, KeyContext::Decrypt)?;
            let id = store.insert_current(&name, &sealed)?;
            tracing::info!(principal, id, "stored current credentials");
        }
        Generation::Legacy => {
            let sealed = EncryptedPair {
                access_key: cipher.encrypt(access_key, KeyContext::Cookie)?,
                access_secret: cipher.encrypt(access_secret, KeyContext::Cookie)?,
            };
            store.upsert_legacy(principal, &sealed)?;
            tracing::info!(principal, "stored legacy credentials");
        }
    }
    Ok(())
}

/// Removes a principal's row from the current store.
///
/// Returns whether a row was removed.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn forget_current(resolver: &CredentialResolver<'_>, principal: &str) -> StoreResult<bool> {
    match resolver.current_id(principal)? {
        Some(id) => resolver.store.delete_current(id),
        None => Ok(false),
    }
}
