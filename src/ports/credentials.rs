//! Credential store port covering both credential table generations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which credential table a pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// `access_keys`, looked up by plain principal name.
    Legacy,
    /// `keys_new`, looked up by id after matching an encrypted name.
    Current,
}

/// A fully decrypted access key and secret for one principal.
///
/// Never partially populated: resolution yields a whole pair or nothing.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    /// OAuth access key.
    pub access_key: String,
    /// OAuth access secret.
    pub access_secret: String,
    /// Table generation the pair was read from.
    pub generation: Generation,
    /// Principal the pair belongs to.
    pub principal: String,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_key", &"<redacted>")
            .field("access_secret", &"<redacted>")
            .field("generation", &self.generation)
            .field("principal", &self.principal)
            .finish()
    }
}

/// Key and secret as stored, still sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPair {
    /// Sealed access key.
    pub access_key: String,
    /// Sealed access secret.
    pub access_secret: String,
}

/// One row of the current table's id/name index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRow {
    /// Row id.
    pub id: i64,
    /// Principal name sealed under the decrypt key.
    pub encrypted_name: String,
}

/// Read and write access to the two credential tables.
pub trait CredentialStore: Send + Sync {
    /// Lists every id/encrypted-name pair of the current table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be queried.
    fn current_principals(
        &self,
    ) -> Result<Vec<PrincipalRow>, Box<dyn std::error::Error + Send + Sync>>;

    /// Fetches the sealed pair stored under a current-table id.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be queried.
    fn current_pair(
        &self,
        id: i64,
    ) -> Result<Option<EncryptedPair>, Box<dyn std::error::Error + Send + Sync>>;

    /// Fetches the sealed pair stored for a principal in the legacy table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be queried.
    fn legacy_pair(
        &self,
        principal: &str,
    ) -> Result<Option<EncryptedPair>, Box<dyn std::error::Error + Send + Sync>>;

    /// Inserts a row into the current table and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert_current(
        &self,
        encrypted_name: &str,
        pair: &EncryptedPair,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;

    /// Inserts or replaces a principal's row in the legacy table.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn upsert_legacy(
        &self,
        principal: &str,
        pair: &EncryptedPair,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Deletes a current-table row. Returns `true` when a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_current(&self, id: i64) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
