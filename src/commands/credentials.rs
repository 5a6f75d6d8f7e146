//! `mdpublish credentials` command.

use crate::adapters::live::cipher::AesGcmCipher;
use crate::adapters::live::sqlite::SqliteStore;
use crate::cli::CredentialsAction;
use crate::config::Settings;
use crate::ports::Generation;
use crate::publish::credentials::{
    forget_current, store_credentials, CredentialResolver, PrincipalCache,
};
use crate::publish::request::format_user;

/// Execute a `credentials` subcommand.
///
/// Principal names go through the same normalization as publish requests.
///
/// # Errors
///
/// Returns an error string if a cipher key is missing, the database cannot
/// be opened, or the store operation fails.
pub fn run(settings: &Settings, action: &CredentialsAction) -> Result<(), String> {
    let (cookie_key, decrypt_key) = settings.cipher_keys().map_err(|e| e.to_string())?;
    let cipher = AesGcmCipher::from_base64(cookie_key, decrypt_key)?;
    let store = SqliteStore::open(&settings.db_path)
        .map_err(|e| format!("Failed to open database {}: {e}", settings.db_path.display()))?;

    match action {
        CredentialsAction::Set { user, key, secret, legacy } => {
            let user = format_user(user);
            let generation = if *legacy { Generation::Legacy } else { Generation::Current };
            store_credentials(&store, &cipher, &user, key, secret, generation)
                .map_err(|e| format!("Failed to store credentials: {e}"))?;
            println!("Stored {generation:?} credentials for {user}.");
        }
        CredentialsAction::Delete { user } => {
            let user = format_user(user);
            let cache = PrincipalCache::new();
            let resolver = CredentialResolver::new(&store, &cipher, &cache);
            let removed = forget_current(&resolver, &user)
                .map_err(|e| format!("Failed to delete credentials: {e}"))?;
            if removed {
                println!("Deleted credentials for {user}.");
            } else {
                println!("No current credentials for {user}.");
            }
        }
    }
    Ok(())
}
