//! Platform secure storage through the `keyring` crate.

use keyring::Entry;
use tracing::{debug, warn};

use super::{
    CredentialError, CredentialStore, Credentials, ORG_ID_ACCOUNT, SERVICE_NAME,
    SESSION_KEY_ACCOUNT,
};

/// Keychain / kernel keyring / Credential Manager backed store
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Store under the default `usagebar` service name
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Store under a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry, CredentialError> {
        Entry::new(&self.service, account).map_err(map_error)
    }

    /// Read one secret; a missing entry is `None`
    fn read(&self, account: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(account)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    fn write(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        self.entry(account)?.set_password(value).map_err(map_error)
    }

    fn remove(&self, account: &str) -> Result<(), CredentialError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let session_key = self.read(SESSION_KEY_ACCOUNT)?;
        let org_id = self.read(ORG_ID_ACCOUNT)?;

        match (session_key, org_id) {
            (Some(key), Some(org)) => match Credentials::new(&key, &org) {
                Ok(creds) => Ok(Some(creds)),
                Err(_) => {
                    warn!("Stored credentials are blank; ignoring them");
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        self.write(ORG_ID_ACCOUNT, credentials.org_id())?;
        self.write(SESSION_KEY_ACCOUNT, credentials.session_key())?;
        debug!("Saved credentials for org {}", credentials.org_id());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.remove(SESSION_KEY_ACCOUNT)?;
        self.remove(ORG_ID_ACCOUNT)
    }
}

/// Map keyring errors to our error type
fn map_error(error: keyring::Error) -> CredentialError {
    match error {
        keyring::Error::NoStorageAccess(platform_err)
        | keyring::Error::PlatformFailure(platform_err) => {
            CredentialError::Unavailable(platform_err.to_string())
        }
        other => CredentialError::Unavailable(other.to_string()),
    }
}
