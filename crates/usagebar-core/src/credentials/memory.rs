//! Process-local credential store.

use parking_lot::Mutex;

use super::{CredentialError, CredentialStore, Credentials};

/// Keeps credentials in memory only; used for environment-supplied
/// credentials, which must never be written to secure storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: Mutex<Option<Credentials>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given credentials
    pub fn holding(credentials: Credentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }

    #[cfg(test)]
    pub(crate) fn with(session_key: &str, org_id: &str) -> Self {
        Self::holding(Credentials {
            session_key: session_key.to_string(),
            org_id: org_id.to_string(),
        })
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.credentials.lock().clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        *self.credentials.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.credentials.lock() = None;
        Ok(())
    }
}
