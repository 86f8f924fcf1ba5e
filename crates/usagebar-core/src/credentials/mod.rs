//! Credential storage for the claude.ai session key and organization ID.
//!
//! Secrets live in platform secure storage (macOS Keychain, Linux kernel keyring,
//! Windows Credential Manager) under the service name `usagebar`, one entry
//! per secret keyed by a fixed account name.

mod keychain;
mod memory;

use std::fmt;

use thiserror::Error;

pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// Service name for all stored secrets
pub const SERVICE_NAME: &str = "usagebar";
/// Account name of the session key entry
pub const SESSION_KEY_ACCOUNT: &str = "sessionKey";
/// Account name of the organization ID entry
pub const ORG_ID_ACCOUNT: &str = "orgId";

/// Environment variable carrying a session key (skips secure storage)
pub const SESSION_KEY_ENV: &str = "USAGEBAR_SESSION_KEY";
/// Environment variable carrying an organization ID (skips secure storage)
pub const ORG_ID_ENV: &str = "USAGEBAR_ORG_ID";

/// Credential store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Session key or organization ID is blank
    #[error("Session key and organization ID are both required")]
    Invalid,

    /// Secure storage could not be read or written
    #[error("Secure storage unavailable: {0}")]
    Unavailable(String),
}

/// Session key and organization ID for one claude.ai account
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    session_key: String,
    org_id: String,
}

impl Credentials {
    /// Trim both values; either one blank is `CredentialError::Invalid`
    pub fn new(session_key: &str, org_id: &str) -> Result<Self, CredentialError> {
        let session_key = session_key.trim();
        let org_id = org_id.trim();
        if session_key.is_empty() || org_id.is_empty() {
            return Err(CredentialError::Invalid);
        }
        Ok(Self {
            session_key: session_key.to_string(),
            org_id: org_id.to_string(),
        })
    }

    /// Read credentials from `USAGEBAR_SESSION_KEY` / `USAGEBAR_ORG_ID`
    pub fn from_env() -> Option<Self> {
        let session_key = std::env::var(SESSION_KEY_ENV).ok()?;
        let org_id = std::env::var(ORG_ID_ENV).ok()?;
        Self::new(&session_key, &org_id).ok()
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("session_key", &"<redacted>")
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// Persistent home for one set of credentials
pub trait CredentialStore: Send + Sync {
    /// Stored credentials; `Ok(None)` when nothing (or only half) is stored
    fn load(&self) -> Result<Option<Credentials>, CredentialError>;

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError>;

    /// Remove both secrets; removing missing entries is not an error
    fn clear(&self) -> Result<(), CredentialError>;
}
