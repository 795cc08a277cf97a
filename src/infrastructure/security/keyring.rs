use crate::domain::error::{AppError, Result};
use keyring::Entry;

/// Secrets stored in the platform credential store under one service name.
pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, user: &str) -> Result<Entry> {
        Entry::new(&self.service, user).map_err(|e| {
            AppError::SecurityError(format!("Failed to open credential {}: {}", user, e))
        })
    }

    pub fn set_secret(&self, user: &str, secret: &str) -> Result<()> {
        if secret.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Refusing to store an empty secret".to_string(),
            ));
        }
        self.entry(user)?
            .set_password(secret)
            .map_err(|e| AppError::SecurityError(format!("Failed to store secret: {}", e)))
    }

    /// `Ok(None)` when nothing is stored for `user`.
    pub fn get_secret(&self, user: &str) -> Result<Option<String>> {
        match self.entry(user)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::SecurityError(format!(
                "Failed to read secret: {}",
                e
            ))),
        }
    }

    /// Deleting a missing secret is not an error.
    pub fn delete_secret(&self, user: &str) -> Result<()> {
        match self.entry(user)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AppError::SecurityError(format!(
                "Failed to delete secret: {}",
                e
            ))),
        }
    }
}
