//! Credential verification against the configured login and argon2 hash

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use guard::config::CredentialsConfig;
use tracing::warn;

/// Checks submitted credentials
#[derive(Clone)]
pub struct CredentialVerifier {
    login: String,
    password_hash: String,
}

impl CredentialVerifier {
    /// Create a verifier, rejecting a hash that is not a valid PHC string
    pub fn new(config: &CredentialsConfig) -> Result<Self> {
        if config.hash.is_empty() {
            warn!("No credentials configured, every login attempt will fail");
        } else {
            PasswordHash::new(&config.hash)
                .map_err(|e| anyhow::anyhow!("Invalid credentials.hash: {}", e))?;
        }

        Ok(Self {
            login: config.login.clone(),
            password_hash: config.hash.clone(),
        })
    }

    /// Verify a login/password pair
    pub fn verify(&self, login: &str, password: &str) -> bool {
        if self.password_hash.is_empty() || login != self.login {
            return false;
        }

        match PasswordHash::new(&self.password_hash) {
            Ok(parsed_hash) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Hash a password for the `credentials.hash` setting
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(password: &str) -> Result<CredentialsConfig> {
        Ok(CredentialsConfig {
            login: "admin".to_string(),
            hash: hash_password(password)?,
        })
    }

    #[test]
    fn test_verify_credentials() -> Result<()> {
        let verifier = CredentialVerifier::new(&config("s3cret!")?)?;

        assert!(verifier.verify("admin", "s3cret!"));
        assert!(!verifier.verify("admin", "wrong"));
        assert!(!verifier.verify("root", "s3cret!"));
        Ok(())
    }

    #[test]
    fn test_missing_hash_rejects_everything() -> Result<()> {
        let verifier = CredentialVerifier::new(&CredentialsConfig::default())?;
        assert!(!verifier.verify("", ""));
        Ok(())
    }

    #[test]
    fn test_invalid_hash_is_rejected() {
        let config = CredentialsConfig {
            login: "admin".to_string(),
            hash: "not-a-phc-string".to_string(),
        };
        assert!(CredentialVerifier::new(&config).is_err());
    }
}
