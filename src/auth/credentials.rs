use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::SaltString;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::directory::{Directory, DirectoryError, SubjectProfile};

use super::claims::PlatformClaims;

/// Credential check failure. Unknown subject, inactive subject, inactive
/// school and wrong password all collapse into `InvalidCredentials` so a
/// login response cannot be used to probe for accounts.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Stateless credential verifier for tenant users and the configured
/// platform operator.
pub struct CredentialVerifier {
    directory: Arc<dyn Directory>,
    operator_email: Option<String>,
    operator_password_hash: Option<String>,
}

impl CredentialVerifier {
    pub fn new(directory: Arc<dyn Directory>, auth: &AuthConfig) -> Self {
        Self {
            directory,
            operator_email: auth.operator_email.clone(),
            operator_password_hash: auth.operator_password_hash.clone(),
        }
    }

    /// Verify a tenant login against the directory. Succeeds only for an
    /// active subject of an active school with a matching password.
    pub async fn verify_tenant(
        &self,
        school_id: &str,
        email: &str,
        password: &str,
    ) -> Result<SubjectProfile, CredentialError> {
        if !self.directory.school_active(school_id).await? {
            return Err(CredentialError::InvalidCredentials);
        }

        let subject = self
            .directory
            .find_subject_by_email(school_id, email)
            .await?
            .filter(|s| s.active)
            .ok_or(CredentialError::InvalidCredentials)?;

        if !verify_password(password, &subject.password_hash) {
            return Err(CredentialError::InvalidCredentials);
        }

        Ok(subject)
    }

    pub fn operator_configured(&self) -> bool {
        self.operator_email.is_some() && self.operator_password_hash.is_some()
    }

    /// Verify the platform operator. The operator is provisioned via
    /// configuration; when no credentials are configured, platform login is
    /// disabled outright.
    pub fn verify_operator(&self, email: &str, password: &str) -> Result<PlatformClaims, CredentialError> {
        let (op_email, op_hash) = match (&self.operator_email, &self.operator_password_hash) {
            (Some(e), Some(h)) => (e, h),
            _ => return Err(CredentialError::InvalidCredentials),
        };

        if !email.eq_ignore_ascii_case(op_email) || !verify_password(password, op_hash) {
            return Err(CredentialError::InvalidCredentials);
        }

        Ok(PlatformClaims {
            // Stable synthetic subject id derived from nothing persistent;
            // the operator has no directory row.
            sub: Uuid::new_v5(&Uuid::NAMESPACE_OID, op_email.as_bytes()),
            email: op_email.clone(),
            cross_tenant: true,
            iat: 0,
            exp: 0,
        })
    }
}

/// Check a password against an Argon2 PHC string. An unparsable stored
/// hash counts as a failed verification, not an error.
pub fn verify_password(password: &str, phc_hash: &str) -> bool {
    match PasswordHash::new(phc_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hash a password to an Argon2 PHC string. Used by provisioning tooling
/// and test fixtures; the core itself never stores new passwords.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .unwrap_or_default()
}
