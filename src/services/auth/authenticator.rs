use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::repos::user_directory::UserDirectory;
use crate::services::auth::error::AuthError;
use crate::services::auth::password::PasswordHasher;
use crate::services::auth::principal::Principal;

/// Credential check used by login.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the principal on success, `AuthError::InvalidCredentials`
    /// whether the username or the password was wrong.
    async fn verify(&self, username: &str, password: &str) -> Result<Principal, AuthError>;
}

/// Directory lookup + password hash comparison.
///
/// Unknown usernames are checked against a throwaway hash so both failure
/// paths pay the same hashing cost.
#[derive(Clone)]
pub struct DirectoryAuthenticator {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: Option<String>,
}

impl DirectoryAuthenticator {
    pub fn new(directory: Arc<dyn UserDirectory>, hasher: Arc<dyn PasswordHasher>) -> Self {
        let dummy_hash = hasher
            .hash("unknown-user-placeholder")
            .inspect_err(|e| warn!(error = %e, "could not prepare dummy password hash"))
            .ok();

        Self {
            directory,
            hasher,
            dummy_hash,
        }
    }
}

#[async_trait]
impl Authenticator for DirectoryAuthenticator {
    async fn verify(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let Some(account) = self.directory.find_by_username(username).await? else {
            if let Some(dummy) = &self.dummy_hash {
                self.hasher.verify(password, dummy);
            }
            debug!(username = %username, "credentials rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &account.password_hash) {
            debug!(username = %username, "credentials rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account.principal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::user_directory::{InMemoryUserDirectory, UserAccount};
    use crate::services::auth::password::{Argon2PasswordHasher, PasswordError};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn authenticator() -> DirectoryAuthenticator {
        let hasher = Argon2PasswordHasher;
        let directory = InMemoryUserDirectory::new().with_account(UserAccount {
            username: "t_admin".into(),
            password_hash: hasher.hash("Admin2023").unwrap(),
            authorities: BTreeSet::from(["ROLE_ADMIN".to_string()]),
        });
        DirectoryAuthenticator::new(Arc::new(directory), Arc::new(hasher))
    }

    #[tokio::test]
    async fn correct_credentials_yield_directory_principal() {
        let p = authenticator().verify("t_admin", "Admin2023").await.unwrap();
        assert_eq!(p, Principal::new("t_admin", ["ROLE_ADMIN"]));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let auth = authenticator();

        let wrong_password = auth.verify("t_admin", "nope").await.unwrap_err();
        let unknown_user = auth.verify("ghost", "Admin2023").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    /// Counts `verify` calls, delegating to Argon2.
    #[derive(Default)]
    struct CountingHasher {
        verifies: AtomicUsize,
    }

    impl PasswordHasher for CountingHasher {
        fn hash(&self, plain: &str) -> Result<String, PasswordError> {
            Argon2PasswordHasher.hash(plain)
        }

        fn verify(&self, plain: &str, hashed: &str) -> bool {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            Argon2PasswordHasher.verify(plain, hashed)
        }
    }

    #[tokio::test]
    async fn unknown_user_still_pays_for_a_hash_check() {
        let hasher = Arc::new(CountingHasher::default());
        let directory = InMemoryUserDirectory::new().with_account(UserAccount {
            username: "t_admin".into(),
            password_hash: hasher.hash("Admin2023").unwrap(),
            authorities: BTreeSet::from(["ROLE_ADMIN".to_string()]),
        });
        let auth = DirectoryAuthenticator::new(Arc::new(directory), hasher.clone());

        assert!(auth.verify("ghost", "Admin2023").await.is_err());
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 1);

        assert!(auth.verify("t_admin", "nope").await.is_err());
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 2);
    }
}
