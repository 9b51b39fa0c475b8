//! Login, logout and session restore.

use tracing::{info, warn};

use crate::error::AuthError;
use crate::services::ServiceClients;
use crate::store::{Credential, CredentialStore};

/// Owns the current credential and is the only writer of the credential
/// attached to the service clients.
///
/// Every login and logout bumps the session epoch. Work started under one
/// epoch must be discarded once the epoch has moved on.
pub struct SessionController {
    store: CredentialStore,
    clients: ServiceClients,
    credential: Option<Credential>,
    epoch: u64,
}

impl SessionController {
    pub fn new(store: CredentialStore, clients: ServiceClients) -> Self {
        Self {
            store,
            clients,
            credential: None,
            epoch: 0,
        }
    }

    /// Trusts a stored token without asking the service.
    pub fn restore(&mut self) -> bool {
        let Some(credential) = self.store.load() else {
            return false;
        };

        self.clients.attach(&credential.token);
        info!(
            username = credential.username.as_deref().unwrap_or("<none>"),
            "Restored saved session"
        );
        self.credential = Some(credential);
        self.epoch += 1;
        true
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let token = match self.clients.feed().request_token(username, password).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, username, "Login failed");
                return Err(e);
            }
        };
        self.establish(username, &token)
    }

    /// Adopts a token issued for `username`. Persists first; nothing is
    /// attached if the store write fails.
    pub fn establish(&mut self, username: &str, token: &str) -> Result<(), AuthError> {
        if let Err(e) = self.store.save(token, username) {
            warn!(error = %e, "Could not persist credential");
            return Err(e.into());
        }

        self.clients.attach(token);
        self.credential = Some(Credential {
            token: token.to_string(),
            username: Some(username.to_string()),
        });
        self.epoch += 1;
        info!(username, "Logged in");
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Could not clear stored credential");
        }
        self.clients.detach();
        self.credential = None;
        self.epoch += 1;
        info!("Logged out");
    }

    pub fn is_logged_in(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.credential.as_ref()?.username.as_deref()
    }

    pub fn clients(&self) -> &ServiceClients {
        &self.clients
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{DEFAULT_CHAT_URL, DEFAULT_FEED_URL};
    use crate::store::{MemoryStore, TOKEN_KEY, USERNAME_KEY};
    use std::time::Duration;

    fn clients() -> ServiceClients {
        ServiceClients::connect(DEFAULT_FEED_URL, DEFAULT_CHAT_URL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_restore_without_token() {
        let mut session = SessionController::new(CredentialStore::new(MemoryStore::new()), clients());
        assert!(!session.restore());
        assert!(!session.is_logged_in());
        assert_eq!(session.clients().attached_token(), None);
        assert_eq!(session.epoch(), 0);
    }

    #[test]
    fn test_restore_attaches_stored_token() {
        let store = MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USERNAME_KEY, "admin")]);
        let mut session = SessionController::new(CredentialStore::new(store), clients());

        assert!(session.restore());
        assert!(session.is_logged_in());
        assert_eq!(session.username(), Some("admin"));
        assert_eq!(session.clients().attached_token(), Some("abc"));
    }

    #[test]
    fn test_establish_persists_and_attaches() {
        let mut session = SessionController::new(CredentialStore::new(MemoryStore::new()), clients());
        session.establish("admin", "abc").unwrap();

        assert!(session.is_logged_in());
        assert_eq!(session.clients().attached_token(), Some("abc"));
        assert_eq!(
            session.store().load(),
            Some(Credential {
                token: "abc".to_string(),
                username: Some("admin".to_string()),
            })
        );
    }

    #[test]
    fn test_logout_clears_everything() {
        let store = MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USERNAME_KEY, "admin")]);
        let mut session = SessionController::new(CredentialStore::new(store), clients());
        session.restore();

        session.logout();

        assert!(!session.is_logged_in());
        assert_eq!(session.clients().feed().client().bearer(), None);
        assert_eq!(session.clients().chat().client().bearer(), None);
        assert_eq!(session.store().load(), None);
    }

    #[test]
    fn test_logout_when_logged_out_is_harmless() {
        let mut session = SessionController::new(CredentialStore::new(MemoryStore::new()), clients());
        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(session.clients().attached_token(), None);
    }

    #[test]
    fn test_every_transition_moves_the_epoch() {
        let mut session = SessionController::new(CredentialStore::new(MemoryStore::new()), clients());
        let start = session.epoch();

        session.establish("admin", "abc").unwrap();
        let logged_in = session.epoch();
        assert!(!session.is_current(start));

        session.logout();
        assert!(!session.is_current(logged_in));
        assert!(session.is_current(session.epoch()));
    }
}
