#![allow(dead_code)]

use std::time::Duration;

use feedchat_core::store::{TOKEN_KEY, USERNAME_KEY};
use feedchat_core::{
    AppShell, ChatService, CredentialStore, FeedService, MemoryStore, ServiceClients, SessionController,
};
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "test_access_token";

pub struct Services {
    pub feed: MockServer,
    pub chat: MockServer,
}

impl Services {
    pub async fn start() -> Self {
        Self {
            feed: MockServer::start().await,
            chat: MockServer::start().await,
        }
    }

    pub fn clients(&self) -> ServiceClients {
        ServiceClients::new(
            FeedService::new(&self.feed.uri(), Duration::from_secs(5)).unwrap(),
            ChatService::new(&self.chat.uri(), Duration::from_secs(5)).unwrap(),
        )
    }

    pub fn session(&self, store: MemoryStore) -> SessionController {
        SessionController::new(CredentialStore::new(store), self.clients())
    }

    /// A shell that restored a saved session for `admin`.
    pub fn logged_in_shell(&self) -> AppShell {
        let store = MemoryStore::with_entries([(TOKEN_KEY, TEST_TOKEN), (USERNAME_KEY, "admin")]);
        let mut shell = AppShell::new(self.session(store));
        shell.start();
        shell
    }
}
