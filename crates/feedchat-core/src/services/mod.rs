pub mod chat;
pub mod feed;

pub use chat::ChatService;
pub use feed::{FeedItem, FeedService};

use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_URL: &str = "http://localhost:5000";

/// The feed and chat clients of one session. Credentials are attached and
/// detached on both in the same call.
#[derive(Clone, Debug)]
pub struct ServiceClients {
    feed: FeedService,
    chat: ChatService,
}

impl ServiceClients {
    pub fn new(feed: FeedService, chat: ChatService) -> Self {
        Self { feed, chat }
    }

    pub fn connect(feed_url: &str, chat_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            FeedService::new(feed_url, timeout)?,
            ChatService::new(chat_url, timeout)?,
        ))
    }

    pub fn feed(&self) -> &FeedService {
        &self.feed
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// The token attached to both clients, or `None` if either lacks one.
    pub fn attached_token(&self) -> Option<&str> {
        match (self.feed.client().bearer(), self.chat.client().bearer()) {
            (Some(feed), Some(chat)) if feed == chat => Some(feed),
            _ => None,
        }
    }

    pub(crate) fn attach(&mut self, token: &str) {
        self.feed.client_mut().attach(token);
        self.chat.client_mut().attach(token);
    }

    pub(crate) fn detach(&mut self) {
        self.feed.client_mut().detach();
        self.chat.client_mut().detach();
    }
}
