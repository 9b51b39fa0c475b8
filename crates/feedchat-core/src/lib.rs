pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod services;
pub mod session;
pub mod shell;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use chat::{ChatController, ChatRequest, ChatTicket, ChatTurn};
pub use client::ServiceClient;
pub use config::Config;
pub use error::{AuthError, ChatError, FetchError, StoreError, SubmitError};
pub use feed::{DraftPost, FeedController, FeedPost, FeedTicket, ImageFile, PostRequest};
pub use services::{ChatService, FeedItem, FeedService, ServiceClients};
pub use session::SessionController;
pub use shell::{AppShell, Surface, Workspace};
pub use state::{ChatMessage, Sender};
pub use store::{Credential, CredentialStore, FileStore, KeyValueStore, MemoryStore};
