//! The top-level auth gate between the login surface and the authenticated
//! feed + chat surface.

use crate::chat::ChatController;
use crate::error::AuthError;
use crate::feed::FeedController;
use crate::services::ServiceClients;
use crate::session::SessionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Login,
    Authenticated,
}

/// The controllers that exist only while a session is live. Dropped on
/// logout; a fresh one is mounted on every login.
pub struct Workspace {
    pub feed: FeedController,
    pub chat: ChatController,
    epoch: u64,
}

impl Workspace {
    fn mount(session: &SessionController) -> Self {
        Self {
            feed: FeedController::new(session.clients().feed().base_url()),
            chat: ChatController::new(),
            epoch: session.epoch(),
        }
    }

    /// The session epoch this workspace was mounted under.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

pub struct AppShell {
    session: SessionController,
    workspace: Option<Workspace>,
}

impl AppShell {
    pub fn new(session: SessionController) -> Self {
        Self {
            session,
            workspace: None,
        }
    }

    /// Restores a saved session, if any, and reports which surface to show.
    pub fn start(&mut self) -> Surface {
        if self.session.restore() {
            self.mount();
        }
        self.surface()
    }

    pub fn surface(&self) -> Surface {
        if self.session.is_logged_in() && self.workspace.is_some() {
            Surface::Authenticated
        } else {
            Surface::Login
        }
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        self.session.login(username, password).await?;
        self.mount();
        Ok(())
    }

    /// Applies the outcome of a token request that ran elsewhere.
    pub fn complete_login(&mut self, username: &str, result: Result<String, AuthError>) -> Result<(), AuthError> {
        let token = result?;
        self.session.establish(username, &token)?;
        self.mount();
        Ok(())
    }

    pub fn logout(&mut self) {
        self.workspace = None;
        self.session.logout();
    }

    fn mount(&mut self) {
        self.workspace = Some(Workspace::mount(&self.session));
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn clients(&self) -> &ServiceClients {
        self.session.clients()
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    pub fn workspace_mut(&mut self) -> Option<&mut Workspace> {
        self.workspace.as_mut()
    }

    /// The mounted workspace together with the clients it talks through.
    pub fn parts_mut(&mut self) -> Option<(&mut Workspace, &ServiceClients)> {
        let workspace = self.workspace.as_mut()?;
        Some((workspace, self.session.clients()))
    }

    /// Whether work started under `epoch` may still touch the workspace.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.session.is_current(epoch)
            && self.workspace.as_ref().is_some_and(|w| w.epoch == epoch)
    }
}
