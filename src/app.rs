use std::path::Path;

use feedchat_core::{AppShell, ChatTurn, FeedPost, ImageFile, Surface};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::{mpsc::UnboundedSender, watch};
use tracing::debug;

use crate::tasks::{self, Completion};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Feed,
    Image,
    Caption,
    Chat,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Feed => FocusPane::Image,
            FocusPane::Image => FocusPane::Caption,
            FocusPane::Caption => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Feed,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusPane::Feed => FocusPane::Chat,
            FocusPane::Image => FocusPane::Feed,
            FocusPane::Caption => FocusPane::Image,
            FocusPane::Chat => FocusPane::Caption,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub field: LoginField,
    pub submitting: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            field: LoginField::Username,
            submitting: false,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub shell: AppShell,
    events: UnboundedSender<AppEvent>,

    // Login surface
    pub login: LoginForm,
    pub alert: Option<String>,

    // Authenticated surface
    pub focus: FocusPane,
    pub image_input: String,
    pub posting: bool,
    pub status: Option<String>,
    pub feed_state: ListState,
    pub chat_cursor: usize, // cursor position in the chat input, in chars
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    transcript_rx: Option<watch::Receiver<usize>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub feed_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(shell: AppShell, events: UnboundedSender<AppEvent>) -> Self {
        let mut app = Self {
            should_quit: false,
            shell,
            events,

            login: LoginForm::default(),
            alert: None,

            focus: FocusPane::Chat,
            image_input: String::new(),
            posting: false,
            status: None,
            feed_state: ListState::default(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            transcript_rx: None,

            animation_frame: 0,

            feed_area: None,
            chat_area: None,
        };

        if app.shell.start() == Surface::Authenticated {
            app.on_mount();
        }
        app
    }

    pub fn is_authenticated(&self) -> bool {
        self.shell.surface() == Surface::Authenticated
    }

    pub fn username(&self) -> Option<&str> {
        self.shell.session().username()
    }

    /// Resets the authenticated surface for a freshly mounted workspace and
    /// loads the feed.
    fn on_mount(&mut self) {
        self.focus = FocusPane::Chat;
        self.image_input.clear();
        self.posting = false;
        self.status = None;
        self.feed_state = ListState::default();
        self.chat_cursor = 0;
        self.chat_scroll = 0;
        self.transcript_rx = self.shell.workspace().map(|w| w.chat.subscribe());
        self.refresh_feed();
    }

    // Login surface
    pub fn submit_login(&mut self) {
        if self.login.submitting || self.login.username.trim().is_empty() {
            return;
        }

        self.login.submitting = true;
        tasks::spawn_login(
            self.events.clone(),
            self.shell.clients().feed().clone(),
            self.shell.session().epoch(),
            self.login.username.trim().to_string(),
            self.login.password.clone(),
        );
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn logout(&mut self) {
        self.shell.logout();
        self.login = LoginForm::default();
        self.alert = None;
        self.transcript_rx = None;
        self.feed_area = None;
        self.chat_area = None;
    }

    // Feed
    pub fn refresh_feed(&mut self) {
        let epoch = self.shell.session().epoch();
        let service = self.shell.clients().feed().clone();
        let Some(workspace) = self.shell.workspace_mut() else {
            return;
        };

        let ticket = workspace.feed.begin_load();
        tasks::spawn_feed_load(self.events.clone(), service, epoch, ticket);
    }

    pub fn caption_mut(&mut self) -> Option<&mut String> {
        self.shell.workspace_mut().map(|w| &mut w.feed.draft_mut().caption)
    }

    pub fn caption(&self) -> &str {
        self.shell
            .workspace()
            .map(|w| w.feed.draft().caption.as_str())
            .unwrap_or("")
    }

    pub fn posts(&self) -> &[FeedPost] {
        self.shell.workspace().map(|w| w.feed.posts()).unwrap_or(&[])
    }

    /// Stages the typed image path (if any) and sends the draft.
    pub fn submit_post(&mut self) {
        if self.posting {
            return;
        }

        let image = match self.image_input.trim() {
            "" => None,
            path => match ImageFile::from_path(path) {
                Ok(image) => Some(image),
                Err(e) => {
                    self.status = Some(e.to_string());
                    return;
                }
            },
        };

        let epoch = self.shell.session().epoch();
        let service = self.shell.clients().feed().clone();
        let Some(workspace) = self.shell.workspace_mut() else {
            return;
        };

        workspace.feed.draft_mut().image = image;
        let request = workspace.feed.begin_submit();
        self.posting = true;
        self.status = Some("Posting...".to_string());
        tasks::spawn_post(self.events.clone(), service, epoch, request);
    }

    pub fn feed_nav_down(&mut self) {
        let len = self.posts().len();
        if len > 0 {
            let i = self.feed_state.selected().unwrap_or(0);
            self.feed_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn feed_nav_up(&mut self) {
        let i = self.feed_state.selected().unwrap_or(0);
        self.feed_state.select(Some(i.saturating_sub(1)));
    }

    // Chat
    pub fn chat_input(&self) -> &str {
        self.shell.workspace().map(|w| w.chat.input()).unwrap_or("")
    }

    pub fn chat_input_mut(&mut self) -> Option<&mut String> {
        self.shell.workspace_mut().map(|w| w.chat.input_mut())
    }

    pub fn chat_turn(&self) -> ChatTurn {
        self.shell
            .workspace()
            .map(|w| w.chat.turn())
            .unwrap_or_default()
    }

    pub fn submit_chat(&mut self) {
        let epoch = self.shell.session().epoch();
        let service = self.shell.clients().chat().clone();
        let username = self.shell.session().username().map(str::to_string);
        let Some(workspace) = self.shell.workspace_mut() else {
            return;
        };

        if let Some(request) = workspace.chat.submit_input(username.as_deref()) {
            self.chat_cursor = 0;
            tasks::spawn_chat(self.events.clone(), service, epoch, request);
        }
    }

    /// Scrolls the transcript to the bottom whenever the chat controller
    /// reports an append.
    pub fn sync_chat_scroll(&mut self) {
        let appended = match self.transcript_rx.as_mut() {
            Some(rx) if rx.has_changed().unwrap_or(false) => {
                rx.borrow_and_update();
                true
            }
            _ => false,
        };
        if appended {
            self.scroll_chat_to_bottom();
        }
    }

    /// Scroll chat to bottom so the latest entry (and "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        if let Some(workspace) = self.shell.workspace() {
            for msg in workspace.chat.transcript() {
                total_lines = total_lines.saturating_add(1); // Sender line ("You:" or "Bot:")
                for line in msg.text.lines() {
                    // Use character count, not byte length, for proper UTF-8 handling
                    let char_count = line.chars().count();
                    total_lines = total_lines.saturating_add((char_count / wrap_width) + 1);
                }
                total_lines = total_lines.saturating_add(1); // Blank line after message
            }
            if !workspace.chat.is_idle() {
                total_lines = total_lines.saturating_add(2); // "Bot:" + "Thinking..."
            }
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        // Paragraph scroll offsets are u16
        let offset = total_lines.saturating_sub(visible_height as usize);
        self.chat_scroll = u16::try_from(offset).unwrap_or(u16::MAX);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat_turn() == ChatTurn::AwaitingResponse || self.login.submitting {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Applies a finished background request, unless the session or workspace
    /// it was started for is gone.
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Login { epoch, username, result } => {
                if self.is_authenticated() || !self.shell.session().is_current(epoch) {
                    debug!("Discarding login result for a finished login attempt");
                    return;
                }
                self.login.submitting = false;
                match self.shell.complete_login(&username, result) {
                    Ok(()) => {
                        self.login = LoginForm::default();
                        self.on_mount();
                    }
                    Err(e) => {
                        self.login.password.clear();
                        self.alert = Some(e.alert_message());
                    }
                }
            }
            Completion::Feed { epoch, ticket, result } => {
                if !self.shell.is_current(epoch) {
                    debug!("Discarding feed result from a previous session");
                    return;
                }
                if let Some(workspace) = self.shell.workspace_mut() {
                    if workspace.feed.apply_load(ticket, result).is_ok() {
                        let len = workspace.feed.posts().len();
                        match self.feed_state.selected() {
                            _ if len == 0 => self.feed_state.select(None),
                            Some(i) if i >= len => self.feed_state.select(Some(len - 1)),
                            None => self.feed_state.select(Some(0)),
                            Some(_) => {}
                        }
                    }
                }
            }
            Completion::Post { epoch, request, result } => {
                if !self.shell.is_current(epoch) {
                    debug!("Discarding post result from a previous session");
                    return;
                }
                self.posting = false;
                let Some(workspace) = self.shell.workspace_mut() else {
                    return;
                };
                match workspace.feed.finish_submit(&request, result) {
                    Ok(()) => {
                        let typed = self.image_input.trim();
                        let submitted = request.image.as_ref().map(|image| image.path());
                        if submitted == Some(Path::new(typed)) {
                            self.image_input.clear();
                        }
                        self.status = None;
                        self.refresh_feed();
                    }
                    Err(e) => {
                        self.status = Some(format!("Could not post: {e}"));
                    }
                }
            }
            Completion::Chat { epoch, ticket, result } => {
                if !self.shell.is_current(epoch) {
                    debug!("Discarding chat reply from a previous session");
                    return;
                }
                if let Some(workspace) = self.shell.workspace_mut() {
                    workspace.chat.resolve(ticket, result);
                }
            }
        }
    }
}
