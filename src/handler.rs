use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use feedchat_core::ChatTurn;
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, LoginField};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Completed(completion) => app.apply(completion),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on every surface
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.is_authenticated() {
        handle_main_key(app, key);
    } else {
        handle_login_key(app, key);
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) {
    // The alert blocks the form until dismissed
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_alert();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login.field = match app.login.field {
                LoginField::Username => LoginField::Password,
                LoginField::Password => LoginField::Username,
            };
        }
        KeyCode::Enter => match app.login.field {
            LoginField::Username => app.login.field = LoginField::Password,
            LoginField::Password => app.submit_login(),
        },
        // Fields are locked while a login request is in flight
        _ if app.login.submitting => {}
        KeyCode::Backspace => {
            login_field_mut(app).pop();
        }
        KeyCode::Char(c) => login_field_mut(app).push(c),
        _ => {}
    }
}

fn login_field_mut(app: &mut App) -> &mut String {
    match app.login.field {
        LoginField::Username => &mut app.login.username,
        LoginField::Password => &mut app.login.password,
    }
}

fn handle_main_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('l') if ctrl => {
            app.logout();
            return;
        }
        KeyCode::Char('r') if ctrl => {
            app.refresh_feed();
            return;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Feed => handle_feed_key(app, key),
        FocusPane::Image => handle_image_key(app, key),
        FocusPane::Caption => handle_caption_key(app, key),
        FocusPane::Chat => handle_chat_key(app, key),
    }
}

fn handle_feed_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.feed_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.feed_nav_up(),
        KeyCode::Char('r') => app.refresh_feed(),
        _ => {}
    }
}

fn handle_image_key(app: &mut App, key: KeyEvent) {
    // The form is locked while a post is being sent
    if app.posting {
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit_post(),
        KeyCode::Esc => app.image_input.clear(),
        KeyCode::Backspace => {
            app.image_input.pop();
        }
        KeyCode::Char(c) => app.image_input.push(c),
        _ => {}
    }
}

fn handle_caption_key(app: &mut App, key: KeyEvent) {
    if app.posting {
        return;
    }

    if key.code == KeyCode::Enter {
        app.submit_post();
        return;
    }

    let Some(caption) = app.caption_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => caption.clear(),
        KeyCode::Backspace => {
            caption.pop();
        }
        KeyCode::Char(c) => caption.push(c),
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::PageUp => {
            for _ in 0..5 {
                app.scroll_chat_up();
            }
            return;
        }
        KeyCode::PageDown => {
            for _ in 0..5 {
                app.scroll_chat_down();
            }
            return;
        }
        _ => {}
    }

    // Input is disabled while a reply is pending
    if app.chat_turn() != ChatTurn::Idle {
        return;
    }

    if key.code == KeyCode::Enter {
        app.submit_chat();
        return;
    }

    let mut cursor = app.chat_cursor;
    let Some(input) = app.chat_input_mut() else {
        return;
    };
    match key.code {
        KeyCode::Backspace => {
            if cursor > 0 {
                cursor -= 1;
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = input.chars().count();
            if cursor < char_count {
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = input.chars().count();
            cursor = (cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            cursor = 0;
        }
        KeyCode::End => {
            cursor = input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
            cursor += 1;
        }
        _ => {}
    }
    app.chat_cursor = cursor;
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if !app.is_authenticated() {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;

    // Position-based scrolling
    let in_feed = app.feed_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_add(3);
            } else if in_feed {
                app.feed_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_sub(3);
            } else if in_feed {
                app.feed_nav_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedchat_core::store::{TOKEN_KEY, USERNAME_KEY};
    use feedchat_core::{AppShell, CredentialStore, MemoryStore, ServiceClients, SessionController};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn app(store: MemoryStore) -> App {
        let clients =
            ServiceClients::connect("http://127.0.0.1:9", "http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let shell = AppShell::new(SessionController::new(CredentialStore::new(store), clients));
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(shell, tx)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 0), 0);
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 9), 6);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(10, 5, 4, 2);
        assert!(point_in_rect(10, 5, rect));
        assert!(point_in_rect(13, 6, rect));
        assert!(!point_in_rect(14, 5, rect));
        assert!(!point_in_rect(10, 7, rect));
    }

    #[tokio::test]
    async fn test_login_form_editing_and_submit() {
        let mut app = app(MemoryStore::new());
        type_str(&mut app, "admin");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "secret");
        press(&mut app, KeyCode::Backspace);

        assert_eq!(app.login.username, "admin");
        assert_eq!(app.login.password, "secre");
        assert_eq!(app.login.field, LoginField::Password);

        press(&mut app, KeyCode::Enter);
        assert!(app.login.submitting);

        // No resubmission or edits while the request is in flight
        type_str(&mut app, "x");
        assert_eq!(app.login.password, "secre");
    }

    #[tokio::test]
    async fn test_alert_blocks_form_until_dismissed() {
        let mut app = app(MemoryStore::new());
        app.alert = Some("Invalid credentials".to_string());

        type_str(&mut app, "abc");
        assert!(app.login.username.is_empty());

        press(&mut app, KeyCode::Enter);
        assert!(app.alert.is_none());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_chat_input_cursor_editing() {
        let mut app = app(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USERNAME_KEY, "admin")]));
        assert_eq!(app.focus, FocusPane::Chat);

        type_str(&mut app, "hllo");
        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('é'));
        assert_eq!(app.chat_input(), "héllo");
        assert_eq!(app.chat_cursor, 2);

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.chat_input(), "hllo");
    }

    #[tokio::test]
    async fn test_chat_input_locked_while_awaiting() {
        let mut app = app(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USERNAME_KEY, "admin")]));
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.chat_input(), "");
        assert_eq!(app.chat_cursor, 0);

        type_str(&mut app, "more");
        assert_eq!(app.chat_input(), "");
    }

    #[tokio::test]
    async fn test_post_form_locked_while_posting() {
        let mut app = app(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USERNAME_KEY, "admin")]));
        app.focus = FocusPane::Image;
        type_str(&mut app, "/tmp/a.png");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "first");
        press(&mut app, KeyCode::Enter);
        assert!(app.posting);

        type_str(&mut app, " more");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::BackTab);
        type_str(&mut app, "x");

        assert_eq!(app.caption(), "first");
        assert_eq!(app.image_input, "/tmp/a.png");
    }

    #[tokio::test]
    async fn test_logout_shortcut_returns_to_login() {
        let mut app = app(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USERNAME_KEY, "admin")]));
        assert!(app.is_authenticated());

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));

        assert!(!app.is_authenticated());
        assert_eq!(app.shell.clients().attached_token(), None);
    }
}
