use feedchat_core::{ChatTurn, Sender};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, LoginField};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.is_authenticated() {
        render_main_screen(app, frame, body_area);
    } else {
        render_login_screen(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    // The alert sits above everything else
    if let Some(message) = &app.alert {
        render_alert(message, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Feed & Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if app.is_authenticated() {
        let user = app.username().unwrap_or(feedchat_core::chat::ANONYMOUS);
        spans.push(Span::raw("  "));
        spans.push(Span::styled(user.to_string(), Style::default().fg(Color::White).bold()));
        spans.push(Span::styled("  (Ctrl+L to log out)", Style::default().fg(Color::Gray)));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.is_authenticated() {
        let text = match app.focus {
            FocusPane::Feed => " FEED ",
            FocusPane::Image | FocusPane::Caption => " POST ",
            FocusPane::Chat => " CHAT ",
        };
        (text, Style::default().bg(Color::Blue).fg(Color::White))
    } else {
        (" LOGIN ", Style::default().bg(Color::Yellow).fg(Color::Black))
    };

    let hints = if !app.is_authenticated() {
        "Tab: switch field | Enter: next/sign in | Esc: quit"
    } else {
        match app.focus {
            FocusPane::Feed => "j/k: scroll | r: refresh | Tab: focus | q: quit",
            FocusPane::Image | FocusPane::Caption => "Enter: post | Esc: clear | Tab: focus | Ctrl+R: refresh",
            FocusPane::Chat => "Enter: send | PgUp/PgDn: scroll | Tab: focus | Ctrl+C: quit",
        }
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_login_screen(app: &App, frame: &mut Frame, area: Rect) {
    let form_width = 44.min(area.width.saturating_sub(4));
    let form_height = 9;
    let form_x = area.x + (area.width.saturating_sub(form_width)) / 2;
    let form_y = area.y + (area.height.saturating_sub(form_height)) / 2;
    let form_area = Rect::new(form_x, form_y, form_width, form_height.min(area.height));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Sign in ");
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let [user_area, pass_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(inner);

    let field_block = |title: &'static str, focused: bool| {
        let color = if focused { Color::Yellow } else { Color::DarkGray };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(title)
    };

    let username_focused = app.login.field == LoginField::Username;
    let username = Paragraph::new(app.login.username.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(field_block(" Username ", username_focused));
    frame.render_widget(username, user_area);

    // Mask the password
    let masked = "*".repeat(app.login.password.chars().count());
    let password = Paragraph::new(masked)
        .style(Style::default().fg(Color::Cyan))
        .block(field_block(" Password ", !username_focused));
    frame.render_widget(password, pass_area);

    if app.login.submitting {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let status = Paragraph::new(format!("Signing in{}", dots))
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
        frame.render_widget(status, status_area);
    } else if app.alert.is_none() {
        let (field_area, len) = match app.login.field {
            LoginField::Username => (user_area, app.login.username.chars().count()),
            LoginField::Password => (pass_area, app.login.password.chars().count()),
        };
        let cursor_x = (len as u16).min(field_area.width.saturating_sub(3));
        frame.set_cursor_position((field_area.x + cursor_x + 1, field_area.y + 1));
    }
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height.min(area.height));

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Login failed ");

    let text = Text::from(vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red).bold())),
        Line::default(),
        Line::from(Span::styled("Press Enter to dismiss", Style::default().fg(Color::DarkGray))),
    ]);

    let alert = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(alert, popup_area);
}

fn render_main_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Feed on the left, chat on the right
    let [feed_area, chat_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    render_feed_panel(app, frame, feed_area);
    render_chat_panel(app, frame, chat_area);
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

fn render_feed_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let [form_area, list_area] = Layout::vertical([
        Constraint::Length(8),
        Constraint::Min(0),
    ])
    .areas(area);

    app.feed_area = Some(list_area);

    // Create-post form
    let posting_focused = matches!(app.focus, FocusPane::Image | FocusPane::Caption);
    let form_title = if app.posting { " Create Post (posting...) " } else { " Create Post " };
    let form_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(posting_focused)))
        .title(form_title);
    let form_inner = form_block.inner(form_area);
    frame.render_widget(form_block, form_area);

    let [image_area, caption_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(form_inner);

    render_text_field(
        frame,
        image_area,
        " Image path (png, jpg, gif, webp, bmp) ",
        &app.image_input,
        app.focus == FocusPane::Image,
    );
    let caption = app.caption().to_string();
    render_text_field(
        frame,
        caption_area,
        " Caption ",
        &caption,
        app.focus == FocusPane::Caption,
    );

    // Posts
    let items: Vec<ListItem> = app
        .shell
        .workspace()
        .map(|w| w.feed.posts())
        .unwrap_or(&[])
        .iter()
        .map(|post| {
            let mut header = vec![Span::styled(
                format!("@{}", post.author),
                Style::default().fg(Color::Cyan).bold(),
            )];
            if let Some(posted_at) = &post.posted_at {
                header.push(Span::styled(
                    format!("  {}", posted_at),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            let mut lines = vec![
                Line::from(header),
                Line::from(Span::styled(
                    post.media_url.clone(),
                    Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                )),
            ];
            if !post.caption.is_empty() {
                lines.push(Line::from(post.caption.clone()));
            }
            lines.push(Line::default());
            ListItem::new(Text::from(lines))
        })
        .collect();

    let empty = items.is_empty();
    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Feed)))
        .title(" Feed ");

    if empty {
        let placeholder = Paragraph::new(Span::styled(
            "No posts yet. Ctrl+R to refresh.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(list_block);
        frame.render_widget(placeholder, list_area);
        return;
    }

    let list = List::new(items)
        .block(list_block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::Rgb(40, 40, 40)))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.feed_state);
}

fn render_text_field(frame: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::DarkGray }))
        .title(title.to_string());

    // Keep the end of the text visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let char_count = value.chars().count();
    let skip = char_count.saturating_sub(inner_width.saturating_sub(1));
    let visible: String = value.chars().skip(skip).collect();
    let visible_len = visible.chars().count() as u16;

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)).block(block),
        area,
    );

    if focused {
        frame.set_cursor_position((area.x + visible_len + 1, area.y + 1));
    }
}

fn render_chat_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let [history_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area for mouse hit-testing and dimensions for scroll calculations
    app.chat_area = Some(history_area);
    app.chat_height = history_area.height.saturating_sub(2);
    app.chat_width = history_area.width.saturating_sub(2);

    let chat_focused = app.focus == FocusPane::Chat;
    let waiting = app.chat_turn() == ChatTurn::AwaitingResponse;

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(chat_focused)))
        .title(" Chat ");

    let transcript = app
        .shell
        .workspace()
        .map(|w| w.chat.transcript())
        .unwrap_or(&[]);

    let chat_text = if transcript.is_empty() && !waiting {
        Text::from(Span::styled(
            "Say hello to the assistant...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in transcript {
            match msg.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                }
                Sender::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                }
            }
            let style = if msg.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            for line in msg.text.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), style)));
            }
            lines.push(Line::default());
        }

        if waiting {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, history_area);

    // Input at the bottom, dimmed while a reply is pending
    let input_border_color = if waiting {
        Color::DarkGray
    } else if chat_focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let input_title = if waiting { " Waiting for reply... " } else { " Message " };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(input_title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat_input()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input_style = if waiting {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text).style(input_style).block(input_block);

    frame.render_widget(input, input_area);

    if chat_focused && !waiting {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}
