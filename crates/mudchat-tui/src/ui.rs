use chrono::Local;
use mudchat_core::{Origin, Phase, Theme};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};

use crate::app::{App, InputMode, View};

/// Colors for the light and dark display modes.
struct Palette {
    bg: Color,
    fg: Color,
    muted: Color,
    accent: Color,
    user: Color,
    system: Color,
    error: Color,
    highlight: Style,
    bar: Style,
    key: Style,
}

impl Palette {
    fn for_mode(dark: bool) -> Self {
        if dark {
            Self {
                bg: Color::Black,
                fg: Color::Gray,
                muted: Color::DarkGray,
                accent: Color::Yellow,
                user: Color::LightBlue,
                system: Color::LightGreen,
                error: Color::LightRed,
                highlight: Style::default().bg(Color::Blue).fg(Color::White),
                bar: Style::default().bg(Color::DarkGray).fg(Color::White),
                key: Style::default().bg(Color::Gray).fg(Color::Black),
            }
        } else {
            Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                user: Color::Blue,
                system: Color::Green,
                error: Color::Red,
                highlight: Style::default().bg(Color::LightBlue).fg(Color::Black),
                bar: Style::default().bg(Color::Gray).fg(Color::Black),
                key: Style::default().bg(Color::DarkGray).fg(Color::White),
            }
        }
    }
}

fn saved_theme_name(theme: &str) -> String {
    Theme::from_str(theme)
        .map(|t| t.display_name().to_string())
        .unwrap_or_else(|| theme.to_string())
}

pub fn render(app: &mut App, view: &View, frame: &mut Frame) {
    let palette = Palette::for_mode(view.dark_mode);
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        area,
    );

    let in_game = view.phase == Phase::InProgress;
    let status_height = u16::from(view.error.is_some() || app.notice.is_some());
    let input_height = if in_game { 3 } else { 0 };

    let [header_area, body_area, status_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(status_height),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(view, &palette, frame, header_area);

    if in_game {
        render_chat(app, view, &palette, frame, body_area);
        render_input(app, view, &palette, frame, input_area);
    } else {
        app.chat_area = None;
        render_welcome(app, view, &palette, frame, body_area);
    }

    render_status(app, view, &palette, frame, status_area);
    render_footer(app, view, &palette, frame, footer_area);

    if app.show_theme_picker {
        render_theme_picker(app, view, &palette, frame, area);
    }
}

fn render_header(view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " MUD Adventure ",
        Style::default().fg(palette.accent).bold(),
    )];

    if view.phase == Phase::InProgress {
        spans.push(Span::raw(format!(" Current theme: {} ", view.theme.display_name())));
    }

    if let Some(short_id) = view.short_session_id() {
        spans.push(Span::raw(format!(" Session ID: {}... ", short_id)));
    }

    spans.push(Span::raw(if view.dark_mode { " [dark] " } else { " [light] " }));
    spans.push(Span::raw(format!("v{}", env!("CARGO_PKG_VERSION"))));

    let header = Paragraph::new(Line::from(spans)).style(palette.bar);
    frame.render_widget(header, area);
}

fn render_welcome(app: &mut App, view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    let [intro_area, list_area] =
        Layout::vertical([Constraint::Length(7), Constraint::Min(0)]).areas(area);

    let mut intro = vec![
        Line::from(Span::styled(
            "Welcome to MUD Adventure",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(
            "Select a theme and start a game to begin your Japanese learning adventure, \
             or load a previous game below.",
        ),
        Line::default(),
        Line::from(vec![
            Span::raw("Selected theme: "),
            Span::styled(view.theme.display_name(), Style::default().fg(palette.accent)),
        ]),
    ];
    if let Some(label) = view.loading {
        intro.push(Line::from(Span::styled(
            format!("{} {}", app.spinner(), label),
            Style::default().fg(palette.muted).italic(),
        )));
    }

    frame.render_widget(
        Paragraph::new(Text::from(intro)).wrap(Wrap { trim: true }),
        intro_area,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(" Previous Games ");

    if view.saved_sessions.is_empty() {
        let empty = Paragraph::new("No saved games yet.")
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, list_area);
        return;
    }

    if app.sessions_state.selected().is_none() {
        app.sessions_state.select(Some(0));
    }

    let items: Vec<ListItem> = view
        .saved_sessions
        .iter()
        .map(|session| {
            let created = session
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M");
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" {} Theme ", saved_theme_name(&session.theme)),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {} ", created), Style::default().fg(palette.muted)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(palette.highlight.add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.sessions_state);
}

fn render_chat(app: &mut App, view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(" Adventure ");
    if let Some(summary) = view.game_summary() {
        block = block.title_bottom(Line::from(format!(" {} ", summary)).fg(palette.muted));
    }
    let inner = block.inner(area);

    // Store sizes for scroll math and mouse hit-testing
    app.chat_area = Some(area);
    app.chat_height = inner.height;

    let mut lines: Vec<Line> = Vec::new();
    for entry in &view.entries {
        let (label, color) = match entry.origin() {
            Origin::User => ("You:", palette.user),
            Origin::System => ("Game:", palette.system),
        };
        lines.push(Line::from(Span::styled(label, Style::default().fg(color).bold())));
        for line in entry.text().lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if let Some(label) = view.loading {
        lines.push(Line::from(Span::styled(
            "Game:",
            Style::default().fg(palette.system).bold(),
        )));
        lines.push(Line::from(Span::styled(
            format!("{} {}", app.spinner(), label),
            Style::default().fg(palette.muted).italic(),
        )));
    }

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total = u16::try_from(chat.line_count(inner.width)).unwrap_or(u16::MAX);
    app.chat_rows = total;
    if app.follow_chat {
        app.scroll_to_bottom();
    } else {
        app.chat_scroll = app.chat_scroll.min(total.saturating_sub(app.chat_height));
    }

    frame.render_widget(chat.block(block).scroll((app.chat_scroll, 0)), area);

    if total > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(app.chat_height) as usize)
            .position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border = if editing { palette.accent } else { palette.muted };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(" Command ");
    let inner = block.inner(area);

    let content = if app.input.is_empty() && !editing {
        Line::from(Span::styled(
            "Type your command...",
            Style::default().fg(palette.muted),
        ))
    } else {
        Line::from(app.input.as_str())
    };

    let style = if view.loading.is_some() {
        Style::default().fg(palette.muted)
    } else {
        Style::default()
    };
    frame.render_widget(Paragraph::new(content).style(style).block(block), area);

    if editing {
        let before: String = app.input.chars().take(app.cursor).collect();
        let offset = Line::from(before).width() as u16;
        frame.set_cursor_position((inner.x + offset.min(inner.width), inner.y));
    }
}

fn render_status(app: &App, view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }

    let line = if let Some(error) = &view.error {
        Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(palette.error).bold(),
        ))
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(format!(" {} ", notice), Style::default().fg(palette.muted)))
    } else {
        Line::default()
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(app: &App, view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    let key_style = palette.key;
    let label_style = palette.bar;
    let in_game = view.phase == Phase::InProgress;

    let mut hints = match (in_game, app.input_mode) {
        (_, InputMode::Editing) if in_game => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (true, _) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" n ", key_style),
            Span::styled(" new game ", label_style),
        ],
        (false, _) => vec![
            Span::styled(" n ", key_style),
            Span::styled(" start game ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" load ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" refresh ", label_style),
        ],
    };

    if app.input_mode == InputMode::Normal || !in_game {
        hints.extend(vec![
            Span::styled(" t ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" d ", key_style),
            Span::styled(if view.dark_mode { " light " } else { " dark " }, label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]);
    }

    let footer = Paragraph::new(Line::from(hints)).style(label_style);
    frame.render_widget(footer, area);
}

fn render_theme_picker(app: &mut App, view: &View, palette: &Palette, frame: &mut Frame, area: Rect) {
    let themes = Theme::all();
    let popup = centered_rect(36, themes.len() as u16 + 2, area);

    let items: Vec<ListItem> = themes
        .iter()
        .map(|theme| {
            let marker = if *theme == view.theme { "*" } else { " " };
            ListItem::new(format!(" {} {} ", marker, theme.display_name()))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .title(" Choose a Theme "),
        )
        .style(Style::default().bg(palette.bg).fg(palette.fg))
        .highlight_style(palette.highlight.add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_widget(Clear, popup);
    frame.render_stateful_widget(list, popup, &mut app.theme_picker_state);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudchat_core::ChatEntry;
    use ratatui::{backend::TestBackend, Terminal};

    fn view(phase: Phase) -> View {
        View {
            phase,
            entries: Vec::new(),
            loading: None,
            error: None,
            theme: Theme::Cafe,
            saved_sessions: Vec::new(),
            dark_mode: false,
            session_id: None,
            game_state: None,
        }
    }

    fn draw(app: &mut App, view: &View) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, view, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_welcome_screen_lists_nothing_saved() {
        let mut app = App::new();
        let screen = draw(&mut app, &view(Phase::NotStarted));
        assert!(screen.contains("Welcome to MUD Adventure"));
        assert!(screen.contains("No saved games yet."));
    }

    #[test]
    fn test_chat_shows_transcript_and_session() {
        let mut app = App::new();
        let mut game = view(Phase::InProgress);
        game.entries = vec![
            ChatEntry::system("You enter a cafe."),
            ChatEntry::user("look around"),
        ];
        game.session_id = Some("abc123def456".to_string());
        game.error = Some("Error sending message: timed out".to_string());

        let screen = draw(&mut app, &game);
        assert!(screen.contains("You enter a cafe."));
        assert!(screen.contains("look around"));
        assert!(screen.contains("Current theme: Cafe"));
        assert!(screen.contains("Session ID: abc123de..."));
        assert!(screen.contains("Error sending message: timed out"));
        assert_eq!(app.chat_height, 24 - 1 - 1 - 3 - 1 - 2);
    }

    #[test]
    fn test_chat_shows_room_and_inventory() {
        let mut app = App::new();
        let mut game = view(Phase::InProgress);
        game.entries = vec![ChatEntry::system("You walk to the counter.")];
        let mut state = mudchat_core::GameState::default();
        state.extra.insert("room".to_string(), "counter".into());
        state.extra.insert("inventory".to_string(), vec!["menu"].into());
        game.game_state = Some(state);

        let screen = draw(&mut app, &game);
        assert!(screen.contains("Room: counter | Inventory: menu"));
    }

    #[test]
    fn test_follow_reaches_reply_after_wide_text() {
        let mut app = App::new();
        let mut game = view(Phase::InProgress);
        for _ in 0..6 {
            game.entries.push(ChatEntry::system("コーヒー".repeat(15)));
        }
        game.entries.push(ChatEntry::system("LATESTREPLY"));

        let screen = draw(&mut app, &game);
        assert!(screen.contains("LATESTREPLY"));
        assert!(app.chat_rows > app.chat_height);
    }

    #[test]
    fn test_scrolling_reaches_reply_after_word_wrapped_text() {
        let mut app = App::new();
        let mut game = view(Phase::InProgress);
        let sentence = "The barista slides a steaming cup across the counter and waits. ";
        for _ in 0..5 {
            game.entries.push(ChatEntry::system(sentence.repeat(3)));
        }
        game.entries.push(ChatEntry::system("LATESTREPLY"));

        assert!(draw(&mut app, &game).contains("LATESTREPLY"));

        app.scroll_up(u16::MAX);
        assert!(!draw(&mut app, &game).contains("LATESTREPLY"));

        app.scroll_down(u16::MAX);
        assert!(draw(&mut app, &game).contains("LATESTREPLY"));
    }

    #[test]
    fn test_theme_picker_popup() {
        let mut app = App::new();
        app.open_theme_picker(Theme::Cafe);
        let screen = draw(&mut app, &view(Phase::NotStarted));
        assert!(screen.contains("Choose a Theme"));
        assert!(screen.contains("GenAI Tech Conference"));
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(36, 15, area);
        assert_eq!(rect, Rect::new(0, 0, 20, 10));
    }
}
