//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! Layout, top to bottom: a one-line settings header, the scrollable deal
//! list, a one-line prompt/banner/help row, and the status bar.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, InputMode};
use crate::settings::FilterMode;

const HELP: &str =
    "r: refresh  i: interval  w: keywords  f: filter  n: notifications  s: startup  ⏎: open  q: quit";

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [header_area, main_area, prompt_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_settings_header(app, frame, header_area);
    draw_feed_list(app, frame, main_area);
    draw_prompt_row(app, frame, prompt_area);
    draw_status_bar(app, frame, status_area);
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn draw_settings_header(app: &App, frame: &mut Frame, area: Rect) {
    let s = &app.settings;
    let filter = match s.filter_mode {
        FilterMode::All => "all deals".to_string(),
        FilterMode::Keywords if s.keywords.is_empty() => "keywords (none set, showing all)".into(),
        FilterMode::Keywords => format!("keywords: {}", s.keywords.join(", ")),
    };
    let dim = Style::default().fg(Color::DarkGray);

    let header = Paragraph::new(Line::from(vec![
        Span::raw(" Every "),
        Span::styled(
            format!("{} min", s.refresh_interval.minutes()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled("  │  ", dim),
        Span::raw("Notifier: "),
        Span::styled(filter, Style::default().fg(Color::Cyan)),
        Span::styled("  │  ", dim),
        Span::raw(format!("Notifications: {}", on_off(!s.notifications_disabled))),
        Span::styled("  │  ", dim),
        Span::raw(format!("Load on startup: {}", on_off(s.load_on_startup))),
    ]));
    frame.render_widget(header, area);
}

/// Render the scrollable deal list.
fn draw_feed_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .entries
        .iter()
        .map(|entry| {
            let date_str = entry
                .item
                .published
                .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "no date".into());

            let mut spans = vec![
                Span::styled(
                    format!("{:<18}", date_str),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
            ];
            if entry.new_today {
                spans.push(Span::styled(
                    "[new] ",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            spans.push(Span::styled(
                entry.item.title.as_str(),
                Style::default().fg(Color::White),
            ));

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(" Plugin Deals ")
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// The prompt while editing, otherwise the latest notification or the key
/// help.
fn draw_prompt_row(app: &App, frame: &mut Frame, area: Rect) {
    let line = match (&app.mode, &app.banner) {
        (InputMode::Editing { field, buffer }, _) => Line::from(vec![
            Span::styled(
                format!(" {}: ", field.label()),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(buffer.as_str()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::styled("  ⏎: set  Esc: cancel", Style::default().fg(Color::DarkGray)),
        ]),
        (InputMode::Normal, Some(notice)) => Line::from(vec![
            Span::styled(
                format!(" {} ", notice.title),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::raw(notice.body.as_str()),
        ]),
        (InputMode::Normal, None) => Line::from(Span::styled(
            format!(" {HELP}"),
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let updated = app
        .last_updated_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".into());
    let next = app
        .next_poll
        .map(|s| format!("next: {}", s.due.format("%H:%M")))
        .unwrap_or_default();

    let status = Paragraph::new(Line::from(vec![
        Span::raw(format!(" Last updated: {updated}")),
        Span::raw("  "),
        Span::styled(
            format!("{} items", app.entries.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(next, Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(app.status.text(), Style::default().fg(Color::Yellow)),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with;
    use crate::app::EditField;
    use crate::filter::VisibleEntry;
    use crate::notify::Notice;
    use crate::poll::Snapshot;
    use crate::settings::Settings;
    use crate::source::make_item;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(120, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();

        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_with_no_items() {
        let mut app = App::new(Settings::default());
        let text = render(&mut app);
        assert!(text.contains("Last updated: --:--:--"));
    }

    #[test]
    fn draw_does_not_panic_with_items() {
        let mut app = app_with(&["Big Sale", "News"]);
        app.select_first();

        let text = render(&mut app);

        assert!(text.contains("Big Sale"));
        assert!(text.contains("2 items"), "status bar should show item count");
    }

    #[test]
    fn entries_published_today_are_marked_new() {
        let mut app = App::new(Settings::default());
        app.apply_snapshot(Snapshot {
            visible_entries: vec![
                VisibleEntry {
                    item: make_item("Fresh Deal", ""),
                    new_today: true,
                },
                VisibleEntry {
                    item: make_item("Old Deal", ""),
                    new_today: false,
                },
            ],
            last_updated_at: None,
            generation: 1,
        });

        let text = render(&mut app);

        assert!(text.contains("[new] Fresh Deal"));
        assert!(!text.contains("[new] Old Deal"));
    }

    #[test]
    fn header_shows_keyword_filter() {
        let mut settings = Settings::default();
        settings.set_filter_rule(crate::settings::FilterRule::from_keyword_list("sale,bundle"));
        let mut app = App::new(settings);

        let text = render(&mut app);

        assert!(text.contains("keywords: sale, bundle"));
        assert!(text.contains("Notifications: on"));
    }

    #[test]
    fn prompt_replaces_help_while_editing() {
        let mut app = App::new(Settings::default());
        app.start_editing(EditField::Interval);

        let text = render(&mut app);

        assert!(text.contains("Auto-refresh interval (minutes): 5"));
        assert!(!text.contains("q: quit"));
    }

    #[test]
    fn banner_shows_notification() {
        let mut app = App::new(Settings::default());
        app.show_notice(Notice {
            title: "New deals!".into(),
            body: "New items found in the feed.".into(),
        });

        let text = render(&mut app);

        assert!(text.contains("New deals!"));
        assert!(text.contains("New items found in the feed."));
    }
}
