use std::rc::Rc;
// src/ui.rs
use crate::app::App;
use crate::monitor::Dashboard;
use chrono::{DateTime, Local, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

/// "1d 02:03:04", "02:03:04" or "03:04".
pub fn format_countdown(remaining: chrono::Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let (days, hours, minutes, seconds) =
        (total / 86_400, (total % 86_400) / 3_600, (total % 3_600) / 60, total % 60);
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// "+3h", "-1h30m", "same time".
pub fn format_bias(bias: chrono::Duration) -> String {
    let minutes = bias.num_minutes();
    if minutes == 0 {
        return "same time".to_string();
    }
    let sign = if minutes > 0 { '+' } else { '-' };
    let (h, m) = (minutes.abs() / 60, minutes.abs() % 60);
    if m == 0 { format!("{}{}h", sign, h) } else { format!("{}{}h{:02}m", sign, h, m) }
}

pub struct LayoutChunks {
    pub status_chunk: Rect,
    pub shows_chunk: Rect,
    pub details_chunk: Rect,
    pub hint_chunk: Rect,
}

pub fn compute_layout(frame_size: Rect) -> LayoutChunks {
    let main_chunks: Rc<[Rect]> = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(1)])
        .split(frame_size);

    let content_columns: Rc<[Rect]> = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);

    LayoutChunks {
        status_chunk: main_chunks[0],
        shows_chunk: content_columns[0],
        details_chunk: content_columns[1],
        hint_chunk: main_chunks[2],
    }
}

fn status_lines(dashboard: &Dashboard, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let live_line = if dashboard.live.is_live() {
        Line::from(vec![
            Span::styled("● LIVE ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(dashboard.live.title().unwrap_or("").to_string()),
        ])
    } else {
        Line::from(Span::styled("Not live", Style::default().fg(Color::DarkGray)))
    };

    let refresh_line = match (&dashboard.last_error, dashboard.last_refresh) {
        (Some(err), _) => {
            Line::from(Span::styled(format!("Refresh failed: {}", err), Style::default().fg(Color::Red)))
        }
        (None, Some(at)) => {
            let next = dashboard
                .next_poll
                .map(|next| format!(", next in {}", format_countdown(next - now)))
                .unwrap_or_default();
            Line::from(Span::styled(
                format!(
                    "Updated {}{} | feed clock {} vs local",
                    at.with_timezone(&Local).format("%H:%M:%S"),
                    next,
                    format_bias(-dashboard.source_bias)
                ),
                Style::default().fg(Color::Gray),
            ))
        }
        (None, None) => Line::from(Span::styled("Loading…", Style::default().fg(Color::Gray))),
    };

    vec![live_line, refresh_line]
}

pub fn ui(f: &mut Frame, app: &App, now: DateTime<Utc>) {
    // === Layout Definitions ===
    let layout_chunks: LayoutChunks = compute_layout(f.size());

    // === Define Styles ===
    let default_style: Style = Style::default().fg(Color::White);
    let selected_item_style: Style =
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let premium_style: Style = Style::default().fg(Color::Magenta);

    // =================================== Status Panel ============================================
    let status_widget: Paragraph = Paragraph::new(status_lines(&app.dashboard, now))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Status").borders(Borders::ALL));
    f.render_widget(status_widget, layout_chunks.status_chunk);

    // ================================ Upcoming Panel (Left) ======================================
    let show_items: Vec<ListItem> = if app.dashboard.shows.is_empty() {
        vec![ListItem::new("No upcoming shows").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.dashboard
            .shows
            .iter()
            .map(|tracked| {
                let show = tracked.show();
                let mut spans = vec![
                    Span::styled(
                        format!("{:>11} ", format_countdown(show.time_until_start(now))),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(show.title().to_string()),
                ];
                if show.is_premium() {
                    spans.push(Span::styled(" ★", premium_style));
                }
                ListItem::new(Line::from(spans)).style(default_style)
            })
            .collect()
    };
    let mut list_state = ListState::default();
    list_state.select(app.selected_index);
    let shows_widget: List = List::new(show_items)
        .block(
            Block::default()
                .title(format!("Upcoming ({})", app.dashboard.shows.len()))
                .borders(Borders::ALL),
        )
        .highlight_style(selected_item_style)
        .highlight_symbol(">> ");
    f.render_stateful_widget(shows_widget, layout_chunks.shows_chunk, &mut list_state);

    // ================================ Details Panel (Right) ======================================
    let details_text: Vec<Line> = match app.selected_show() {
        Some(tracked) => {
            let show = tracked.show();
            let mut lines = vec![
                Line::from(Span::styled(show.title().to_string(), selected_item_style)),
                Line::from(""),
                Line::from(format!("Type     : {}", show.kind())),
                Line::from(format!("Premium  : {}", if show.is_premium() { "yes" } else { "no" })),
                Line::from(format!(
                    "Starts   : {}",
                    show.starts_at_local().format("%a %b %e, %H:%M")
                )),
                Line::from(format!("In       : {}", format_countdown(show.time_until_start(now)))),
            ];
            if let Some(url) = show.image_url(&app.dashboard.feed_url) {
                lines.push(Line::from(format!("Image    : {}", url)));
            }
            if let Some(at) = tracked.notified_at() {
                lines.push(Line::from(format!(
                    "Notified : {}",
                    at.with_timezone(&Local).format("%H:%M:%S")
                )));
            }
            lines
        }
        None => vec![Line::from("Select a show to see its details.")],
    };
    let details_widget: Paragraph = Paragraph::new(details_text)
        .wrap(Wrap { trim: true })
        .style(default_style)
        .block(Block::default().title("Details").borders(Borders::ALL));
    f.render_widget(details_widget, layout_chunks.details_chunk);

    // =============================== Hint Bar Panel (Bottom) =====================================
    let hint_widget: Paragraph = Paragraph::new("[↑/↓] Select | [R] Refresh now | [Q] Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(hint_widget, layout_chunks.hint_chunk);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_formats() {
        assert_eq!(format_countdown(chrono::Duration::seconds(-5)), "00:00");
        assert_eq!(format_countdown(chrono::Duration::seconds(75)), "01:15");
        assert_eq!(format_countdown(chrono::Duration::seconds(3 * 3600 + 5)), "03:00:05");
        assert_eq!(format_countdown(chrono::Duration::seconds(90_061)), "1d 01:01:01");
    }

    #[test]
    fn bias_formats() {
        assert_eq!(format_bias(chrono::Duration::zero()), "same time");
        assert_eq!(format_bias(chrono::Duration::hours(3)), "+3h");
        assert_eq!(format_bias(chrono::Duration::minutes(-90)), "-1h30m");
    }

    #[test]
    fn layout_splits_frame() {
        let chunks = compute_layout(Rect::new(0, 0, 100, 30));
        assert_eq!(chunks.status_chunk.height, 4);
        assert_eq!(chunks.hint_chunk.height, 1);
        assert_eq!(chunks.shows_chunk.width + chunks.details_chunk.width, 100);
    }
}
