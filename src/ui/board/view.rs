use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use ratatui::Frame;

use crate::model::{TaskColumn, TaskStatus};
use crate::progress::Urgency;
use crate::stats::{dynamic_rgb, BoardStats};
use crate::store::TaskView;

use super::app::{AddTaskInput, AppState, DeleteConfirmState, InputField, StatusKind};

const BAR_WIDTH: usize = 10;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_SELECTED: Color = Color::Rgb(180, 156, 92);

pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let stats = app.store.stats();
    render_header(frame, &stats, chunks[0]);
    render_columns(frame, app, chunks[1]);
    render_footer(frame, app, &stats, chunks[2]);

    if let Some(input) = app.input.as_ref() {
        render_add_modal(frame, area, input);
    }
    if let Some(state) = app.delete_confirm.as_ref() {
        render_delete_confirm_modal(frame, area, state);
    }
    if app.show_help {
        render_help_modal(frame, area);
    }
}

fn render_header(frame: &mut Frame, stats: &BoardStats, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let day = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Day"))
        .gauge_style(Style::default().fg(rgb(stats.day.elapsed_percent)))
        .percent(u16::from(stats.day.elapsed_percent))
        .label(format!(
            "{}%  {} left",
            stats.day.elapsed_percent, stats.day.remaining_hms
        ));
    frame.render_widget(day, chunks[0]);

    let tasks = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .gauge_style(Style::default().fg(COLOR_SUCCESS))
        .percent(u16::from(stats.completed_percent))
        .label(format!(
            "{} of {} done  daily {}%  overdue {}",
            stats.completed, stats.total, stats.daily_percent, stats.overdue
        ));
    frame.render_widget(tasks, chunks[1]);
}

fn render_columns(frame: &mut Frame, app: &AppState, area: Rect) {
    let columns = app.columns();
    if columns.is_empty() {
        let widget = Paragraph::new("No columns")
            .alignment(Alignment::Center)
            .style(Style::default().fg(COLOR_MUTED));
        frame.render_widget(widget, area);
        return;
    }

    let share = 100 / columns.len() as u16;
    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|_| Constraint::Percentage(share))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (index, column) in columns.iter().enumerate() {
        let selected_row = (index == app.column).then_some(app.row);
        render_column(frame, app, column, selected_row, chunks[index]);
    }
}

fn render_column(
    frame: &mut Frame,
    app: &AppState,
    column: &TaskColumn,
    selected_row: Option<usize>,
    area: Rect,
) {
    let border = if selected_row.is_some() {
        COLOR_BORDER_SELECTED
    } else {
        COLOR_BORDER
    };
    let title = format!(
        " {} {}/{} ",
        column.title,
        column.completed(),
        column.tasks.len()
    );
    let inner_width = area.width.saturating_sub(2) as usize;

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (row, task) in column.tasks.iter().enumerate() {
        let view = app.store.task_view(column, task);
        let selected = selected_row == Some(row);
        lines.extend(task_lines(&view, selected, inner_width));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "empty",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    frame.render_widget(widget, area);
}

fn task_lines(view: &TaskView, selected: bool, width: usize) -> Vec<Line<'static>> {
    let mut text_style = match view.status {
        TaskStatus::Done => Style::default()
            .fg(COLOR_MUTED_DARK)
            .add_modifier(Modifier::CROSSED_OUT),
        TaskStatus::InProgress => Style::default().fg(COLOR_WARNING),
        TaskStatus::Idle => Style::default().fg(COLOR_TEXT),
    };
    if selected {
        text_style = text_style.add_modifier(Modifier::REVERSED);
    }

    let marker = status_marker(view.status);
    let text = truncate_text(&view.text, width.saturating_sub(marker.chars().count() + 1));
    let mut lines = vec![Line::from(vec![
        Span::styled(marker.to_string(), Style::default().fg(COLOR_ACCENT)),
        Span::raw(" "),
        Span::styled(text, text_style),
    ])];

    let urgency_color = urgency_color(view.urgency);
    let mut detail = vec![
        Span::raw("  "),
        Span::styled(view.time_left.clone(), Style::default().fg(urgency_color)),
    ];
    if view.show_progress {
        detail.push(Span::raw(" "));
        detail.push(Span::styled(
            progress_bar(view.progress, BAR_WIDTH),
            Style::default().fg(urgency_color),
        ));
    }
    lines.push(Line::from(detail));
    lines
}

fn render_footer(frame: &mut Frame, app: &AppState, stats: &BoardStats, area: Rect) {
    let hint_span = Span::styled(app.footer_hint(), Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status.to_string(), status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let counts_line = Line::from(Span::styled(
        format!(
            "archived {}  year {}%  {} left",
            stats.archived, stats.year.elapsed_percent, stats.year.remaining_label
        ),
        Style::default().fg(COLOR_ACCENT),
    ));
    let widget = Paragraph::new(vec![line, counts_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER)),
        );
    frame.render_widget(widget, area);
}

fn render_add_modal(frame: &mut Frame, area: Rect, input: &AddTaskInput) {
    let content_width = area.width.saturating_sub(8).min(64);
    let modal = centered_rect(content_width, 8, area);
    frame.render_widget(Clear, modal);

    let field_style = |field: InputField| {
        if input.field == field {
            Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_MUTED)
        }
    };
    let within = if input.kind.is_daily() {
        "end of today".to_string()
    } else {
        input.within.clone()
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Column: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(input.kind.to_string(), Style::default().fg(COLOR_ACCENT)),
        ]),
        Line::from(vec![
            Span::styled("Text:   ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(format!("{}_", input.text), field_style(InputField::Text)),
        ]),
        Line::from(vec![
            Span::styled("Due in: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(within, field_style(InputField::Within)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "enter add  tab field  ctrl-t column  esc cancel",
            Style::default().fg(COLOR_MUTED_DARK),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("New task"))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, modal);
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, state: &DeleteConfirmState) {
    let content_width = area.width.saturating_sub(8).min(64);
    let modal = centered_rect(content_width, 7, area);
    frame.render_widget(Clear, modal);

    let text_width = (content_width as usize).saturating_sub(10);
    let lines = vec![
        Line::from(Span::styled(
            "Delete task?",
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Task: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(
                truncate_text(&state.text, text_width),
                Style::default().fg(COLOR_TEXT),
            ),
        ]),
        Line::from(Span::styled(
            "It goes to the archive; u restores it.",
            Style::default().fg(COLOR_MUTED),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Delete"))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let entries = [
        ("h / l", "previous / next column"),
        ("j / k", "next / previous task"),
        ("space", "idle > in progress > done"),
        ("a", "add a task"),
        ("d", "delete (archive) task"),
        ("< / >", "move task left / right"),
        ("u", "restore latest deleted"),
        ("r", "reload from disk"),
        ("q", "quit"),
    ];
    let modal = centered_rect(44, entries.len() as u16 + 2, area);
    frame.render_widget(Clear, modal);

    let lines: Vec<Line<'static>> = entries
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:<8}"), Style::default().fg(COLOR_ACCENT)),
                Span::styled(action.to_string(), Style::default().fg(COLOR_TEXT)),
            ])
        })
        .collect();
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(widget, modal);
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Idle => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Done => "[x]",
    }
}

fn urgency_color(urgency: Urgency) -> Color {
    match urgency {
        Urgency::Relaxed => COLOR_SUCCESS,
        Urgency::Approaching => COLOR_WARNING,
        Urgency::Urgent | Urgency::Expired => COLOR_ERROR,
    }
}

fn rgb(progress: u8) -> Color {
    let (red, green, blue) = dynamic_rgb(progress);
    Color::Rgb(red, green, blue)
}

/// Remaining-time bar; full when the window has just started.
fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(width.saturating_sub(filled))
    )
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_with_remaining_time() {
        assert_eq!(progress_bar(100.0, 4), "████");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(0.0, 4), "░░░░");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_text("Купить продукты", 9), "Купить...");
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abc", 0), "");
    }

    #[test]
    fn centered_rect_stays_inside() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(40, 4, area);
        assert_eq!(rect.width, 18);
        assert_eq!((rect.x, rect.y), (1, 3));
    }
}
