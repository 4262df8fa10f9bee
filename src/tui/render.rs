use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState};
use ratatui::Frame;

use crate::commands::stages::{column_title, SortKey};
use crate::jenkins::Status;
use crate::output::format_millis;

use super::browser::{Browser, LogView};
use super::input::Mode;

/// Lines around the table body: heading, filter line, borders, column header, footer.
pub const TABLE_CHROME: u16 = 7;

const ACCENT: Color = Color::Indexed(202);

pub fn render(f: &mut Frame, browser: &Browser) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // heading and filter
            Constraint::Min(1),    // table or log
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    render_heading(f, chunks[0], browser);
    match browser.log() {
        Some(log) => render_log(f, chunks[1], log),
        None => render_table(f, chunks[1], browser),
    }
    render_footer(f, chunks[2], browser);
}

fn render_heading(f: &mut Frame, area: Rect, browser: &Browser) {
    let title = match browser.log() {
        Some(log) => format!("{} > {}", browser.heading(), log.title),
        None => browser.heading(),
    };
    let mut lines = vec![Line::from(Span::styled(
        title,
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    ))];

    if let Some(message) = browser.message() {
        lines.push(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    } else if browser.is_editing() {
        lines.push(Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(Color::Cyan)),
            Span::raw(browser.filter().to_string()),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ]));
    } else if !browser.filter().is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(Color::DarkGray)),
            Span::raw(browser.filter().to_string()),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn status_style(status: Status) -> Style {
    let color = match status {
        Status::Success => Color::Green,
        Status::Failed | Status::Aborted => Color::Red,
        Status::InProgress => Color::Yellow,
        Status::NotExecuted | Status::Unknown => Color::DarkGray,
    };
    Style::default().fg(color)
}

fn render_table(f: &mut Frame, area: Rect, browser: &Browser) {
    let view = browser.view();
    let rows = browser.rows();

    let header = TableRow::new(vec![
        Cell::from(column_title(&view, SortKey::Name, "Name")),
        Cell::from(column_title(&view, SortKey::Status, "Status")),
        Cell::from(column_title(&view, SortKey::Duration, "Duration")),
        Cell::from("ID"),
    ])
    .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let body = rows.iter().map(|row| {
        TableRow::new(vec![
            Cell::from(row.name.clone()),
            Cell::from(row.status.as_str()).style(status_style(row.status)),
            Cell::from(format_millis(row.duration_millis)),
            Cell::from(row.id.clone()),
        ])
    });

    let table = Table::new(
        body,
        [
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" {} rows ", rows.len())),
    )
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("> ");

    let selected = (!rows.is_empty()).then_some(browser.selected());
    let mut state = TableState::default().with_selected(selected);
    f.render_stateful_widget(table, area, &mut state);
}

fn render_log(f: &mut Frame, area: Rect, log: &LogView) {
    let height = usize::from(area.height.saturating_sub(2));
    let end = (log.scroll + height).min(log.lines.len());
    let visible: Vec<Line> = log.lines[log.scroll.min(end)..end]
        .iter()
        .map(|line| Line::raw(line.as_str()))
        .collect();

    let mut title = format!(" {} ", log.title);
    if log.truncated {
        title.push_str("(truncated) ");
    }
    let paragraph = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(title),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect, browser: &Browser) {
    let hints: &[(&str, &str)] = match browser.mode() {
        Mode::Filter => &[("Enter", "apply"), ("Esc", "cancel")],
        Mode::Log => &[
            ("↑↓/jk", "scroll"),
            ("PgUp/PgDn", "page"),
            ("g/G", "top/bottom"),
            ("q/Esc", "close"),
        ],
        Mode::Table => &[
            ("↑↓/jk", "move"),
            ("Enter/→", "open"),
            ("Esc/←", "back"),
            ("n/s/d", "sort"),
            ("f", "filter"),
            ("c", "clear"),
            ("q", "quit"),
        ],
    };

    let mut spans: Vec<Span> = Vec::new();
    for (i, (key, desc)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(
            format!(" {desc}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(log) = browser.log() {
        spans.push(Span::styled(
            format!("  {}%", log.percent(browser.page())),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}
