//! Render pipeline: a pure, idempotent projection from the snapshot store,
//! log buffer, and filter flags to a full terminal frame. Every draw
//! repaints everything; there is no diffing against the previous frame, so
//! rows from a superseded snapshot can never linger.

use console_proto::{Channel, ConnectionStatus};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::state::{classify, FilterSet, LogBuffer, Severity, SnapshotStore, StateClass};

const DASH: &str = "-";
const NOT_AVAILABLE: &str = "N/A";
const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Channels whose classification passes the current filter flags, in
/// snapshot order.
pub fn visible_channels<'a>(channels: &'a [Channel], filters: &FilterSet) -> Vec<&'a Channel> {
    channels
        .iter()
        .filter(|channel| classify(&channel.state).is_visible(filters))
        .collect()
}

fn class_color(class: StateClass) -> Color {
    match class {
        StateClass::Running => Color::Green,
        StateClass::Standby => Color::Cyan,
        StateClass::Paused => Color::Yellow,
        StateClass::Alarm => Color::Red,
        StateClass::Finish => Color::Blue,
        StateClass::Offline => Color::DarkGray,
        StateClass::Default => Color::White,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Gray,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
        Severity::Receive => Color::Cyan,
        Severity::Send => Color::Magenta,
    }
}

fn badge(connected: bool, text: &str) -> Span<'static> {
    let color = if connected { Color::Green } else { Color::Red };
    Span::styled(
        text.to_owned(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

/// Link-health summary. Transport and controller connectivity are rendered
/// as independent badges: the controller badge reflects only what the
/// backend reports, never the transport state.
pub fn status_line(status: &ConnectionStatus) -> Line<'static> {
    let transport = badge(
        status.tcp_connected,
        if status.tcp_connected {
            "connected"
        } else {
            "disconnected"
        },
    );
    let controller = if status.tpt_connected {
        let state = status
            .tpt_state
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Online");
        badge(true, state)
    } else {
        badge(false, "disconnected")
    };
    let station = status
        .work_station_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_owned();

    Line::from(vec![
        Span::raw(" transport "),
        transport,
        Span::raw("   controller "),
        controller,
        Span::raw("   station "),
        Span::raw(station),
    ])
}

fn field_or_dash(value: &str) -> &str {
    if value.is_empty() {
        DASH
    } else {
        value
    }
}

pub fn channel_rows<'a>(channels: &'a [Channel], filters: &FilterSet) -> Vec<Row<'a>> {
    visible_channels(channels, filters)
        .into_iter()
        .map(|channel| {
            let class = classify(&channel.state);
            Row::new(vec![
                Cell::from(channel.channel_id.as_str()),
                Cell::from(channel.state.as_str())
                    .style(Style::default().fg(class_color(class))),
                Cell::from(field_or_dash(&channel.barcode)),
                Cell::from(field_or_dash(&channel.process)),
                Cell::from(field_or_dash(&channel.message)),
            ])
        })
        .collect()
}

/// The newest log entries that fit into `max` terminal lines. Multi-line
/// messages (pretty-printed protocol dumps) keep their line breaks.
pub fn log_lines(logs: &LogBuffer, max: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for entry in logs.iter() {
        let color = severity_color(entry.severity);
        let timestamp = entry
            .timestamp
            .format(&TIME_FORMAT)
            .unwrap_or_else(|_| String::new());
        let mut message_lines = entry.message.lines();
        let first = message_lines.next().unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{timestamp}] [{}] ", entry.source),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(first.to_owned(), Style::default().fg(color)),
        ]));
        for rest in message_lines {
            lines.push(Line::from(Span::styled(
                format!("    {rest}"),
                Style::default().fg(color),
            )));
        }
    }
    let skip = lines.len().saturating_sub(max);
    lines.split_off(skip)
}

fn filter_span(key: char, label: &str, enabled: bool) -> Span<'static> {
    let style = if enabled {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!(" {key}:{label}"), style)
}

fn footer(filters: &FilterSet) -> Line<'static> {
    let mut spans = vec![Span::styled(
        " q quit  \u{2191}/\u{2193} select  x stop  p pause  r resume  g status  c clear ",
        Style::default().fg(Color::Gray),
    )];
    spans.push(Span::raw("|"));
    spans.push(filter_span('1', "running", filters.running));
    spans.push(filter_span('2', "standby", filters.standby));
    spans.push(filter_span('3', "alarm", filters.alarm));
    spans.push(filter_span('4', "offline", filters.offline));
    Line::from(spans)
}

/// Paints a complete frame from the current state. Calling this twice with
/// unchanged inputs produces an identical buffer.
pub fn draw(
    frame: &mut Frame,
    store: &SnapshotStore,
    logs: &LogBuffer,
    filters: &FilterSet,
    selected: usize,
) {
    let [status_area, table_area, log_area, footer_area] = areas(frame.area());

    frame.render_widget(
        Paragraph::new(status_line(store.status())).block(Block::bordered().title("Link")),
        status_area,
    );

    let shown = visible_channels(store.channels(), filters).len();
    let total = store.channels().len();
    let widths = [
        Constraint::Length(8),
        Constraint::Length(18),
        Constraint::Length(20),
        Constraint::Length(16),
        Constraint::Min(10),
    ];
    let table = Table::new(channel_rows(store.channels(), filters), widths)
        .header(
            Row::new(["Channel", "State", "Barcode", "Process", "Message"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::bordered().title(format!("Channels {shown}/{total}")))
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut table_state = TableState::default().with_selected(if shown == 0 {
        None
    } else {
        Some(selected.min(shown - 1))
    });
    frame.render_stateful_widget(table, table_area, &mut table_state);

    let visible_log_lines = log_area.height.saturating_sub(2) as usize;
    frame.render_widget(
        Paragraph::new(Text::from(log_lines(logs, visible_log_lines)))
            .block(Block::bordered().title(format!("Log ({})", logs.len()))),
        log_area,
    );

    frame.render_widget(Paragraph::new(footer(filters)), footer_area);
}

fn areas(area: Rect) -> [Rect; 4] {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(12),
        Constraint::Length(1),
    ])
    .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}
