//! Watch view rendering.

use std::time::Duration;

use portwarden_core::{Listener, PortWatchFrame, WatchSnapshot};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::output::{format_bytes, format_duration, truncate};

/// Removed-port notices shown below the table.
const MAX_NOTICES: usize = 5;
/// Connections listed in the single-port view.
const MAX_CONNECTIONS: usize = 5;

// ============================================================================
// All ports
// ============================================================================

pub fn draw_watch(f: &mut Frame, snapshot: &WatchSnapshot, interval: Duration) {
    let notices = snapshot.removed.len().min(MAX_NOTICES) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),       // Header
            Constraint::Min(0),          // Table
            Constraint::Length(notices), // Removed ports
            Constraint::Length(3),       // Footer
        ])
        .split(f.area());

    let title = format!(
        "portwarden --watch | Refresh: {} | Press 'q' to quit",
        format_interval(interval)
    );
    draw_header(f, &title, chunks[0]);
    draw_table(f, snapshot, chunks[1]);
    draw_removed(f, snapshot, chunks[2]);
    draw_footer(f, snapshot, chunks[3]);
}

fn draw_header(f: &mut Frame, title: &str, area: Rect) {
    let header = Paragraph::new(title.to_string())
        .style(Style::default().fg(Color::Cyan).bold())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

    f.render_widget(header, area);
}

fn draw_table(f: &mut Frame, snapshot: &WatchSnapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Listening Ports ");

    if snapshot.listeners.is_empty() {
        let empty = Paragraph::new("No listening ports found.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["PORT", "PROTO", "PID", "USER", "CONNS", "UPTIME", "PROCESS"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).bold()));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = snapshot.listeners.iter().map(|l| {
        let style = if snapshot.is_added(l.port) {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        Row::new(listener_cells(l)).style(style)
    });

    let widths = [
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn listener_cells(l: &Listener) -> Vec<Cell<'static>> {
    let pid = l.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
    let (user, uptime, process) = match &l.process {
        Some(p) => (
            truncate(&p.user, 10),
            if p.uptime_seconds > 0 {
                format_duration(p.uptime_seconds)
            } else {
                "-".to_string()
            },
            p.display_name().to_string(),
        ),
        None => ("-".to_string(), "-".to_string(), "-".to_string()),
    };

    vec![
        Cell::from(l.port.to_string()),
        Cell::from(l.protocol.as_str()),
        Cell::from(pid),
        Cell::from(user),
        Cell::from(l.connection_count.to_string()),
        Cell::from(uptime),
        Cell::from(process),
    ]
}

fn draw_removed(f: &mut Frame, snapshot: &WatchSnapshot, area: Rect) {
    if area.height == 0 {
        return;
    }

    let lines: Vec<Line> = snapshot
        .removed
        .iter()
        .take(MAX_NOTICES)
        .map(|port| Line::from(format!("  ● Port {} removed", port)))
        .collect();

    let notices = Paragraph::new(lines).style(Style::default().fg(Color::Red));
    f.render_widget(notices, area);
}

fn draw_footer(f: &mut Frame, snapshot: &WatchSnapshot, area: Rect) {
    let mut spans = vec![Span::styled(
        format!("{} ports", snapshot.listeners.len()),
        Style::default().fg(Color::DarkGray),
    )];
    if !snapshot.added.is_empty() {
        spans.push(Span::styled(
            format!("  +{} new", snapshot.added.len()),
            Style::default().fg(Color::Green),
        ));
    }
    if !snapshot.removed.is_empty() {
        spans.push(Span::styled(
            format!("  -{} removed", snapshot.removed.len()),
            Style::default().fg(Color::Red),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(footer, area);
}

// ============================================================================
// Single port
// ============================================================================

pub fn draw_port(f: &mut Frame, frame: &PortWatchFrame, interval: Duration) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(f.area());

    let title = format!(
        "portwarden port {} --watch | Refresh: {} | Press 'q' to quit",
        frame.port,
        format_interval(interval)
    );
    draw_header(f, &title, chunks[0]);

    let body = Paragraph::new(port_lines(frame)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Port {} ", frame.port)),
    );
    f.render_widget(body, chunks[1]);
}

fn port_lines(frame: &PortWatchFrame) -> Vec<Line<'static>> {
    let changed = Style::default().fg(Color::Yellow);
    let section = Style::default().bold();
    let mut lines = Vec::new();

    if frame.became_active {
        lines.push(Line::styled("● Port became active", Style::default().fg(Color::Green)));
        lines.push(Line::default());
    }
    if frame.exited {
        lines.push(Line::styled("● Process exited", Style::default().fg(Color::Red)));
        lines.push(Line::default());
    }

    let Some(l) = &frame.listener else {
        lines.push(Line::from(format!("Port {} is not in use.", frame.port)));
        return lines;
    };

    lines.push(Line::styled("Process", section));
    match &l.process {
        Some(p) => {
            lines.push(Line::from(format!("  PID:      {}", p.pid)));
            lines.push(Line::from(format!("  Command:  {}", p.display_name())));
            lines.push(Line::from(format!("  User:     {}", p.user)));
            lines.push(Line::from(format!(
                "  Uptime:   {}",
                format_duration(p.uptime_seconds)
            )));
        }
        None => {
            lines.push(Line::from("  (permission denied or process info unavailable)"));
        }
    }
    lines.push(Line::default());

    lines.push(Line::styled("Listening", section));
    lines.push(Line::from(format!("  Address:  {}:{}", l.address, l.port)));
    lines.push(Line::from(format!(
        "  Protocol: {}",
        l.protocol.as_str().to_uppercase()
    )));
    lines.push(Line::default());

    let mut heading = format!("Connections ({})", l.connection_count);
    if frame.connection_delta != 0 {
        heading.push_str(&format!(" ({:+})", frame.connection_delta));
    }
    lines.push(if frame.changes.connections {
        Line::styled(heading, changed.bold())
    } else {
        Line::styled(heading, section)
    });
    for c in l.connections.iter().take(MAX_CONNECTIONS) {
        lines.push(Line::from(format!(
            "  {}:{}  {}",
            c.remote_addr, c.remote_port, c.state
        )));
    }
    if l.connections.len() > MAX_CONNECTIONS {
        lines.push(Line::from(format!(
            "  ... and {} more",
            l.connections.len() - MAX_CONNECTIONS
        )));
    }
    lines.push(Line::default());

    lines.push(Line::styled("Stats", section));
    match &l.stats {
        Some(stats) => {
            let pick = |moved: bool| if moved { changed } else { Style::default() };
            lines.push(Line::styled(
                format!("  Memory:   {}", format_bytes(stats.memory_rss)),
                pick(frame.changes.memory),
            ));
            lines.push(Line::styled(
                format!("  CPU:      {:.1}%", stats.cpu_percent),
                pick(frame.changes.cpu),
            ));
            lines.push(Line::styled(
                format!("  FDs:      {}", stats.fd_count),
                pick(frame.changes.fds),
            ));
            lines.push(Line::styled(
                format!("  Threads:  {}", stats.thread_count),
                pick(frame.changes.threads),
            ));
        }
        None => lines.push(Line::from("  No stats available")),
    }

    lines
}

/// `1s`, `2s`, `500ms`, `1500ms`.
fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis >= 1000 && millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(1)), "1s");
        assert_eq!(format_interval(Duration::from_millis(500)), "500ms");
        assert_eq!(format_interval(Duration::from_millis(1500)), "1500ms");
    }
}
