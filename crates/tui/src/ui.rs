use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tracing::Level;

use vigil_core::logger::LogLine;
use vigil_core::types::{ResourceKind, RunState};
use crate::App;

const METER_WIDTH: usize = 20;

fn resource_color(kind: ResourceKind) -> Color {
    match kind {
        ResourceKind::Health => Color::Red,
        ResourceKind::Mana => Color::LightBlue,
        ResourceKind::Stamina => Color::Green,
    }
}

/// `[#####.....]` style fill meter.
fn meter(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    let status = app.status_snapshot();
    let settings = app.settings_snapshot();

    let (banner_label, banner_bg) = match status.state {
        RunState::Running => ("RUNNING (Press S to stop)", Color::Green),
        RunState::Idle => ("STOPPED (Press S to start)", Color::Red),
    };

    let key = |s: &'static str| Span::styled(s, Style::default().fg(Color::Yellow));
    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::raw(" "),
            key("j/k"),
            Span::raw(" select, "),
            key("+/-"),
            Span::raw(" threshold, "),
            key("c"),
            Span::raw(" spell, "),
            key("w"),
            Span::raw(" save:"),
        ]),
        Line::from(""),
    ];

    for kind in ResourceKind::ALL {
        let i = kind.index();
        let bar = settings.resource_bar(kind);
        let prefix = if i == app.selected { "> " } else { "  " };
        let color = resource_color(kind);

        let mut spans = vec![
            Span::raw(prefix),
            Span::styled(format!("{:<8}", kind.name()), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ];
        if bar.region.is_some() {
            let percent = status.percents[i];
            spans.push(Span::styled(meter(percent, METER_WIDTH), Style::default().fg(color)));
            spans.push(Span::raw(format!(" {:5.1}%", percent)));
        } else {
            spans.push(Span::styled("(area not selected)", Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(Span::styled(
            format!(
                "    below {:.0}% press '{}'  cooldown {:.1}s  used {}",
                bar.threshold, bar.potion_key, bar.cooldown_secs, status.potions_used[i]
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.push(Line::from(""));
    let spell = &settings.spellcasting;
    let (spell_label, spell_color) = if spell.enabled { ("ON", Color::Green) } else { ("OFF", Color::DarkGray) };
    lines.push(Line::from(vec![
        Span::styled("  Spell   ", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
        Span::styled(spell_label, Style::default().fg(spell_color)),
        Span::raw(format!("  '{}' every {:.1}s  cast {}", spell.spell_key, spell.spell_interval, status.spells_cast)),
    ]));

    let mode = if settings.zone_spec().is_some() {
        format!("zone, {} points", spell.target_zone.points_count)
    } else if spell.random_targeting {
        format!("ring r={:.0}, new every {}", spell.target_radius, spell.target_change_interval.max(1))
    } else {
        "key only".to_string()
    };
    let mut target = format!("    target: {}", mode);
    if let Some(p) = status.last_target {
        target.push_str(&format!("  last {}", p));
    }
    if let Some((dx, dy)) = status.ring_offset {
        target.push_str(&format!("  offset ({:+.0}, {:+.0}) [{}]", dx, dy, status.casts_since_target_change));
    }
    lines.push(Line::from(Span::styled(target, Style::default().fg(Color::DarkGray))));

    let window = match app.game_window() {
        Some(frame) => format!("  Window  {}", frame.rect),
        None => "  Window  not found".to_string(),
    };
    lines.push(Line::from(Span::styled(window, Style::default().fg(Color::Cyan))));
    lines.push(Line::from(Span::styled(
        format!("  Ticks   {}", status.ticks),
        Style::default().fg(Color::DarkGray),
    )));
    if let Some(err) = &status.last_error {
        lines.push(Line::from(Span::styled(format!("  last error: {}", err), Style::default().fg(Color::Red))));
    }

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    // Full-width centered banner
    let banner_width = left_chunks[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let centered_banner = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_total - pad_left));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered_banner,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(panel, left_chunks[1]);

    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end].iter().map(log_line).collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

/// Timestamp, level tag for warn/error, bold prefix, message.
fn log_line(line: &LogLine) -> Line<'_> {
    let msg_color = match line.prefix.as_str() {
        "controller" => Color::White,
        "stub" | "windows" => Color::DarkGray,
        _ => Color::Gray,
    };

    let mut spans = vec![
        Span::styled(line.timestamp.as_str(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];
    if line.level == Level::ERROR {
        spans.push(Span::styled("error ", Style::default().fg(Color::Red)));
    } else if line.level == Level::WARN {
        spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow)));
    }
    if !line.prefix.is_empty() {
        spans.push(Span::styled(
            line.prefix.as_str(),
            Style::default().fg(msg_color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(line.message.as_str(), Style::default().fg(msg_color)));
    Line::from(spans)
}
