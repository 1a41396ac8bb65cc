use crate::client::{
    AppSnapshot,
    ReelView,
    SpinRecord,
};
use color_eyre::eyre::Result;
use crossterm::event::{
    Event,
    KeyCode,
    KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use darepot::{
    SessionPhase,
    SpinOutcome,
};
use itertools::Itertools;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;
use unicode_width::UnicodeWidthChar;

pub enum UserEvent {
    Quit,
    Spin,
    ClosePopup,
    Redraw,
    Ignore,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    popup_open: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.popup_open = snap.popup.is_some();
    if let Some(mut term) = state.terminal.take() {
        let res = term.draw(|f| ui(f, state, snap)).map(|_| ());
        state.terminal = Some(term);
        res?;
    }
    Ok(())
}

pub fn handle_event(state: &mut UiState, event: Event) -> UserEvent {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(..) => return UserEvent::Redraw,
        _ => return UserEvent::Ignore,
    };
    if k.kind != KeyEventKind::Press {
        return UserEvent::Ignore;
    }
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return UserEvent::Quit;
    }
    match state.mode {
        Mode::QuitModal => match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => UserEvent::Quit,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                UserEvent::Redraw
            }
            _ => UserEvent::Ignore,
        },
        Mode::Normal => match k.code {
            KeyCode::Esc if state.popup_open => UserEvent::ClosePopup,
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                UserEvent::Redraw
            }
            KeyCode::Char(' ') | KeyCode::Enter => UserEvent::Spin,
            _ => UserEvent::Ignore,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(3), // curse bar
            Constraint::Length(5), // reels
            Constraint::Length(3), // flavor text
            Constraint::Min(4),    // recent spins
            Constraint::Length(3), // status + help
        ])
        .split(f.area());

    draw_title(f, chunks[0], snap);
    draw_curse_bar(f, chunks[1], snap);
    draw_reels(f, chunks[2], &snap.reels);
    draw_message(f, chunks[3], snap);
    draw_recent(f, chunks[4], &snap.recent);
    draw_bottom(f, chunks[5], snap);
    if let Some(outcome) = &snap.popup {
        draw_result_popup(f, outcome);
    }
    if snap.cursed_flash {
        draw_cursed_banner(f);
    }
    if state.mode == Mode::QuitModal {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
        let p = Paragraph::new("Leave the darepot? (Y/N)");
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }
}

fn draw_title(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let title = Paragraph::new(format!("JACK'O DAREPOT | Spins: {}", snap.spin_count))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn draw_curse_bar(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let color = if snap.curse_meter > 0 { Color::Red } else { Color::DarkGray };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Curse"))
        .gauge_style(Style::default().fg(color))
        .percent(u16::from(snap.curse_meter))
        .label(format!(
            "{}% (next spin cursed at {:.0}%)",
            snap.curse_meter, snap.cursed_chance
        ));
    f.render_widget(gauge, area);
}

fn draw_reels(f: &mut Frame, area: Rect, reels: &[ReelView]) {
    if reels.is_empty() {
        return;
    }
    let constraints = vec![Constraint::Ratio(1, reels.len() as u32); reels.len()];
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for (reel, rect) in reels.iter().zip(cols.iter()) {
        let accent = if reel.cursed { Color::Red } else { Color::Yellow };
        let value_style = if reel.stopped {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .title(reel.label);
        let inner = block.inner(*rect);
        let text = fit_width(&reel.value, inner.width as usize);
        let lines = vec![Line::from(""), Line::styled(text, value_style)];
        f.render_widget(&block, *rect);
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
    }
}

fn draw_message(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let style = if snap.reels.iter().any(|r| r.cursed) {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::White)
    };
    let p = Paragraph::new(snap.message.clone())
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_recent(f: &mut Frame, area: Rect, recent: &[SpinRecord]) {
    let mut lines = Vec::new();
    if recent.is_empty() {
        lines.push(Line::styled("None yet", Style::default().fg(Color::DarkGray)));
    }
    for record in recent {
        let parts = match &record.outcome {
            SpinOutcome::Normal {
                player,
                category,
                game,
            } => [player.to_string(), category.clone(), game.name.clone()],
            SpinOutcome::Cursed { player, challenge } => {
                [player.to_string(), String::from("CURSED"), challenge.name.clone()]
            }
        };
        let text = format!(
            "#{} {} {}",
            record.spin_number,
            record.at.format("%H:%M:%S"),
            parts.iter().join(" / ")
        );
        if record.outcome.is_cursed() {
            lines.push(Line::styled(text, Style::default().fg(Color::Red)));
        } else {
            lines.push(Line::from(text));
        }
    }
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Recent Spins"));
    f.render_widget(p, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let phase = match snap.phase {
        SessionPhase::Idle => "idle",
        SessionPhase::Resolving => "resolving",
        SessionPhase::Revealing => "revealing",
        SessionPhase::Completed => "completed",
    };
    let help = Paragraph::new(format!(
        "{} [{}] | space/enter spin | esc close | q quit",
        snap.status, phase
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(help, area);
}

fn draw_result_popup(f: &mut Frame, outcome: &SpinOutcome) {
    let area = centered_rect(50, 40, f.area());
    let (title, color, lines) = match outcome {
        SpinOutcome::Normal {
            player,
            category,
            game,
        } => {
            let mut lines = vec![
                Line::from(format!("Player: {player}")),
                Line::from(format!("Category: {category}")),
                Line::from(format!("Game: {}", game.name)),
            ];
            if let Some(text) = &game.text {
                lines.push(Line::from(""));
                lines.push(Line::from(text.clone()));
            }
            ("Spin Result", Color::Yellow, lines)
        }
        SpinOutcome::Cursed { player, challenge } => (
            "CURSED!",
            Color::Red,
            vec![
                Line::from(format!("Player: {player}")),
                Line::from(""),
                Line::from(format!("{}: {}", challenge.name, challenge.text)),
            ],
        ),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);
    let mut lines = lines;
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "space/esc to close",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }),
        block.inner(area),
    );
}

fn draw_cursed_banner(f: &mut Frame) {
    let area = centered_rect(30, 15, f.area());
    let banner = Paragraph::new("CURSED!")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    f.render_widget(Clear, area);
    f.render_widget(banner, area);
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

// Truncates to a display width, marking the cut with an ellipsis.
fn fit_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max {
            if max > 0 {
                while width + 1 > max {
                    match out.pop() {
                        Some(c) => width -= c.width().unwrap_or(0),
                        None => break,
                    }
                }
                out.push('…');
            }
            return out;
        }
        width += w;
        out.push(ch);
    }
    out
}
