use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::ui::{AppState, Focus, ToastLevel};

const SPINNER: [&str; 6] = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"];

/// Instance line: server id, connection and the restart reminder.
pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let mut spans = vec![
        Span::styled(" ds-console ", theme.text_active_bold()),
        Span::raw(format!("slapd-{}  ", state.ctx.server_id)),
        Span::styled(state.ctx.ldapi_url(), theme.text_muted()),
    ];
    if state.restart_suggested {
        spans.push(Span::styled(
            "  restart required (R)",
            Style::default()
                .fg(theme.warning)
                .add_modifier(Modifier::BOLD),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn draw_footer(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let mut spans: Vec<Span> = Vec::new();
    if state.in_flight > 0 {
        let spinner = SPINNER[state.tick as usize % SPINNER.len()];
        spans.push(Span::raw(format!(" {spinner} running {}  |  ", state.in_flight)));
    }
    if let Some(t) = &state.toast {
        let color = theme.toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Warning => "[WARN]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!("{tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    }
    let help = match state.focus {
        Focus::Tree => "↑/↓ select  Enter open  Tab form  n new  d delete  R restart  y copy cmd  q quit",
        Focus::Form => "Enter edit  s save  u undo  t test regex  i reindex  a tasks  Esc back  q quit",
    };
    spans.push(Span::styled(help, theme.text_muted()));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
