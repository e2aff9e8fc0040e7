use crate::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub fn panel_block<'a>(title: impl Into<Line<'a>>, focused: bool, theme: &Theme) -> Block<'a> {
    let b = Block::default().borders(Borders::ALL).title(title);
    if focused {
        b.border_style(theme.border_focused())
    } else {
        b.border_style(theme.border_unfocused())
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(v[1]);
    h[1]
}

/// Modal yes/no question drawn over `area`.
pub fn draw_confirm(f: &mut Frame, area: Rect, prompt: &str, theme: &Theme) {
    let rect = centered_rect(60, 25, area);
    let body = vec![
        Line::raw(prompt.to_string()),
        Line::raw(""),
        Line::from(Span::styled("y/Enter confirm  n/Esc cancel", theme.text_muted())),
    ];
    let p = Paragraph::new(body)
        .block(panel_block(" Confirm ", true, theme))
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

/// Modal pick list; `cursor` is the highlighted row.
pub fn draw_choices(f: &mut Frame, area: Rect, title: &str, items: &[&str], cursor: usize, theme: &Theme) {
    let rect = centered_rect(50, 50, area);
    let mut body: Vec<Line> = items
        .iter()
        .enumerate()
        .map(|(i, label)| {
            if i == cursor {
                Line::from(Span::styled(format!("> {label}"), theme.text_active_bold()))
            } else {
                Line::raw(format!("  {label}"))
            }
        })
        .collect();
    body.push(Line::raw(""));
    body.push(Line::from(Span::styled("Enter choose  Esc cancel", theme.text_muted())));
    let p = Paragraph::new(body).block(panel_block(format!(" {title} "), true, theme));
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}
