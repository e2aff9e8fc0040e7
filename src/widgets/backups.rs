//! Backups and LDIF exports as two stacked tables.

use crate::panels::backups::BackupTable;
use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

pub fn draw_backups(f: &mut Frame, area: Rect, table: &BackupTable, focused: bool, theme: &Theme) {
    let status = match (table.busy, table.running) {
        (true, _) => " (working…)",
        (false, Some(true)) => " (server running)",
        (false, Some(false)) => " (server stopped)",
        (false, None) => "",
    };
    let block = panel_block(format!(" Backups & LDIFs{status} "), focused, theme);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let header = Row::new(vec!["Backup", "Created", "Size"]).style(theme.section_header());
    let rows: Vec<Row> = table
        .backups
        .iter()
        .map(|b| {
            Row::new(vec![
                Cell::from(b.name.clone()),
                Cell::from(b.date.clone()),
                Cell::from(b.size.clone()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Percentage(45),
        Constraint::Percentage(35),
        Constraint::Percentage(20),
    ];
    let backups = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(theme.list_cursor_style())
        .highlight_symbol("› ");
    let mut ts = TableState::default();
    if !table.backups.is_empty() {
        ts.select(Some(table.selected));
    }
    f.render_stateful_widget(backups, chunks[0], &mut ts);

    let header = Row::new(vec!["LDIF", "Created", "Size", "Suffix"]).style(theme.section_header());
    let rows: Vec<Row> = table
        .ldifs
        .iter()
        .map(|l| {
            Row::new(vec![
                l.name.clone(),
                l.date.clone(),
                l.size.clone(),
                l.suffix.clone(),
            ])
        })
        .collect();
    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(25),
        Constraint::Percentage(15),
        Constraint::Percentage(30),
    ];
    f.render_widget(Table::new(rows, widths).header(header), chunks[1]);

    let hint = match &table.last_error {
        Some(e) => Line::from(Span::styled(format!("! {e}"), theme.text_error())),
        None => Line::from(Span::styled(
            "Enter restore  n new backup  d delete  r refresh",
            theme.text_muted(),
        )),
    };
    f.render_widget(Paragraph::new(hint), chunks[2]);
}
