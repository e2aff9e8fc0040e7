use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::nav::flatten::{flatten_nav, NavRow, NavTarget};
use crate::ui::{AppState, Focus};
use crate::widgets::chrome::panel_block;

const SPINNER: [&str; 6] = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"];

pub(crate) fn compute_scroll_window(total: usize, selected: usize, inner_h: u16) -> (usize, usize) {
    if inner_h == 0 || total == 0 {
        return (0, 0);
    }
    let sel = selected.min(total.saturating_sub(1));
    let ih = inner_h as usize;
    let start = sel.saturating_sub(ih - 1);
    let end = (start + ih).min(total);
    (start, end)
}

/// Visible window: the stored offset unless it would hide the cursor.
fn window(state: &AppState, total: usize, inner_h: u16) -> (usize, usize) {
    let ih = inner_h as usize;
    let start = state.menu_offset.min(total.saturating_sub(ih));
    if state.selected >= start && state.selected < start + ih {
        (start, (start + ih).min(total))
    } else {
        compute_scroll_window(total, state.selected, inner_h)
    }
}

fn row_text(state: &AppState, row: &NavRow) -> String {
    let indent = "  ".repeat(row.depth);
    match &row.target {
        NavTarget::Header(_) => format!("{indent}{}", row.label),
        NavTarget::Group(kind) => {
            let coord = state.entities.get(*kind);
            let status = if coord.disable_tree() {
                format!(" {} ", SPINNER[state.tick as usize % SPINNER.len()])
            } else if coord.last_error.is_some() {
                " (error) ".to_string()
            } else {
                format!(" ({}) ", coord.entities().len())
            };
            format!("{indent}▾ {}{status}", row.label)
        }
        NavTarget::Page(_) => match row.tag.as_str() {
            crate::app::DBLINK => format!("{indent}⇄ {}", row.label),
            "" | "suffix" | "subsuffix" => format!("{indent}{}", row.label),
            tag => format!("{indent}{} [{tag}]", row.label),
        },
    }
}

pub fn draw_tree(f: &mut Frame, area: Rect, state: &AppState) {
    let rows = flatten_nav(state);
    let inner_h = area.height.saturating_sub(2);
    let (start, end) = window(state, rows.len(), inner_h);
    let theme = &state.theme;
    let focused = state.focus == Focus::Tree;
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(idx, row)| {
            let is_sel = idx == state.selected;
            let marker = if is_sel { "> " } else { "  " };
            let text = format!("{marker}{}", row_text(state, row));
            let open = matches!(&row.target, NavTarget::Page(p) if state.open.as_ref() == Some(p));
            let style = if is_sel && focused {
                theme.list_cursor_style()
            } else if matches!(row.target, NavTarget::Header(_)) {
                theme.section_header()
            } else if open {
                theme.text_active_bold()
            } else {
                Style::default()
            };
            ListItem::new(text).style(style)
        })
        .collect();
    let list = List::new(items).block(panel_block(" 389 Directory Server ", focused, theme));
    f.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::EntityKind;
    use crate::coordinator::EntityRow;
    use ratatui::backend::TestBackend;

    #[test]
    fn window_keeps_selected_visible() {
        let (s1, e1) = compute_scroll_window(20, 0, 5);
        assert_eq!((s1, e1), (0, 5));
        let (s2, e2) = compute_scroll_window(20, 4, 5);
        assert_eq!((s2, e2), (0, 5));
        let (s3, e3) = compute_scroll_window(20, 5, 5);
        assert_eq!((s3, e3), (1, 6));
        let (s4, e4) = compute_scroll_window(20, 19, 5);
        assert_eq!((s4, e4), (15, 20));
    }

    #[test]
    fn tree_shows_links_and_policy_types() {
        let mut state = AppState::default();
        state.entities.get_mut(EntityKind::Suffixes).set_entities(vec![
            EntityRow::new("dc=example,dc=com").tagged("suffix"),
            EntityRow::new("ou=remote,dc=example,dc=com")
                .tagged(crate::app::DBLINK)
                .at_depth(1),
        ]);
        state
            .entities
            .get_mut(EntityKind::LocalPolicies)
            .set_entities(vec![EntityRow::new("ou=people,dc=example,dc=com").tagged("subtree")]);
        let mut terminal = Terminal::new(TestBackend::new(60, 24)).unwrap();
        terminal.draw(|f| draw_tree(f, f.area(), &state)).unwrap();
        let buf = terminal.backend().buffer();
        let text: String = (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("> Database"));
        assert!(text.contains("Suffixes (2)"));
        assert!(text.contains("⇄ ou=remote,dc=example,dc=com"));
        assert!(text.contains("ou=people,dc=example,dc=com [subtree]"));
    }
}
