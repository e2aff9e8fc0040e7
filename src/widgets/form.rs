//! Attribute forms: sections of `label: value` lines with the cursor marked
//! by `›` and inline validation errors below the offending field.

use crate::attrs::diff::{AttrKind, AttrSpec, AttributeDescriptor};
use crate::attrs::{AttrValue, AttributeSnapshot};
use crate::panels::{CreateDraft, FieldError, Panel, Phase};
use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the right pane shows, borrowed from a loaded panel or a create draft.
pub struct FormView<'a> {
    pub title: String,
    pub status: Option<&'static str>,
    pub sections: &'static [AttributeDescriptor],
    pub values: &'a AttributeSnapshot,
    pub errors: &'a [FieldError],
    pub dirty: bool,
    /// Editable fields currently held by another setting.
    pub locked: Vec<&'static str>,
    pub hint: &'static str,
}

impl<'a> FormView<'a> {
    pub fn of_panel(p: &'a Panel) -> Self {
        let status = match p.phase {
            Phase::Uninitialized => Some("not loaded"),
            Phase::Loading => Some("loading"),
            Phase::Saving => Some("saving"),
            Phase::Ready => None,
        };
        Self {
            title: p.title(),
            status,
            sections: p.sections(),
            values: &p.current,
            errors: &p.errors,
            dirty: p.dirty,
            locked: p.locked_fields(),
            hint: "Enter edit  s save  u undo  r reload  d delete  Tab tree",
        }
    }

    pub fn of_draft(d: &'a CreateDraft) -> Self {
        Self {
            title: format!("New {}", d.title()),
            status: d.submitting.then_some("creating"),
            sections: d.sections(),
            values: &d.values,
            errors: &d.errors,
            dirty: true,
            locked: Vec::new(),
            hint: "Enter edit  s create  Esc discard",
        }
    }

    pub fn of_task(d: &'a CreateDraft) -> Self {
        Self {
            title: d.title(),
            status: d.submitting.then_some("running"),
            hint: "Enter edit  s run  Esc discard",
            ..Self::of_draft(d)
        }
    }

    fn error_for(&self, name: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == name)
            .map(|e| e.message.as_str())
    }
}

pub fn field_count(sections: &[AttributeDescriptor]) -> usize {
    sections.iter().map(|d| d.attrs.len()).sum()
}

/// Field under a flat cursor index, sections concatenated in order.
pub fn field_at(sections: &[AttributeDescriptor], idx: usize) -> Option<&'static AttrSpec> {
    sections.iter().flat_map(|d| d.attrs.iter()).nth(idx)
}

pub fn display_value(spec: &AttrSpec, value: Option<&AttrValue>) -> String {
    let Some(v) = value else {
        return String::new();
    };
    match (spec.kind, v) {
        (AttrKind::Secret, v) => "•".repeat(v.render().chars().count()),
        (AttrKind::Bool, v) => crate::attrs::on_off(v.as_bool()).to_string(),
        (AttrKind::List, AttrValue::List(items)) => items.join(", "),
        (_, v) => v.render(),
    }
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    view: &FormView,
    cursor: usize,
    focused: bool,
    theme: &Theme,
) {
    let mut title = format!(" {}", view.title);
    if view.dirty {
        title.push_str(" *");
    }
    if let Some(s) = view.status {
        title.push_str(&format!(" ({s}…)"));
    }
    title.push(' ');
    let block = panel_block(title, focused, theme);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let mut lines: Vec<Line> = Vec::new();
    let mut cursor_line = 0usize;
    let mut idx = 0usize;
    for section in view.sections {
        lines.push(Line::from(Span::styled(
            format!("-- {} --", section.section),
            theme.section_header(),
        )));
        for spec in section.attrs {
            let is_sel = idx == cursor;
            if is_sel {
                cursor_line = lines.len();
            }
            let marker = if is_sel { '›' } else { ' ' };
            let value = display_value(spec, view.values.get(spec.name));
            let value_style = if !spec.editable() || view.locked.contains(&spec.name) {
                theme.text_muted()
            } else if is_sel && focused {
                theme.text_active_bold()
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{marker} {}: ", spec.label)),
                Span::styled(value, value_style),
            ]));
            if let Some(err) = view.error_for(spec.name) {
                lines.push(Line::from(Span::styled(
                    format!("  ! {err}"),
                    theme.text_error(),
                )));
            }
            idx += 1;
        }
    }

    let h = chunks[0].height as usize;
    let offset = if h == 0 {
        0
    } else {
        cursor_line.saturating_sub(h.saturating_sub(2))
    };
    f.render_widget(
        Paragraph::new(lines).scroll((offset as u16, 0)),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(view.hint).style(theme.text_muted()),
        chunks[1],
    );
}
