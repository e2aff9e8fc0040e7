//! Modal `tui-textarea` editor used for every text entry: attribute values,
//! backup names and regex samples. List values are edited one per line.

use crate::attrs::diff::{AttrKind, AttrSpec};
use crate::attrs::AttrValue;
use crate::theme::Theme;
use crate::widgets::chrome::{centered_rect, panel_block};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::Clear;
use tui_textarea::{CursorMove, TextArea};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditTarget {
    Field(&'static str),
    BackupName,
    RegexSample,
}

pub struct FieldEditor {
    pub target: EditTarget,
    pub label: String,
    pub multiline: bool,
    ta: TextArea<'static>,
}

impl FieldEditor {
    pub fn new(target: EditTarget, label: impl Into<String>, initial: &str, multiline: bool) -> Self {
        let lines: Vec<String> = if initial.is_empty() {
            vec![String::new()]
        } else {
            initial.lines().map(str::to_string).collect()
        };
        let mut ta = TextArea::new(lines);
        ta.move_cursor(CursorMove::Bottom);
        ta.move_cursor(CursorMove::End);
        Self {
            target,
            label: label.into(),
            multiline,
            ta,
        }
    }

    pub fn for_field(spec: &'static AttrSpec, value: Option<&AttrValue>) -> Self {
        let initial = match value {
            Some(AttrValue::List(items)) => items.join("\n"),
            Some(v) => v.render(),
            None => String::new(),
        };
        Self::new(
            EditTarget::Field(spec.name),
            spec.label,
            &initial,
            spec.kind == AttrKind::List,
        )
    }

    pub fn input(&mut self, key: KeyEvent) {
        self.ta.input(key);
    }

    pub fn text(&self) -> String {
        self.ta.lines().join(if self.multiline { "\n" } else { " " })
    }
}

pub fn draw_editor(f: &mut Frame, area: Rect, editor: &FieldEditor, theme: &Theme) {
    let (keys, height) = if editor.multiline {
        ("Ctrl+S save • Esc cancel • one value per line", 70)
    } else {
        ("Enter save • Esc cancel", 20)
    };
    let rect = centered_rect(80, height, area);
    let block = panel_block(format!(" Editing: {} - {keys} ", editor.label), true, theme);
    let inner = block.inner(rect);
    f.render_widget(Clear, rect);
    f.render_widget(block, rect);
    f.render_widget(&editor.ta, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    static MECHS: AttrSpec = AttrSpec::assign("mechs", "Mechanisms", AttrKind::List);
    static DESC: AttrSpec = AttrSpec::flag("description", "Description", AttrKind::Text, "--desc");

    fn type_str(ed: &mut FieldEditor, s: &str) {
        for c in s.chars() {
            ed.input(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[test]
    fn list_values_are_one_per_line() {
        let v = AttrValue::List(vec!["GSSAPI".into(), "EXTERNAL".into()]);
        let mut ed = FieldEditor::for_field(&MECHS, Some(&v));
        assert!(ed.multiline);
        assert_eq!(ed.text(), "GSSAPI\nEXTERNAL");
        ed.input(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        type_str(&mut ed, "PLAIN");
        assert_eq!(
            crate::attrs::split_list(&ed.text()),
            vec!["GSSAPI", "EXTERNAL", "PLAIN"]
        );
    }

    #[test]
    fn text_edits_append_at_end() {
        let mut ed = FieldEditor::for_field(&DESC, Some(&AttrValue::Text("main".into())));
        assert!(!ed.multiline);
        assert_eq!(ed.target, EditTarget::Field("description"));
        type_str(&mut ed, " db");
        assert_eq!(ed.text(), "main db");
    }
}
