//! Indented text outline of a form.
//!
//! Each leaf prints as `key (kind): value`, array items print their `#n`
//! identity (usable in field paths) and their position.

use frontform::{
    Form, FieldPath, SchemaNode, Value,
    data::{ArrayNode, EditableItem},
    render::{Presenter, present},
};

#[derive(Debug, Default)]
pub struct OutlinePresenter {
    lines: Vec<String>,
    depth: usize,
}

impl OutlinePresenter {
    pub fn render(form: &Form) -> String {
        let mut outline = Self::default();
        present(form, &mut outline);
        let mut out = outline.lines.join("\n");
        out.push('\n');
        out
    }

    fn push(&mut self, line: String) {
        self.lines.push(format!("{}{line}", "  ".repeat(self.depth)));
    }

    fn header(node: &SchemaNode) -> String {
        let mut s = node.key.clone();
        if let Some(label) = &node.label {
            s.push_str(&format!(" \"{label}\""));
        }
        s.push_str(&format!(" ({}", node.kind()));
        if node.required {
            s.push_str(", required");
        }
        s.push(')');
        s
    }
}

impl Presenter for OutlinePresenter {
    fn leaf(&mut self, _path: &FieldPath, node: &SchemaNode, value: &Value) {
        let mut line = format!("{}: {value}", Self::header(node));
        if !node.options.is_empty() {
            line.push_str(&format!(" [{}]", node.options.join(", ")));
        }
        self.push(line);
    }

    fn begin_object(&mut self, _path: &FieldPath, node: &SchemaNode) {
        self.push(Self::header(node));
        self.depth += 1;
    }

    fn end_object(&mut self, _path: &FieldPath, _node: &SchemaNode) {
        self.depth -= 1;
    }

    fn begin_array(&mut self, _path: &FieldPath, node: &SchemaNode, array: &ArrayNode) {
        self.push(format!("{}: {} items", Self::header(node), array.len()));
        self.depth += 1;
    }

    fn begin_item(&mut self, _path: &FieldPath, item: &EditableItem, len: usize) {
        self.push(format!("{} [{}/{len}]", item.identity, item.position + 1));
        self.depth += 1;
    }

    fn end_item(&mut self, _path: &FieldPath, _item: &EditableItem) {
        self.depth -= 1;
    }

    fn end_array(&mut self, _path: &FieldPath, _node: &SchemaNode, _array: &ArrayNode) {
        self.depth -= 1;
    }
}
