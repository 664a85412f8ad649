//! Presentation boundary.
//!
//! The engine never depends on a widget library. A renderer implements
//! [`Presenter`] and receives the tree through [`present`]; user edits come
//! back as [`EditEvent`]s applied with [`Form::apply`](crate::synth::Form::apply).

use serde_json::Value;

use crate::{
    data::{ArrayNode, EditableItem, FieldPath, ItemId, NodeBody, SchemaNode},
    synth::Form,
};

/// A user edit reported by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    /// Replace the value of a leaf.
    SetValue { path: FieldPath, value: Value },
    /// Append a new element to an array container.
    AddItem { path: FieldPath },
    /// Drop an element of an array container.
    RemoveItem { path: FieldPath, identity: ItemId },
    /// Move an element of an array container to index `to`.
    MoveItem {
        path: FieldPath,
        identity: ItemId,
        to: usize,
    },
}

/// Receives the editable tree in depth-first, declaration order.
///
/// Every method has an empty default so renderers only implement what they draw.
#[allow(unused_variables)]
pub trait Presenter {
    fn leaf(&mut self, path: &FieldPath, node: &SchemaNode, value: &Value) {}

    fn begin_object(&mut self, path: &FieldPath, node: &SchemaNode) {}

    fn end_object(&mut self, path: &FieldPath, node: &SchemaNode) {}

    fn begin_array(&mut self, path: &FieldPath, node: &SchemaNode, array: &ArrayNode) {}

    fn begin_item(&mut self, path: &FieldPath, item: &EditableItem, len: usize) {}

    fn end_item(&mut self, path: &FieldPath, item: &EditableItem) {}

    fn end_array(&mut self, path: &FieldPath, node: &SchemaNode, array: &ArrayNode) {}
}

/// Walk the whole form through `presenter`. The root object itself is not reported.
pub fn present<P: Presenter + ?Sized>(form: &Form, presenter: &mut P) {
    if let NodeBody::Object { children, .. } = &form.root().body {
        for child in children {
            walk(FieldPath::root().key(child.key.clone()), child, presenter);
        }
    }
}

fn walk<P: Presenter + ?Sized>(path: FieldPath, node: &SchemaNode, presenter: &mut P) {
    match &node.body {
        NodeBody::Leaf { value } => presenter.leaf(&path, node, value),
        NodeBody::Object { children, .. } => {
            presenter.begin_object(&path, node);
            for child in children {
                walk(path.clone().key(child.key.clone()), child, presenter);
            }
            presenter.end_object(&path, node);
        }
        NodeBody::Array(array) => {
            presenter.begin_array(&path, node, array);
            for item in &array.items {
                let item_path = path.clone().item(item.identity);
                presenter.begin_item(&item_path, item, array.len());
                if let NodeBody::Object { children, .. } = &item.node.body {
                    for child in children {
                        walk(item_path.clone().key(child.key.clone()), child, presenter);
                    }
                }
                presenter.end_item(&item_path, item);
            }
            presenter.end_array(&path, node, array);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{FieldSchema, FormSchema},
        synth::Synthesizer,
    };
    use serde_json::json;

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl Presenter for Trace {
        fn leaf(&mut self, path: &FieldPath, _node: &SchemaNode, value: &Value) {
            self.0.push(format!("{path}={value}"));
        }

        fn begin_item(&mut self, path: &FieldPath, item: &EditableItem, len: usize) {
            self.0.push(format!("{path} {}/{len}", item.position + 1));
        }
    }

    #[test]
    fn test_present_visits_in_declaration_order() {
        let schema = FormSchema::new(vec![
            FieldSchema::new("title", "text"),
            FieldSchema::new("links", "array").with_fields(vec![FieldSchema::new("href", "url")]),
            FieldSchema::new("draft", "checkbox"),
        ]);
        let form = Synthesizer::new()
            .synthesize(&schema, &json!({"title": "Home", "links": [{"href": "/a"}]}))
            .unwrap();

        let mut trace = Trace::default();
        present(&form, &mut trace);
        assert_eq!(
            trace.0,
            vec![
                r#"title="Home""#,
                "links.#1 1/1",
                r#"links.#1.href="/a""#,
                "draft=false",
            ]
        );
    }
}
