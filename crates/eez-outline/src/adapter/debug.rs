//! Text rendering of an adapter's tree.

use eez_outline_core::DebugTree;

use super::TreeObjectAdapter;
use crate::document::{Document, ObjectKey};

/// A [`TreeObjectAdapter`] paired with its document, renderable with
/// [`eez_outline_core::TreeDebug`].
///
/// Selected nodes are marked with `*`. Collapsed nodes with children are
/// marked with `+` and their children are not rendered.
#[derive(Clone, Copy)]
pub struct AdapterTree<'a> {
    adapter: &'a TreeObjectAdapter,
    doc: &'a Document,
}

impl<'a> AdapterTree<'a> {
    pub fn new(adapter: &'a TreeObjectAdapter, doc: &'a Document) -> Self {
        Self { adapter, doc }
    }
}

impl DebugTree for AdapterTree<'_> {
    type Node = ObjectKey;

    fn roots(&self) -> Vec<ObjectKey> {
        vec![self.adapter.object()]
    }

    fn label(&self, node: &ObjectKey) -> String {
        let mut label = self.doc.object_to_string(*node);
        if !self.adapter.is_expanded(*node) && self.adapter.has_children(self.doc, *node) {
            label.push_str(" +");
        }
        if self.adapter.is_selected(*node) {
            label.push_str(" *");
        }
        label
    }

    fn children(&self, node: &ObjectKey) -> Vec<ObjectKey> {
        if self.adapter.is_expanded(*node) {
            self.adapter.children(self.doc, *node).objects()
        } else {
            Vec::new()
        }
    }
}
