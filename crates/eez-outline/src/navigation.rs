//! Per-object navigation selection.
//!
//! List views do not keep selection flags of their own. The item selected
//! in the list shown for an object is recorded here, so every view of that
//! object agrees on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use eez_outline_core::Signal;
use eez_outline_core::logging::targets;

use crate::document::{Document, ObjectKey};

/// Navigation store shared between the list adapters of one document.
pub type SharedNavigationStore = Arc<RwLock<NavigationStore>>;

/// A navigation selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationChange {
    /// The object whose list changed selection.
    pub object: ObjectKey,
    /// The newly selected item.
    pub item: Option<ObjectKey>,
}

/// The selected item per navigated object.
#[derive(Debug)]
pub struct NavigationStore {
    editable: bool,
    selected: HashMap<ObjectKey, ObjectKey>,
    /// Emitted when the selected item of an object changes.
    pub changed: Signal<NavigationChange>,
}

impl Default for NavigationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStore {
    /// Create an editable store with nothing selected.
    pub fn new() -> Self {
        Self {
            editable: true,
            selected: HashMap::new(),
            changed: Signal::new(),
        }
    }

    /// Wrap in a shared handle.
    pub fn shared(self) -> SharedNavigationStore {
        Arc::new(RwLock::new(self))
    }

    /// Returns true if lists may be reordered by dragging.
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    /// Item selected in the list of `object`.
    pub fn get_navigation_selected_item(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.selected.get(&object).copied()
    }

    /// Record `item` as selected in the list of `object`.
    pub fn set_navigation_selected_item(&mut self, object: ObjectKey, item: ObjectKey) {
        if self.selected.insert(object, item) != Some(item) {
            tracing::debug!(target: targets::ADAPTER, ?object, ?item, "navigation item selected");
            self.changed.emit(NavigationChange {
                object,
                item: Some(item),
            });
        }
    }

    /// Forget the selection of `object`.
    pub fn clear_navigation_selected_item(&mut self, object: ObjectKey) {
        if self.selected.remove(&object).is_some() {
            self.changed.emit(NavigationChange { object, item: None });
        }
    }

    /// Drop selections whose object or item is gone from the document.
    pub fn prune(&mut self, doc: &Document) {
        self.selected
            .retain(|&object, &mut item| doc.contains(object) && doc.contains(item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentStore;
    use crate::document::tests::sample;

    #[test]
    fn test_selection_per_object() {
        let doc = sample();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let fonts = doc.property_object(doc.root(), "fonts").unwrap();
        let mut store = NavigationStore::new();
        assert!(store.is_editable());

        store.set_navigation_selected_item(pages, doc.elements(pages)[1]);
        store.set_navigation_selected_item(pages, doc.elements(pages)[1]);
        store.set_navigation_selected_item(fonts, doc.elements(fonts)[0]);
        assert_eq!(store.get_navigation_selected_item(pages), Some(doc.elements(pages)[1]));
        assert_eq!(store.changed.emit_count(), 2);

        store.clear_navigation_selected_item(fonts);
        assert_eq!(store.get_navigation_selected_item(fonts), None);
        assert_eq!(store.changed.emit_count(), 3);
    }

    #[test]
    fn test_prune_forgets_deleted_items() {
        let mut doc_store = DocumentStore::new(sample());
        let doc = doc_store.document();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let settings = doc.elements(pages)[1];

        let mut store = NavigationStore::new();
        store.set_navigation_selected_item(pages, settings);
        doc_store.delete_object(settings).unwrap();
        store.prune(doc_store.document());
        assert_eq!(store.get_navigation_selected_item(pages), None);
    }
}
