//! Row projection of a single array.

use std::collections::HashSet;

use eez_outline_core::logging::targets;

use super::{ActivateFn, DropPosition, FilterFn, RowAdapter, SortDirection, TreeRow, can_reorder};
use crate::clipboard::{self, Clipboard};
use crate::document::{Document, DocumentStore, ObjectKey};
use crate::drag_drop::{DragDropManager, DropAction};
use crate::error::Result;
use crate::menu::{ContextMenuFactory, Menu};
use crate::navigation::SharedNavigationStore;

/// Shows the elements of one array as top-level rows.
///
/// The selected row is the navigation item recorded for the array in the
/// shared [`NavigationStore`](crate::navigation::NavigationStore). Local
/// flags follow it: whenever the navigation item is listed but not flagged,
/// the flags are reset to exactly that item.
pub struct ListAdapter {
    object: ObjectKey,
    navigation: SharedNavigationStore,
    flags: HashSet<ObjectKey>,
    sort_direction: SortDirection,
    filter: Option<FilterFn>,
    search_text: Option<String>,
    on_activate: Option<ActivateFn>,
}

impl std::fmt::Debug for ListAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListAdapter")
            .field("object", &self.object)
            .field("flags", &self.flags)
            .field("sort_direction", &self.sort_direction)
            .field("has_filter", &self.filter.is_some())
            .field("search_text", &self.search_text)
            .finish()
    }
}

impl ListAdapter {
    /// List the elements of the array `object`.
    pub fn new(object: ObjectKey, navigation: SharedNavigationStore) -> Self {
        Self {
            object,
            navigation,
            flags: HashSet::new(),
            sort_direction: SortDirection::None,
            filter: None,
            search_text: None,
            on_activate: None,
        }
    }

    pub fn with_sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = direction;
        self
    }

    /// Only elements accepted by `f` are listed.
    pub fn with_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Document, ObjectKey) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(std::sync::Arc::new(f));
        self
    }

    pub fn with_filter_fn(mut self, filter: Option<FilterFn>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.set_search_text(text);
        self
    }

    /// Called with the object of a double-clicked row.
    pub fn on_double_click<F>(mut self, f: F) -> Self
    where
        F: Fn(ObjectKey) + Send + Sync + 'static,
    {
        self.on_activate = Some(std::sync::Arc::new(f));
        self
    }

    /// Only list elements whose text contains `text`, ignoring case. An
    /// empty text lists everything.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.search_text = (!text.is_empty()).then(|| text.to_lowercase());
    }

    /// The listed array.
    pub fn object(&self) -> ObjectKey {
        self.object
    }

    /// Listed elements in display order.
    pub fn items(&self, doc: &Document) -> Vec<ObjectKey> {
        let mut items: Vec<ObjectKey> = doc
            .elements(self.object)
            .iter()
            .copied()
            .filter(|&item| self.filter.as_ref().is_none_or(|filter| filter(doc, item)))
            .filter(|&item| {
                self.search_text
                    .as_deref()
                    .is_none_or(|text| doc.object_to_string(item).to_lowercase().contains(text))
            })
            .collect();
        self.sort_direction.sort(doc, &mut items);
        items
    }

    /// The navigation item of the array, if it is listed.
    pub fn selected_item(&self, doc: &Document) -> Option<ObjectKey> {
        let item = self.navigation.read().get_navigation_selected_item(self.object)?;
        let id = doc.id(item)?;
        self.get_item_from_id(doc, id)
    }

    /// Reset the flags to the navigation item when they disagree.
    pub fn enforce_selection(&mut self, doc: &Document) {
        if let Some(item) = self.selected_item(doc) {
            if !self.flags.contains(&item) {
                tracing::trace!(target: targets::ROWS, ?item, "list selection realigned");
                self.flags.clear();
                self.flags.insert(item);
            }
        }
    }

    /// Select the row of `object`, if it is listed.
    pub fn select_object(&mut self, doc: &Document, object: ObjectKey) {
        if let Some(item) = doc.id(object).and_then(|id| self.get_item_from_id(doc, id)) {
            self.select_item(doc, item);
        }
    }

    /// Select the listed `objects` one after the other.
    pub fn select_objects(&mut self, doc: &Document, objects: &[ObjectKey]) {
        for &object in objects {
            self.select_object(doc, object);
        }
    }

    /// Context menu for the selected row, or for the list itself.
    pub fn create_selection_context_menu(
        &self,
        doc: &Document,
        clipboard: &dyn Clipboard,
        factory: &dyn ContextMenuFactory,
    ) -> Option<Menu> {
        let target = self.selected_item(doc).unwrap_or(self.object);
        factory.create_context_menu(doc, clipboard, target)
    }
}

impl RowAdapter for ListAdapter {
    fn all_rows(&self, doc: &Document) -> Vec<TreeRow> {
        let rows: Vec<TreeRow> = self
            .items(doc)
            .into_iter()
            .map(|item| TreeRow {
                item,
                level: 0,
                draggable: true,
                collapsable: false,
            })
            .collect();
        tracing::trace!(target: targets::ROWS, rows = rows.len(), "list rows computed");
        rows
    }

    fn max_level(&self) -> Option<usize> {
        Some(0)
    }

    fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    fn get_item_from_id(&self, doc: &Document, id: &str) -> Option<ObjectKey> {
        self.items(doc).into_iter().find(|&item| doc.id(item) == Some(id))
    }

    fn get_item_parent(&self, _doc: &Document, item: ObjectKey) -> Option<ObjectKey> {
        (item != self.object).then_some(self.object)
    }

    fn is_selected(&self, doc: &Document, item: ObjectKey) -> bool {
        match self.selected_item(doc) {
            Some(selected) if !self.flags.contains(&selected) => item == selected,
            _ => self.flags.contains(&item),
        }
    }

    fn select_item(&mut self, doc: &Document, item: ObjectKey) {
        self.enforce_selection(doc);
        let outside_navigation = doc
            .parent(item)
            .is_some_and(|parent| !doc.is_part_of_navigation(parent));
        if outside_navigation {
            self.navigation
                .write()
                .set_navigation_selected_item(self.object, item);
            return;
        }

        if let Some(previous) = self.selected_item(doc) {
            self.flags.remove(&previous);
        }
        self.navigation
            .write()
            .set_navigation_selected_item(self.object, item);
        if let Some(current) = self.selected_item(doc) {
            self.flags.insert(current);
        }
    }

    fn select_items(&mut self, doc: &Document, items: &[ObjectKey]) {
        if let Some(&first) = items.first() {
            self.select_item(doc, first);
        }
    }

    fn toggle_selected(&mut self, doc: &Document, item: ObjectKey) {
        self.select_item(doc, item);
    }

    fn cut_selection(&mut self, store: &mut DocumentStore, clipboard: &mut dyn Clipboard) -> Result<()> {
        self.enforce_selection(store.document());
        if let Some(item) = self.selected_item(store.document()) {
            clipboard::cut_item(store, clipboard, item)?;
            self.navigation.write().prune(store.document());
        }
        Ok(())
    }

    fn copy_selection(&mut self, doc: &Document, clipboard: &mut dyn Clipboard) -> Result<()> {
        self.enforce_selection(doc);
        match self.selected_item(doc) {
            Some(item) => clipboard::copy_item(doc, clipboard, item),
            None => Ok(()),
        }
    }

    fn paste_selection(&mut self, store: &mut DocumentStore, clipboard: &dyn Clipboard) -> Result<()> {
        self.enforce_selection(store.document());
        let target = self.selected_item(store.document()).unwrap_or(self.object);
        let created = clipboard::paste_item(store, clipboard, target)?;
        self.select_objects(store.document(), &created);
        Ok(())
    }

    fn delete_selection(&mut self, store: &mut DocumentStore) -> Result<()> {
        self.enforce_selection(store.document());
        if let Some(item) = self.selected_item(store.document()) {
            clipboard::delete_items(store, &[item])?;
            self.flags.retain(|&flagged| flagged != item);
            self.navigation.write().prune(store.document());
        }
        Ok(())
    }

    fn on_double_click(&self, item: ObjectKey) {
        if let Some(callback) = &self.on_activate {
            callback(item);
        }
    }

    fn can_drop(
        &self,
        doc: &Document,
        drag: &DragDropManager,
        drop_item: ObjectKey,
        position: DropPosition,
        prev_id: Option<&str>,
        next_id: Option<&str>,
    ) -> bool {
        if !self.navigation.read().is_editable() {
            return false;
        }
        let Some(session) = drag.session() else {
            return false;
        };
        if !doc.array_accepts(self.object, session.class_name()) {
            return false;
        }
        can_reorder(doc, session.object(), drop_item, position, prev_id, next_id)
    }

    fn can_drop_inside(&self, _doc: &Document, _drag: &DragDropManager, _drop_item: ObjectKey) -> bool {
        false
    }

    fn on_drop(
        &mut self,
        store: &mut DocumentStore,
        drag: &mut DragDropManager,
        position: DropPosition,
    ) -> Result<Option<ObjectKey>> {
        let doc = store.document();
        let accepted = matches!(position, DropPosition::Before | DropPosition::After)
            && drag
                .drop_object()
                .is_some_and(|drop_item| self.can_drop(doc, drag, drop_item, position, None, None));
        let Some(session) = drag.end(true) else {
            return Ok(None);
        };
        if !accepted {
            tracing::debug!(target: targets::DRAG, ?position, "drop rejected");
            return Ok(None);
        }
        let (Some(drop_item), Some(json)) = (session.drop_object(), session.object_json()) else {
            tracing::warn!(target: targets::DRAG, "drop without a payload");
            return Ok(None);
        };
        let source = session.object();
        let is_move = session.proposed_action() == DropAction::MOVE;

        let created = store.transact("drop object", |store| {
            if is_move && store.document().contains(source) {
                store.delete_object(source)?;
            }
            if position == DropPosition::Before {
                store.insert_object_before(drop_item, json)
            } else {
                store.insert_object_after(drop_item, json)
            }
        })?;

        tracing::debug!(target: targets::DRAG, ?position, moved = is_move, "dropped in list");
        self.navigation.write().prune(store.document());
        self.select_object(store.document(), created);
        Ok(Some(created))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::document::tests::sample;
    use crate::navigation::NavigationStore;

    struct Fixture {
        store: DocumentStore,
        navigation: SharedNavigationStore,
        pages: ObjectKey,
        main: ObjectKey,
        settings: ObjectKey,
    }

    fn fixture() -> Fixture {
        let doc = sample();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let (main, settings) = (doc.elements(pages)[0], doc.elements(pages)[1]);
        Fixture {
            store: DocumentStore::new(doc),
            navigation: NavigationStore::new().shared(),
            pages,
            main,
            settings,
        }
    }

    #[test]
    fn test_rows_are_flat() {
        let f = fixture();
        let list = ListAdapter::new(f.pages, f.navigation.clone());
        let rows = list.all_rows(f.store.document());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.level == 0 && !row.collapsable));
        assert_eq!(list.max_level(), Some(0));
        assert_eq!(list.get_item_parent(f.store.document(), f.main), Some(f.pages));
        assert_eq!(list.get_item_parent(f.store.document(), f.pages), None);
    }

    #[test]
    fn test_search_filter_and_sort() {
        let f = fixture();
        let doc = f.store.document();
        let mut list = ListAdapter::new(f.pages, f.navigation.clone())
            .with_sort_direction(SortDirection::Desc);
        assert_eq!(list.items(doc), vec![f.settings, f.main]);

        list.set_search_text("MAI");
        assert_eq!(list.items(doc), vec![f.main]);
        list.set_search_text("");
        assert_eq!(list.items(doc).len(), 2);

        let list = list.with_filter(|doc, item| doc.label(item).starts_with('S'));
        assert_eq!(list.items(doc), vec![f.settings]);
    }

    #[test]
    fn test_selection_follows_navigation() {
        let f = fixture();
        let doc = f.store.document();
        let mut list = ListAdapter::new(f.pages, f.navigation.clone());

        list.select_item(doc, f.main);
        assert!(list.is_selected(doc, f.main));
        assert_eq!(f.navigation.read().get_navigation_selected_item(f.pages), Some(f.main));

        // another view moves the navigation selection
        f.navigation.write().set_navigation_selected_item(f.pages, f.settings);
        assert!(list.is_selected(doc, f.settings));
        assert!(!list.is_selected(doc, f.main));
        list.enforce_selection(doc);
        assert!(list.is_selected(doc, f.settings));

        list.select_items(doc, &[f.main, f.settings]);
        assert_eq!(list.selected_item(doc), Some(f.main));
    }

    #[test]
    fn test_selection_outside_navigation_only_records() {
        let f = fixture();
        let doc = f.store.document();
        let fonts = doc.property_object(doc.root(), "fonts").unwrap();
        let sans = doc.elements(fonts)[0];
        let mut list = ListAdapter::new(fonts, f.navigation.clone());

        list.select_item(doc, sans);
        assert_eq!(f.navigation.read().get_navigation_selected_item(fonts), Some(sans));
        assert!(list.is_selected(doc, sans));
    }

    #[test]
    fn test_clipboard_on_navigation_item() {
        let mut f = fixture();
        let mut clipboard = MemoryClipboard::new();
        let mut list = ListAdapter::new(f.pages, f.navigation.clone());

        list.select_item(f.store.document(), f.main);
        list.copy_selection(f.store.document(), &mut clipboard).unwrap();
        list.paste_selection(&mut f.store, &clipboard).unwrap();

        let doc = f.store.document();
        assert_eq!(doc.elements(f.pages).len(), 3);
        let pasted = doc.elements(f.pages)[1];
        assert_eq!(list.selected_item(doc), Some(pasted));

        list.delete_selection(&mut f.store).unwrap();
        assert_eq!(f.store.document().elements(f.pages).len(), 2);
        assert_eq!(list.selected_item(f.store.document()), None);
    }

    #[test]
    fn test_can_drop() {
        let f = fixture();
        let doc = f.store.document();
        let list = ListAdapter::new(f.pages, f.navigation.clone());
        let mut drag = DragDropManager::new();
        drag.start(doc, f.main, DropAction::ALL).unwrap();
        let main_id = doc.id(f.main);

        assert!(list.can_drop(doc, &drag, f.settings, DropPosition::After, main_id, None));
        assert!(!list.can_drop(doc, &drag, f.settings, DropPosition::Before, main_id, None));
        assert!(!list.can_drop(doc, &drag, f.main, DropPosition::After, None, None));
        assert!(!list.can_drop_inside(doc, &drag, f.settings));

        f.navigation.write().set_editable(false);
        assert!(!list.can_drop(doc, &drag, f.settings, DropPosition::After, main_id, None));
    }

    #[test]
    fn test_can_drop_rejects_foreign_class() {
        let f = fixture();
        let doc = f.store.document();
        let fonts = doc.property_object(doc.root(), "fonts").unwrap();
        let list = ListAdapter::new(fonts, f.navigation.clone());
        let mut drag = DragDropManager::new();
        drag.start(doc, f.main, DropAction::ALL).unwrap();
        assert!(!list.can_drop(doc, &drag, doc.elements(fonts)[0], DropPosition::After, None, None));
    }

    #[test]
    fn test_drop_reorders() {
        let mut f = fixture();
        let mut list = ListAdapter::new(f.pages, f.navigation.clone());
        let mut drag = DragDropManager::new();

        list.on_drag_start(f.store.document(), &mut drag, f.settings).unwrap();
        list.on_drag_over(&mut drag, Some(f.main));
        let created = list
            .on_drop(&mut f.store, &mut drag, DropPosition::Before)
            .unwrap()
            .unwrap();

        let doc = f.store.document();
        assert_eq!(doc.elements(f.pages), &[created, f.main]);
        assert_eq!(doc.label(created), "Settings");
        assert_eq!(list.selected_item(doc), Some(created));

        // inside drops are not supported by lists
        list.on_drag_start(doc, &mut drag, f.main).unwrap();
        list.on_drag_over(&mut drag, Some(created));
        assert_eq!(list.on_drop(&mut f.store, &mut drag, DropPosition::Inside).unwrap(), None);
        assert_eq!(f.store.document().elements(f.pages).len(), 2);
    }

    #[test]
    fn test_rejected_drop_leaves_document_untouched() {
        let mut f = fixture();
        let doc = f.store.document();
        let fonts = doc.property_object(doc.root(), "fonts").unwrap();
        let sans = doc.elements(fonts)[0];
        let before = doc.to_json(doc.root());
        let mut list = ListAdapter::new(fonts, f.navigation.clone());
        let mut drag = DragDropManager::new();

        list.on_drag_start(doc, &mut drag, f.main).unwrap();
        drag.set_proposed_action(DropAction::MOVE);
        list.on_drag_over(&mut drag, Some(sans));
        assert_eq!(list.on_drop(&mut f.store, &mut drag, DropPosition::After).unwrap(), None);
        assert!(!drag.is_dragging());

        let doc = f.store.document();
        assert!(doc.contains(f.main));
        assert_eq!(doc.elements(f.pages).len(), 2);
        assert_eq!(doc.to_json(doc.root()), before);
        assert!(!f.store.can_undo());
    }

    #[test]
    fn test_added_elements_are_listed() {
        let mut f = fixture();
        let list = ListAdapter::new(f.pages, f.navigation.clone());
        f.store.add_object(f.pages, &json!({ "name": "About" })).unwrap();
        assert_eq!(list.all_rows(f.store.document()).len(), 3);
    }
}
