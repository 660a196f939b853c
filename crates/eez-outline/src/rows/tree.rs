//! Row projection of a tree adapter.

use serde_json::Map;

use eez_outline_core::PerfSpan;
use eez_outline_core::logging::targets;

use super::{ActivateFn, DropPosition, FilterFn, RowAdapter, SortDirection, TreeRow, can_reorder};
use crate::adapter::TreeObjectAdapter;
use crate::clipboard::{self, Clipboard, PastePlace};
use crate::document::{Document, DocumentStore, ObjectKey};
use crate::drag_drop::{DragDropManager, DropAction};
use crate::error::Result;
use crate::menu::{ContextMenuFactory, Menu};

/// Flattens the subtree of a [`TreeObjectAdapter`] into rows.
///
/// Rows are produced depth first in pre-order. Siblings are sorted by label
/// when a sort direction is set, which also turns off dragging. Objects
/// rejected by the filter are skipped together with their subtrees. An
/// array holding exactly one element that is shown without its container
/// contributes that element at its own level.
pub struct TreeAdapter {
    root: TreeObjectAdapter,
    item: Option<ObjectKey>,
    filter: Option<FilterFn>,
    collapsable: bool,
    sort_direction: SortDirection,
    max_level: Option<usize>,
    on_activate: Option<ActivateFn>,
}

impl std::fmt::Debug for TreeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeAdapter")
            .field("root", &self.root)
            .field("item", &self.item)
            .field("has_filter", &self.filter.is_some())
            .field("collapsable", &self.collapsable)
            .field("sort_direction", &self.sort_direction)
            .field("max_level", &self.max_level)
            .finish()
    }
}

impl TreeAdapter {
    /// Rows for the whole subtree of `root`, collapsable and unsorted.
    pub fn new(root: TreeObjectAdapter) -> Self {
        TreeAdapterBuilder::new(root).build()
    }

    /// The adapter holding selection and expansion.
    pub fn root_adapter(&self) -> &TreeObjectAdapter {
        &self.root
    }

    pub fn root_adapter_mut(&mut self) -> &mut TreeObjectAdapter {
        &mut self.root
    }

    /// Give back the wrapped adapter.
    pub fn into_root_adapter(self) -> TreeObjectAdapter {
        self.root
    }

    /// Returns true if rows can be expanded and collapsed.
    pub fn is_collapsable(&self) -> bool {
        self.collapsable
    }

    pub fn is_expanded(&self, item: ObjectKey) -> bool {
        self.root.is_expanded(item)
    }

    /// Flip the expansion of a row. Does nothing for non-collapsable trees.
    pub fn toggle_expanded(&mut self, item: ObjectKey) {
        if self.collapsable {
            self.root.toggle_expanded(item);
        }
    }

    /// Select the row of `object`, if it has one.
    pub fn select_object(&mut self, doc: &Document, object: ObjectKey) {
        if let Some(item) = doc.id(object).and_then(|id| self.get_item_from_id(doc, id)) {
            self.select_item(doc, item);
        }
    }

    /// Select the rows of `objects` that have one.
    pub fn select_objects(&mut self, doc: &Document, objects: &[ObjectKey]) {
        let items: Vec<ObjectKey> = objects
            .iter()
            .filter_map(|&object| doc.id(object).and_then(|id| self.get_item_from_id(doc, id)))
            .collect();
        if !items.is_empty() {
            self.select_items(doc, &items);
        }
    }

    /// Context menu for the current selection.
    pub fn create_selection_context_menu(
        &self,
        doc: &Document,
        clipboard: &dyn Clipboard,
        factory: &dyn ContextMenuFactory,
    ) -> Option<Menu> {
        self.root.create_selection_context_menu(doc, clipboard, factory)
    }

    fn sorted_children(&self, doc: &Document, item: ObjectKey) -> Vec<ObjectKey> {
        let mut children = self.root.children(doc, item).objects();
        self.sort_direction.sort(doc, &mut children);
        children
    }

    fn enum_children(
        &self,
        doc: &Document,
        items: Vec<ObjectKey>,
        level: usize,
        draggable: bool,
        rows: &mut Vec<TreeRow>,
    ) {
        for item in items {
            if self.filter.as_ref().is_some_and(|filter| !filter(doc, item)) {
                continue;
            }

            let children = self.sorted_children(doc, item);
            if children.len() == 1 && doc.is_array(item) && doc.is_show_only_children_in_tree(item) {
                self.enum_children(doc, children, level, draggable, rows);
                continue;
            }

            let index = rows.len();
            rows.push(TreeRow {
                item,
                level,
                draggable,
                collapsable: false,
            });

            let max_level_reached = self.max_level == Some(level);
            let has_children = !children.is_empty();
            if !max_level_reached && (self.root.is_expanded(item) || !self.collapsable) && has_children {
                self.enum_children(doc, children, level + 1, draggable, rows);
            }

            rows[index].collapsable = self.collapsable
                && !max_level_reached
                && (has_children || doc.can_contain_children(item));
        }
    }

    fn drag_class<'a>(&self, drag: &'a DragDropManager) -> Option<&'a str> {
        drag.session().map(|session| session.class_name())
    }
}

impl RowAdapter for TreeAdapter {
    fn all_rows(&self, doc: &Document) -> Vec<TreeRow> {
        let _span = PerfSpan::new("tree_rows");
        let start = self.item.unwrap_or_else(|| self.root.object());
        let mut rows = Vec::new();
        self.enum_children(
            doc,
            self.sorted_children(doc, start),
            0,
            !self.sort_direction.is_sorted(),
            &mut rows,
        );
        tracing::trace!(target: targets::ROWS, rows = rows.len(), "tree rows computed");
        rows
    }

    fn max_level(&self) -> Option<usize> {
        self.max_level
    }

    fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    fn get_item_from_id(&self, doc: &Document, id: &str) -> Option<ObjectKey> {
        self.root.get_object_adapter(doc, id)
    }

    fn get_item_parent(&self, doc: &Document, item: ObjectKey) -> Option<ObjectKey> {
        self.root.get_parent(doc, item)
    }

    fn is_selected(&self, _doc: &Document, item: ObjectKey) -> bool {
        self.root.is_selected(item)
    }

    fn select_item(&mut self, doc: &Document, item: ObjectKey) {
        self.root.select_items(doc, &[item]);
    }

    fn select_items(&mut self, doc: &Document, items: &[ObjectKey]) {
        self.root.select_items(doc, items);
    }

    fn toggle_selected(&mut self, doc: &Document, item: ObjectKey) {
        self.root.toggle_selected(doc, item);
    }

    fn cut_selection(&mut self, store: &mut DocumentStore, clipboard: &mut dyn Clipboard) -> Result<()> {
        self.root.cut_selection(store, clipboard)
    }

    fn copy_selection(&mut self, doc: &Document, clipboard: &mut dyn Clipboard) -> Result<()> {
        self.root.copy_selection(doc, clipboard)
    }

    fn paste_selection(&mut self, store: &mut DocumentStore, clipboard: &dyn Clipboard) -> Result<()> {
        self.root.paste_selection(store, clipboard).map(|_| ())
    }

    fn delete_selection(&mut self, store: &mut DocumentStore) -> Result<()> {
        self.root.delete_selection(store)
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
        let (Some(drag_object), Some(class)) = (drag.drag_object(), self.drag_class(drag)) else {
            return false;
        };
        if self.is_ancestor_of_drag_object(doc, drag, drop_item) {
            return false;
        }
        let parent_accepts = doc.is_array_element(drop_item)
            && doc
                .parent(drop_item)
                .is_some_and(|array| doc.array_accepts(array, class));
        if !parent_accepts {
            return false;
        }
        can_reorder(doc, drag_object, drop_item, position, prev_id, next_id)
    }

    fn can_drop_inside(&self, doc: &Document, drag: &DragDropManager, drop_item: ObjectKey) -> bool {
        let Some(class) = self.drag_class(drag) else {
            return false;
        };
        !self.is_ancestor_of_drag_object(doc, drag, drop_item)
            && clipboard::find_paste_place_inside(doc, drop_item, class, true).is_some()
    }

    fn on_drop(
        &mut self,
        store: &mut DocumentStore,
        drag: &mut DragDropManager,
        position: DropPosition,
    ) -> Result<Option<ObjectKey>> {
        let doc = store.document();
        let accepted = drag.drop_object().is_some_and(|drop_item| match position {
            DropPosition::Inside => self.can_drop_inside(doc, drag, drop_item),
            DropPosition::Before | DropPosition::After => {
                self.can_drop(doc, drag, drop_item, position, None, None)
            }
            DropPosition::None => false,
        });
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

        let place = if position == DropPosition::Inside {
            match clipboard::find_paste_place_inside(doc, drop_item, session.class_name(), true) {
                Some(place) => Some(place),
                None => return Ok(None),
            }
        } else {
            None
        };
        let is_move = session.proposed_action() == DropAction::MOVE;

        let created = store.transact("drop object", |store| {
            if is_move && store.document().contains(source) {
                store.delete_object(source)?;
            }
            match (position, place) {
                (DropPosition::Before, _) => store.insert_object_before(drop_item, json).map(Some),
                (DropPosition::After, _) => store.insert_object_after(drop_item, json).map(Some),
                (_, Some(PastePlace::Array(array))) => store.add_object(array, json).map(Some),
                (_, Some(PastePlace::Property { object, name })) => {
                    let mut values = Map::new();
                    values.insert(name.clone(), json.clone());
                    store.update_object(object, &values)?;
                    Ok(store.document().property_object(object, &name))
                }
                (_, None) => Ok(None),
            }
        })?;

        tracing::debug!(target: targets::DRAG, ?position, moved = is_move, "dropped");
        if let Some(object) = created {
            self.select_object(store.document(), object);
        }
        self.root.prune(store.document());
        Ok(created)
    }
}

/// Builder for [`TreeAdapter`].
///
/// # Example
///
/// ```ignore
/// let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(doc.root()))
///     .filter(|doc, object| doc.class_name(object) != Some("Font"))
///     .sort_direction(SortDirection::Asc)
///     .max_level(1)
///     .build();
/// ```
pub struct TreeAdapterBuilder {
    root: TreeObjectAdapter,
    item: Option<ObjectKey>,
    filter: Option<FilterFn>,
    collapsable: bool,
    sort_direction: SortDirection,
    max_level: Option<usize>,
    on_activate: Option<ActivateFn>,
}

impl TreeAdapterBuilder {
    /// Start from the adapter holding selection and expansion.
    pub fn new(root: TreeObjectAdapter) -> Self {
        Self {
            root,
            item: None,
            filter: None,
            collapsable: true,
            sort_direction: SortDirection::None,
            max_level: None,
            on_activate: None,
        }
    }

    /// Produce rows for the children of `item` instead of the root object.
    pub fn item(mut self, item: ObjectKey) -> Self {
        self.item = Some(item);
        self
    }

    /// Only objects accepted by `f` get rows.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Document, ObjectKey) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(std::sync::Arc::new(f));
        self
    }

    /// Use a shared filter.
    pub fn filter_fn(mut self, filter: Option<FilterFn>) -> Self {
        self.filter = filter;
        self
    }

    pub fn collapsable(mut self, collapsable: bool) -> Self {
        self.collapsable = collapsable;
        self
    }

    pub fn sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = direction;
        self
    }

    /// Rows deeper than `level` are not produced.
    pub fn max_level(mut self, level: usize) -> Self {
        self.max_level = Some(level);
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

    pub fn build(self) -> TreeAdapter {
        TreeAdapter {
            root: self.root,
            item: self.item,
            filter: self.filter,
            collapsable: self.collapsable,
            sort_direction: self.sort_direction,
            max_level: self.max_level,
            on_activate: self.on_activate,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::document::tests::{registry, sample};

    struct Fixture {
        doc: Document,
        main: ObjectKey,
        settings: ObjectKey,
        sans: ObjectKey,
        title: ObjectKey,
        ok: ObjectKey,
    }

    fn fixture() -> Fixture {
        let doc = sample();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let fonts = doc.property_object(doc.root(), "fonts").unwrap();
        let (main, settings) = (doc.elements(pages)[0], doc.elements(pages)[1]);
        let sans = doc.elements(fonts)[0];
        let widgets = doc.property_object(main, "widgets").unwrap();
        let (title, ok) = (doc.elements(widgets)[0], doc.elements(widgets)[1]);
        Fixture {
            doc,
            main,
            settings,
            sans,
            title,
            ok,
        }
    }

    fn items(rows: &[TreeRow]) -> Vec<ObjectKey> {
        rows.iter().map(|row| row.item).collect()
    }

    #[test]
    fn test_collapsed_rows() {
        let f = fixture();
        let rows = TreeAdapter::new(TreeObjectAdapter::new(f.doc.root())).all_rows(&f.doc);
        assert_eq!(items(&rows), vec![f.main, f.settings, f.sans]);
        assert!(rows.iter().all(|row| row.level == 0 && row.draggable));
        assert!(rows[0].collapsable);
        // an empty page can still hold widgets
        assert!(rows[1].collapsable);
        assert!(!rows[2].collapsable);
    }

    #[test]
    fn test_expanded_rows_nest() {
        let f = fixture();
        let mut root = TreeObjectAdapter::new(f.doc.root());
        root.set_expanded(f.main, true);
        let rows = TreeAdapter::new(root).all_rows(&f.doc);
        assert_eq!(items(&rows), vec![f.main, f.title, f.ok, f.settings, f.sans]);
        assert_eq!(rows[1].level, 1);
        assert_eq!(rows[2].level, 1);
    }

    #[test]
    fn test_not_collapsable_always_recurses() {
        let f = fixture();
        let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(f.doc.root()))
            .collapsable(false)
            .build()
            .all_rows(&f.doc);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| !row.collapsable));
    }

    #[test]
    fn test_filter_prunes_subtree() {
        let f = fixture();
        let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(f.doc.root()))
            .collapsable(false)
            .filter(|doc, object| doc.label(object) != "Main")
            .build()
            .all_rows(&f.doc);
        assert_eq!(items(&rows), vec![f.settings, f.sans]);
    }

    #[test]
    fn test_sorted_rows_are_not_draggable() {
        let f = fixture();
        let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(f.doc.root()))
            .sort_direction(SortDirection::Desc)
            .build()
            .all_rows(&f.doc);
        assert_eq!(items(&rows), vec![f.settings, f.sans, f.main]);
        assert!(rows.iter().all(|row| !row.draggable));
    }

    #[test]
    fn test_max_level() {
        let f = fixture();
        let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(f.doc.root()))
            .collapsable(false)
            .max_level(0)
            .build()
            .all_rows(&f.doc);
        assert_eq!(items(&rows), vec![f.main, f.settings, f.sans]);
    }

    #[test]
    fn test_sub_item_rows() {
        let f = fixture();
        let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(f.doc.root()))
            .item(f.main)
            .build()
            .all_rows(&f.doc);
        assert_eq!(items(&rows), vec![f.title, f.ok]);
    }

    #[test]
    fn test_single_element_array_is_spliced() {
        let doc = Document::from_json(
            registry(),
            "Project",
            &json!({ "settings": { "title": "t" }, "pages": [{ "name": "Only" }], "fonts": [] }),
        )
        .unwrap();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let fonts = doc.property_object(doc.root(), "fonts").unwrap();
        let settings = doc.property_object(doc.root(), "settings").unwrap();
        let only = doc.elements(pages)[0];

        let rows = TreeAdapter::new(TreeObjectAdapter::new(doc.root())).all_rows(&doc);
        assert_eq!(items(&rows), vec![settings, only, fonts]);
    }

    #[test]
    fn test_item_lookup_and_selection() {
        let f = fixture();
        let mut rows = TreeAdapter::new(TreeObjectAdapter::new(f.doc.root()));
        let ok_id = f.doc.id(f.ok).unwrap();
        assert_eq!(rows.get_item_from_id(&f.doc, ok_id), Some(f.ok));
        assert_eq!(rows.get_item_parent(&f.doc, f.ok), Some(f.main));
        assert_eq!(rows.item_to_string(&f.doc, f.ok), "ok");
        assert!(rows.is_ancestor(&f.doc, f.ok, f.main));

        rows.select_object(&f.doc, f.ok);
        assert!(rows.is_selected(&f.doc, f.ok));
        assert!(rows.is_expanded(f.main));

        rows.select_objects(&f.doc, &[f.title, f.ok]);
        assert_eq!(rows.root_adapter().selected_items(&f.doc), vec![f.title, f.ok]);

        rows.toggle_expanded(f.main);
        assert!(!rows.is_expanded(f.main));
    }

    #[test]
    fn test_double_click_callback() {
        let f = fixture();
        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clicks);
        let rows = TreeAdapterBuilder::new(TreeObjectAdapter::new(f.doc.root()))
            .on_double_click(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        rows.on_double_click(f.main);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_can_drop_rules() {
        let f = fixture();
        let rows = TreeAdapter::new(TreeObjectAdapter::new(f.doc.root()));
        let mut drag = DragDropManager::new();
        assert!(!rows.can_drop(&f.doc, &drag, f.main, DropPosition::After, None, None));

        drag.start(&f.doc, f.main, DropAction::ALL).unwrap();
        let main_id = f.doc.id(f.main);
        // onto itself or inside its own subtree
        assert!(!rows.can_drop(&f.doc, &drag, f.main, DropPosition::After, None, None));
        assert!(!rows.can_drop(&f.doc, &drag, f.ok, DropPosition::After, None, None));
        // a font list does not accept pages
        assert!(!rows.can_drop(&f.doc, &drag, f.sans, DropPosition::Before, None, None));
        // same position
        assert!(!rows.can_drop(&f.doc, &drag, f.settings, DropPosition::Before, main_id, None));
        assert!(rows.can_drop(&f.doc, &drag, f.settings, DropPosition::After, main_id, None));

        assert!(rows.can_drop_inside(&f.doc, &drag, f.doc.root()));
        assert!(!rows.can_drop_inside(&f.doc, &drag, f.sans));
        assert!(!rows.can_drop_inside(&f.doc, &drag, f.main));
    }

    #[test]
    fn test_drop_moves_object() {
        let f = fixture();
        let mut store = DocumentStore::new(f.doc);
        let mut rows = TreeAdapter::new(TreeObjectAdapter::new(store.document().root()));
        let mut drag = DragDropManager::new();

        rows.on_drag_start(store.document(), &mut drag, f.main).unwrap();
        assert!(rows.is_drag_source(&drag, f.main));
        rows.on_drag_over(&mut drag, Some(f.settings));
        let created = rows
            .on_drop(&mut store, &mut drag, DropPosition::After)
            .unwrap()
            .unwrap();

        let doc = store.document();
        assert!(!doc.contains(f.main));
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        assert_eq!(doc.elements(pages), &[f.settings, created]);
        assert_eq!(doc.label(created), "Main");
        assert_eq!(rows.root_adapter().selected_items(doc), vec![created]);
        assert!(!drag.is_dragging());
        assert_eq!(store.undo_label(), Some("drop object"));
    }

    #[test]
    fn test_drop_copy_inside() {
        let f = fixture();
        let mut store = DocumentStore::new(f.doc);
        let mut rows = TreeAdapter::new(TreeObjectAdapter::new(store.document().root()));
        let mut drag = DragDropManager::new();

        rows.on_drag_start(store.document(), &mut drag, f.ok).unwrap();
        drag.set_proposed_action(DropAction::COPY);
        rows.on_drag_over(&mut drag, Some(f.title));
        let created = rows
            .on_drop(&mut store, &mut drag, DropPosition::Inside)
            .unwrap()
            .unwrap();

        let doc = store.document();
        assert!(doc.contains(f.ok));
        let children = doc.property_object(f.title, "children").unwrap();
        assert_eq!(doc.elements(children), &[created]);
        assert_eq!(doc.class_name(created), Some("Button"));
    }

    #[test]
    fn test_drop_without_place_keeps_source() {
        let f = fixture();
        let mut store = DocumentStore::new(f.doc);
        let mut rows = TreeAdapter::new(TreeObjectAdapter::new(store.document().root()));
        let mut drag = DragDropManager::new();

        rows.on_drag_start(store.document(), &mut drag, f.main).unwrap();
        rows.on_drag_over(&mut drag, Some(f.sans));
        let created = rows.on_drop(&mut store, &mut drag, DropPosition::Inside).unwrap();
        assert_eq!(created, None);
        assert!(store.document().contains(f.main));
        assert!(!store.can_undo());
    }

    #[test]
    fn test_rejected_drop_leaves_document_untouched() {
        let doc = Document::from_json(
            registry(),
            "Project",
            &json!({ "settings": { "title": "t" }, "pages": [{ "name": "Only" }], "fonts": [{ "name": "Sans" }] }),
        )
        .unwrap();
        let settings = doc.property_object(doc.root(), "settings").unwrap();
        let only = doc.elements(doc.property_object(doc.root(), "pages").unwrap())[0];
        let sans = doc.elements(doc.property_object(doc.root(), "fonts").unwrap())[0];
        let before = doc.to_json(doc.root());
        let mut store = DocumentStore::new(doc);
        let mut rows = TreeAdapter::new(TreeObjectAdapter::new(store.document().root()));
        let mut drag = DragDropManager::new();

        // a page next to a font, then next to an object that is not an array element
        for target in [sans, settings] {
            rows.on_drag_start(store.document(), &mut drag, only).unwrap();
            drag.set_proposed_action(DropAction::MOVE);
            rows.on_drag_over(&mut drag, Some(target));
            let created = rows.on_drop(&mut store, &mut drag, DropPosition::After).unwrap();
            assert_eq!(created, None);
            assert!(!drag.is_dragging());
        }

        let doc = store.document();
        assert!(doc.contains(only));
        assert_eq!(doc.to_json(doc.root()), before);
        assert!(!store.can_undo());
    }
}
