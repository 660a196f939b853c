//! Tree/selection adapter.
//!
//! A [`TreeObjectAdapter`] projects the subtree of one document object into
//! a selectable, expandable tree. Tree nodes are identified by the document
//! object they wrap. Their children are derived from the document on every
//! call, so they always match the current object graph. Only the
//! `selected` and `expanded` flags are stored, in a map keyed by object.
//!
//! # Example
//!
//! ```ignore
//! let mut adapter = TreeObjectAdapter::new(doc.root());
//! adapter.select_object(&doc, widget);
//! assert_eq!(adapter.selected_object(&doc), Some(widget));
//! assert!(adapter.is_expanded(page));
//! ```

mod children;
mod debug;
mod state;

use std::collections::HashMap;

pub use children::AdapterChildren;
pub use debug::AdapterTree;
pub use state::ViewState;

use eez_outline_core::Signal;
use eez_outline_core::logging::targets;

use crate::clipboard::{self, Clipboard};
use crate::document::{Document, DocumentStore, ObjectKey, is_descendant_id};
use crate::error::Result;
use crate::menu::{ContextMenuFactory, Menu, MenuAction, MenuItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct NodeFlags {
    selected: bool,
    expanded: bool,
}

/// A reference to a tree node: the object it wraps or its hierarchical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef<'a> {
    Object(ObjectKey),
    Id(&'a str),
}

impl From<ObjectKey> for ItemRef<'_> {
    fn from(object: ObjectKey) -> Self {
        Self::Object(object)
    }
}

impl<'a> From<&'a str> for ItemRef<'a> {
    fn from(id: &'a str) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a String> for ItemRef<'a> {
    fn from(id: &'a String) -> Self {
        Self::Id(id)
    }
}

/// Selection and expansion state over a document subtree.
#[derive(Debug)]
pub struct TreeObjectAdapter {
    object: ObjectKey,
    flags: HashMap<ObjectKey, NodeFlags>,
    /// Emitted once per call that replaces or changes the selection.
    pub selection_changed: Signal<()>,
}

impl TreeObjectAdapter {
    /// Create an adapter over the subtree rooted at `object`.
    pub fn new(object: ObjectKey) -> Self {
        Self {
            object,
            flags: HashMap::new(),
            selection_changed: Signal::new(),
        }
    }

    /// Create an adapter whose root starts expanded.
    pub fn with_expanded_root(object: ObjectKey) -> Self {
        let mut adapter = Self::new(object);
        adapter.set_expanded(object, true);
        adapter
    }

    /// The object at the root of the subtree.
    pub fn object(&self) -> ObjectKey {
        self.object
    }

    fn flags(&self, item: ObjectKey) -> NodeFlags {
        self.flags.get(&item).copied().unwrap_or_default()
    }

    fn flags_mut(&mut self, item: ObjectKey) -> &mut NodeFlags {
        self.flags.entry(item).or_default()
    }

    /// Children of a node, derived from the current document.
    pub fn children(&self, doc: &Document, item: ObjectKey) -> AdapterChildren {
        AdapterChildren::of(doc, item)
    }

    /// Returns true if the node has at least one child.
    pub fn has_children(&self, doc: &Document, item: ObjectKey) -> bool {
        !self.children(doc, item).is_empty()
    }

    /// Returns true if the node is selected.
    pub fn is_selected(&self, item: ObjectKey) -> bool {
        self.flags(item).selected
    }

    /// Returns true if the node is expanded.
    pub fn is_expanded(&self, item: ObjectKey) -> bool {
        self.flags(item).expanded
    }

    /// Expand or collapse a node.
    pub fn set_expanded(&mut self, item: ObjectKey, expanded: bool) {
        self.flags_mut(item).expanded = expanded;
    }

    /// Flip the expansion of a node.
    pub fn toggle_expanded(&mut self, item: ObjectKey) {
        let flags = self.flags_mut(item);
        flags.expanded = !flags.expanded;
    }

    /// Drop flags of objects that are no longer in the document.
    pub fn prune(&mut self, doc: &Document) {
        let before = self.flags.len();
        self.flags.retain(|&object, _| doc.contains(object));
        tracing::trace!(
            target: targets::ADAPTER,
            removed = before - self.flags.len(),
            "pruned adapter flags"
        );
    }

    // -- selection --

    /// Selected nodes of the subtree in document order.
    pub fn selected_items(&self, doc: &Document) -> Vec<ObjectKey> {
        let mut items = Vec::new();
        if self.flags.values().any(|flags| flags.selected) {
            self.collect_selected(doc, self.object, &mut items);
        }
        items
    }

    fn collect_selected(&self, doc: &Document, item: ObjectKey, items: &mut Vec<ObjectKey>) {
        if self.is_selected(item) {
            items.push(item);
        }
        for child in self.children(doc, item).objects() {
            self.collect_selected(doc, child, items);
        }
    }

    /// The selected node when exactly one is selected.
    pub fn selected_item(&self, doc: &Document) -> Option<ObjectKey> {
        match self.selected_items(doc).as_slice() {
            [item] => Some(*item),
            _ => None,
        }
    }

    /// The selected object when exactly one is selected. Nodes and objects
    /// share keys, so this is [`TreeObjectAdapter::selected_item`].
    pub fn selected_object(&self, doc: &Document) -> Option<ObjectKey> {
        self.selected_item(doc)
    }

    /// All selected objects in document order.
    pub fn selected_objects(&self, doc: &Document) -> Vec<ObjectKey> {
        self.selected_items(doc)
    }

    fn mark_selected(&mut self, doc: &Document, item: ObjectKey) {
        self.flags_mut(item).selected = true;
        let mut current = item;
        while let Some(parent) = self.get_parent(doc, current) {
            self.flags_mut(parent).expanded = true;
            current = parent;
        }
    }

    /// Select a node and expand every node above it.
    pub fn select_item(&mut self, doc: &Document, item: ObjectKey) {
        self.mark_selected(doc, item);
        self.selection_changed.emit(());
    }

    /// Replace the selection.
    pub fn select_items(&mut self, doc: &Document, items: &[ObjectKey]) {
        for flags in self.flags.values_mut() {
            flags.selected = false;
        }
        for &item in items {
            self.mark_selected(doc, item);
        }
        tracing::debug!(target: targets::ADAPTER, count = items.len(), "selection replaced");
        self.selection_changed.emit(());
    }

    /// Select the nodes covering `objects`.
    pub fn select_objects(&mut self, doc: &Document, objects: &[ObjectKey]) {
        let items: Vec<ObjectKey> = objects
            .iter()
            .filter_map(|&object| self.get_ancestor_object_adapter(doc, object))
            .collect();
        self.select_items(doc, &items);
    }

    /// Select the objects with the given ids. Does nothing when they are
    /// already exactly the selection, in any order.
    pub fn select_object_ids<S: AsRef<str>>(&mut self, doc: &Document, ids: &[S]) {
        let mut wanted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        wanted.sort_unstable();
        let mut current: Vec<&str> = self
            .selected_items(doc)
            .into_iter()
            .filter_map(|item| doc.id(item))
            .collect();
        current.sort_unstable();
        if wanted == current {
            tracing::trace!(target: targets::ADAPTER, "selection already matches ids");
            return;
        }

        let objects: Vec<ObjectKey> = wanted.iter().filter_map(|id| doc.object_from_id(id)).collect();
        self.select_objects(doc, &objects);
    }

    /// Select the node covering `object`, or clear the selection when the
    /// object is outside the subtree.
    pub fn select_object(&mut self, doc: &Document, object: ObjectKey) {
        match self.get_ancestor_object_adapter(doc, object) {
            Some(item) => self.select_items(doc, &[item]),
            None => self.select_items(doc, &[]),
        }
    }

    /// Deselect a selected node, otherwise select it.
    pub fn toggle_selected(&mut self, doc: &Document, item: ObjectKey) {
        if self.is_selected(item) {
            self.flags_mut(item).selected = false;
            self.selection_changed.emit(());
        } else {
            self.select_item(doc, item);
        }
    }

    // -- view state --

    /// Save selection and expansion. Children of expanded nodes are saved
    /// when they are selected or expanded themselves.
    pub fn save_state(&self, doc: &Document) -> ViewState {
        self.save_node(doc, self.object)
    }

    fn save_node(&self, doc: &Document, item: ObjectKey) -> ViewState {
        let flags = self.flags(item);
        let children = if flags.expanded {
            self.children(doc, item)
                .entries()
                .into_iter()
                .filter(|&(_, child)| {
                    let child_flags = self.flags(child);
                    child_flags.selected || child_flags.expanded
                })
                .map(|(key, child)| (key, self.save_node(doc, child)))
                .collect()
        } else {
            Vec::new()
        };
        ViewState {
            selected: flags.selected,
            children,
        }
    }

    /// Restore a saved state. Every node that receives an entry is expanded.
    pub fn load_state(&mut self, doc: &Document, state: &ViewState) {
        self.load_node(doc, self.object, state);
        tracing::debug!(target: targets::ADAPTER, "view state loaded");
        self.selection_changed.emit(());
    }

    fn load_node(&mut self, doc: &Document, item: ObjectKey, state: &ViewState) {
        let flags = self.flags_mut(item);
        flags.expanded = true;
        flags.selected = state.selected;

        let children = self.children(doc, item);
        for (key, child_state) in &state.children {
            if let Some(child) = children.get(key) {
                self.load_node(doc, child, child_state);
            }
        }
    }

    // -- lookup --

    /// Find the node for an object or id by descending along id prefixes.
    pub fn get_object_adapter<'a>(
        &self,
        doc: &Document,
        item: impl Into<ItemRef<'a>>,
    ) -> Option<ObjectKey> {
        let id = match item.into() {
            ItemRef::Object(object) => doc.id(object)?,
            ItemRef::Id(id) => id,
        };

        let mut current = self.object;
        loop {
            let current_id = doc.id(current)?;
            if current_id == id {
                return Some(current);
            }
            if !is_descendant_id(id, current_id) {
                return None;
            }
            current = self
                .children(doc, current)
                .objects()
                .into_iter()
                .find(|&child| doc.id(child).is_some_and(|child_id| is_descendant_id(id, child_id)))?;
        }
    }

    /// The deepest node that is `object` or one of its ancestors. `None`
    /// when `object` is outside the subtree.
    pub fn get_ancestor_object_adapter(&self, doc: &Document, object: ObjectKey) -> Option<ObjectKey> {
        if !doc.is_ancestor(object, self.object) {
            return None;
        }
        let mut current = self.object;
        while current != object {
            match self
                .children(doc, current)
                .objects()
                .into_iter()
                .find(|&child| doc.is_ancestor(object, child))
            {
                Some(child) => current = child,
                None => break,
            }
        }
        Some(current)
    }

    /// The nearest node above `item`.
    pub fn get_parent(&self, doc: &Document, item: ObjectKey) -> Option<ObjectKey> {
        doc.ancestors(item)
            .find_map(|ancestor| self.get_object_adapter(doc, ancestor))
    }

    /// Nodes from the subtree root down to `item`, both included.
    pub fn get_ancestors(&self, doc: &Document, item: ObjectKey) -> Vec<ObjectKey> {
        let mut chain = vec![item];
        let mut current = item;
        while let Some(parent) = self.get_parent(doc, current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    // -- clipboard --

    fn all_selected(&self, doc: &Document, allowed: impl Fn(ObjectKey) -> bool) -> Option<Vec<ObjectKey>> {
        let items = self.selected_items(doc);
        (!items.is_empty() && items.iter().all(|&item| allowed(item))).then_some(items)
    }

    /// Returns true if every selected object can be cut.
    pub fn can_cut(&self, doc: &Document) -> bool {
        self.all_selected(doc, |item| doc.can_cut(item)).is_some()
    }

    /// Cut the selection. A single object goes through the per-object cut,
    /// several objects are deleted in one step.
    pub fn cut_selection(&mut self, store: &mut DocumentStore, clipboard: &mut dyn Clipboard) -> Result<()> {
        let doc = store.document();
        let Some(objects) = self.all_selected(doc, |item| doc.can_cut(item)) else {
            return Ok(());
        };
        if let [object] = objects.as_slice() {
            return clipboard::cut_item(store, clipboard, *object);
        }
        let text = clipboard::objects_to_clipboard_text(doc, &objects)?;
        clipboard::delete_items(store, &objects)?;
        clipboard.write_text(&text);
        Ok(())
    }

    /// Returns true if every selected object can be copied.
    pub fn can_copy(&self, doc: &Document) -> bool {
        self.all_selected(doc, |item| doc.can_copy(item)).is_some()
    }

    /// Copy the selection.
    pub fn copy_selection(&self, doc: &Document, clipboard: &mut dyn Clipboard) -> Result<()> {
        let Some(objects) = self.all_selected(doc, |item| doc.can_copy(item)) else {
            return Ok(());
        };
        if let [object] = objects.as_slice() {
            return clipboard::copy_item(doc, clipboard, *object);
        }
        clipboard.write_text(&clipboard::objects_to_clipboard_text(doc, &objects)?);
        Ok(())
    }

    /// Object the clipboard would be pasted on, if pasting is allowed.
    fn paste_target(&self, doc: &Document, clipboard: &dyn Clipboard) -> Option<ObjectKey> {
        let items = self.selected_items(doc);
        let target = match items.as_slice() {
            [] => self.object,
            [item] => *item,
            [first, ..] if doc.have_same_parent(&items) => *first,
            _ => return None,
        };
        clipboard::can_paste(doc, clipboard, target).then_some(target)
    }

    /// Returns true if the clipboard can be pasted on the selection.
    pub fn can_paste(&self, doc: &Document, clipboard: &dyn Clipboard) -> bool {
        self.paste_target(doc, clipboard).is_some()
    }

    /// Paste on the selection, or on the subtree root when nothing is
    /// selected, and select the pasted objects.
    pub fn paste_selection(
        &mut self,
        store: &mut DocumentStore,
        clipboard: &dyn Clipboard,
    ) -> Result<Vec<ObjectKey>> {
        let Some(target) = self.paste_target(store.document(), clipboard) else {
            return Ok(Vec::new());
        };
        let created = clipboard::paste_item(store, clipboard, target)?;
        if !created.is_empty() {
            self.select_objects(store.document(), &created);
        }
        Ok(created)
    }

    /// Returns true if every selected object can be deleted.
    pub fn can_delete(&self, doc: &Document) -> bool {
        self.all_selected(doc, |item| doc.can_delete(item)).is_some()
    }

    /// Clear the selection and delete the previously selected objects.
    pub fn delete_selection(&mut self, store: &mut DocumentStore) -> Result<()> {
        let doc = store.document();
        let Some(objects) = self.all_selected(doc, |item| doc.can_delete(item)) else {
            return Ok(());
        };
        self.select_items(doc, &[]);
        clipboard::delete_items(store, &objects)?;
        self.prune(store.document());
        Ok(())
    }

    // -- context menu --

    /// Menu for the current selection. A single selected object gets the
    /// factory's menu. Otherwise the permitted clipboard actions are offered,
    /// extended by the factory when all selected objects share one parent.
    pub fn create_selection_context_menu(
        &self,
        doc: &Document,
        clipboard: &dyn Clipboard,
        factory: &dyn ContextMenuFactory,
    ) -> Option<Menu> {
        let selected = self.selected_items(doc);
        if let [object] = selected.as_slice() {
            return factory.create_context_menu(doc, clipboard, *object);
        }

        let mut items = Vec::new();
        if self.can_cut(doc) {
            items.push(MenuItem::action("Cut", MenuAction::Cut));
        }
        if self.can_copy(doc) {
            items.push(MenuItem::action("Copy", MenuAction::Copy));
        }
        if self.can_paste(doc, clipboard) {
            items.push(MenuItem::action("Paste", MenuAction::Paste));
        }
        if self.can_delete(doc) {
            items.push(MenuItem::Separator);
            items.push(MenuItem::action("Delete", MenuAction::Delete));
        }
        if let Some(&first) = selected.first() {
            if doc.have_same_parent(&selected) {
                factory.extend_context_menu(doc, first, &selected, &mut items);
            }
        }

        let menu = Menu::from_items(items);
        (!menu.is_empty()).then_some(menu)
    }

    /// Run a clipboard action chosen from a menu. Returns false for custom
    /// actions, which the host handles.
    pub fn run_menu_action(
        &mut self,
        store: &mut DocumentStore,
        clipboard: &mut dyn Clipboard,
        action: &MenuAction,
    ) -> Result<bool> {
        tracing::debug!(target: targets::ADAPTER, ?action, "menu action");
        match action {
            MenuAction::Cut => self.cut_selection(store, clipboard)?,
            MenuAction::Copy => self.copy_selection(store.document(), clipboard)?,
            MenuAction::Paste => {
                self.paste_selection(store, clipboard)?;
            }
            MenuAction::Delete => self.delete_selection(store)?,
            MenuAction::Custom(_) => return Ok(false),
        }
        Ok(true)
    }
}
