//! Context menu construction.
//!
//! Menus are plain data. The host decides how to show them and passes the
//! chosen [`MenuAction`] back to the adapter that built the menu.

use crate::clipboard::{self, Clipboard};
use crate::document::{Document, ObjectKey};

/// An action offered by a context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Cut,
    Copy,
    Paste,
    Delete,
    /// An action contributed by a factory extension.
    Custom(String),
}

/// One entry of a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    /// A clickable entry.
    Action { label: String, action: MenuAction },
    /// A separator line.
    Separator,
}

impl MenuItem {
    /// Create an action entry.
    pub fn action(label: impl Into<String>, action: MenuAction) -> Self {
        Self::Action {
            label: label.into(),
            action,
        }
    }
}

/// A context menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    /// Build a menu, dropping leading, trailing, and doubled separators.
    pub fn from_items(items: Vec<MenuItem>) -> Self {
        let mut cleaned: Vec<MenuItem> = Vec::with_capacity(items.len());
        for item in items {
            let is_separator = item == MenuItem::Separator;
            if is_separator && matches!(cleaned.last(), None | Some(MenuItem::Separator)) {
                continue;
            }
            cleaned.push(item);
        }
        if cleaned.last() == Some(&MenuItem::Separator) {
            cleaned.pop();
        }
        Self { items: cleaned }
    }

    /// Menu entries.
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Returns true if the menu has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Actions in menu order.
    pub fn actions(&self) -> impl Iterator<Item = &MenuAction> {
        self.items.iter().filter_map(|item| match item {
            MenuItem::Action { action, .. } => Some(action),
            MenuItem::Separator => None,
        })
    }

    /// Returns true if the menu offers `action`.
    pub fn contains(&self, action: &MenuAction) -> bool {
        self.actions().any(|a| a == action)
    }
}

/// Builds context menus for document objects.
pub trait ContextMenuFactory {
    /// Menu for a single object. `None` means no menu.
    fn create_context_menu(
        &self,
        doc: &Document,
        clipboard: &dyn Clipboard,
        object: ObjectKey,
    ) -> Option<Menu>;

    /// Add entries for `objects`, all children of one parent. `object` is
    /// the first of them.
    fn extend_context_menu(
        &self,
        _doc: &Document,
        _object: ObjectKey,
        _objects: &[ObjectKey],
        _items: &mut Vec<MenuItem>,
    ) {
    }
}

/// Offers the clipboard actions a single object permits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContextMenuFactory;

impl ContextMenuFactory for DefaultContextMenuFactory {
    fn create_context_menu(
        &self,
        doc: &Document,
        clipboard: &dyn Clipboard,
        object: ObjectKey,
    ) -> Option<Menu> {
        let mut items = Vec::new();
        if doc.can_cut(object) {
            items.push(MenuItem::action("Cut", MenuAction::Cut));
        }
        if doc.can_copy(object) {
            items.push(MenuItem::action("Copy", MenuAction::Copy));
        }
        if clipboard::can_paste(doc, clipboard, object) {
            items.push(MenuItem::action("Paste", MenuAction::Paste));
        }
        items.push(MenuItem::Separator);
        if doc.can_delete(object) {
            items.push(MenuItem::action("Delete", MenuAction::Delete));
        }
        self.extend_context_menu(doc, object, &[object], &mut items);

        let menu = Menu::from_items(items);
        (!menu.is_empty()).then_some(menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::document::tests::sample;

    #[test]
    fn test_separators_are_cleaned() {
        let menu = Menu::from_items(vec![
            MenuItem::Separator,
            MenuItem::action("Copy", MenuAction::Copy),
            MenuItem::Separator,
            MenuItem::Separator,
            MenuItem::action("Delete", MenuAction::Delete),
            MenuItem::Separator,
        ]);
        assert_eq!(menu.items().len(), 3);
        assert_eq!(menu.items()[1], MenuItem::Separator);
    }

    #[test]
    fn test_default_factory() {
        let doc = sample();
        let clipboard = MemoryClipboard::new();
        let factory = DefaultContextMenuFactory;

        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let menu = factory
            .create_context_menu(&doc, &clipboard, doc.elements(pages)[0])
            .unwrap();
        let actions: Vec<&MenuAction> = menu.actions().collect();
        assert_eq!(actions, vec![&MenuAction::Cut, &MenuAction::Copy, &MenuAction::Delete]);

        assert!(factory.create_context_menu(&doc, &clipboard, doc.root()).is_none());
    }
}
