//! Flat row projections for virtualized tree and list views.
//!
//! A view renders the rows returned by [`RowAdapter::all_rows`] and routes
//! selection, clipboard, and drag-and-drop input back through the same
//! adapter. [`TreeAdapter`] linearizes a [`TreeObjectAdapter`] subtree.
//! [`ListAdapter`] shows the elements of one array.
//!
//! [`TreeObjectAdapter`]: crate::adapter::TreeObjectAdapter

mod list;
mod tree;

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use list::ListAdapter;
pub use tree::{TreeAdapter, TreeAdapterBuilder};

use crate::clipboard::Clipboard;
use crate::document::{Document, DocumentStore, ObjectKey};
use crate::drag_drop::{DragDropManager, DropAction};
use crate::error::Result;

/// Predicate deciding whether an object gets a row.
pub type FilterFn = Arc<dyn Fn(&Document, ObjectKey) -> bool + Send + Sync>;

/// Callback for double-clicked rows.
pub type ActivateFn = Arc<dyn Fn(ObjectKey) + Send + Sync>;

/// Row ordering among siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Document order.
    #[default]
    None,
    Asc,
    Desc,
}

impl SortDirection {
    /// Returns true for ascending or descending order.
    pub fn is_sorted(self) -> bool {
        self != Self::None
    }

    /// Sort `items` by label in this direction.
    pub fn sort(self, doc: &Document, items: &mut [ObjectKey]) {
        match self {
            Self::None => {}
            Self::Asc => items.sort_by(|&a, &b| compare_labels(&doc.label(a), &doc.label(b))),
            Self::Desc => items.sort_by(|&a, &b| compare_labels(&doc.label(b), &doc.label(a))),
        }
    }
}

/// Where a dragged object lands relative to the drop target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPosition {
    #[default]
    None,
    Before,
    After,
    Inside,
}

/// One visible row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow {
    /// The object shown in the row.
    pub item: ObjectKey,
    /// Nesting depth, 0 for top-level rows.
    pub level: usize,
    pub draggable: bool,
    /// Whether the row shows an expand/collapse toggle.
    pub collapsable: bool,
}

/// Compare labels the way a default locale collation orders plain names:
/// case-insensitively first, then lowercase before uppercase where the
/// letters tie, so `"apple" < "Apple" < "banana"`.
///
/// There is no accent folding and digits compare one by one, so `"10"`
/// sorts before `"9"`.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    let case_rank = |c: char| (c.is_uppercase(), c);
    folded.then_with(|| a.chars().map(case_rank).cmp(b.chars().map(case_rank)))
}

/// Reordering checks shared by all row adapters, applied once the drop
/// target is known to accept the dragged object.
///
/// Dropping on the dragged object itself is rejected. Within the same
/// parent, dropping right before the next sibling or right after the
/// previous one would leave the object where it is, which the neighbor ids
/// reveal. Dropping into a different parent is always allowed.
pub(crate) fn can_reorder(
    doc: &Document,
    drag_object: ObjectKey,
    drop_item: ObjectKey,
    position: DropPosition,
    prev_id: Option<&str>,
    next_id: Option<&str>,
) -> bool {
    if drop_item == drag_object {
        return false;
    }
    if doc.parent(drop_item) != doc.parent(drag_object) {
        return true;
    }
    let drag_id = doc.id(drag_object);
    match position {
        DropPosition::Before => prev_id != drag_id,
        DropPosition::After => next_id != drag_id,
        DropPosition::None | DropPosition::Inside => false,
    }
}

/// The interface a tree or list view drives.
pub trait RowAdapter {
    /// Visible rows in display order.
    fn all_rows(&self, doc: &Document) -> Vec<TreeRow>;

    /// Deepest level that gets rows, `None` for unlimited.
    fn max_level(&self) -> Option<usize>;

    fn sort_direction(&self) -> SortDirection;

    /// Row whose object has `id`.
    fn get_item_from_id(&self, doc: &Document, id: &str) -> Option<ObjectKey>;

    fn get_item_parent(&self, doc: &Document, item: ObjectKey) -> Option<ObjectKey>;

    fn is_selected(&self, doc: &Document, item: ObjectKey) -> bool;

    fn select_item(&mut self, doc: &Document, item: ObjectKey);

    fn select_items(&mut self, doc: &Document, items: &[ObjectKey]);

    fn toggle_selected(&mut self, doc: &Document, item: ObjectKey);

    fn cut_selection(&mut self, store: &mut DocumentStore, clipboard: &mut dyn Clipboard) -> Result<()>;

    fn copy_selection(&mut self, doc: &Document, clipboard: &mut dyn Clipboard) -> Result<()>;

    fn paste_selection(&mut self, store: &mut DocumentStore, clipboard: &dyn Clipboard) -> Result<()>;

    fn delete_selection(&mut self, store: &mut DocumentStore) -> Result<()>;

    /// Invoke the activation callback for a double-clicked row.
    fn on_double_click(&self, item: ObjectKey);

    /// Whether the dragged object may be dropped next to `drop_item`.
    /// `prev_id` and `next_id` are the ids of the rows around the drop line.
    fn can_drop(
        &self,
        doc: &Document,
        drag: &DragDropManager,
        drop_item: ObjectKey,
        position: DropPosition,
        prev_id: Option<&str>,
        next_id: Option<&str>,
    ) -> bool;

    /// Whether the dragged object may be dropped into `drop_item`.
    fn can_drop_inside(&self, doc: &Document, drag: &DragDropManager, drop_item: ObjectKey) -> bool;

    /// Complete the drag on the current drop target. Returns the inserted
    /// object, if any.
    fn on_drop(
        &mut self,
        store: &mut DocumentStore,
        drag: &mut DragDropManager,
        position: DropPosition,
    ) -> Result<Option<ObjectKey>>;

    fn get_item_id<'d>(&self, doc: &'d Document, item: ObjectKey) -> Option<&'d str> {
        doc.id(item)
    }

    fn item_to_string(&self, doc: &Document, item: ObjectKey) -> String {
        doc.object_to_string(item)
    }

    fn is_ancestor(&self, doc: &Document, item: ObjectKey, ancestor: ObjectKey) -> bool {
        doc.is_ancestor(item, ancestor)
    }

    fn is_dragging(&self, drag: &DragDropManager) -> bool {
        drag.is_dragging()
    }

    fn is_drag_source(&self, drag: &DragDropManager, item: ObjectKey) -> bool {
        drag.is_drag_source(item)
    }

    /// Start dragging `item`, allowing both copy and move.
    fn on_drag_start(&self, doc: &Document, drag: &mut DragDropManager, item: ObjectKey) -> Result<()> {
        drag.start(doc, item, DropAction::ALL)
    }

    /// Track the row under the drag.
    fn on_drag_over(&self, drag: &mut DragDropManager, drop_item: Option<ObjectKey>) {
        match drop_item {
            Some(item) => drag.set_drop_object(item),
            None => drag.unset_drop_object(),
        }
    }

    fn on_drag_leave(&self, drag: &mut DragDropManager) {
        drag.unset_drop_object();
    }

    /// The drag ended without a drop on this view.
    fn on_drag_end(&self, drag: &mut DragDropManager) {
        drag.cancel();
    }

    fn drop_item(&self, drag: &DragDropManager) -> Option<ObjectKey> {
        drag.drop_object()
    }

    /// Returns true if `drop_item` lies inside the dragged object.
    fn is_ancestor_of_drag_object(&self, doc: &Document, drag: &DragDropManager, drop_item: ObjectKey) -> bool {
        drag.drag_object()
            .is_some_and(|object| doc.is_ancestor(drop_item, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::sample;

    #[test]
    fn test_compare_labels_ignores_case() {
        assert_eq!(compare_labels("alpha", "Beta"), Ordering::Less);
        assert_eq!(compare_labels("Beta", "alpha"), Ordering::Greater);
        assert_eq!(compare_labels("a", "A"), Ordering::Less);
        assert_eq!(compare_labels("same", "same"), Ordering::Equal);

        let mut names = vec!["banana", "Apple", "apple", "10", "9", "aPple"];
        names.sort_by(|a, b| compare_labels(a, b));
        assert_eq!(names, vec!["10", "9", "apple", "aPple", "Apple", "banana"]);
    }

    #[test]
    fn test_sort_direction() {
        let doc = sample();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let mut items = doc.elements(pages).to_vec();
        let (main, settings) = (items[0], items[1]);

        SortDirection::Desc.sort(&doc, &mut items);
        assert_eq!(items, vec![settings, main]);
        SortDirection::Asc.sort(&doc, &mut items);
        assert_eq!(items, vec![main, settings]);
        assert!(!SortDirection::None.is_sorted());
    }

    #[test]
    fn test_sort_direction_serde_names() {
        let direction: SortDirection = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(direction, SortDirection::Desc);
        assert_eq!(serde_json::to_string(&SortDirection::None).unwrap(), "\"none\"");
    }

    #[test]
    fn test_can_reorder_same_parent() {
        let doc = sample();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let (main, settings) = (doc.elements(pages)[0], doc.elements(pages)[1]);
        let main_id = doc.id(main);

        assert!(!can_reorder(&doc, main, main, DropPosition::Before, None, None));
        // main sits right before settings already
        assert!(!can_reorder(&doc, main, settings, DropPosition::Before, main_id, None));
        assert!(can_reorder(&doc, main, settings, DropPosition::After, main_id, None));
        assert!(!can_reorder(&doc, main, settings, DropPosition::Inside, None, None));
    }
}
