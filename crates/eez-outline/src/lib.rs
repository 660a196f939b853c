//! EEZ Outline - headless view-models for editing a hierarchical document.
//!
//! The crate projects a typed object graph into what tree and list views
//! need, without depending on any UI toolkit:
//!
//! - [`document`]: class schema, the object arena with hierarchical ids, and
//!   the [`DocumentStore`] with transactions and undo
//! - [`adapter`]: [`TreeObjectAdapter`], selection and expansion over a
//!   subtree, with saved view state and clipboard commands
//! - [`rows`]: [`TreeAdapter`] and [`ListAdapter`], the flat rows a
//!   virtualized view renders, including drag-and-drop validation
//! - [`clipboard`], [`menu`], [`drag_drop`], [`navigation`]: the context
//!   objects the adapters work with
//! - [`tabs`]: the home window tab list
//!
//! # Example
//!
//! ```ignore
//! use eez_outline::prelude::*;
//!
//! let registry = Arc::new(
//!     ClassRegistry::builder()
//!         .class(ClassInfo::new("Project").property(PropertyInfo::array("pages", "Page")))
//!         .class(ClassInfo::new("Page").property(PropertyInfo::scalar("name")))
//!         .build()?,
//! );
//! let doc = Document::from_json(registry, "Project", &json)?;
//! let mut store = DocumentStore::new(doc);
//!
//! let mut rows = TreeAdapter::new(TreeObjectAdapter::new(store.document().root()));
//! for row in rows.all_rows(store.document()) {
//!     println!("{:indent$}{}", "", rows.item_to_string(store.document(), row.item), indent = row.level * 2);
//! }
//! ```

pub mod adapter;
pub mod clipboard;
pub mod config;
pub mod document;
pub mod drag_drop;
pub mod error;
pub mod menu;
pub mod navigation;
pub mod rows;
pub mod tabs;

pub use adapter::{AdapterTree, ItemRef, TreeObjectAdapter, ViewState};
pub use clipboard::{Clipboard, ClipboardData, MemoryClipboard, PastePlace};
pub use config::TreeViewConfig;
pub use document::{
    ClassInfo, ClassRegistry, Document, DocumentChange, DocumentStore, ObjectKey, ObjectKind,
    PropertyInfo, PropertyType,
};
pub use drag_drop::{DragDropManager, DragSession, DragState, DropAction};
pub use error::{ClipboardError, ConfigError, DocumentError, OutlineError, Result, TabError};
pub use menu::{ContextMenuFactory, DefaultContextMenuFactory, Menu, MenuAction, MenuItem};
pub use navigation::{NavigationStore, SharedNavigationStore};
pub use rows::{
    DropPosition, ListAdapter, RowAdapter, SortDirection, TreeAdapter, TreeAdapterBuilder, TreeRow,
};
pub use tabs::{SavedTab, Tab, TabDefinition, TabManager};

/// Commonly used types.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{
        ClassInfo, ClassRegistry, Clipboard, Document, DocumentStore, DragDropManager, DropPosition,
        ListAdapter, MemoryClipboard, NavigationStore, ObjectKey, PropertyInfo, RowAdapter,
        SortDirection, TreeAdapter, TreeObjectAdapter, ViewState,
    };
}
