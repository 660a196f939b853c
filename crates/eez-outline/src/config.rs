//! View configuration.
//!
//! Row adapters can be set up from TOML:
//!
//! ```toml
//! collapsable = true
//! sort_direction = "asc"
//! max_level = 2
//! search_text = "page"
//! ```
//!
//! Missing keys take their defaults: collapsable, unsorted, unlimited depth,
//! no search.

use serde::{Deserialize, Serialize};

use crate::adapter::TreeObjectAdapter;
use crate::document::ObjectKey;
use crate::error::ConfigError;
use crate::navigation::SharedNavigationStore;
use crate::rows::{ListAdapter, SortDirection, TreeAdapter, TreeAdapterBuilder};

/// Options of a tree or list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeViewConfig {
    /// Rows can be expanded and collapsed. Trees that are not collapsable
    /// show every level.
    pub collapsable: bool,
    pub sort_direction: SortDirection,
    /// Deepest row level, unlimited when absent. Lists ignore it.
    pub max_level: Option<usize>,
    /// Case-insensitive text filter. Trees ignore it.
    pub search_text: Option<String>,
}

impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            collapsable: true,
            sort_direction: SortDirection::None,
            max_level: None,
            search_text: None,
        }
    }
}

impl TreeViewConfig {
    /// Parse from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Builder for a tree over `root`, preset with these options.
    pub fn tree_builder(&self, root: TreeObjectAdapter) -> TreeAdapterBuilder {
        let builder = TreeAdapterBuilder::new(root)
            .collapsable(self.collapsable)
            .sort_direction(self.sort_direction);
        match self.max_level {
            Some(level) => builder.max_level(level),
            None => builder,
        }
    }

    /// Tree over `root` with these options.
    pub fn tree_adapter(&self, root: TreeObjectAdapter) -> TreeAdapter {
        self.tree_builder(root).build()
    }

    /// List of the array `object` with these options.
    pub fn list_adapter(&self, object: ObjectKey, navigation: SharedNavigationStore) -> ListAdapter {
        let list = ListAdapter::new(object, navigation).with_sort_direction(self.sort_direction);
        match &self.search_text {
            Some(text) => list.with_search_text(text.as_str()),
            None => list,
        }
    }
}
