//! Persisted selection and expansion state.
//!
//! The JSON shape mirrors the tree children:
//!
//! ```text
//! { "$selected": true, "<child key>": { ... }, ... }
//! ```
//!
//! `$selected` is written only when true. Keys starting with `$` other than
//! `$selected` are ignored on load.

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SELECTED_KEY: &str = "$selected";

/// Saved state of one tree node and its saved children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Whether the node was selected.
    pub selected: bool,
    /// Saved children in tree order, by child key.
    pub children: Vec<(String, ViewState)>,
}

impl ViewState {
    /// Saved state of the child under `key`.
    pub fn child(&self, key: &str) -> Option<&ViewState> {
        self.children
            .iter()
            .find(|(child_key, _)| child_key == key)
            .map(|(_, state)| state)
    }

    /// Serialize to a JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Serialize for ViewState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.children.len() + usize::from(self.selected);
        let mut map = serializer.serialize_map(Some(len))?;
        if self.selected {
            map.serialize_entry(SELECTED_KEY, &true)?;
        }
        for (key, child) in &self.children {
            map.serialize_entry(key, child)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ViewState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ViewStateVisitor)
    }
}

struct ViewStateVisitor;

impl<'de> Visitor<'de> for ViewStateVisitor {
    type Value = ViewState;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a view state map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ViewState, A::Error> {
        let mut state = ViewState::default();
        while let Some(key) = access.next_key::<String>()? {
            if key == SELECTED_KEY {
                state.selected = access.next_value::<Option<bool>>()?.unwrap_or(false);
            } else if key.starts_with('$') {
                access.next_value::<IgnoredAny>()?;
            } else {
                let child = access.next_value::<ViewState>()?;
                if state.child(&key).is_some() {
                    return Err(de::Error::custom(format!("duplicate view state key '{key}'")));
                }
                state.children.push((key, child));
            }
        }
        Ok(state)
    }
}
