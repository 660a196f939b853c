//! Tree children of a document object.

use crate::document::{Document, ObjectKey, ObjectKind};

/// Children of an object as shown in a tree.
///
/// Arrays, and objects whose only visible child properties are arrays that
/// show only their elements, yield an ordered sequence keyed by position.
/// Every other object yields its visible child properties keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterChildren {
    Sequence(Vec<ObjectKey>),
    Named(Vec<(String, ObjectKey)>),
}

impl AdapterChildren {
    /// Compute the children of `object` from its current state.
    pub fn of(doc: &Document, object: ObjectKey) -> Self {
        match doc.kind(object) {
            None => Self::Sequence(Vec::new()),
            Some(ObjectKind::Array) => Self::Sequence(doc.elements(object).to_vec()),
            Some(ObjectKind::Object) => {
                let Some(class) = doc.class_info(object) else {
                    return Self::Sequence(Vec::new());
                };
                let visible: Vec<(&str, ObjectKey, bool)> = class
                    .child_properties()
                    .filter(|property| property.enumerable)
                    .filter_map(|property| {
                        let child = doc.property_object(object, &property.name)?;
                        let flatten = property.is_array() && property.show_only_children_in_tree;
                        Some((property.name.as_str(), child, flatten))
                    })
                    .collect();

                if visible.iter().all(|&(_, _, flatten)| flatten) {
                    Self::Sequence(
                        visible
                            .iter()
                            .flat_map(|&(_, array, _)| doc.elements(array).iter().copied())
                            .collect(),
                    )
                } else {
                    Self::Named(
                        visible
                            .into_iter()
                            .map(|(name, child, _)| (name.to_string(), child))
                            .collect(),
                    )
                }
            }
        }
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(items) => items.len(),
            Self::Named(entries) => entries.len(),
        }
    }

    /// Returns true if there are no children.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child objects in order.
    pub fn objects(&self) -> Vec<ObjectKey> {
        match self {
            Self::Sequence(items) => items.clone(),
            Self::Named(entries) => entries.iter().map(|&(_, child)| child).collect(),
        }
    }

    /// Children with their keys: the position as a string for sequences,
    /// the property name otherwise.
    pub fn entries(&self) -> Vec<(String, ObjectKey)> {
        match self {
            Self::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, &child)| (index.to_string(), child))
                .collect(),
            Self::Named(entries) => entries.clone(),
        }
    }

    /// Child under `key`.
    pub fn get(&self, key: &str) -> Option<ObjectKey> {
        match self {
            Self::Sequence(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).copied()),
            Self::Named(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|&(_, child)| child),
        }
    }
}
