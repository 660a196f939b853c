//! The document object graph.
//!
//! A [`Document`] is an arena of objects addressed by [`ObjectKey`]. Each
//! object is either a plain object of some registered class or an array
//! container holding elements of a declared element class. Parent links are
//! back-references only; the arena owns every object.
//!
//! Every object also carries a hierarchical string id. The root is `"1"`
//! and a child of `p` is `"<p>.<n>"`, where `n` comes from a per-parent
//! counter that is never reused. Ancestor tests on ids rely on
//! [`is_descendant_id`].
//!
//! Documents are edited through a [`DocumentStore`], which adds atomic
//! mutations, transactions, undo, and change notification.

mod json;
pub mod schema;
mod store;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

pub use schema::{ClassInfo, ClassRegistry, ClassRegistryBuilder, PropertyInfo, PropertyType};
pub use store::{ChangeKind, DocumentChange, DocumentStore};

use crate::error::DocumentError;

/// Id of the document root.
pub const ROOT_ID: &str = "1";

new_key_type! {
    /// Handle of an object in a [`Document`].
    pub struct ObjectKey;
}

/// Whether an object is a plain object or an array container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// An instance of a registered class.
    Object,
    /// A container of elements of one element class.
    Array,
}

/// Returns true if `id` is `ancestor_id` or lies below it.
pub fn is_descendant_id(id: &str, ancestor_id: &str) -> bool {
    match id.strip_prefix(ancestor_id) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectData {
    /// Class name; the element class for arrays.
    class: String,
    kind: ObjectKind,
    id: String,
    parent: Option<ObjectKey>,
    /// Name of the property holding this object, `None` for array elements.
    key: Option<String>,
    fields: HashMap<String, Value>,
    properties: HashMap<String, ObjectKey>,
    elements: Vec<ObjectKey>,
    last_child: u64,
}

impl ObjectData {
    fn new(
        class: String,
        kind: ObjectKind,
        id: String,
        parent: Option<ObjectKey>,
        key: Option<String>,
    ) -> Self {
        Self {
            class,
            kind,
            id,
            parent,
            key,
            fields: HashMap::new(),
            properties: HashMap::new(),
            elements: Vec::new(),
            last_child: 0,
        }
    }
}

/// An object graph conforming to a [`ClassRegistry`].
#[derive(Debug, Clone)]
pub struct Document {
    registry: Arc<ClassRegistry>,
    objects: SlotMap<ObjectKey, ObjectData>,
    root: ObjectKey,
}

impl Document {
    /// Create a document whose root is an empty instance of `root_class`.
    pub fn new(registry: Arc<ClassRegistry>, root_class: &str) -> Result<Self, DocumentError> {
        Self::from_json(registry, root_class, &Value::Object(serde_json::Map::new()))
    }

    /// The class registry.
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// The root object.
    pub fn root(&self) -> ObjectKey {
        self.root
    }

    /// Returns true if the key refers to a live object.
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Number of objects, array containers included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the document holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn get(&self, key: ObjectKey) -> Option<&ObjectData> {
        self.objects.get(key)
    }

    fn data_mut(&mut self, key: ObjectKey) -> Result<&mut ObjectData, DocumentError> {
        self.objects.get_mut(key).ok_or(DocumentError::ObjectNotFound)
    }

    /// Hierarchical id.
    pub fn id(&self, key: ObjectKey) -> Option<&str> {
        self.get(key).map(|data| data.id.as_str())
    }

    /// Parent object or array container.
    pub fn parent(&self, key: ObjectKey) -> Option<ObjectKey> {
        self.get(key)?.parent
    }

    /// Key of the object within its parent: the property name, or the
    /// element index for array elements.
    pub fn key(&self, key: ObjectKey) -> Option<String> {
        let data = self.get(key)?;
        match &data.key {
            Some(name) => Some(name.clone()),
            None => self.index_of(key).map(|index| index.to_string()),
        }
    }

    /// Class name; the element class for arrays.
    pub fn class_name(&self, key: ObjectKey) -> Option<&str> {
        self.get(key).map(|data| data.class.as_str())
    }

    /// Class metadata; the element class for arrays.
    pub fn class_info(&self, key: ObjectKey) -> Option<&ClassInfo> {
        self.registry.get(self.class_name(key)?)
    }

    /// Object kind.
    pub fn kind(&self, key: ObjectKey) -> Option<ObjectKind> {
        self.get(key).map(|data| data.kind)
    }

    /// Returns true for array containers.
    pub fn is_array(&self, key: ObjectKey) -> bool {
        self.kind(key) == Some(ObjectKind::Array)
    }

    /// Elements of an array container, empty for anything else.
    pub fn elements(&self, key: ObjectKey) -> &[ObjectKey] {
        self.get(key).map_or(&[], |data| data.elements.as_slice())
    }

    /// Position of an array element within its parent array.
    pub fn index_of(&self, key: ObjectKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.elements(parent).iter().position(|&element| element == key)
    }

    /// The object or array container held by a child property.
    pub fn property_object(&self, key: ObjectKey, name: &str) -> Option<ObjectKey> {
        self.get(key)?.properties.get(name).copied()
    }

    /// A scalar property value.
    pub fn scalar(&self, key: ObjectKey, name: &str) -> Option<&Value> {
        self.get(key)?.fields.get(name)
    }

    /// The property of the parent that holds this object. `None` for the
    /// root and for array elements.
    pub fn holding_property(&self, key: ObjectKey) -> Option<&PropertyInfo> {
        let data = self.get(key)?;
        let name = data.key.as_deref()?;
        self.class_info(data.parent?)?.find_property(name)
    }

    /// Label used for sorting and display: the label property when it holds
    /// a non-empty value, otherwise the id.
    pub fn label(&self, key: ObjectKey) -> String {
        let Some(data) = self.get(key) else {
            return String::new();
        };
        if data.kind == ObjectKind::Array {
            return self.object_to_string(key);
        }
        let label = self
            .class_info(key)
            .and_then(|class| data.fields.get(class.label_property_name()));
        match label {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => data.id.clone(),
        }
    }

    /// Text shown for an object in tree and list rows. Array containers show
    /// the display name of their property.
    pub fn object_to_string(&self, key: ObjectKey) -> String {
        match self.kind(key) {
            Some(ObjectKind::Array) => match self.holding_property(key) {
                Some(PropertyInfo {
                    display_name: Some(display_name),
                    ..
                }) => display_name.clone(),
                _ => self
                    .get(key)
                    .and_then(|data| data.key.as_deref())
                    .map(schema::humanize)
                    .unwrap_or_default(),
            },
            Some(ObjectKind::Object) => self.label(key),
            None => String::new(),
        }
    }

    /// Iterate over the parent chain, starting with the parent of `key`.
    pub fn ancestors(&self, key: ObjectKey) -> impl Iterator<Item = ObjectKey> + '_ {
        std::iter::successors(self.parent(key), move |&current| self.parent(current))
    }

    /// Returns true if `ancestor` is `object` or one of its ancestors.
    pub fn is_ancestor(&self, object: ObjectKey, ancestor: ObjectKey) -> bool {
        self.contains(object)
            && (object == ancestor || self.ancestors(object).any(|key| key == ancestor))
    }

    /// Resolve a hierarchical id by descending along matching id prefixes.
    pub fn object_from_id(&self, id: &str) -> Option<ObjectKey> {
        let mut current = self.root;
        loop {
            let current_id = self.id(current)?;
            if current_id == id {
                return Some(current);
            }
            if !is_descendant_id(id, current_id) {
                return None;
            }
            current = self
                .child_objects(current)
                .into_iter()
                .find(|&child| self.id(child).is_some_and(|child_id| is_descendant_id(id, child_id)))?;
        }
    }

    /// Direct children: elements of an array, or the present object and
    /// array properties of an object in declaration order.
    pub fn child_objects(&self, key: ObjectKey) -> Vec<ObjectKey> {
        let Some(data) = self.get(key) else {
            return Vec::new();
        };
        match data.kind {
            ObjectKind::Array => data.elements.clone(),
            ObjectKind::Object => self
                .class_info(key)
                .map(|class| {
                    class
                        .child_properties()
                        .filter_map(|property| data.properties.get(&property.name).copied())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Returns true if the parent is an array container.
    pub fn is_array_element(&self, key: ObjectKey) -> bool {
        self.parent(key).is_some_and(|parent| self.is_array(parent))
    }

    /// Returns true for objects held by an optional object property.
    pub fn is_optional(&self, key: ObjectKey) -> bool {
        self.kind(key) == Some(ObjectKind::Object)
            && self.holding_property(key).is_some_and(|property| property.optional)
    }

    /// Returns true if the object may be copied to the clipboard.
    pub fn can_copy(&self, key: ObjectKey) -> bool {
        self.is_array_element(key) || self.is_optional(key)
    }

    /// Returns true if the object may be cut.
    pub fn can_cut(&self, key: ObjectKey) -> bool {
        self.can_copy(key)
    }

    /// Returns true if the object may be deleted.
    pub fn can_delete(&self, key: ObjectKey) -> bool {
        self.is_array_element(key) || self.is_optional(key)
    }

    /// Returns true if the object can hold children, whether or not it
    /// currently does.
    pub fn can_contain_children(&self, key: ObjectKey) -> bool {
        match self.kind(key) {
            Some(ObjectKind::Array) => true,
            Some(ObjectKind::Object) => self
                .class_info(key)
                .is_some_and(|class| class.child_properties().any(|property| property.enumerable)),
            None => false,
        }
    }

    /// Returns false only for array containers whose property turns off
    /// showing only the elements.
    pub fn is_show_only_children_in_tree(&self, key: ObjectKey) -> bool {
        self.holding_property(key)
            .is_none_or(|property| property.show_only_children_in_tree)
    }

    /// Returns false for objects held by a property excluded from navigation.
    pub fn is_part_of_navigation(&self, key: ObjectKey) -> bool {
        self.holding_property(key)
            .is_none_or(|property| property.part_of_navigation)
    }

    /// Returns true if the object's class is `class` or a subclass of it.
    pub fn is_instance_of(&self, key: ObjectKey, class: &str) -> bool {
        self.class_name(key)
            .is_some_and(|name| self.registry.is_subclass_of(name, class))
    }

    /// Returns true if `key` is an array whose element class accepts `class`.
    pub fn array_accepts(&self, key: ObjectKey, class: &str) -> bool {
        self.is_array(key)
            && self
                .class_name(key)
                .is_some_and(|element| self.registry.is_subclass_of(class, element))
    }

    /// Returns true if all objects share one parent.
    pub fn have_same_parent(&self, objects: &[ObjectKey]) -> bool {
        match objects.split_first() {
            Some((first, rest)) => {
                let parent = self.parent(*first);
                rest.iter().all(|&object| self.parent(object) == parent)
            }
            None => true,
        }
    }

    // -- mutation primitives, used by the store on a working copy --

    fn next_child_id(&mut self, parent: ObjectKey) -> Result<String, DocumentError> {
        let data = self.data_mut(parent)?;
        data.last_child += 1;
        Ok(format!("{}.{}", data.id, data.last_child))
    }

    pub(crate) fn set_scalar(
        &mut self,
        key: ObjectKey,
        name: &str,
        value: Value,
    ) -> Result<(), DocumentError> {
        let data = self.data_mut(key)?;
        if value.is_null() {
            data.fields.remove(name);
        } else {
            data.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Replace the child held by an object property.
    pub(crate) fn set_object_property(
        &mut self,
        key: ObjectKey,
        property: &PropertyInfo,
        value: Option<&Value>,
    ) -> Result<Option<ObjectKey>, DocumentError> {
        let PropertyType::Object { class } = &property.ty else {
            return Err(DocumentError::NotAnObject(property.name.clone()));
        };
        if let Some(old) = self.data_mut(key)?.properties.remove(&property.name) {
            self.remove_subtree(old);
        }
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(json) => {
                let child = self.load_object(Some(key), Some(property.name.clone()), class, json)?;
                self.data_mut(key)?.properties.insert(property.name.clone(), child);
                Ok(Some(child))
            }
        }
    }

    /// Replace every element of an array container.
    pub(crate) fn replace_elements(
        &mut self,
        array: ObjectKey,
        items: &[Value],
    ) -> Result<Vec<ObjectKey>, DocumentError> {
        let old = std::mem::take(&mut self.data_mut(array)?.elements);
        for element in old {
            self.remove_subtree(element);
        }
        let len = items.len();
        (0..len)
            .map(|index| self.insert_element(array, index, &items[index]))
            .collect()
    }

    /// Load `json` as a new element at `index` (clamped to the length).
    pub(crate) fn insert_element(
        &mut self,
        array: ObjectKey,
        index: usize,
        json: &Value,
    ) -> Result<ObjectKey, DocumentError> {
        let data = self.get(array).ok_or(DocumentError::ObjectNotFound)?;
        if data.kind != ObjectKind::Array {
            return Err(DocumentError::NotAnArray(data.id.clone()));
        }
        let element_class = data.class.clone();
        let element = self.load_object(Some(array), None, &element_class, json)?;
        let elements = &mut self.data_mut(array)?.elements;
        let index = index.min(elements.len());
        elements.insert(index, element);
        Ok(element)
    }

    /// Detach an array element or optional object and drop its subtree.
    pub(crate) fn remove(&mut self, key: ObjectKey) -> Result<(), DocumentError> {
        let data = self.get(key).ok_or(DocumentError::ObjectNotFound)?;
        let id = data.id.clone();
        let name = data.key.clone();
        let parent = data.parent.ok_or_else(|| DocumentError::NoParent(id.clone()))?;

        if self.is_array(parent) {
            self.data_mut(parent)?.elements.retain(|&element| element != key);
        } else if let (true, Some(name)) = (self.is_optional(key), name) {
            self.data_mut(parent)?.properties.remove(&name);
        } else {
            return Err(DocumentError::NotDeletable(id));
        }

        self.remove_subtree(key);
        Ok(())
    }

    fn remove_subtree(&mut self, key: ObjectKey) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.objects.remove(current) {
                stack.extend(data.properties.into_values());
                stack.extend(data.elements);
            }
        }
    }
}
