//! Schema-guided JSON loading and saving.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{ClassRegistry, Document, ObjectData, ObjectKey, ObjectKind, PropertyType, ROOT_ID};
use crate::error::DocumentError;

/// JSON key naming the concrete class of an object.
pub const CLASS_KEY: &str = "$class";

impl Document {
    /// Load a document from JSON, validating it against the registry.
    pub fn from_json(
        registry: Arc<ClassRegistry>,
        root_class: &str,
        json: &Value,
    ) -> Result<Self, DocumentError> {
        registry.require(root_class)?;
        let mut document = Document {
            registry,
            objects: Default::default(),
            root: ObjectKey::default(),
        };
        document.root = document.load_object(None, None, root_class, json)?;
        tracing::debug!(
            target: eez_outline_core::logging::targets::DOCUMENT,
            objects = document.len(),
            "document loaded"
        );
        Ok(document)
    }

    /// Serialize an object or array. `"$class"` is written only where the
    /// class differs from the one its place declares.
    pub fn to_json(&self, key: ObjectKey) -> Option<Value> {
        self.object_json(key, false)
    }

    /// Like [`Document::to_json`], but the top-level object always names its
    /// class. Used for clipboard payloads, which may be pasted into places
    /// declaring a base class.
    pub fn to_tagged_json(&self, key: ObjectKey) -> Option<Value> {
        self.object_json(key, true)
    }

    /// The class declared by the place that holds `key`.
    fn declared_class(&self, key: ObjectKey) -> Option<&str> {
        let data = self.get(key)?;
        match data.parent {
            None => Some(data.class.as_str()),
            Some(parent) if self.is_array(parent) => self.class_name(parent),
            Some(_) => self.holding_property(key)?.child_class(),
        }
    }

    fn object_json(&self, key: ObjectKey, tag: bool) -> Option<Value> {
        let data = self.get(key)?;
        match data.kind {
            ObjectKind::Array => Some(Value::Array(
                data.elements
                    .iter()
                    .filter_map(|&element| self.object_json(element, false))
                    .collect(),
            )),
            ObjectKind::Object => {
                let mut map = Map::new();
                if tag || self.declared_class(key) != Some(data.class.as_str()) {
                    map.insert(CLASS_KEY.to_string(), Value::String(data.class.clone()));
                }
                for property in self.registry.get(&data.class)?.properties() {
                    let value = match property.ty {
                        PropertyType::Scalar => data.fields.get(&property.name).cloned(),
                        _ => data
                            .properties
                            .get(&property.name)
                            .and_then(|&child| self.object_json(child, false)),
                    };
                    if let Some(value) = value {
                        map.insert(property.name.clone(), value);
                    }
                }
                Some(Value::Object(map))
            }
        }
    }

    pub(super) fn load_object(
        &mut self,
        parent: Option<ObjectKey>,
        key: Option<String>,
        declared: &str,
        json: &Value,
    ) -> Result<ObjectKey, DocumentError> {
        let map = json
            .as_object()
            .ok_or_else(|| DocumentError::invalid_json(declared, "expected a JSON object"))?;

        let class = match map.get(CLASS_KEY) {
            None => declared.to_string(),
            Some(Value::String(name)) => {
                self.registry.require(name)?;
                if !self.registry.is_subclass_of(name, declared) {
                    return Err(DocumentError::incompatible_class(name.as_str(), declared));
                }
                name.clone()
            }
            Some(_) => {
                return Err(DocumentError::invalid_json(declared, "\"$class\" must be a string"));
            }
        };

        let registry = Arc::clone(&self.registry);
        let class_info = registry.require(&class)?;
        if let Some(unknown) = map
            .keys()
            .find(|name| *name != CLASS_KEY && class_info.find_property(name).is_none())
        {
            return Err(DocumentError::unknown_property(class.as_str(), unknown.as_str()));
        }

        let id = match parent {
            Some(parent) => self.next_child_id(parent)?,
            None => ROOT_ID.to_string(),
        };
        let object = self
            .objects
            .insert(ObjectData::new(class, ObjectKind::Object, id, parent, key));

        for property in class_info.properties() {
            let value = map.get(&property.name);
            match &property.ty {
                PropertyType::Scalar => {
                    if let Some(value) = value.filter(|value| !value.is_null()) {
                        self.data_mut(object)?
                            .fields
                            .insert(property.name.clone(), value.clone());
                    }
                }
                PropertyType::Object { class } => {
                    if let Some(value) = value.filter(|value| !value.is_null()) {
                        let child =
                            self.load_object(Some(object), Some(property.name.clone()), class, value)?;
                        self.data_mut(object)?
                            .properties
                            .insert(property.name.clone(), child);
                    }
                }
                PropertyType::Array { class } => {
                    let array = self.load_array(object, &property.name, class, value)?;
                    self.data_mut(object)?
                        .properties
                        .insert(property.name.clone(), array);
                }
            }
        }

        Ok(object)
    }

    /// Array properties always get a container, empty when the JSON omits it.
    fn load_array(
        &mut self,
        owner: ObjectKey,
        name: &str,
        element_class: &str,
        json: Option<&Value>,
    ) -> Result<ObjectKey, DocumentError> {
        let items: &[Value] = match json {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(DocumentError::invalid_json(
                    element_class,
                    format!("property '{name}' must be an array"),
                ));
            }
        };

        let id = self.next_child_id(owner)?;
        let array = self.objects.insert(ObjectData::new(
            element_class.to_string(),
            ObjectKind::Array,
            id,
            Some(owner),
            Some(name.to_string()),
        ));
        for item in items {
            let element = self.load_object(Some(array), None, element_class, item)?;
            self.data_mut(array)?.elements.push(element);
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{registry, sample};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_subclass_tag_only_where_needed() {
        let doc = sample();
        let json = doc.to_json(doc.root()).unwrap();
        assert_eq!(json["pages"][0]["widgets"][1]["$class"], "Button");
        assert!(json["pages"][0]["widgets"][0].get("$class").is_none());
        assert!(json.get("$class").is_none());
        assert!(json.get("settings").is_none());
        assert_eq!(json["pages"][1]["widgets"], json!([]));

        let reloaded = Document::from_json(registry(), "Project", &json).unwrap();
        assert_eq!(reloaded.to_json(reloaded.root()), Some(json));
    }

    #[test]
    fn test_tagged_json() {
        let doc = sample();
        let pages = doc.property_object(doc.root(), "pages").unwrap();
        let page = doc.elements(pages)[0];
        let json = doc.to_tagged_json(page).unwrap();
        assert_eq!(json["$class"], "Page");
    }

    #[test]
    fn test_rejects_unknown_property() {
        let result = Document::from_json(registry(), "Project", &json!({ "colour": "red" }));
        assert!(matches!(result, Err(DocumentError::UnknownProperty { .. })));
    }

    #[test]
    fn test_rejects_incompatible_class() {
        let result = Document::from_json(
            registry(),
            "Project",
            &json!({ "pages": [{ "$class": "Font" }] }),
        );
        assert!(matches!(result, Err(DocumentError::IncompatibleClass { .. })));
    }

    #[test]
    fn test_rejects_non_array_for_array_property() {
        let result = Document::from_json(registry(), "Project", &json!({ "pages": {} }));
        assert!(matches!(result, Err(DocumentError::InvalidJson { .. })));
    }
}
