//! Clipboard payloads and the per-object cut, copy, paste, and delete
//! operations.
//!
//! Objects travel through the clipboard as a JSON payload naming the class
//! of the first object, base64-encoded with the standard alphabet:
//!
//! ```text
//! {"objectClassName": "Page", "object": {...}}
//! {"objectClassName": "Page", "objects": [{...}, {...}]}
//! ```
//!
//! Pasting looks for a place that accepts the payload class: the target
//! itself when it is a compatible array, one of its array properties, an
//! unset object property for single objects, and then the same search on
//! each ancestor.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use eez_outline_core::logging::targets;

use crate::document::{Document, DocumentStore, ObjectKey, PropertyType};
use crate::error::{ClipboardError, DocumentError, Result};

/// A text clipboard.
pub trait Clipboard {
    /// Replace the clipboard text.
    fn write_text(&mut self, text: &str);

    /// Current clipboard text.
    fn read_text(&self) -> Option<String>;
}

/// In-process clipboard.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the clipboard.
    pub fn clear(&mut self) {
        self.text = None;
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) {
        self.text = Some(text.to_string());
    }

    fn read_text(&self) -> Option<String> {
        self.text.clone()
    }
}

/// Decoded clipboard payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardData {
    /// Class of the (first) object.
    pub object_class_name: String,
    /// A single object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    /// Several objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Value>>,
}

impl ClipboardData {
    /// Payload for one object.
    pub fn from_object(doc: &Document, object: ObjectKey) -> Option<Self> {
        Some(Self {
            object_class_name: doc.class_name(object)?.to_string(),
            object: Some(doc.to_tagged_json(object)?),
            objects: None,
        })
    }

    /// Payload for several objects. The class is the first object's class.
    pub fn from_objects(doc: &Document, objects: &[ObjectKey]) -> Option<Self> {
        let first = *objects.first()?;
        Some(Self {
            object_class_name: doc.class_name(first)?.to_string(),
            object: None,
            objects: Some(
                objects
                    .iter()
                    .map(|&object| doc.to_tagged_json(object))
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// Returns true for a single-object payload.
    pub fn is_single(&self) -> bool {
        self.object.is_some()
    }

    /// Serialize and base64-encode.
    pub fn encode(&self) -> std::result::Result<String, ClipboardError> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    /// Decode base64 text and parse the payload.
    pub fn decode(text: &str) -> std::result::Result<Self, ClipboardError> {
        let bytes = STANDARD.decode(text.trim())?;
        let data: Self = serde_json::from_slice(&bytes)?;
        if data.object.is_none() && data.objects.is_none() {
            return Err(ClipboardError::Empty);
        }
        Ok(data)
    }

    /// Decode and check that the payload class is registered in `doc`.
    pub fn decode_for(doc: &Document, text: &str) -> std::result::Result<Self, ClipboardError> {
        let data = Self::decode(text)?;
        if doc.registry().get(&data.object_class_name).is_none() {
            return Err(ClipboardError::UnknownClass(data.object_class_name));
        }
        Ok(data)
    }

    fn items(&self) -> Vec<Value> {
        match (&self.object, &self.objects) {
            (Some(object), _) => vec![object.clone()],
            (None, Some(objects)) => objects.clone(),
            (None, None) => Vec::new(),
        }
    }
}

/// Where a payload can be pasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PastePlace {
    /// Into an array container.
    Array(ObjectKey),
    /// Into an unset object property.
    Property { object: ObjectKey, name: String },
}

/// A decoded payload together with its paste place.
#[derive(Debug, Clone)]
pub struct PasteTarget {
    /// The payload.
    pub data: ClipboardData,
    /// The place it goes.
    pub place: PastePlace,
}

/// Find a place inside `object` for objects of `class`.
pub fn find_paste_place_inside(
    doc: &Document,
    object: ObjectKey,
    class: &str,
    is_single: bool,
) -> Option<PastePlace> {
    if doc.is_array(object) {
        return doc.array_accepts(object, class).then_some(PastePlace::Array(object));
    }

    let class_info = doc.class_info(object)?;
    let registry = doc.registry();

    for property in class_info.child_properties() {
        if let PropertyType::Array { class: element } = &property.ty {
            if registry.is_subclass_of(class, element) {
                if let Some(array) = doc.property_object(object, &property.name) {
                    return Some(PastePlace::Array(array));
                }
            }
        }
    }

    if is_single {
        for property in class_info.child_properties() {
            if let PropertyType::Object { class: declared } = &property.ty {
                if registry.is_subclass_of(class, declared)
                    && doc.property_object(object, &property.name).is_none()
                {
                    return Some(PastePlace::Property {
                        object,
                        name: property.name.clone(),
                    });
                }
            }
        }
    }

    None
}

/// Find a paste place inside `object` or, failing that, inside the nearest
/// ancestor that has one.
pub fn find_paste_place_inside_and_outside(
    doc: &Document,
    object: ObjectKey,
    data: &ClipboardData,
) -> Option<PastePlace> {
    std::iter::once(object)
        .chain(doc.ancestors(object))
        .find_map(|candidate| {
            find_paste_place_inside(doc, candidate, &data.object_class_name, data.is_single())
        })
}

/// Decode the clipboard and find where its payload would go when pasted on
/// `object`. Undecodable clipboard text yields `None`.
pub fn check_clipboard(
    doc: &Document,
    clipboard: &dyn Clipboard,
    object: ObjectKey,
) -> Option<PasteTarget> {
    let text = clipboard.read_text()?;
    let data = match ClipboardData::decode_for(doc, &text) {
        Ok(data) => data,
        Err(err) => {
            tracing::trace!(target: targets::CLIPBOARD, error = %err, "clipboard holds no usable payload");
            return None;
        }
    };
    let place = find_paste_place_inside_and_outside(doc, object, &data)?;
    Some(PasteTarget { data, place })
}

/// Returns true if the clipboard can be pasted on `object`.
pub fn can_paste(doc: &Document, clipboard: &dyn Clipboard, object: ObjectKey) -> bool {
    check_clipboard(doc, clipboard, object).is_some()
}

/// Paste the clipboard on `object` and return the new objects.
///
/// A single object lands right after `object` when the paste array is
/// `object`'s own parent. Otherwise objects are appended to the paste array,
/// or the single object fills the unset property.
pub fn paste_item(
    store: &mut DocumentStore,
    clipboard: &dyn Clipboard,
    object: ObjectKey,
) -> Result<Vec<ObjectKey>> {
    let Some(PasteTarget { data, place }) = check_clipboard(store.document(), clipboard, object)
    else {
        tracing::warn!(target: targets::CLIPBOARD, "nothing to paste");
        return Ok(Vec::new());
    };
    let items = data.items();

    let created = match place {
        PastePlace::Property { object: owner, name } => {
            let json = items.into_iter().next().ok_or(ClipboardError::Empty)?;
            let mut values = Map::new();
            values.insert(name.clone(), json);
            store.update_object(owner, &values)?;
            store.document().property_object(owner, &name).into_iter().collect()
        }
        PastePlace::Array(array) => {
            if data.is_single() && store.document().parent(object) == Some(array) {
                let index = store
                    .document()
                    .index_of(object)
                    .ok_or(DocumentError::ObjectNotFound)?;
                let json = items.first().ok_or(ClipboardError::Empty)?;
                vec![store.insert_object(array, index + 1, json)?]
            } else {
                store.add_objects(array, &items)?
            }
        }
    };

    tracing::debug!(target: targets::CLIPBOARD, count = created.len(), "pasted");
    Ok(created)
}

/// Copy one object to the clipboard.
pub fn copy_item(doc: &Document, clipboard: &mut dyn Clipboard, object: ObjectKey) -> Result<()> {
    let data = ClipboardData::from_object(doc, object).ok_or(DocumentError::ObjectNotFound)?;
    clipboard.write_text(&data.encode()?);
    tracing::debug!(target: targets::CLIPBOARD, class = %data.object_class_name, "copied");
    Ok(())
}

/// Copy one object to the clipboard and delete it.
pub fn cut_item(
    store: &mut DocumentStore,
    clipboard: &mut dyn Clipboard,
    object: ObjectKey,
) -> Result<()> {
    let data =
        ClipboardData::from_object(store.document(), object).ok_or(DocumentError::ObjectNotFound)?;
    let text = data.encode()?;
    store.delete_object(object)?;
    clipboard.write_text(&text);
    tracing::debug!(target: targets::CLIPBOARD, class = %data.object_class_name, "cut");
    Ok(())
}

/// Encoded payload for several objects.
pub fn objects_to_clipboard_text(doc: &Document, objects: &[ObjectKey]) -> Result<String> {
    let data = ClipboardData::from_objects(doc, objects).ok_or(DocumentError::ObjectNotFound)?;
    Ok(data.encode()?)
}

/// Delete objects in one undo step.
pub fn delete_items(store: &mut DocumentStore, objects: &[ObjectKey]) -> Result<()> {
    match objects {
        [] => Ok(()),
        [object] => Ok(store.delete_object(*object)?),
        _ => Ok(store.delete_objects(objects)?),
    }
}
