//! The document store: atomic mutations, transactions, and undo.
//!
//! Every mutation runs against a working copy of the document and replaces
//! the live document only when it succeeds, so a failed mutation leaves no
//! trace. Outside a transaction each mutation is its own undo step. Inside
//! `begin_transaction`/`commit_transaction` all mutations form one step.

use serde_json::{Map, Value};

use eez_outline_core::Signal;
use eez_outline_core::logging::targets;

use super::{Document, ObjectKey, PropertyType};
use crate::error::DocumentError;

/// What produced a document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A mutation or a committed transaction.
    Commit,
    /// An undo step.
    Undo,
    /// A redo step.
    Redo,
}

/// Payload of [`DocumentStore::changed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// What produced the change.
    pub kind: ChangeKind,
    /// Label of the undo step.
    pub label: String,
    /// Store generation after the change.
    pub generation: u64,
}

#[derive(Debug)]
struct UndoStep {
    label: String,
    snapshot: Document,
}

#[derive(Debug)]
struct Transaction {
    label: String,
    depth: usize,
    before: Document,
    modified: bool,
}

/// Owner of a [`Document`] and the only way to edit it.
#[derive(Debug)]
pub struct DocumentStore {
    document: Document,
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    transaction: Option<Transaction>,
    generation: u64,
    /// Emitted after each committed step, undo, or redo.
    pub changed: Signal<DocumentChange>,
}

impl DocumentStore {
    /// Take ownership of a document.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            transaction: None,
            generation: 0,
            changed: Signal::new(),
        }
    }

    /// The current document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Incremented on every visible change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Open a transaction, or nest into the open one.
    pub fn begin_transaction(&mut self, label: impl Into<String>) {
        match &mut self.transaction {
            Some(transaction) => transaction.depth += 1,
            None => {
                let label = label.into();
                tracing::debug!(target: targets::DOCUMENT, label = %label, "begin transaction");
                self.transaction = Some(Transaction {
                    label,
                    depth: 1,
                    before: self.document.clone(),
                    modified: false,
                });
            }
        }
    }

    /// Close the innermost transaction level. Closing the outermost level
    /// records one undo step if anything changed.
    pub fn commit_transaction(&mut self) -> Result<(), DocumentError> {
        let transaction = self.transaction.as_mut().ok_or(DocumentError::NoTransaction)?;
        transaction.depth -= 1;
        if transaction.depth > 0 {
            return Ok(());
        }
        if let Some(transaction) = self.transaction.take() {
            tracing::debug!(
                target: targets::DOCUMENT,
                label = %transaction.label,
                modified = transaction.modified,
                "commit transaction"
            );
            if transaction.modified {
                self.record(transaction.label, transaction.before);
            }
        }
        Ok(())
    }

    /// Run `f` inside one transaction. When `f` fails, the document goes
    /// back to its state before the call and no undo step is recorded.
    pub fn transact<R>(
        &mut self,
        label: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<R, DocumentError>,
    ) -> Result<R, DocumentError> {
        let checkpoint = self.document.clone();
        let modified = self.transaction.as_ref().is_some_and(|t| t.modified);
        self.begin_transaction(label);
        match f(self) {
            Ok(result) => {
                self.commit_transaction()?;
                Ok(result)
            }
            Err(err) => {
                self.document = checkpoint;
                self.abandon_transaction_level(modified);
                tracing::debug!(target: targets::DOCUMENT, error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Close the innermost transaction level without recording it.
    /// `modified` is the enclosing level's flag before the level opened.
    fn abandon_transaction_level(&mut self, modified: bool) {
        let closed = match &mut self.transaction {
            Some(transaction) => {
                transaction.depth -= 1;
                transaction.modified = modified;
                transaction.depth == 0
            }
            None => false,
        };
        if closed {
            self.transaction = None;
        }
    }

    fn record(&mut self, label: String, before: Document) {
        self.undo_stack.push(UndoStep {
            label: label.clone(),
            snapshot: before,
        });
        self.redo_stack.clear();
        self.notify(ChangeKind::Commit, label);
    }

    fn notify(&mut self, kind: ChangeKind, label: String) {
        self.generation += 1;
        self.changed.emit(DocumentChange {
            kind,
            label,
            generation: self.generation,
        });
    }

    fn mutate<R>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Document) -> Result<R, DocumentError>,
    ) -> Result<R, DocumentError> {
        let mut working = self.document.clone();
        let result = f(&mut working)?;
        let before = std::mem::replace(&mut self.document, working);
        tracing::debug!(target: targets::DOCUMENT, operation = label, "document mutated");
        match &mut self.transaction {
            Some(transaction) => transaction.modified = true,
            None => self.record(label.to_string(), before),
        }
        Ok(result)
    }

    /// Set properties of an object. Scalars take the value as is, object
    /// properties load it as a child (`null` unsets an optional child), and
    /// array properties replace all elements.
    pub fn update_object(
        &mut self,
        object: ObjectKey,
        values: &Map<String, Value>,
    ) -> Result<(), DocumentError> {
        self.mutate("update object", |doc| {
            let class = doc.class_info(object).ok_or(DocumentError::ObjectNotFound)?.clone();
            if doc.is_array(object) {
                return Err(DocumentError::NotAnObject(
                    doc.id(object).unwrap_or_default().to_string(),
                ));
            }
            for (name, value) in values {
                let property = class
                    .find_property(name)
                    .ok_or_else(|| DocumentError::unknown_property(class.name(), name.as_str()))?;
                match &property.ty {
                    PropertyType::Scalar => doc.set_scalar(object, name, value.clone())?,
                    PropertyType::Object { .. } => {
                        if value.is_null() && !property.optional {
                            return Err(DocumentError::NotDeletable(name.clone()));
                        }
                        doc.set_object_property(object, property, Some(value))?;
                    }
                    PropertyType::Array { class } => {
                        let items = value.as_array().ok_or_else(|| {
                            DocumentError::invalid_json(class.as_str(), format!("property '{name}' must be an array"))
                        })?;
                        let array = doc
                            .property_object(object, name)
                            .ok_or(DocumentError::ObjectNotFound)?;
                        doc.replace_elements(array, items)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Append an element.
    pub fn add_object(&mut self, array: ObjectKey, json: &Value) -> Result<ObjectKey, DocumentError> {
        self.mutate("add object", |doc| doc.insert_element(array, usize::MAX, json))
    }

    /// Append several elements.
    pub fn add_objects(
        &mut self,
        array: ObjectKey,
        json: &[Value],
    ) -> Result<Vec<ObjectKey>, DocumentError> {
        self.mutate("add objects", |doc| {
            json.iter()
                .map(|item| doc.insert_element(array, usize::MAX, item))
                .collect()
        })
    }

    /// Insert an element at `index`.
    pub fn insert_object(
        &mut self,
        array: ObjectKey,
        index: usize,
        json: &Value,
    ) -> Result<ObjectKey, DocumentError> {
        self.mutate("insert object", |doc| doc.insert_element(array, index, json))
    }

    /// Insert an element right before an existing element.
    pub fn insert_object_before(
        &mut self,
        sibling: ObjectKey,
        json: &Value,
    ) -> Result<ObjectKey, DocumentError> {
        self.insert_next_to(sibling, json, 0)
    }

    /// Insert an element right after an existing element.
    pub fn insert_object_after(
        &mut self,
        sibling: ObjectKey,
        json: &Value,
    ) -> Result<ObjectKey, DocumentError> {
        self.insert_next_to(sibling, json, 1)
    }

    fn insert_next_to(
        &mut self,
        sibling: ObjectKey,
        json: &Value,
        offset: usize,
    ) -> Result<ObjectKey, DocumentError> {
        let doc = &self.document;
        let index = doc.index_of(sibling).ok_or_else(|| {
            DocumentError::NoParent(doc.id(sibling).unwrap_or_default().to_string())
        })?;
        let array = doc.parent(sibling).ok_or(DocumentError::ObjectNotFound)?;
        self.mutate("insert object", |doc| doc.insert_element(array, index + offset, json))
    }

    /// Delete an array element or optional object.
    pub fn delete_object(&mut self, object: ObjectKey) -> Result<(), DocumentError> {
        self.mutate("delete object", |doc| doc.remove(object))
    }

    /// Delete several objects in one step. Objects already removed with an
    /// ancestor earlier in the list are skipped.
    pub fn delete_objects(&mut self, objects: &[ObjectKey]) -> Result<(), DocumentError> {
        self.mutate("delete objects", |doc| {
            for &object in objects {
                if doc.contains(object) {
                    doc.remove(object)?;
                }
            }
            Ok(())
        })
    }

    /// JSON copy of an object, suitable for inserting elsewhere.
    pub fn clone_object(&self, object: ObjectKey) -> Option<Value> {
        self.document.to_tagged_json(object)
    }

    /// Returns true if there is a step to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there is a step to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the step `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|step| step.label.as_str())
    }

    /// Label of the step `redo` would reapply.
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|step| step.label.as_str())
    }

    /// Revert the last step. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, DocumentError> {
        if self.transaction.is_some() {
            return Err(DocumentError::TransactionOpen("undo"));
        }
        let Some(step) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let current = std::mem::replace(&mut self.document, step.snapshot);
        self.redo_stack.push(UndoStep {
            label: step.label.clone(),
            snapshot: current,
        });
        tracing::debug!(target: targets::DOCUMENT, label = %step.label, "undo");
        self.notify(ChangeKind::Undo, step.label);
        Ok(true)
    }

    /// Reapply the last undone step. Returns false when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> Result<bool, DocumentError> {
        if self.transaction.is_some() {
            return Err(DocumentError::TransactionOpen("redo"));
        }
        let Some(step) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let current = std::mem::replace(&mut self.document, step.snapshot);
        self.undo_stack.push(UndoStep {
            label: step.label.clone(),
            snapshot: current,
        });
        tracing::debug!(target: targets::DOCUMENT, label = %step.label, "redo");
        self.notify(ChangeKind::Redo, step.label);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::super::tests::sample;
    use super::*;

    fn pages(store: &DocumentStore) -> ObjectKey {
        let doc = store.document();
        doc.property_object(doc.root(), "pages").unwrap()
    }

    #[test]
    fn test_add_and_undo() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);
        let added = store.add_object(pages, &json!({ "name": "Extra" })).unwrap();
        assert_eq!(store.document().elements(pages).len(), 3);
        assert_eq!(store.document().label(added), "Extra");
        assert_eq!(store.undo_label(), Some("add object"));

        assert!(store.undo().unwrap());
        assert_eq!(store.document().elements(pages).len(), 2);
        assert!(!store.document().contains(added));

        assert!(store.redo().unwrap());
        assert!(store.document().contains(added));
    }

    #[test]
    fn test_failed_mutation_leaves_document_untouched() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);
        let result = store.add_objects(pages, &[json!({ "name": "ok" }), json!({ "bogus": 1 })]);
        assert!(result.is_err());
        assert_eq!(store.document().elements(pages).len(), 2);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_failed_transact_rolls_back() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);
        let before = store.document().to_json(store.document().root());
        let generation = store.generation();

        let first = store.document().elements(pages)[0];
        let result = store.transact("drop object", |store| {
            store.delete_object(first)?;
            store.add_object(pages, &json!({ "bogus": 1 }))
        });
        assert!(matches!(result, Err(DocumentError::UnknownProperty { .. })));

        assert!(store.document().contains(first));
        assert_eq!(store.document().to_json(store.document().root()), before);
        assert!(!store.in_transaction());
        assert!(!store.can_undo());
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn test_failed_nested_transact_keeps_outer_changes() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);

        store.begin_transaction("edit pages");
        store.add_object(pages, &json!({ "name": "Extra" })).unwrap();
        let result = store.transact("nested", |store| {
            let first = store.document().elements(pages)[0];
            store.delete_object(first)?;
            Err::<(), _>(DocumentError::ObjectNotFound)
        });
        assert!(result.is_err());
        assert!(store.in_transaction());
        store.commit_transaction().unwrap();

        assert_eq!(store.document().elements(pages).len(), 3);
        assert_eq!(store.undo_label(), Some("edit pages"));
        assert!(store.undo().unwrap());
        assert_eq!(store.document().elements(pages).len(), 2);
    }

    #[test]
    fn test_failed_nested_transact_alone_records_nothing() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);

        store.begin_transaction("edit pages");
        let result = store.transact("nested", |store| {
            store.add_object(pages, &json!({ "name": "Extra" }))?;
            Err::<(), _>(DocumentError::ObjectNotFound)
        });
        assert!(result.is_err());
        store.commit_transaction().unwrap();

        assert_eq!(store.document().elements(pages).len(), 2);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_transaction_is_one_step() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        store.changed.connect(move |change: &DocumentChange| {
            events_clone.lock().push(change.label.clone());
        });

        store.begin_transaction("move page");
        let first = store.document().elements(pages)[0];
        let json = store.clone_object(first).unwrap();
        store.begin_transaction("nested");
        store.delete_object(first).unwrap();
        store.commit_transaction().unwrap();
        store.add_object(pages, &json).unwrap();
        assert!(events.lock().is_empty());
        store.commit_transaction().unwrap();

        assert_eq!(*events.lock(), vec!["move page".to_string()]);
        assert_eq!(store.undo_label(), Some("move page"));
        let labels: Vec<String> = store
            .document()
            .elements(pages)
            .iter()
            .map(|&page| store.document().label(page))
            .collect();
        assert_eq!(labels, vec!["Settings", "Main"]);
        assert!(matches!(store.commit_transaction(), Err(DocumentError::NoTransaction)));
    }

    #[test]
    fn test_update_object() {
        let mut store = DocumentStore::new(sample());
        let root = store.document().root();
        let mut values = Map::new();
        values.insert("name".into(), json!("renamed"));
        values.insert("settings".into(), json!({ "title": "T" }));
        store.update_object(root, &values).unwrap();

        let doc = store.document();
        assert_eq!(doc.scalar(root, "name"), Some(&json!("renamed")));
        let settings = doc.property_object(root, "settings").unwrap();
        assert!(doc.is_optional(settings));

        let mut values = Map::new();
        values.insert("settings".into(), Value::Null);
        store.update_object(root, &values).unwrap();
        assert!(store.document().property_object(root, "settings").is_none());
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut store = DocumentStore::new(sample());
        let pages = pages(&store);
        let first = store.document().elements(pages)[0];
        store.insert_object_before(first, &json!({ "name": "A" })).unwrap();
        store.insert_object_after(first, &json!({ "name": "B" })).unwrap();
        let doc = store.document();
        let labels: Vec<String> = doc.elements(pages).iter().map(|&p| doc.label(p)).collect();
        assert_eq!(labels, vec!["A", "Main", "B", "Settings"]);
    }

    #[test]
    fn test_undo_inside_transaction_is_rejected() {
        let mut store = DocumentStore::new(sample());
        store.begin_transaction("open");
        assert!(matches!(store.undo(), Err(DocumentError::TransactionOpen(_))));
        store.commit_transaction().unwrap();
        assert!(!store.can_undo());
    }
}
