//! Error types for eez-outline.
//!
//! Lookups throughout the crate return `Option` and treat absence as a normal
//! outcome. The types here cover the operations that touch the document store
//! or decode data coming from outside the process.

/// Result type alias for eez-outline operations.
pub type Result<T> = std::result::Result<T, OutlineError>;

/// Errors raised by the document model and the document store.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A class name is not present in the registry.
    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    /// A property is not declared by the class.
    #[error("Class '{class}' has no property '{property}'")]
    UnknownProperty { class: String, property: String },

    /// A class inherits from itself through its base chain.
    #[error("Class '{0}' has a cyclic base class chain")]
    CyclicInheritance(String),

    /// The object is not an array container.
    #[error("Object '{0}' is not an array")]
    NotAnArray(String),

    /// The object is not a plain object.
    #[error("Object '{0}' is not an object")]
    NotAnObject(String),

    /// A class is not a subclass of the class expected at that place.
    #[error("Class '{class}' cannot be used where '{expected}' is expected")]
    IncompatibleClass { class: String, expected: String },

    /// JSON does not match the shape declared by the class.
    #[error("Invalid JSON for class '{class}': {message}")]
    InvalidJson { class: String, message: String },

    /// The object key no longer refers to a live object.
    #[error("Object not found")]
    ObjectNotFound,

    /// The object has no parent that could hold a sibling or drop it.
    #[error("Object '{0}' has no parent")]
    NoParent(String),

    /// The object cannot be removed from its parent.
    #[error("Object '{0}' cannot be deleted")]
    NotDeletable(String),

    /// `commit_transaction` was called without a matching begin.
    #[error("No transaction is open")]
    NoTransaction,

    /// Undo or redo was requested while a transaction is open.
    #[error("Cannot {0} while a transaction is open")]
    TransactionOpen(&'static str),
}

impl DocumentError {
    /// Create an unknown property error.
    pub fn unknown_property(class: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            class: class.into(),
            property: property.into(),
        }
    }

    /// Create an incompatible class error.
    pub fn incompatible_class(class: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::IncompatibleClass {
            class: class.into(),
            expected: expected.into(),
        }
    }

    /// Create an invalid JSON error.
    pub fn invalid_json(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidJson {
            class: class.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while decoding clipboard payloads.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The clipboard text is not valid base64.
    #[error("Clipboard text is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload is not the expected JSON.
    #[error("Clipboard payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload names a class the registry does not know.
    #[error("Clipboard payload has unknown class '{0}'")]
    UnknownClass(String),

    /// The payload has neither `object` nor `objects`.
    #[error("Clipboard payload is empty")]
    Empty,
}

/// Errors raised by the tab manager.
#[derive(Debug, thiserror::Error)]
pub enum TabError {
    /// No open tab and no tab definition has this id.
    #[error("Tab '{0}' not found")]
    NotFound(String),

    /// The Home tab cannot be closed.
    #[error("Tab '{0}' is permanent and cannot be removed")]
    PermanentTab(String),

    /// Saved tab state could not be parsed.
    #[error("Invalid saved tabs: {0}")]
    InvalidState(#[from] serde_json::Error),
}

/// Errors raised while loading view configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse or shape error.
    #[error("Invalid view configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level error type for eez-outline.
#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    /// Document model or store error.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Clipboard error.
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    /// Tab manager error.
    #[error(transparent)]
    Tab(#[from] TabError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// View state could not be parsed.
    #[error("Invalid view state: {0}")]
    ViewState(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocumentError::unknown_property("Page", "width");
        assert_eq!(err.to_string(), "Class 'Page' has no property 'width'");

        let err: OutlineError = TabError::PermanentTab("home".into()).into();
        assert_eq!(err.to_string(), "Tab 'home' is permanent and cannot be removed");
    }

    #[test]
    fn test_clipboard_error_from_base64() {
        use base64::Engine as _;
        let err = base64::engine::general_purpose::STANDARD
            .decode("***")
            .map_err(ClipboardError::from)
            .unwrap_err();
        assert!(matches!(err, ClipboardError::Base64(_)));
    }
}
