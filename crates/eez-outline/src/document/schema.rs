//! Static class metadata.
//!
//! Every document object belongs to a class registered in a [`ClassRegistry`].
//! A class declares an ordered list of properties. Each property is a scalar,
//! a single child object, or an array of child objects of a declared element
//! class. Classes can extend a base class, in which case the base properties
//! come first. Inheritance is resolved once, when the registry is built.
//!
//! # Example
//!
//! ```
//! use eez_outline::document::{ClassInfo, ClassRegistry, PropertyInfo};
//!
//! let registry = ClassRegistry::builder()
//!     .class(
//!         ClassInfo::new("Project")
//!             .property(PropertyInfo::array("pages", "Page")),
//!     )
//!     .class(ClassInfo::new("Page").property(PropertyInfo::scalar("name")))
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.get("Page").is_some());
//! ```

use std::collections::HashMap;

use crate::error::DocumentError;

/// The type of a declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// A JSON scalar (string, number, boolean, or null).
    Scalar,
    /// A single child object of the given class.
    Object { class: String },
    /// An array container of child objects of the given element class.
    Array { class: String },
}

/// Metadata for one declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property name, also the JSON key.
    pub name: String,
    /// Property type.
    pub ty: PropertyType,
    /// Human-readable name of an array property.
    pub display_name: Option<String>,
    /// Whether the property shows up in tree children.
    pub enumerable: bool,
    /// For array properties: show the elements in place of the container.
    pub show_only_children_in_tree: bool,
    /// Whether objects held by this property take part in navigation.
    pub part_of_navigation: bool,
    /// For object properties: the child may be unset and can be deleted.
    pub optional: bool,
}

impl PropertyInfo {
    fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            display_name: None,
            enumerable: true,
            show_only_children_in_tree: true,
            part_of_navigation: true,
            optional: false,
        }
    }

    /// Declare a scalar property.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Scalar)
    }

    /// Declare a child object property.
    pub fn object(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Object { class: class.into() })
    }

    /// Declare an array property.
    pub fn array(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Array { class: class.into() })
    }

    /// Set the display name.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Exclude the property from tree children.
    pub fn hidden(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Mark an object property as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set whether an array shows only its elements in trees.
    pub fn show_only_children_in_tree(mut self, show: bool) -> Self {
        self.show_only_children_in_tree = show;
        self
    }

    /// Set whether held objects take part in navigation.
    pub fn part_of_navigation(mut self, part: bool) -> Self {
        self.part_of_navigation = part;
        self
    }

    /// Returns true for object and array properties.
    pub fn is_child(&self) -> bool {
        !matches!(self.ty, PropertyType::Scalar)
    }

    /// Returns true for array properties.
    pub fn is_array(&self) -> bool {
        matches!(self.ty, PropertyType::Array { .. })
    }

    /// The declared class of a child property.
    pub fn child_class(&self) -> Option<&str> {
        match &self.ty {
            PropertyType::Scalar => None,
            PropertyType::Object { class } | PropertyType::Array { class } => Some(class),
        }
    }
}

/// Metadata for one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    name: String,
    base: Option<String>,
    label_property: Option<String>,
    properties: Vec<PropertyInfo>,
}

impl ClassInfo {
    /// Start declaring a class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            label_property: None,
            properties: Vec::new(),
        }
    }

    /// Set the base class.
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Use a scalar property other than `name` as the label.
    pub fn label_property(mut self, property: impl Into<String>) -> Self {
        self.label_property = Some(property.into());
        self
    }

    /// Append a property declaration.
    pub fn property(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base class name.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Scalar property holding the label, `name` unless overridden.
    pub fn label_property_name(&self) -> &str {
        self.label_property.as_deref().unwrap_or("name")
    }

    /// All properties, base class properties first.
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Find a property by name.
    pub fn find_property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterate over object and array properties.
    pub fn child_properties(&self) -> impl Iterator<Item = &PropertyInfo> {
        self.properties.iter().filter(|p| p.is_child())
    }
}

/// Registry of all classes a document may contain.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassInfo>,
}

impl ClassRegistry {
    /// Start building a registry.
    pub fn builder() -> ClassRegistryBuilder {
        ClassRegistryBuilder::default()
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Look up a class, failing with [`DocumentError::UnknownClass`].
    pub fn require(&self, name: &str) -> Result<&ClassInfo, DocumentError> {
        self.get(name)
            .ok_or_else(|| DocumentError::UnknownClass(name.to_string()))
    }

    /// Returns true if `class` is `base` or extends it, directly or not.
    pub fn is_subclass_of(&self, class: &str, base: &str) -> bool {
        let mut current = Some(class);
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self.get(name).and_then(ClassInfo::base);
        }
        false
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no class is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Builder for [`ClassRegistry`].
#[derive(Debug, Default)]
pub struct ClassRegistryBuilder {
    declared: Vec<ClassInfo>,
}

impl ClassRegistryBuilder {
    /// Register a class.
    pub fn class(mut self, class: ClassInfo) -> Self {
        self.declared.push(class);
        self
    }

    /// Resolve inheritance and validate class references.
    pub fn build(self) -> Result<ClassRegistry, DocumentError> {
        let declared: HashMap<String, ClassInfo> = self
            .declared
            .into_iter()
            .map(|class| (class.name.clone(), class))
            .collect();

        let mut classes = HashMap::with_capacity(declared.len());
        for name in declared.keys() {
            let resolved = resolve(&declared, name)?;
            classes.insert(name.clone(), resolved);
        }

        for class in classes.values() {
            for property in class.child_properties() {
                if let Some(child) = property.child_class() {
                    if !classes.contains_key(child) {
                        return Err(DocumentError::UnknownClass(child.to_string()));
                    }
                }
            }
        }

        tracing::debug!(
            target: eez_outline_core::logging::targets::DOCUMENT,
            class_count = classes.len(),
            "class registry built"
        );

        Ok(ClassRegistry { classes })
    }
}

/// Flatten the base chain of `name` into one class.
fn resolve(declared: &HashMap<String, ClassInfo>, name: &str) -> Result<ClassInfo, DocumentError> {
    let mut chain = Vec::new();
    let mut current = Some(name);
    while let Some(class_name) = current {
        if chain.iter().any(|c: &&ClassInfo| c.name == class_name) {
            return Err(DocumentError::CyclicInheritance(name.to_string()));
        }
        let class = declared
            .get(class_name)
            .ok_or_else(|| DocumentError::UnknownClass(class_name.to_string()))?;
        chain.push(class);
        current = class.base.as_deref();
    }

    let own = chain[0];
    let mut properties: Vec<PropertyInfo> = Vec::new();
    for class in chain.iter().rev() {
        for property in &class.properties {
            // a subclass may redeclare a base property
            if let Some(existing) = properties.iter_mut().find(|p| p.name == property.name) {
                *existing = property.clone();
            } else {
                properties.push(property.clone());
            }
        }
    }

    let label_property = chain.iter().find_map(|c| c.label_property.clone());

    Ok(ClassInfo {
        name: own.name.clone(),
        base: own.base.clone(),
        label_property,
        properties,
    })
}

/// Turn a property key into a display string (`fontSize` becomes `Font size`).
pub fn humanize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' || ch == '-' {
            out.push(' ');
        } else if ch.is_uppercase() {
            if i > 0 {
                out.push(' ');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => out,
    }
}
