//! Per-type bean metadata.
//!
//! A [`BeanType`] is an ordered list of layers. Each layer holds the
//! attributes and operations one type declares itself ("local"
//! descriptors). Extending another type copies its layers in front of the
//! new local layer, so the aggregated view always runs from the least to the
//! most specific declaration.

use std::sync::Arc;

use crate::descriptor::{Access, Argument, Attribute, Operation, ValueType};
use crate::error::{DeclarationError, DeclarationResult};

/// Descriptors declared directly by one type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeLayer {
    type_name: String,
    attributes: Vec<Arc<Attribute>>,
    operations: Vec<Arc<Operation>>,
}

impl TypeLayer {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attributes(&self) -> &[Arc<Attribute>] {
        &self.attributes
    }

    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeanType {
    name: String,
    layers: Vec<Arc<TypeLayer>>,
    attributes: Vec<Arc<Attribute>>,
    operations: Vec<Arc<Operation>>,
}

impl BeanType {
    pub fn builder(name: &str) -> BeanTypeBuilder {
        BeanTypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layers from least to most specific; the last one is this type's own.
    pub fn layers(&self) -> &[Arc<TypeLayer>] {
        &self.layers
    }

    pub fn local_attributes(&self) -> &[Arc<Attribute>] {
        self.layers
            .last()
            .map(|layer| layer.attributes())
            .unwrap_or_default()
    }

    pub fn local_operations(&self) -> &[Arc<Operation>] {
        self.layers
            .last()
            .map(|layer| layer.operations())
            .unwrap_or_default()
    }

    /// Aggregated attributes of every layer.
    pub fn attributes(&self) -> &[Arc<Attribute>] {
        &self.attributes
    }

    /// Aggregated operations of every layer.
    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Arc<Attribute>> {
        self.attributes.iter().find(|attribute| attribute.name() == name)
    }

    pub fn find_operation(&self, name: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|operation| operation.name() == name)
    }

    /// True if `type_name` is this type or one it extends.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.type_name() == type_name)
    }
}

/// Declares a bean type.
///
/// ```
/// use rumx::{BeanType, ValueType};
///
/// let entry = BeanType::builder("Entry")
///     .accessor("my_int", ValueType::Integer, "My integer")
///     .reader("my_string", ValueType::String, "My string")
///     .operation("push", ValueType::Void, "Push a value", &[
///         &["my_int", "integer", "An integer argument"],
///     ])
///     .build()
///     .unwrap();
/// assert_eq!(entry.attributes().len(), 2);
/// ```
#[derive(Debug)]
pub struct BeanTypeBuilder {
    name: String,
    inherited: Vec<Arc<TypeLayer>>,
    attributes: Vec<Arc<Attribute>>,
    operations: Vec<Arc<Operation>>,
    error: Option<DeclarationError>,
}

impl BeanTypeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inherited: Vec::new(),
            attributes: Vec::new(),
            operations: Vec::new(),
            error: None,
        }
    }

    /// Appends all layers of `parent`. Calling it more than once mixes in
    /// several types in call order; a layer already present is skipped.
    pub fn extend(mut self, parent: &BeanType) -> Self {
        for layer in parent.layers() {
            if !self.inherited.iter().any(|l| Arc::ptr_eq(l, layer)) {
                self.inherited.push(layer.clone());
            }
        }
        self
    }

    pub fn reader(self, name: &str, value_type: ValueType, description: &str) -> Self {
        self.attribute(Attribute::new(
            name,
            value_type,
            description,
            Access::ReadOnly,
        ))
    }

    pub fn writer(self, name: &str, value_type: ValueType, description: &str) -> Self {
        self.attribute(Attribute::new(
            name,
            value_type,
            description,
            Access::WriteOnly,
        ))
    }

    pub fn accessor(self, name: &str, value_type: ValueType, description: &str) -> Self {
        self.attribute(Attribute::new(
            name,
            value_type,
            description,
            Access::ReadWrite,
        ))
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        if self
            .attributes
            .iter()
            .any(|existing| existing.name() == attribute.name())
        {
            self.fail(DeclarationError::DuplicateAttribute {
                type_name: self.name.clone(),
                attribute: attribute.name().to_string(),
            });
        } else {
            self.attributes.push(Arc::new(attribute));
        }
        self
    }

    /// Declares an operation from `[name, type, description]` argument
    /// triples. A triple of any other shape fails the declaration.
    pub fn operation(
        self,
        name: &str,
        return_type: ValueType,
        description: &str,
        args: &[&[&str]],
    ) -> Self {
        let arguments = args
            .iter()
            .enumerate()
            .map(|(index, spec)| Argument::from_spec(name, index, spec))
            .collect::<DeclarationResult<Vec<_>>>()
            .and_then(|arguments| Operation::new(name, return_type, description, arguments));
        match arguments {
            Ok(operation) => self.add_operation(operation),
            Err(e) => {
                let mut this = self;
                this.fail(e);
                this
            }
        }
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        if self
            .operations
            .iter()
            .any(|existing| existing.name() == operation.name())
        {
            self.fail(DeclarationError::DuplicateOperation {
                type_name: self.name.clone(),
                operation: operation.name().to_string(),
            });
        } else {
            self.operations.push(Arc::new(operation));
        }
        self
    }

    pub fn build(self) -> DeclarationResult<BeanType> {
        if let Some(error) = self.error {
            tracing::warn!("Bean type {} declaration failed: {}", self.name, error);
            return Err(error);
        }

        let local = Arc::new(TypeLayer {
            type_name: self.name.clone(),
            attributes: self.attributes,
            operations: self.operations,
        });
        let mut layers = self.inherited;
        layers.push(local);

        let attributes = layers
            .iter()
            .flat_map(|layer| layer.attributes().iter().cloned())
            .collect();
        let operations = layers
            .iter()
            .flat_map(|layer| layer.operations().iter().cloned())
            .collect();

        Ok(BeanType {
            name: self.name,
            layers,
            attributes,
            operations,
        })
    }

    // 最初のエラーだけを保持する
    fn fail(&mut self, error: DeclarationError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// Names of every attribute in aggregation order, duplicates included.
pub fn attribute_names(bean_type: &BeanType) -> Vec<&str> {
    bean_type
        .attributes()
        .iter()
        .map(|attribute| attribute.name())
        .collect()
}
