//! Model schemas: the fixed name-to-position property table per model type.
//!
//! Column projection needs to know, for every model type, which property
//! names exist, their declared types, and their positional order. That
//! table is built once per model type and shared; there is no runtime
//! type introspection anywhere in the projection path.

use std::collections::HashMap;

use crate::core::value::{FieldType, FieldValue};
use crate::error::{GateError, Result};

/// One property in a model schema: its external name and declared type.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub field_type: FieldType,
}

/// The fixed property table for one model type.
///
/// Properties are positional; the index maps external names (compared
/// case-insensitively, the way relational column names arrive) to
/// positions.
#[derive(Debug)]
pub struct ModelSchema {
    model: String,
    properties: Vec<PropertyDef>,
    index: HashMap<String, usize>,
}

impl ModelSchema {
    /// Start building a schema for the named model type.
    pub fn builder(model: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            model: model.into(),
            properties: Vec::new(),
        }
    }

    /// The model type name this schema describes.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Property position for an external name, if the name is known.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Property definition at a position.
    ///
    /// Panics if the position is out of range; positions only come from
    /// this schema's own lookups.
    pub fn property(&self, position: usize) -> &PropertyDef {
        &self.properties[position]
    }

    /// All properties in positional order.
    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }
}

/// Builder for [`ModelSchema`]. Duplicate property names are rejected
/// when the schema is finished.
pub struct ModelSchemaBuilder {
    model: String,
    properties: Vec<PropertyDef>,
}

impl ModelSchemaBuilder {
    /// Append a property; positions follow insertion order.
    pub fn property(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Finish the schema, building the name index.
    pub fn build(self) -> ModelSchema {
        let mut index = HashMap::with_capacity(self.properties.len());
        for (position, prop) in self.properties.iter().enumerate() {
            let previous = index.insert(prop.name.to_ascii_lowercase(), position);
            assert!(
                previous.is_none(),
                "duplicate property '{}' in schema for model '{}'",
                prop.name,
                self.model
            );
        }
        ModelSchema {
            model: self.model,
            properties: self.properties,
            index,
        }
    }
}

/// A data-model type that can be moved through the gateway.
///
/// Models expose their properties positionally through the schema table.
/// `set` must accept the typed null for a property (the model keeps its
/// own null representation internally).
pub trait DataModel: Default + Send + 'static {
    /// The fixed schema table for this model type, built once.
    fn schema() -> &'static ModelSchema;

    /// Read the property at `position`.
    fn get(&self, position: usize) -> FieldValue;

    /// Write the property at `position`. Fails if the value's type does
    /// not match the declared property type.
    fn set(&mut self, position: usize, value: FieldValue) -> Result<()>;
}

/// Check a value against a declared property type, producing the error a
/// model `set` implementation should raise on mismatch.
pub fn check_assignable(
    model: &str,
    property: &PropertyDef,
    value: &FieldValue,
) -> Result<()> {
    if value.field_type() != property.field_type {
        return Err(GateError::column(
            property.name.clone(),
            format!(
                "cannot assign {} value to {} property of model '{}'",
                value.field_type(),
                property.field_type,
                model
            ),
        ));
    }
    Ok(())
}
