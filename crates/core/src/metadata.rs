//! Entity metadata model.
//!
//! An [`EntityType`] names a persistable kind, declares its properties, an
//! optional primary key and the seed rows that must exist once its storage is
//! first provisioned. A [`Model`] is the ordered set of entity types a context
//! works with. Both are immutable after construction.

use crate::error::{KeystoneError, KeystoneResult};
use crate::value::{Row, ScalarType, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// A declared property of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Declared scalar type
    pub scalar_type: ScalarType,
    /// Whether `Value::Null` is accepted
    pub nullable: bool,
}

/// One component of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyProperty {
    /// Property name
    pub name: String,
    /// Declared scalar type
    pub scalar_type: ScalarType,
}

/// Static shape of a primary key, used to pick the key-value factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyShape {
    /// One key property
    Single(ScalarType),
    /// Several key properties, in declaration order
    Composite(Vec<ScalarType>),
}

/// Primary key of an entity type.
///
/// Equality and hashing cover the owning entity and the ordered key
/// properties, so the descriptor doubles as the identity of the in-memory
/// table that stores the entity's rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyDescriptor {
    entity: String,
    properties: Vec<KeyProperty>,
}

impl KeyDescriptor {
    /// Create a descriptor for `entity` over the given key properties.
    pub fn new(entity: impl Into<String>, properties: Vec<KeyProperty>) -> Self {
        Self {
            entity: entity.into(),
            properties,
        }
    }

    /// Name of the entity type declaring this key.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Key properties in declaration order.
    pub fn properties(&self) -> &[KeyProperty] {
        &self.properties
    }

    /// Shape of the key.
    pub fn shape(&self) -> KeyShape {
        match self.properties.as_slice() {
            [single] => KeyShape::Single(single.scalar_type),
            many => KeyShape::Composite(many.iter().map(|p| p.scalar_type).collect()),
        }
    }
}

/// A persistable kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityType {
    name: String,
    properties: Vec<Property>,
    primary_key: Option<KeyDescriptor>,
    container: Option<String>,
    seed: Vec<Row>,
}

impl EntityType {
    /// Start building an entity type.
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    /// Entity type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared properties.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Look up a property by name.
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Primary key, if one was declared.
    pub fn primary_key(&self) -> Option<&KeyDescriptor> {
        self.primary_key.as_ref()
    }

    /// Name of the document container backing this entity type.
    ///
    /// Defaults to the entity type name.
    pub fn container_name(&self) -> &str {
        self.container.as_deref().unwrap_or(&self.name)
    }

    /// Seed rows declared for this entity type.
    pub fn seed_data(&self) -> &[Row] {
        &self.seed
    }

    /// Check a row against the declared properties.
    ///
    /// Unknown properties, type mismatches and nulls in non-nullable
    /// properties are rejected. Missing nullable properties are accepted.
    pub fn validate_row(&self, row: &Row) -> KeystoneResult<()> {
        for name in row.keys() {
            if self.find_property(name).is_none() {
                return Err(KeystoneError::invalid_value(
                    &self.name,
                    name,
                    "property is not declared",
                ));
            }
        }

        for property in &self.properties {
            match row.get(&property.name) {
                None | Some(Value::Null) if !property.nullable => {
                    return Err(KeystoneError::invalid_value(
                        &self.name,
                        &property.name,
                        "required property is missing",
                    ));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    if value.scalar_type() != Some(property.scalar_type) {
                        return Err(KeystoneError::invalid_value(
                            &self.name,
                            &property.name,
                            format!("expected {}", property.scalar_type),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Builder for [`EntityType`].
///
/// ```
/// use keystone_core::metadata::EntityType;
/// use keystone_core::value::{row, ScalarType, Value};
///
/// let blog = EntityType::builder("Blog")
///     .property("id", ScalarType::Int)
///     .property("url", ScalarType::String)
///     .key(["id"])
///     .seed(row([("id", Value::Int(1)), ("url", Value::from("a.example"))]))
///     .build()
///     .unwrap();
/// assert_eq!(blog.seed_data().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EntityTypeBuilder {
    name: String,
    properties: Vec<Property>,
    key: Option<Vec<String>>,
    container: Option<String>,
    seed: Vec<Row>,
}

impl EntityTypeBuilder {
    /// Create a builder for an entity type called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            key: None,
            container: None,
            seed: Vec::new(),
        }
    }

    /// Add a required property.
    pub fn property(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            scalar_type,
            nullable: false,
        });
        self
    }

    /// Add a nullable property.
    pub fn nullable_property(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            scalar_type,
            nullable: true,
        });
        self
    }

    /// Declare the primary key, in component order.
    pub fn key<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Override the backing container name.
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container = Some(name.into());
        self
    }

    /// Append a seed row.
    pub fn seed(mut self, row: Row) -> Self {
        self.seed.push(row);
        self
    }

    /// Validate and build the entity type.
    pub fn build(self) -> KeystoneResult<EntityType> {
        if self.name.is_empty() {
            return Err(KeystoneError::configuration(
                "entity type name must not be empty",
            ));
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(KeystoneError::configuration(format!(
                    "property '{}' is declared twice on entity type '{}'",
                    property.name, self.name
                )));
            }
        }

        let primary_key = match self.key {
            None => None,
            Some(names) if names.is_empty() => {
                return Err(KeystoneError::configuration(format!(
                    "primary key of entity type '{}' has no properties",
                    self.name
                )));
            }
            Some(names) => {
                let mut key_properties = Vec::with_capacity(names.len());
                for name in names {
                    let property = self
                        .properties
                        .iter()
                        .find(|p| p.name == name)
                        .ok_or_else(|| {
                            KeystoneError::configuration(format!(
                                "key property '{}' is not declared on entity type '{}'",
                                name, self.name
                            ))
                        })?;
                    if property.nullable {
                        return Err(KeystoneError::configuration(format!(
                            "key property '{}' on entity type '{}' must not be nullable",
                            name, self.name
                        )));
                    }
                    key_properties.push(KeyProperty {
                        name,
                        scalar_type: property.scalar_type,
                    });
                }
                Some(KeyDescriptor::new(self.name.clone(), key_properties))
            }
        };

        let entity = EntityType {
            name: self.name,
            properties: self.properties,
            primary_key,
            container: self.container,
            seed: self.seed,
        };

        for seed in &entity.seed {
            entity.validate_row(seed)?;
        }

        Ok(entity)
    }
}

/// The set of entity types known to a context.
#[derive(Debug, Clone, Default)]
pub struct Model {
    entity_types: Vec<Arc<EntityType>>,
}

impl Model {
    /// Create a model. Entity type names must be unique.
    pub fn new(entity_types: impl IntoIterator<Item = EntityType>) -> KeystoneResult<Self> {
        let mut seen = HashSet::new();
        let mut types = Vec::new();
        for entity in entity_types {
            if !seen.insert(entity.name().to_string()) {
                return Err(KeystoneError::configuration(format!(
                    "entity type '{}' is declared twice",
                    entity.name()
                )));
            }
            types.push(Arc::new(entity));
        }
        Ok(Self {
            entity_types: types,
        })
    }

    /// Entity types in declaration order.
    pub fn entity_types(&self) -> &[Arc<EntityType>] {
        &self.entity_types
    }

    /// Look up an entity type by name.
    pub fn find_entity_type(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.entity_types.iter().find(|e| e.name() == name)
    }
}
