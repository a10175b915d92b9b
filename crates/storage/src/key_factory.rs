//! Principal key extraction, specialised per key shape.
//!
//! [`key_value_factory`] matches on [`KeyShape`] once, when a table is built,
//! and hands back the factory for that shape. Row access never re-dispatches.

use keystone_core::error::{KeystoneError, KeystoneResult};
use keystone_core::metadata::{KeyDescriptor, KeyProperty, KeyShape};
use keystone_core::value::{KeyValue, PrincipalKey, Row, Value};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Builds principal keys for one key descriptor.
pub trait KeyValueFactory: Send + Sync + fmt::Debug {
    /// Descriptor this factory was built for.
    fn descriptor(&self) -> &KeyDescriptor;

    /// Extract the principal key from a full row.
    fn key_from_row(&self, row: &Row) -> KeystoneResult<PrincipalKey>;

    /// Build the principal key from key values in component order.
    fn key_from_values(&self, values: &[Value]) -> KeystoneResult<PrincipalKey>;
}

/// Pick the factory matching the descriptor's shape.
///
/// Fails with [`KeystoneError::Configuration`] when the key has no
/// properties or uses a type that cannot be a key.
pub fn key_value_factory(descriptor: &KeyDescriptor) -> KeystoneResult<Arc<dyn KeyValueFactory>> {
    if descriptor.properties().is_empty() {
        return Err(KeystoneError::configuration(format!(
            "primary key of entity type '{}' has no properties",
            descriptor.entity()
        )));
    }
    for property in descriptor.properties() {
        if !property.scalar_type.is_key_compatible() {
            return Err(KeystoneError::configuration(format!(
                "key property '{}.{}' has type {}, which cannot be used in a key",
                descriptor.entity(),
                property.name,
                property.scalar_type
            )));
        }
    }

    let factory: Arc<dyn KeyValueFactory> = match descriptor.shape() {
        KeyShape::Single(_) => Arc::new(SimpleKeyValueFactory::new(descriptor.clone())),
        KeyShape::Composite(_) => Arc::new(CompositeKeyValueFactory::new(descriptor.clone())),
    };
    Ok(factory)
}

fn component(
    descriptor: &KeyDescriptor,
    property: &KeyProperty,
    value: Option<&Value>,
) -> KeystoneResult<KeyValue> {
    let value = match value {
        None | Some(Value::Null) => {
            return Err(KeystoneError::invalid_value(
                descriptor.entity(),
                &property.name,
                "key property has no value",
            ))
        }
        Some(v) => v,
    };

    match KeyValue::from_value(value) {
        Some(kv) if kv.scalar_type() == property.scalar_type => Ok(kv),
        _ => Err(KeystoneError::invalid_value(
            descriptor.entity(),
            &property.name,
            format!("expected {} key value", property.scalar_type),
        )),
    }
}

fn check_arity(descriptor: &KeyDescriptor, values: &[Value]) -> KeystoneResult<()> {
    let expected = descriptor.properties().len();
    if values.len() != expected {
        return Err(KeystoneError::invalid_value(
            descriptor.entity(),
            "<key>",
            format!("expected {} key values, got {}", expected, values.len()),
        ));
    }
    Ok(())
}

/// Factory for keys made of one property.
#[derive(Debug, Clone)]
pub struct SimpleKeyValueFactory {
    descriptor: KeyDescriptor,
}

impl SimpleKeyValueFactory {
    fn new(descriptor: KeyDescriptor) -> Self {
        Self { descriptor }
    }

    fn property(&self) -> &KeyProperty {
        &self.descriptor.properties()[0]
    }
}

impl KeyValueFactory for SimpleKeyValueFactory {
    fn descriptor(&self) -> &KeyDescriptor {
        &self.descriptor
    }

    fn key_from_row(&self, row: &Row) -> KeystoneResult<PrincipalKey> {
        let property = self.property();
        component(&self.descriptor, property, row.get(&property.name)).map(PrincipalKey::Single)
    }

    fn key_from_values(&self, values: &[Value]) -> KeystoneResult<PrincipalKey> {
        check_arity(&self.descriptor, values)?;
        component(&self.descriptor, self.property(), values.first()).map(PrincipalKey::Single)
    }
}

/// Factory for keys made of several properties.
#[derive(Debug, Clone)]
pub struct CompositeKeyValueFactory {
    descriptor: KeyDescriptor,
}

impl CompositeKeyValueFactory {
    fn new(descriptor: KeyDescriptor) -> Self {
        Self { descriptor }
    }
}

impl KeyValueFactory for CompositeKeyValueFactory {
    fn descriptor(&self) -> &KeyDescriptor {
        &self.descriptor
    }

    fn key_from_row(&self, row: &Row) -> KeystoneResult<PrincipalKey> {
        let components = self
            .descriptor
            .properties()
            .iter()
            .map(|p| component(&self.descriptor, p, row.get(&p.name)))
            .collect::<KeystoneResult<SmallVec<[KeyValue; 4]>>>()?;
        Ok(PrincipalKey::Composite(components))
    }

    fn key_from_values(&self, values: &[Value]) -> KeystoneResult<PrincipalKey> {
        check_arity(&self.descriptor, values)?;
        let components = self
            .descriptor
            .properties()
            .iter()
            .zip(values)
            .map(|(p, v)| component(&self.descriptor, p, Some(v)))
            .collect::<KeystoneResult<SmallVec<[KeyValue; 4]>>>()?;
        Ok(PrincipalKey::Composite(components))
    }
}
