//! # Serializers
//!
//! A serializer turns values of one concrete engine type into generic values.
//!
//! Serializers receive the registry they were resolved from, so a serializer
//! for a composite value can ask it about each field (see [`ElementMapSerializer`]
//! and [`crate::codec::ElementSeedSerializer`]).

use crate::primitives::{
    CARDINALITY_ESTIMATOR_SERIALIZER, DESTINATION, DIRECTED, EDGE, ELEMENT_MAP_SERIALIZER, ENTITY,
    GROUP, PROPERTIES, SOURCE, TYPE_KEY, VERTEX,
};
use crate::registry::SerializerRegistry;
use crate::types::{BridgeError, ElementKey, EngineValue, GenericValue, TypeTag};
use std::fmt;

// =============================================================================
// SERIALIZER TRAIT
// =============================================================================

/// Converts values of a concrete engine type into generic values.
///
/// Serializers must be `Send + Sync`: one instance is shared by every stream
/// and every thread reading the registry.
pub trait Serializer: fmt::Debug + Send + Sync {
    /// Name of this serializer, as known to the catalog.
    fn name(&self) -> &str;

    /// Whether this serializer understands values tagged `tag`.
    fn can_handle(&self, tag: &TypeTag) -> bool;

    /// Convert `value` into its generic form.
    fn serialize(
        &self,
        value: &EngineValue,
        registry: &SerializerRegistry,
    ) -> Result<GenericValue, BridgeError>;
}

// =============================================================================
// CARDINALITY ESTIMATOR
// =============================================================================

/// Collapses a cardinality estimator to its estimated count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardinalityEstimatorSerializer;

impl Serializer for CardinalityEstimatorSerializer {
    fn name(&self) -> &str {
        CARDINALITY_ESTIMATOR_SERIALIZER
    }

    fn can_handle(&self, tag: &TypeTag) -> bool {
        *tag == TypeTag::CARDINALITY_ESTIMATOR
    }

    fn serialize(
        &self,
        value: &EngineValue,
        _registry: &SerializerRegistry,
    ) -> Result<GenericValue, BridgeError> {
        match value {
            EngineValue::Estimator(estimator) => Ok(GenericValue::from(estimator.cardinality())),
            other => Err(BridgeError::Serialization(format!(
                "{} cannot serialize a {}",
                CARDINALITY_ESTIMATOR_SERIALIZER,
                other.type_tag()
            ))),
        }
    }
}

// =============================================================================
// ELEMENT MAP
// =============================================================================

/// Converts an entity or edge into a flat tagged mapping.
///
/// Vertices and property values are each serialized through the registry,
/// so e.g. an estimator property arrives as its count.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementMapSerializer;

impl Serializer for ElementMapSerializer {
    fn name(&self) -> &str {
        ELEMENT_MAP_SERIALIZER
    }

    fn can_handle(&self, tag: &TypeTag) -> bool {
        *tag == TypeTag::ENTITY || *tag == TypeTag::EDGE
    }

    fn serialize(
        &self,
        value: &EngineValue,
        registry: &SerializerRegistry,
    ) -> Result<GenericValue, BridgeError> {
        let EngineValue::Element(element) = value else {
            return Err(BridgeError::Serialization(format!(
                "{} cannot serialize a {}",
                ELEMENT_MAP_SERIALIZER,
                value.type_tag()
            )));
        };

        let mut map = serde_json::Map::new();
        match &element.key {
            ElementKey::Entity { vertex } => {
                map.insert(TYPE_KEY.into(), ENTITY.into());
                map.insert(GROUP.into(), element.group.clone().into());
                map.insert(VERTEX.into(), registry.serialize_value(vertex)?);
            }
            ElementKey::Edge {
                source,
                destination,
                directed,
            } => {
                map.insert(TYPE_KEY.into(), EDGE.into());
                map.insert(GROUP.into(), element.group.clone().into());
                map.insert(SOURCE.into(), registry.serialize_value(source)?);
                map.insert(DESTINATION.into(), registry.serialize_value(destination)?);
                map.insert(DIRECTED.into(), (*directed).into());
            }
        }

        let mut properties = serde_json::Map::new();
        for (name, property) in &element.properties {
            properties.insert(name.clone(), registry.serialize_value(property)?);
        }
        map.insert(PROPERTIES.into(), GenericValue::Object(properties));

        Ok(GenericValue::Object(map))
    }
}

// =============================================================================
// TESTS
// =============================================================================
