//! # Element Seed Codec
//!
//! Encodes the two element seed variants into a tagged generic mapping:
//!
//! ```text
//! {"type": "EntitySeed", "vertex": ...}
//! {"type": "EdgeSeed", "source": ..., "destination": ..., "directed": ..., "matchedVertex": ...}
//! ```
//!
//! Every field value is offered to the registry first. A field whose concrete
//! type has a serializer is stored serialized, anything else is stored raw.
//! The codec is closed: any value that is not one of the two seeds is an
//! [`BridgeError::UnsupportedVariant`], never a partial mapping.

use crate::primitives::{
    DESTINATION, DIRECTED, EDGE_SEED, ELEMENT_SEED_SERIALIZER, ENTITY_SEED, MATCHED_VERTEX, SOURCE,
    TYPE_KEY, VERTEX,
};
use crate::registry::SerializerRegistry;
use crate::serializers::Serializer;
use crate::types::{
    BridgeError, EdgeSeed, ElementSeed, EngineValue, EntitySeed, GenericValue, TypeTag,
};

/// Encode a seed, consulting `registry` for each field.
pub fn encode(
    seed: &ElementSeed,
    registry: &SerializerRegistry,
) -> Result<GenericValue, BridgeError> {
    let mut map = serde_json::Map::new();
    match seed {
        ElementSeed::Entity(EntitySeed { vertex }) => {
            map.insert(TYPE_KEY.into(), ENTITY_SEED.into());
            map.insert(VERTEX.into(), registry.serialize_value(vertex)?);
        }
        ElementSeed::Edge(EdgeSeed {
            source,
            destination,
            directed_type,
            matched_vertex,
        }) => {
            map.insert(TYPE_KEY.into(), EDGE_SEED.into());
            map.insert(SOURCE.into(), registry.serialize_value(source)?);
            map.insert(DESTINATION.into(), registry.serialize_value(destination)?);
            map.insert(DIRECTED.into(), registry.serialize_value(directed_type)?);
            map.insert(MATCHED_VERTEX.into(), registry.serialize_value(matched_vertex)?);
        }
    }
    Ok(GenericValue::Object(map))
}

/// Encode an engine value that must be a seed.
pub fn encode_value(
    value: &EngineValue,
    registry: &SerializerRegistry,
) -> Result<GenericValue, BridgeError> {
    match value {
        EngineValue::Seed(seed) => encode(seed, registry),
        other => Err(BridgeError::UnsupportedVariant(other.type_tag())),
    }
}

/// Rebuild a seed from its encoded form.
///
/// Field values are converted structurally, so a field that was serialized
/// (e.g. an estimator collapsed to a count) comes back as the serialized value.
pub fn decode(value: &GenericValue) -> Result<ElementSeed, BridgeError> {
    let map = value.as_object().ok_or_else(|| {
        BridgeError::Decode(format!("element seed must be a mapping, got {value}"))
    })?;
    let tag = map
        .get(TYPE_KEY)
        .and_then(GenericValue::as_str)
        .ok_or_else(|| BridgeError::Decode(format!("element seed has no '{TYPE_KEY}' field")))?;

    let field = |name: &str| -> Result<EngineValue, BridgeError> {
        map.get(name)
            .map(EngineValue::from_generic)
            .ok_or_else(|| BridgeError::Decode(format!("{tag} is missing '{name}'")))
    };
    // Matched vertex is optional on the wire.
    let optional = |name: &str| {
        map.get(name)
            .map(EngineValue::from_generic)
            .unwrap_or(EngineValue::Null)
    };

    match tag {
        ENTITY_SEED => Ok(ElementSeed::entity(field(VERTEX)?)),
        EDGE_SEED => Ok(ElementSeed::edge(
            field(SOURCE)?,
            field(DESTINATION)?,
            optional(DIRECTED),
            optional(MATCHED_VERTEX),
        )),
        other => Err(BridgeError::UnsupportedVariant(TypeTag::new(other))),
    }
}

// =============================================================================
// SERIALIZER
// =============================================================================

/// Registry entry for seeds; delegates to [`encode_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementSeedSerializer;

impl Serializer for ElementSeedSerializer {
    fn name(&self) -> &str {
        ELEMENT_SEED_SERIALIZER
    }

    fn can_handle(&self, tag: &TypeTag) -> bool {
        *tag == TypeTag::ENTITY_SEED || *tag == TypeTag::EDGE_SEED
    }

    fn serialize(
        &self,
        value: &EngineValue,
        registry: &SerializerRegistry,
    ) -> Result<GenericValue, BridgeError> {
        encode_value(value, registry)
    }
}

// =============================================================================
// TESTS
// =============================================================================
