//! # Core Type Definitions
//!
//! This module contains the value model that crosses the runtime boundary:
//! - Type identification (`TypeTag`)
//! - Engine-native values (`EngineValue`, `CustomValue`)
//! - Graph identifiers and elements (`ElementSeed`, `Element`)
//! - Caller identity and effect status (`User`, `Status`)
//! - Error types (`BridgeError`)
//!
//! ## Two Generic Shapes
//!
//! A value reaches the caller either *serialized* (through a registered
//! serializer, e.g. `{"type": "EntitySeed", ...}`) or *raw* (through
//! [`EngineValue::to_generic`], e.g. `{"class": "EntitySeed", ...}`).
//! The raw shape never needs engine type definitions on the caller side either.

use crate::estimator::CardinalityEstimator;
use crate::primitives::{
    CLASS_KEY, DESTINATION, DIRECTED, EDGE, EDGE_SEED, ENTITY, ENTITY_SEED, GROUP, MATCHED_VERTEX,
    PROPERTIES, SOURCE, UNKNOWN_USER_ID, VERTEX,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The universal wire shape: string-keyed ordered mapping, scalar, or sequence.
pub type GenericValue = serde_json::Value;

// =============================================================================
// TYPE TAG
// =============================================================================

/// Stable identifier of a concrete engine type.
///
/// Registry lookups compare tags by exact string equality. There is no
/// notion of a supertype: `EntitySeed` and `EdgeSeed` are unrelated keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const NULL: Self = Self::from_static("Null");
    pub const BOOLEAN: Self = Self::from_static("Boolean");
    pub const LONG: Self = Self::from_static("Long");
    pub const DOUBLE: Self = Self::from_static("Double");
    pub const STRING: Self = Self::from_static("String");
    pub const LIST: Self = Self::from_static("List");
    pub const MAP: Self = Self::from_static("Map");
    pub const DIRECTED_TYPE: Self = Self::from_static("DirectedType");
    pub const ENTITY_SEED: Self = Self::from_static(ENTITY_SEED);
    pub const EDGE_SEED: Self = Self::from_static(EDGE_SEED);
    pub const ENTITY: Self = Self::from_static(ENTITY);
    pub const EDGE: Self = Self::from_static(EDGE);
    pub const CARDINALITY_ESTIMATOR: Self = Self::from_static("CardinalityEstimator");
    pub const PROPERTIES: Self = Self::from_static("Properties");

    /// Every tag produced by a non-custom [`EngineValue`].
    pub const BUILTIN: [Self; 14] = [
        Self::NULL,
        Self::BOOLEAN,
        Self::LONG,
        Self::DOUBLE,
        Self::STRING,
        Self::LIST,
        Self::MAP,
        Self::DIRECTED_TYPE,
        Self::ENTITY_SEED,
        Self::EDGE_SEED,
        Self::ENTITY,
        Self::EDGE,
        Self::CARDINALITY_ESTIMATOR,
        Self::PROPERTIES,
    ];

    /// Create a tag from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a tag from an owned or borrowed name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CUSTOM VALUES
// =============================================================================

/// A user-defined engine type.
///
/// Custom values name their own [`TypeTag`], so a serializer registered
/// for that tag is selected for them like for any built-in value.
pub trait CustomValue: fmt::Debug + Send + Sync {
    /// The exact tag of this value's concrete type.
    fn type_tag(&self) -> TypeTag;

    /// Raw generic form, used when no serializer is registered.
    fn to_generic(&self) -> GenericValue;

    /// Access to the concrete type for serializers that downcast.
    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// DIRECTED TYPE
// =============================================================================

/// Directedness filter carried by an edge seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectedType {
    Directed,
    Undirected,
    Either,
}

impl DirectedType {
    /// Wire name of the directed type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directed => "DIRECTED",
            Self::Undirected => "UNDIRECTED",
            Self::Either => "EITHER",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "DIRECTED" => Some(Self::Directed),
            "UNDIRECTED" => Some(Self::Undirected),
            "EITHER" => Some(Self::Either),
            _ => None,
        }
    }
}

// =============================================================================
// ELEMENT SEEDS
// =============================================================================

/// Identifier of a single vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySeed {
    pub vertex: EngineValue,
}

/// Identifier of an edge between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSeed {
    pub source: EngineValue,
    pub destination: EngineValue,
    pub directed_type: EngineValue,
    pub matched_vertex: EngineValue,
}

/// Compact reference to a graph vertex or edge.
///
/// Constructed by the engine and never mutated by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementSeed {
    Entity(EntitySeed),
    Edge(EdgeSeed),
}

impl ElementSeed {
    /// Create an entity seed.
    #[must_use]
    pub fn entity(vertex: impl Into<EngineValue>) -> Self {
        Self::Entity(EntitySeed {
            vertex: vertex.into(),
        })
    }

    /// Create an edge seed.
    #[must_use]
    pub fn edge(
        source: impl Into<EngineValue>,
        destination: impl Into<EngineValue>,
        directed_type: impl Into<EngineValue>,
        matched_vertex: impl Into<EngineValue>,
    ) -> Self {
        Self::Edge(EdgeSeed {
            source: source.into(),
            destination: destination.into(),
            directed_type: directed_type.into(),
            matched_vertex: matched_vertex.into(),
        })
    }

    /// The exact tag of this seed's variant.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Entity(_) => TypeTag::ENTITY_SEED,
            Self::Edge(_) => TypeTag::EDGE_SEED,
        }
    }

    fn to_generic(&self) -> GenericValue {
        let mut map = serde_json::Map::new();
        match self {
            Self::Entity(seed) => {
                map.insert(CLASS_KEY.into(), ENTITY_SEED.into());
                map.insert(VERTEX.into(), seed.vertex.to_generic());
            }
            Self::Edge(seed) => {
                map.insert(CLASS_KEY.into(), EDGE_SEED.into());
                map.insert(SOURCE.into(), seed.source.to_generic());
                map.insert(DESTINATION.into(), seed.destination.to_generic());
                map.insert(DIRECTED.into(), seed.directed_type.to_generic());
                map.insert(MATCHED_VERTEX.into(), seed.matched_vertex.to_generic());
            }
        }
        GenericValue::Object(map)
    }
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// Identity part of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKey {
    Entity {
        vertex: EngineValue,
    },
    Edge {
        source: EngineValue,
        destination: EngineValue,
        directed: bool,
    },
}

/// A stored graph element: a group, an identity and ordered properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub group: String,
    pub key: ElementKey,
    pub properties: BTreeMap<String, EngineValue>,
}

impl Element {
    /// Create an entity with no properties.
    #[must_use]
    pub fn entity(group: impl Into<String>, vertex: impl Into<EngineValue>) -> Self {
        Self {
            group: group.into(),
            key: ElementKey::Entity {
                vertex: vertex.into(),
            },
            properties: BTreeMap::new(),
        }
    }

    /// Create an edge with no properties.
    #[must_use]
    pub fn edge(
        group: impl Into<String>,
        source: impl Into<EngineValue>,
        destination: impl Into<EngineValue>,
        directed: bool,
    ) -> Self {
        Self {
            group: group.into(),
            key: ElementKey::Edge {
                source: source.into(),
                destination: destination.into(),
                directed,
            },
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<EngineValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The exact tag of this element's kind.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self.key {
            ElementKey::Entity { .. } => TypeTag::ENTITY,
            ElementKey::Edge { .. } => TypeTag::EDGE,
        }
    }

    fn to_generic(&self) -> GenericValue {
        let mut map = serde_json::Map::new();
        match &self.key {
            ElementKey::Entity { vertex } => {
                map.insert(CLASS_KEY.into(), ENTITY.into());
                map.insert(GROUP.into(), self.group.clone().into());
                map.insert(VERTEX.into(), vertex.to_generic());
            }
            ElementKey::Edge {
                source,
                destination,
                directed,
            } => {
                map.insert(CLASS_KEY.into(), EDGE.into());
                map.insert(GROUP.into(), self.group.clone().into());
                map.insert(SOURCE.into(), source.to_generic());
                map.insert(DESTINATION.into(), destination.to_generic());
                map.insert(DIRECTED.into(), (*directed).into());
            }
        }
        let properties = self
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.to_generic()))
            .collect();
        map.insert(PROPERTIES.into(), GenericValue::Object(properties));
        GenericValue::Object(map)
    }
}

// =============================================================================
// ENGINE VALUE
// =============================================================================

/// A value as the graph engine produces it.
///
/// The set of built-in variants is closed; anything else enters through
/// [`EngineValue::Custom`] and identifies itself with its own tag.
#[derive(Debug, Clone)]
pub enum EngineValue {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    Text(String),
    List(Vec<EngineValue>),
    Map(BTreeMap<String, EngineValue>),
    Directed(DirectedType),
    Seed(Box<ElementSeed>),
    Element(Box<Element>),
    Estimator(CardinalityEstimator),
    /// Engine configuration or metadata. Never serialized, only passed through.
    Properties(BTreeMap<String, String>),
    Custom(Arc<dyn CustomValue>),
}

impl EngineValue {
    /// Wrap a user-defined value.
    #[must_use]
    pub fn custom(value: impl CustomValue + 'static) -> Self {
        Self::Custom(Arc::new(value))
    }

    /// The exact tag of this value's concrete type.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Null => TypeTag::NULL,
            Self::Boolean(_) => TypeTag::BOOLEAN,
            Self::Long(_) => TypeTag::LONG,
            Self::Double(_) => TypeTag::DOUBLE,
            Self::Text(_) => TypeTag::STRING,
            Self::List(_) => TypeTag::LIST,
            Self::Map(_) => TypeTag::MAP,
            Self::Directed(_) => TypeTag::DIRECTED_TYPE,
            Self::Seed(seed) => seed.type_tag(),
            Self::Element(element) => element.type_tag(),
            Self::Estimator(_) => TypeTag::CARDINALITY_ESTIMATOR,
            Self::Properties(_) => TypeTag::PROPERTIES,
            Self::Custom(value) => value.type_tag(),
        }
    }

    /// Check if this is the absent value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Raw generic form, without consulting any serializer.
    #[must_use]
    pub fn to_generic(&self) -> GenericValue {
        match self {
            Self::Null => GenericValue::Null,
            Self::Boolean(b) => GenericValue::Bool(*b),
            Self::Long(n) => GenericValue::from(*n),
            // NaN and infinities have no JSON number form.
            Self::Double(d) => {
                serde_json::Number::from_f64(*d).map_or(GenericValue::Null, GenericValue::Number)
            }
            Self::Text(s) => GenericValue::String(s.clone()),
            Self::List(items) => GenericValue::Array(items.iter().map(Self::to_generic).collect()),
            Self::Map(entries) => GenericValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_generic()))
                    .collect(),
            ),
            Self::Directed(directed) => GenericValue::String(directed.as_str().to_string()),
            Self::Seed(seed) => seed.to_generic(),
            Self::Element(element) => element.to_generic(),
            Self::Estimator(estimator) => estimator.to_generic(),
            Self::Properties(properties) => GenericValue::Object(
                properties
                    .iter()
                    .map(|(key, value)| (key.clone(), GenericValue::String(value.clone())))
                    .collect(),
            ),
            Self::Custom(value) => value.to_generic(),
        }
    }

    /// Structural conversion from a generic value.
    ///
    /// Only scalars, sequences and mappings are produced. A mapping that looks
    /// like an encoded seed stays a mapping; use [`crate::codec::decode`] for seeds.
    #[must_use]
    pub fn from_generic(value: &GenericValue) -> Self {
        match value {
            GenericValue::Null => Self::Null,
            GenericValue::Bool(b) => Self::Boolean(*b),
            GenericValue::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Long(i),
                (None, Some(f)) => Self::Double(f),
                (None, None) => Self::Text(n.to_string()),
            },
            GenericValue::String(s) => Self::Text(s.clone()),
            GenericValue::Array(items) => {
                Self::List(items.iter().map(Self::from_generic).collect())
            }
            GenericValue::Object(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_generic(value)))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for EngineValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Directed(a), Self::Directed(b)) => a == b,
            (Self::Seed(a), Self::Seed(b)) => a == b,
            (Self::Element(a), Self::Element(b)) => a == b,
            (Self::Estimator(a), Self::Estimator(b)) => a == b,
            (Self::Properties(a), Self::Properties(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.type_tag() == b.type_tag() && a.to_generic() == b.to_generic())
            }
            _ => false,
        }
    }
}

impl From<bool> for EngineValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for EngineValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<i32> for EngineValue {
    fn from(value: i32) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<&str> for EngineValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EngineValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<EngineValue>> for EngineValue {
    fn from(value: Vec<EngineValue>) -> Self {
        Self::List(value)
    }
}

impl From<DirectedType> for EngineValue {
    fn from(value: DirectedType) -> Self {
        Self::Directed(value)
    }
}

impl From<ElementSeed> for EngineValue {
    fn from(value: ElementSeed) -> Self {
        Self::Seed(Box::new(value))
    }
}

impl From<Element> for EngineValue {
    fn from(value: Element) -> Self {
        Self::Element(Box::new(value))
    }
}

impl From<CardinalityEstimator> for EngineValue {
    fn from(value: CardinalityEstimator) -> Self {
        Self::Estimator(value)
    }
}

// =============================================================================
// CALLER IDENTITY
// =============================================================================

fn unknown_user_id() -> String {
    UNKNOWN_USER_ID.to_string()
}

/// The identity an operation is executed as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default = "unknown_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub data_auths: BTreeSet<String>,
    #[serde(default)]
    pub op_auths: BTreeSet<String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            user_id: unknown_user_id(),
            data_auths: BTreeSet::new(),
            op_auths: BTreeSet::new(),
        }
    }
}

impl User {
    /// Create a user with no authorisations.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Outcome of an operation that declares no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    /// Numeric code seen by the caller: 0 on success, 1 on failure.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Which half of a configuration entry could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    Type,
    Serializer,
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => f.write_str("type"),
            Self::Serializer => f.write_str("serializer"),
        }
    }
}

/// Errors that can occur while marshalling values across the boundary.
///
/// `Decode` and `EngineExecution` are degraded by the compatibility contract
/// of the dispatcher; `UnsupportedVariant` always propagates.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An operation or caller descriptor could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The graph engine failed to execute an operation.
    #[error("Engine execution failed: {0}")]
    EngineExecution(String),

    /// The seed codec was given something other than an entity or edge seed.
    #[error("Unsupported element seed variant: {0}")]
    UnsupportedVariant(TypeTag),

    /// A configured type or serializer name is unknown.
    #[error("Cannot resolve {kind} '{name}'")]
    ConfigurationResolution { kind: ResolutionKind, name: String },

    /// A serializer could not convert a value.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration document is malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
