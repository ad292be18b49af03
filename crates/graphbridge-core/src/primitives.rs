//! # Wire Primitives
//!
//! Fixed names and limits of the generic wire shape.
//!
//! Every key and tag the foreign runtime sees is defined here so the codec,
//! the serializers and the reference engine cannot drift apart.

// =============================================================================
// DISCRIMINANTS
// =============================================================================

/// Discriminant key written by the codec and the element map serializer.
pub const TYPE_KEY: &str = "type";

/// Discriminant key of the raw, engine-native generic form.
///
/// Values that reach the caller without a serializer carry `"class"`
/// instead of `"type"`, so the two shapes are never confused.
pub const CLASS_KEY: &str = "class";

/// Tag for the entity seed variant.
pub const ENTITY_SEED: &str = "EntitySeed";

/// Tag for the edge seed variant.
pub const EDGE_SEED: &str = "EdgeSeed";

/// Tag for an entity element.
pub const ENTITY: &str = "Entity";

/// Tag for an edge element.
pub const EDGE: &str = "Edge";

// =============================================================================
// FIELD NAMES
// =============================================================================

/// Vertex field of an entity seed or entity.
pub const VERTEX: &str = "vertex";

/// Source field of an edge seed or edge.
pub const SOURCE: &str = "source";

/// Destination field of an edge seed or edge.
pub const DESTINATION: &str = "destination";

/// Directed-type field of an edge seed (the field is named `directed` on the wire).
pub const DIRECTED: &str = "directed";

/// Matched-vertex field of an edge seed.
pub const MATCHED_VERTEX: &str = "matchedVertex";

/// Group field of an element.
pub const GROUP: &str = "group";

/// Properties field of an element.
pub const PROPERTIES: &str = "properties";

// =============================================================================
// SERIALIZER NAMES
// =============================================================================

/// Catalog name of the cardinality estimator serializer.
pub const CARDINALITY_ESTIMATOR_SERIALIZER: &str = "CardinalityEstimatorSerializer";

/// Catalog name of the element seed serializer.
pub const ELEMENT_SEED_SERIALIZER: &str = "ElementSeedSerializer";

/// Catalog name of the element map serializer.
pub const ELEMENT_MAP_SERIALIZER: &str = "ElementMapSerializer";

// =============================================================================
// LIMITS & DEFAULTS
// =============================================================================

/// Number of minimum hashes a cardinality estimator retains by default.
pub const DEFAULT_SKETCH_CAPACITY: usize = 256;

/// Smallest capacity a cardinality estimator accepts.
///
/// The estimate divides by the k-th minimum, which needs k >= 2.
pub const MIN_SKETCH_CAPACITY: usize = 2;

/// Caller identity used when a descriptor names no user.
pub const UNKNOWN_USER_ID: &str = "UNKNOWN";

/// Maximum size of a configuration file (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

