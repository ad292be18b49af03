//! # Serializer Registry
//!
//! Maps exact type tags to serializers, plus the startup-time catalog that
//! turns configured names into tags and serializer instances.
//!
//! ## Concurrency
//!
//! The registry is shared by a session and every stream it produces.
//! Reads take a shared lock, registration takes the exclusive lock.
//! Resolved serializers are cloned out of the map, so no lock is held while
//! a serializer runs (serializers may call back into the registry).
//!
//! ## Lookup Rules
//!
//! - One serializer per tag; registering a tag again replaces the previous one
//! - Lookups are exact: a serializer for `EntitySeed` never answers for `EdgeSeed`
//! - A missing serializer is `None`, not an error

use crate::codec::ElementSeedSerializer;
use crate::primitives::{
    CARDINALITY_ESTIMATOR_SERIALIZER, ELEMENT_MAP_SERIALIZER, ELEMENT_SEED_SERIALIZER,
};
use crate::serializers::{CardinalityEstimatorSerializer, ElementMapSerializer, Serializer};
use crate::types::{BridgeError, EngineValue, GenericValue, ResolutionKind, TypeTag};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// REGISTRY
// =============================================================================

/// Session-scoped mapping from type tag to serializer.
#[derive(Debug, Default)]
pub struct SerializerRegistry {
    serializers: RwLock<BTreeMap<TypeTag, Arc<dyn Serializer>>>,
}

impl SerializerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in serializers.
    ///
    /// - `EntitySeed`, `EdgeSeed` → [`ElementSeedSerializer`]
    /// - `Entity`, `Edge` → [`ElementMapSerializer`]
    /// - `CardinalityEstimator` → [`CardinalityEstimatorSerializer`]
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let seeds: Arc<dyn Serializer> = Arc::new(ElementSeedSerializer);
        let elements: Arc<dyn Serializer> = Arc::new(ElementMapSerializer);
        registry.register(TypeTag::ENTITY_SEED, Arc::clone(&seeds));
        registry.register(TypeTag::EDGE_SEED, seeds);
        registry.register(TypeTag::ENTITY, Arc::clone(&elements));
        registry.register(TypeTag::EDGE, elements);
        registry.register(
            TypeTag::CARDINALITY_ESTIMATOR,
            Arc::new(CardinalityEstimatorSerializer),
        );
        registry
    }

    /// Register `serializer` for `tag`, replacing any previous one.
    ///
    /// Returns the replaced serializer, if any.
    pub fn register(
        &self,
        tag: TypeTag,
        serializer: Arc<dyn Serializer>,
    ) -> Option<Arc<dyn Serializer>> {
        let name = serializer.name().to_string();
        let previous = self.serializers.write().insert(tag.clone(), serializer);
        match &previous {
            Some(old) => tracing::debug!(
                "replaced serializer for {}: {} -> {}",
                tag,
                old.name(),
                name
            ),
            None => tracing::debug!("registered serializer {} for {}", name, tag),
        }
        previous
    }

    /// Resolve names through `catalog` and register the result.
    ///
    /// Unknown names are reported here, never deferred to first use.
    pub fn register_named(
        &self,
        catalog: &SerializerCatalog,
        type_name: &str,
        serializer_name: &str,
    ) -> Result<TypeTag, BridgeError> {
        let (tag, serializer) = catalog.resolve(type_name, serializer_name)?;
        if !serializer.can_handle(&tag) {
            tracing::warn!(
                "serializer {} does not declare support for {}; registering anyway",
                serializer.name(),
                tag
            );
        }
        self.register(tag.clone(), serializer);
        Ok(tag)
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn resolve(&self, tag: &TypeTag) -> Option<Arc<dyn Serializer>> {
        self.serializers.read().get(tag).cloned()
    }

    /// Lookup by the tag of `value`.
    #[must_use]
    pub fn resolve_for(&self, value: &EngineValue) -> Option<Arc<dyn Serializer>> {
        self.resolve(&value.type_tag())
    }

    /// Serialize `value` with its registered serializer, or return its raw form.
    pub fn serialize_value(&self, value: &EngineValue) -> Result<GenericValue, BridgeError> {
        match self.resolve_for(value) {
            Some(serializer) => serializer.serialize(value, self),
            None => Ok(value.to_generic()),
        }
    }

    /// Check if a serializer is registered for `tag`.
    #[must_use]
    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.serializers.read().contains_key(tag)
    }

    /// Number of registered tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.serializers.read().len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.serializers.read().is_empty()
    }

    /// All registered tags in deterministic order.
    #[must_use]
    pub fn registered_tags(&self) -> Vec<TypeTag> {
        self.serializers.read().keys().cloned().collect()
    }
}

// =============================================================================
// CATALOG
// =============================================================================

type SerializerFactory = Box<dyn Fn() -> Arc<dyn Serializer> + Send + Sync>;

/// Startup-time table of the type and serializer names configuration may use.
///
/// Configuration refers to types and serializers by stable string names;
/// the catalog is the only place those names are resolved.
pub struct SerializerCatalog {
    types: BTreeMap<String, TypeTag>,
    serializers: BTreeMap<String, SerializerFactory>,
}

impl Default for SerializerCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for SerializerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerCatalog")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("serializers", &self.serializers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SerializerCatalog {
    /// A catalog that knows no names.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
            serializers: BTreeMap::new(),
        }
    }

    /// A catalog with every built-in tag and serializer.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for tag in TypeTag::BUILTIN {
            catalog.declare_type(tag);
        }
        catalog.define_serializer(CARDINALITY_ESTIMATOR_SERIALIZER, || {
            Arc::new(CardinalityEstimatorSerializer)
        });
        catalog.define_serializer(ELEMENT_SEED_SERIALIZER, || Arc::new(ElementSeedSerializer));
        catalog.define_serializer(ELEMENT_MAP_SERIALIZER, || Arc::new(ElementMapSerializer));
        catalog
    }

    /// Make a custom type nameable by configuration.
    pub fn declare_type(&mut self, tag: TypeTag) {
        self.types.insert(tag.as_str().to_string(), tag);
    }

    /// Make a serializer constructible by name.
    pub fn define_serializer<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Serializer> + Send + Sync + 'static,
    {
        self.serializers.insert(name.into(), Box::new(factory));
    }

    /// Resolve a type name.
    pub fn resolve_type(&self, type_name: &str) -> Result<TypeTag, BridgeError> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| BridgeError::ConfigurationResolution {
                kind: ResolutionKind::Type,
                name: type_name.to_string(),
            })
    }

    /// Build a fresh serializer by name.
    pub fn instantiate(&self, serializer_name: &str) -> Result<Arc<dyn Serializer>, BridgeError> {
        self.serializers
            .get(serializer_name)
            .map(|factory| factory())
            .ok_or_else(|| BridgeError::ConfigurationResolution {
                kind: ResolutionKind::Serializer,
                name: serializer_name.to_string(),
            })
    }

    /// Resolve both halves of a configuration entry. The type is checked first.
    pub fn resolve(
        &self,
        type_name: &str,
        serializer_name: &str,
    ) -> Result<(TypeTag, Arc<dyn Serializer>), BridgeError> {
        let tag = self.resolve_type(type_name)?;
        let serializer = self.instantiate(serializer_name)?;
        Ok((tag, serializer))
    }
}

// =============================================================================
// TESTS
// =============================================================================
