//! # Graph Session
//!
//! The surface a foreign caller talks to: one engine, one serializer registry,
//! one catalog of configurable names.
//!
//! ```text
//! caller ──execute(op, user)──▶ GraphSession ──▶ OperationDispatcher ──▶ GraphEngine
//!        ◀──DispatchOutcome────              ◀── ResultBridge ◀── SerializerRegistry
//! ```

use crate::config::BridgeConfig;
use crate::dispatch::{DispatchOutcome, GraphEngine, OperationDispatcher};
use crate::registry::{SerializerCatalog, SerializerRegistry};
use crate::types::{BridgeError, GenericValue, TypeTag};
use std::sync::Arc;

// =============================================================================
// REGISTRATION REPORT
// =============================================================================

/// Outcome of one configured registration.
#[derive(Debug)]
pub struct RegistrationEntry {
    pub type_name: String,
    pub serializer_name: String,
    pub result: Result<TypeTag, BridgeError>,
}

impl RegistrationEntry {
    /// Check if the entry was registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-entry outcome of a batch registration, in request order.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    entries: Vec<RegistrationEntry>,
}

impl RegistrationReport {
    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[RegistrationEntry] {
        &self.entries
    }

    /// Number of entries that were registered.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.entries.iter().filter(|e| e.is_registered()).count()
    }

    /// Entries that could not be resolved.
    pub fn failures(&self) -> impl Iterator<Item = &RegistrationEntry> {
        self.entries.iter().filter(|e| !e.is_registered())
    }

    /// Check if every entry was registered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(RegistrationEntry::is_registered)
    }

    /// Turn the report into the first failure, if any.
    pub fn into_result(self) -> Result<(), BridgeError> {
        match self.entries.into_iter().find_map(|e| e.result.err()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A graph engine exposed across the runtime boundary.
pub struct GraphSession<E> {
    dispatcher: OperationDispatcher<E>,
    catalog: SerializerCatalog,
}

impl<E: GraphEngine> GraphSession<E> {
    /// Create a session with the built-in serializers and catalog.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            dispatcher: OperationDispatcher::new(
                engine,
                Arc::new(SerializerRegistry::with_defaults()),
            ),
            catalog: SerializerCatalog::builtin(),
        }
    }

    /// Create a session from configuration, resolving names with the built-in catalog.
    pub fn from_config(engine: E, config: &BridgeConfig) -> (Self, RegistrationReport) {
        Self::with_catalog(engine, SerializerCatalog::builtin(), config)
    }

    /// Create a session from configuration, resolving names with `catalog`.
    pub fn with_catalog(
        engine: E,
        catalog: SerializerCatalog,
        config: &BridgeConfig,
    ) -> (Self, RegistrationReport) {
        let registry = if config.register_defaults {
            SerializerRegistry::with_defaults()
        } else {
            SerializerRegistry::new()
        };
        let session = Self {
            dispatcher: OperationDispatcher::new(engine, Arc::new(registry)),
            catalog,
        };
        let report = session.register_serializers(config.entries());
        (session, report)
    }

    /// Decode and execute an operation under the compatibility contract.
    pub fn execute(&self, operation: &str, user: &str) -> DispatchOutcome {
        self.dispatcher.execute(operation, user)
    }

    /// Decode and execute an operation, returning decode and output failures.
    pub fn try_execute(
        &self,
        operation: &str,
        user: &str,
    ) -> Result<DispatchOutcome, BridgeError> {
        self.dispatcher.try_execute(operation, user)
    }

    /// Execute an operation and collapse its outcome to a generic value.
    ///
    /// Follows the compatibility contract: a result that cannot be serialized
    /// is logged and becomes `null`.
    pub fn execute_generic(&self, operation: &str, user: &str) -> GenericValue {
        match self.execute(operation, user).into_generic(self.registry()) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialize result: {}", e);
                GenericValue::Null
            }
        }
    }

    /// Execute an operation and collapse its outcome to a generic value,
    /// returning decode, output and serialization failures.
    pub fn try_execute_generic(
        &self,
        operation: &str,
        user: &str,
    ) -> Result<GenericValue, BridgeError> {
        self.try_execute(operation, user)?
            .into_generic(self.registry())
    }

    /// Register a serializer by configured names.
    ///
    /// Fails with [`BridgeError::ConfigurationResolution`] when either name is
    /// unknown to the catalog; the registry is left untouched in that case.
    pub fn register_serializer(
        &self,
        type_name: &str,
        serializer_name: &str,
    ) -> Result<TypeTag, BridgeError> {
        let result = self
            .dispatcher
            .registry()
            .register_named(&self.catalog, type_name, serializer_name);
        match &result {
            Ok(tag) => tracing::info!("registered {} for {}", serializer_name, tag),
            Err(e) => tracing::warn!("{}", e),
        }
        result
    }

    /// Register every entry, reporting each outcome.
    pub fn register_serializers<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> RegistrationReport {
        let entries = entries
            .into_iter()
            .map(|(type_name, serializer_name)| RegistrationEntry {
                type_name: type_name.to_string(),
                serializer_name: serializer_name.to_string(),
                result: self.register_serializer(type_name, serializer_name),
            })
            .collect();
        RegistrationReport { entries }
    }

    /// The catalog, for declaring custom types and serializers.
    pub fn catalog_mut(&mut self) -> &mut SerializerCatalog {
        &mut self.catalog
    }

    /// The registry shared with every stream this session produces.
    #[must_use]
    pub fn registry(&self) -> &Arc<SerializerRegistry> {
        self.dispatcher.registry()
    }

    /// The engine behind this session.
    #[must_use]
    pub fn engine(&self) -> &E {
        self.dispatcher.engine()
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for GraphSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSession")
            .field("dispatcher", &self.dispatcher)
            .field("catalog", &self.catalog)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
