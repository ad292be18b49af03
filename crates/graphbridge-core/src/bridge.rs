//! # Lazy Result Bridge
//!
//! Serializes an engine result stream one element at a time as the caller pulls.
//!
//! ## Serializer Selection
//!
//! The first element is pulled at construction and its tag picks the
//! serializer for the whole stream. Later elements are serialized with that
//! same serializer even if their own tag differs; when the first element has
//! no serializer, every element is passed through raw.
//!
//! ## Resource Release
//!
//! A [`ResultStream`] owns the engine cursor behind it. The release callback
//! runs exactly once: when the stream is exhausted, when it is closed
//! explicitly, or when it is dropped unfinished.

use crate::registry::SerializerRegistry;
use crate::serializers::Serializer;
use crate::types::{BridgeError, EngineValue, GenericValue};
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

// =============================================================================
// RESULT STREAM
// =============================================================================

type Release = Box<dyn FnOnce() + Send>;

/// One-shot, forward-only sequence of engine values with an owned resource.
pub struct ResultStream {
    source: Option<Box<dyn Iterator<Item = EngineValue> + Send>>,
    release: Option<Release>,
}

impl ResultStream {
    /// Wrap an iterator that holds no releasable resource.
    #[must_use]
    pub fn new(source: impl Iterator<Item = EngineValue> + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            release: None,
        }
    }

    /// Wrap an iterator whose resource is released by `release`.
    #[must_use]
    pub fn with_release(
        source: impl Iterator<Item = EngineValue> + Send + 'static,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            release: Some(Box::new(release)),
        }
    }

    /// A stream over already materialized values.
    #[must_use]
    pub fn from_values(values: Vec<EngineValue>) -> Self {
        Self::new(values.into_iter())
    }

    /// Drop the source and release the resource. Idempotent.
    pub fn close(&mut self) {
        self.source = None;
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Check if the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}

impl Iterator for ResultStream {
    type Item = EngineValue;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.source.as_mut()?.next();
        if next.is_none() {
            self.close();
        }
        next
    }
}

impl FusedIterator for ResultStream {}

impl Drop for ResultStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream")
            .field("closed", &self.is_closed())
            .field("releasable", &self.release.is_some())
            .finish()
    }
}

// =============================================================================
// RESULT BRIDGE
// =============================================================================

/// Pull-based view of a [`ResultStream`] as generic values.
///
/// Single pass and not restartable; once `None` is returned it stays `None`.
pub struct ResultBridge {
    stream: ResultStream,
    lookahead: Option<EngineValue>,
    serializer: Option<Arc<dyn Serializer>>,
    registry: Arc<SerializerRegistry>,
}

impl ResultBridge {
    /// Take ownership of `stream` and select its serializer from the first element.
    #[must_use]
    pub fn new(mut stream: ResultStream, registry: Arc<SerializerRegistry>) -> Self {
        let lookahead = stream.next();
        let serializer = lookahead
            .as_ref()
            .and_then(|first| registry.resolve_for(first));

        match (&lookahead, &serializer) {
            (None, _) => tracing::debug!("result stream is empty"),
            (Some(first), Some(s)) => tracing::debug!(
                "result stream of {} serialized with {}",
                first.type_tag(),
                s.name()
            ),
            (Some(first), None) => tracing::debug!(
                "result stream of {} passed through raw",
                first.type_tag()
            ),
        }

        Self {
            stream,
            lookahead,
            serializer,
            registry,
        }
    }

    /// Name of the serializer fixed for this stream, if one was resolved.
    #[must_use]
    pub fn serializer_name(&self) -> Option<&str> {
        self.serializer.as_deref().map(|s| s.name())
    }

    /// Check if every element has been pulled and the source released.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.lookahead.is_none() && self.stream.is_closed()
    }

    fn convert(&self, value: &EngineValue) -> Result<GenericValue, BridgeError> {
        match &self.serializer {
            Some(serializer) => serializer.serialize(value, &self.registry),
            None => Ok(value.to_generic()),
        }
    }
}

impl Iterator for ResultBridge {
    type Item = Result<GenericValue, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = match self.lookahead.take() {
            Some(first) => first,
            None => self.stream.next()?,
        };
        Some(self.convert(&raw))
    }
}

impl FusedIterator for ResultBridge {}

impl fmt::Debug for ResultBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultBridge")
            .field("serializer", &self.serializer_name())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
