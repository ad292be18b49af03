//! # graphbridge-core
//!
//! The marshalling core of graphbridge - THE LOGIC.
//!
//! This crate lets a caller in another runtime run operations against a graph
//! engine and receive results as generic values (scalars, ordered mappings,
//! sequences) that need no engine type definitions on the caller side.
//!
//! ## Components
//!
//! - `registry` → exact type tag to serializer mapping, plus the name catalog
//! - `codec` → the closed element seed encoder
//! - `dispatch` → operation classification and outcome normalization
//! - `bridge` → lazy, pull-based serialization of result streams
//!
//! ## Architectural Constraints
//!
//! - Synchronous call/response: nothing runs in the background
//! - Has NO async, NO network dependencies (pure Rust)
//! - Results stream in source order with one element of lookahead
//! - Engine resources held by a stream are released exactly once

// =============================================================================
// MODULES
// =============================================================================

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod estimator;
pub mod memory;
pub mod primitives;
pub mod registry;
pub mod serializers;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BridgeError, CustomValue, DirectedType, EdgeSeed, Element, ElementKey, ElementSeed,
    EngineValue, EntitySeed, GenericValue, ResolutionKind, Status, TypeTag, User,
};

// =============================================================================
// RE-EXPORTS: Marshalling
// =============================================================================

pub use bridge::{ResultBridge, ResultStream};
pub use codec::ElementSeedSerializer;
pub use dispatch::{Capability, DispatchOutcome, EngineOutput, GraphEngine, OperationDispatcher};
pub use estimator::CardinalityEstimator;
pub use registry::{SerializerCatalog, SerializerRegistry};
pub use serializers::{CardinalityEstimatorSerializer, ElementMapSerializer, Serializer};

// =============================================================================
// RE-EXPORTS: Session & Engine
// =============================================================================

pub use config::{BridgeConfig, read_bounded};
pub use memory::{ElementDescriptor, MemoryGraph, MemoryOperation};
pub use session::{GraphSession, RegistrationEntry, RegistrationReport};
