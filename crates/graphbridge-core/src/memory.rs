//! # In-Memory Reference Engine
//!
//! A small element store implementing [`GraphEngine`], used by the CLI and the
//! integration tests.
//!
//! ## Operations
//!
//! Operations are JSON documents tagged by `"class"`:
//!
//! | Operation | Capability | Result |
//! |-----------|------------|--------|
//! | `AddElements { input }` | Input | status |
//! | `GetAllElements { groups? }` | Output | stream of elements |
//! | `GetElements { input, groups? }` | Output | stream of elements |
//! | `GetAdjacentIds { input }` | Output | stream of entity seeds |
//! | `CountAllElements` | Output | count |
//! | `EstimateVertexCount` | Output | cardinality estimator |
//! | `GetGraphProperties` | Output | engine properties (never serialized) |
//! | `DeleteAllData` | Effect | status |
//!
//! ## Scans
//!
//! Every stream is a lazy cursor over a snapshot of the store taken when the
//! operation ran. Writes never disturb open scans. A scan counts as open until
//! its stream is exhausted, closed or dropped (see [`MemoryGraph::open_scans`]).

use crate::bridge::ResultStream;
use crate::codec;
use crate::dispatch::{Capability, EngineOutput, GraphEngine};
use crate::estimator::CardinalityEstimator;
use crate::types::{
    BridgeError, DirectedType, EdgeSeed, Element, ElementKey, ElementSeed, EngineValue,
    EntitySeed, GenericValue, User,
};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// OPERATIONS
// =============================================================================

/// An element as supplied to `AddElements`, in the raw `"class"` form.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "class")]
pub enum ElementDescriptor {
    Entity {
        group: String,
        vertex: GenericValue,
        #[serde(default)]
        properties: BTreeMap<String, GenericValue>,
    },
    Edge {
        group: String,
        source: GenericValue,
        destination: GenericValue,
        #[serde(default = "directed_by_default")]
        directed: bool,
        #[serde(default)]
        properties: BTreeMap<String, GenericValue>,
    },
}

fn directed_by_default() -> bool {
    true
}

impl ElementDescriptor {
    fn into_element(self) -> Result<Element, BridgeError> {
        let (group, key, properties) = match self {
            Self::Entity {
                group,
                vertex,
                properties,
            } => (
                group,
                ElementKey::Entity {
                    vertex: EngineValue::from_generic(&vertex),
                },
                properties,
            ),
            Self::Edge {
                group,
                source,
                destination,
                directed,
                properties,
            } => (
                group,
                ElementKey::Edge {
                    source: EngineValue::from_generic(&source),
                    destination: EngineValue::from_generic(&destination),
                    directed,
                },
                properties,
            ),
        };

        if group.is_empty() {
            return Err(BridgeError::EngineExecution(
                "element group must not be empty".to_string(),
            ));
        }

        Ok(Element {
            group,
            key,
            properties: properties
                .iter()
                .map(|(name, value)| (name.clone(), EngineValue::from_generic(value)))
                .collect(),
        })
    }
}

/// Operations understood by [`MemoryGraph`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "class")]
pub enum MemoryOperation {
    AddElements {
        input: Vec<ElementDescriptor>,
    },
    GetAllElements {
        #[serde(default)]
        groups: BTreeSet<String>,
    },
    GetElements {
        #[serde(deserialize_with = "seeds")]
        input: Vec<ElementSeed>,
        #[serde(default)]
        groups: BTreeSet<String>,
    },
    GetAdjacentIds {
        #[serde(deserialize_with = "seeds")]
        input: Vec<ElementSeed>,
    },
    CountAllElements,
    EstimateVertexCount,
    GetGraphProperties,
    DeleteAllData,
}

fn seeds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ElementSeed>, D::Error> {
    let raw = Vec::<GenericValue>::deserialize(deserializer)?;
    raw.iter()
        .map(|value| codec::decode(value).map_err(serde::de::Error::custom))
        .collect()
}

// =============================================================================
// SEED MATCHING
// =============================================================================

fn in_groups(element: &Element, groups: &BTreeSet<String>) -> bool {
    groups.is_empty() || groups.contains(&element.group)
}

fn directed_filter(value: &EngineValue) -> DirectedType {
    match value {
        EngineValue::Directed(directed) => *directed,
        EngineValue::Text(name) => DirectedType::parse(name).unwrap_or(DirectedType::Either),
        _ => DirectedType::Either,
    }
}

fn entity_seed_matches(seed: &EntitySeed, element: &Element) -> bool {
    match &element.key {
        ElementKey::Entity { vertex } => *vertex == seed.vertex,
        ElementKey::Edge {
            source,
            destination,
            ..
        } => *source == seed.vertex || *destination == seed.vertex,
    }
}

fn edge_seed_matches(seed: &EdgeSeed, element: &Element) -> bool {
    let ElementKey::Edge {
        source,
        destination,
        directed,
    } = &element.key
    else {
        return false;
    };

    let wanted = match directed_filter(&seed.directed_type) {
        DirectedType::Directed => *directed,
        DirectedType::Undirected => !*directed,
        DirectedType::Either => true,
    };
    let forward = *source == seed.source && *destination == seed.destination;
    let reverse = !*directed && *source == seed.destination && *destination == seed.source;

    wanted && (forward || reverse)
}

fn seed_matches(seed: &ElementSeed, element: &Element) -> bool {
    match seed {
        ElementSeed::Entity(seed) => entity_seed_matches(seed, element),
        ElementSeed::Edge(seed) => edge_seed_matches(seed, element),
    }
}

/// The vertex on the other side of an edge touching one of `vertices`.
fn adjacent_vertex(vertices: &[EngineValue], element: &Element) -> Option<EngineValue> {
    let ElementKey::Edge {
        source,
        destination,
        ..
    } = &element.key
    else {
        return None;
    };

    if vertices.contains(source) {
        Some(destination.clone())
    } else if vertices.contains(destination) {
        Some(source.clone())
    } else {
        None
    }
}

// =============================================================================
// SCAN
// =============================================================================

/// Lazy cursor over a store snapshot.
struct Scan<F> {
    snapshot: Arc<Vec<Element>>,
    position: usize,
    select: F,
}

impl<F> Iterator for Scan<F>
where
    F: FnMut(&Element) -> Option<EngineValue>,
{
    type Item = EngineValue;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(element) = self.snapshot.get(self.position) {
            self.position += 1;
            if let Some(value) = (self.select)(element) {
                return Some(value);
            }
        }
        None
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// In-memory graph engine.
#[derive(Debug)]
pub struct MemoryGraph {
    elements: RwLock<Arc<Vec<Element>>>,
    properties: BTreeMap<String, String>,
    open_scans: Arc<AtomicUsize>,
}

impl MemoryGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new(graph_id: impl Into<String>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("graphId".to_string(), graph_id.into());
        Self {
            elements: RwLock::new(Arc::new(Vec::new())),
            properties,
            open_scans: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Builder-style graph property setter.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Number of stored elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.read().len()
    }

    /// Number of scans whose resources have not been released yet.
    #[must_use]
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }

    /// Store elements. Either all are stored or none is.
    pub fn add_elements(&self, input: Vec<ElementDescriptor>) -> Result<usize, BridgeError> {
        let batch = input
            .into_iter()
            .map(ElementDescriptor::into_element)
            .collect::<Result<Vec<_>, _>>()?;
        let added = batch.len();

        let mut guard = self.elements.write();
        Arc::make_mut(&mut *guard).extend(batch);
        Ok(added)
    }

    /// Remove every element.
    pub fn clear(&self) {
        *self.elements.write() = Arc::new(Vec::new());
    }

    fn snapshot(&self) -> Arc<Vec<Element>> {
        Arc::clone(&*self.elements.read())
    }

    fn open_scan<F>(&self, select: F) -> ResultStream
    where
        F: FnMut(&Element) -> Option<EngineValue> + Send + 'static,
    {
        let open = Arc::clone(&self.open_scans);
        let opened = open.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("opened scan ({} open)", opened);

        let scan = Scan {
            snapshot: self.snapshot(),
            position: 0,
            select,
        };
        ResultStream::with_release(scan, move || {
            open.fetch_sub(1, Ordering::SeqCst);
        })
    }

    fn estimate_vertex_count(&self) -> CardinalityEstimator {
        let mut estimator = CardinalityEstimator::new();
        for element in self.snapshot().iter() {
            match &element.key {
                ElementKey::Entity { vertex } => estimator.offer(vertex.to_generic().to_string()),
                ElementKey::Edge {
                    source,
                    destination,
                    ..
                } => {
                    estimator.offer(source.to_generic().to_string());
                    estimator.offer(destination.to_generic().to_string());
                }
            }
        }
        estimator
    }
}

impl GraphEngine for MemoryGraph {
    type Operation = MemoryOperation;

    fn classify(&self, operation: &MemoryOperation) -> Capability {
        match operation {
            MemoryOperation::AddElements { .. } => Capability::Input,
            MemoryOperation::DeleteAllData => Capability::Effect,
            _ => Capability::Output,
        }
    }

    fn execute_output(
        &self,
        operation: MemoryOperation,
        user: &User,
    ) -> Result<EngineOutput, BridgeError> {
        tracing::debug!(user = %user.user_id, "memory graph read");

        match operation {
            MemoryOperation::GetAllElements { groups } => Ok(EngineOutput::Stream(
                self.open_scan(move |element| {
                    in_groups(element, &groups).then(|| EngineValue::from(element.clone()))
                }),
            )),
            MemoryOperation::GetElements { input, groups } => Ok(EngineOutput::Stream(
                self.open_scan(move |element| {
                    (in_groups(element, &groups) && input.iter().any(|s| seed_matches(s, element)))
                        .then(|| EngineValue::from(element.clone()))
                }),
            )),
            MemoryOperation::GetAdjacentIds { input } => {
                let vertices: Vec<EngineValue> = input
                    .into_iter()
                    .filter_map(|seed| match seed {
                        ElementSeed::Entity(EntitySeed { vertex }) => Some(vertex),
                        ElementSeed::Edge(_) => None,
                    })
                    .collect();
                Ok(EngineOutput::Stream(self.open_scan(move |element| {
                    adjacent_vertex(&vertices, element)
                        .map(|vertex| EngineValue::from(ElementSeed::entity(vertex)))
                })))
            }
            MemoryOperation::CountAllElements => {
                let count = i64::try_from(self.element_count()).map_err(|_| {
                    BridgeError::EngineExecution("element count overflows a long".to_string())
                })?;
                Ok(EngineOutput::Value(EngineValue::Long(count)))
            }
            MemoryOperation::EstimateVertexCount => Ok(EngineOutput::Value(EngineValue::from(
                self.estimate_vertex_count(),
            ))),
            MemoryOperation::GetGraphProperties => Ok(EngineOutput::Value(
                EngineValue::Properties(self.properties.clone()),
            )),
            other => Err(BridgeError::EngineExecution(format!(
                "{:?} does not produce a result",
                other
            ))),
        }
    }

    fn execute_effect(&self, operation: MemoryOperation, user: &User) -> Result<(), BridgeError> {
        tracing::debug!(user = %user.user_id, "memory graph write");

        match operation {
            MemoryOperation::AddElements { input } => {
                let added = self.add_elements(input)?;
                tracing::info!("added {} elements", added);
                Ok(())
            }
            MemoryOperation::DeleteAllData => {
                self.clear();
                tracing::info!("deleted all data");
                Ok(())
            }
            other => Err(BridgeError::EngineExecution(format!(
                "{:?} is not an effect operation",
                other
            ))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
