//! # Operation Dispatcher
//!
//! Decodes an operation and a caller identity, classifies the operation by its
//! declared capability, runs it on the engine and normalizes the outcome.
//!
//! ## Outcome Policy
//!
//! | Capability | Success | Engine failure |
//! |------------|---------|----------------|
//! | Output | `Value(result)` or `Stream(bridge)` | logged, `Value(None)` |
//! | Input | `Status(Success)` | logged, `Status(Failure)` |
//! | Effect | `Status(Success)` | logged, `Status(Failure)` |
//!
//! Decode failures are logged and become `Value(None)`.
//!
//! The table above is the compatibility contract of [`OperationDispatcher::execute`].
//! [`OperationDispatcher::try_execute`] keeps the status codes but returns
//! decode and output failures as errors, so a caller can tell "failed" from
//! "no result".

use crate::bridge::{ResultBridge, ResultStream};
use crate::registry::SerializerRegistry;
use crate::types::{BridgeError, EngineValue, GenericValue, Status, User};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// ENGINE BOUNDARY
// =============================================================================

/// Declared capability of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Produces a result.
    Output,
    /// Consumes input and declares no result.
    Input,
    /// Neither; executed for its side effect only.
    Effect,
}

/// What an output-capable operation returned.
#[derive(Debug)]
pub enum EngineOutput {
    Value(EngineValue),
    Stream(ResultStream),
}

/// The graph engine as seen by the dispatcher.
///
/// Classification is structural: it depends on which operation was decoded,
/// not on the values it carries.
pub trait GraphEngine {
    /// Engine-defined operation descriptor.
    type Operation: DeserializeOwned + fmt::Debug;

    /// Bucket `operation` into exactly one capability.
    fn classify(&self, operation: &Self::Operation) -> Capability;

    /// Execute an output-capable operation.
    fn execute_output(
        &self,
        operation: Self::Operation,
        user: &User,
    ) -> Result<EngineOutput, BridgeError>;

    /// Execute an input-capable or effect-only operation.
    fn execute_effect(&self, operation: Self::Operation, user: &User) -> Result<(), BridgeError>;
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Normalized result of executing one operation.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A single result, passed through unserialized. `None` means no result.
    Value(Option<EngineValue>),
    /// A lazily serialized result sequence.
    Stream(ResultBridge),
    /// Status of an operation that declares no result.
    Status(Status),
}

impl DispatchOutcome {
    /// Status code, if this is a status outcome.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Check if this is the empty value.
    #[must_use]
    pub fn is_empty_value(&self) -> bool {
        matches!(self, Self::Value(None))
    }

    /// The stream, if this is a stream outcome.
    #[must_use]
    pub fn into_stream(self) -> Option<ResultBridge> {
        match self {
            Self::Stream(bridge) => Some(bridge),
            _ => None,
        }
    }

    /// The value, if this is a populated value outcome.
    #[must_use]
    pub fn into_value(self) -> Option<EngineValue> {
        match self {
            Self::Value(value) => value,
            _ => None,
        }
    }

    /// Collapse the outcome into one generic value.
    ///
    /// Streams are drained into a sequence, statuses become their numeric
    /// code and the empty value is `null`. Single values go through
    /// `registry`, except engine properties which always pass through raw.
    ///
    /// The first element or value that cannot be serialized ends the
    /// conversion with its error; a partly drained stream is released.
    pub fn into_generic(self, registry: &SerializerRegistry) -> Result<GenericValue, BridgeError> {
        match self {
            Self::Value(None) => Ok(GenericValue::Null),
            Self::Value(Some(value @ EngineValue::Properties(_))) => Ok(value.to_generic()),
            Self::Value(Some(value)) => registry.serialize_value(&value),
            Self::Stream(bridge) => bridge
                .collect::<Result<Vec<_>, _>>()
                .map(GenericValue::Array),
            Self::Status(status) => Ok(GenericValue::from(status.code())),
        }
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Routes operations to a [`GraphEngine`] and bridges their results.
pub struct OperationDispatcher<E> {
    engine: E,
    registry: Arc<SerializerRegistry>,
}

impl<E: GraphEngine> OperationDispatcher<E> {
    /// Create a dispatcher whose streams serialize through `registry`.
    #[must_use]
    pub fn new(engine: E, registry: Arc<SerializerRegistry>) -> Self {
        Self { engine, registry }
    }

    /// The engine operations run against.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The registry streams serialize through.
    #[must_use]
    pub fn registry(&self) -> &Arc<SerializerRegistry> {
        &self.registry
    }

    /// Decode and execute, degrading failures per the compatibility contract.
    pub fn execute(&self, operation: &str, user: &str) -> DispatchOutcome {
        degrade(self.try_execute(operation, user))
    }

    /// Decode and execute, returning decode and output failures as errors.
    pub fn try_execute(&self, operation: &str, user: &str) -> Result<DispatchOutcome, BridgeError> {
        tracing::info!("received operation : {}", operation);
        tracing::info!("received user : {}", user);

        let (operation, user) = decode(operation, user)?;
        self.try_dispatch(operation, &user)
    }

    /// Execute a decoded operation, degrading failures per the compatibility contract.
    pub fn dispatch(&self, operation: E::Operation, user: &User) -> DispatchOutcome {
        degrade(self.try_dispatch(operation, user))
    }

    /// Execute a decoded operation, returning output failures as errors.
    pub fn try_dispatch(
        &self,
        operation: E::Operation,
        user: &User,
    ) -> Result<DispatchOutcome, BridgeError> {
        let capability = self.engine.classify(&operation);
        tracing::debug!(user = %user.user_id, ?capability, ?operation, "dispatching");

        match capability {
            Capability::Output => {
                tracing::info!("executing Output operation");
                let output = self.engine.execute_output(operation, user)?;
                Ok(self.normalize(output))
            }
            Capability::Input => {
                tracing::info!("executing Input operation");
                Ok(self.run_for_effect(operation, user, "Input operation"))
            }
            Capability::Effect => {
                tracing::info!("executing operation");
                Ok(self.run_for_effect(operation, user, "operation"))
            }
        }
    }

    fn run_for_effect(&self, operation: E::Operation, user: &User, label: &str) -> DispatchOutcome {
        match self.engine.execute_effect(operation, user) {
            Ok(()) => DispatchOutcome::Status(Status::Success),
            Err(e) => {
                tracing::error!("{} failed : {}", label, e);
                DispatchOutcome::Status(Status::Failure)
            }
        }
    }

    fn normalize(&self, output: EngineOutput) -> DispatchOutcome {
        match output {
            EngineOutput::Stream(stream) => {
                DispatchOutcome::Stream(ResultBridge::new(stream, Arc::clone(&self.registry)))
            }
            EngineOutput::Value(EngineValue::Null) => DispatchOutcome::Value(None),
            EngineOutput::Value(EngineValue::List(items)) => DispatchOutcome::Stream(
                ResultBridge::new(ResultStream::from_values(items), Arc::clone(&self.registry)),
            ),
            EngineOutput::Value(value) => DispatchOutcome::Value(Some(value)),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for OperationDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDispatcher")
            .field("engine", &self.engine)
            .field("registered", &self.registry.len())
            .finish()
    }
}

fn decode<O: DeserializeOwned>(operation: &str, user: &str) -> Result<(O, User), BridgeError> {
    let operation = serde_json::from_str(operation)
        .map_err(|e| BridgeError::Decode(format!("operation: {}", e)))?;
    let user =
        serde_json::from_str(user).map_err(|e| BridgeError::Decode(format!("user: {}", e)))?;
    Ok((operation, user))
}

fn degrade(result: Result<DispatchOutcome, BridgeError>) -> DispatchOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("{}", e);
            DispatchOutcome::Value(None)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializers::CardinalityEstimatorSerializer;
    use crate::types::{ElementSeed, TypeTag};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(tag = "op")]
    enum Scripted {
        Produce { value: GenericValue },
        Seeds { vertices: Vec<String> },
        Properties,
        Nothing,
        BrokenOutput,
        Load,
        BrokenLoad,
        Flush,
        BrokenFlush,
    }

    #[derive(Debug)]
    struct ScriptedEngine;

    impl GraphEngine for ScriptedEngine {
        type Operation = Scripted;

        fn classify(&self, operation: &Scripted) -> Capability {
            match operation {
                Scripted::Load | Scripted::BrokenLoad => Capability::Input,
                Scripted::Flush | Scripted::BrokenFlush => Capability::Effect,
                _ => Capability::Output,
            }
        }

        fn execute_output(
            &self,
            operation: Scripted,
            _user: &User,
        ) -> Result<EngineOutput, BridgeError> {
            match operation {
                Scripted::Produce { value } => {
                    Ok(EngineOutput::Value(EngineValue::from_generic(&value)))
                }
                Scripted::Seeds { vertices } => Ok(EngineOutput::Stream(ResultStream::from_values(
                    vertices
                        .into_iter()
                        .map(|v| EngineValue::from(ElementSeed::entity(v)))
                        .collect(),
                ))),
                Scripted::Properties => Ok(EngineOutput::Value(EngineValue::Properties(
                    [("graphId".to_string(), "g1".to_string())].into_iter().collect(),
                ))),
                Scripted::Nothing => Ok(EngineOutput::Value(EngineValue::Null)),
                _ => Err(BridgeError::EngineExecution("boom".into())),
            }
        }

        fn execute_effect(&self, operation: Scripted, _user: &User) -> Result<(), BridgeError> {
            match operation {
                Scripted::Load | Scripted::Flush => Ok(()),
                _ => Err(BridgeError::EngineExecution("boom".into())),
            }
        }
    }

    fn dispatcher() -> OperationDispatcher<ScriptedEngine> {
        OperationDispatcher::new(ScriptedEngine, Arc::new(SerializerRegistry::with_defaults()))
    }

    #[test]
    fn output_success_is_a_value() {
        let outcome = dispatcher().execute(r#"{"op":"Produce","value":7}"#, "{}");
        assert_eq!(outcome.into_value(), Some(EngineValue::Long(7)));
    }

    #[test]
    fn output_failure_is_an_empty_value() {
        let outcome = dispatcher().execute(r#"{"op":"BrokenOutput"}"#, "{}");
        assert!(outcome.is_empty_value());
    }

    #[test]
    fn output_failure_is_an_error_on_the_strict_path() {
        let result = dispatcher().try_execute(r#"{"op":"BrokenOutput"}"#, "{}");
        assert!(matches!(result, Err(BridgeError::EngineExecution(_))));
    }

    #[test]
    fn null_result_is_an_empty_value() {
        let outcome = dispatcher().execute(r#"{"op":"Nothing"}"#, "{}");
        assert!(outcome.is_empty_value());
    }

    #[test]
    fn input_statuses() {
        let d = dispatcher();
        assert_eq!(d.execute(r#"{"op":"Load"}"#, "{}").status(), Some(Status::Success));
        assert_eq!(d.execute(r#"{"op":"BrokenLoad"}"#, "{}").status(), Some(Status::Failure));
    }

    #[test]
    fn effect_statuses() {
        let d = dispatcher();
        assert_eq!(d.execute(r#"{"op":"Flush"}"#, "{}").status(), Some(Status::Success));
        assert_eq!(d.execute(r#"{"op":"BrokenFlush"}"#, "{}").status(), Some(Status::Failure));
    }

    #[test]
    fn effect_failure_is_a_status_even_on_the_strict_path() {
        let outcome = dispatcher()
            .try_execute(r#"{"op":"BrokenFlush"}"#, "{}")
            .expect("status, not error");
        assert_eq!(outcome.status(), Some(Status::Failure));
    }

    #[test]
    fn malformed_operation_degrades_to_empty_value() {
        let d = dispatcher();
        assert!(d.execute("not json", "{}").is_empty_value());
        assert!(d.execute(r#"{"op":"NoSuchOp"}"#, "{}").is_empty_value());
        assert!(matches!(
            d.try_execute("not json", "{}"),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn malformed_user_degrades_to_empty_value() {
        let d = dispatcher();
        assert!(d.execute(r#"{"op":"Load"}"#, "[1,2]").is_empty_value());
    }

    #[test]
    fn sequence_result_is_bridged() {
        let outcome = dispatcher().execute(r#"{"op":"Seeds","vertices":["a","b"]}"#, "{}");
        let bridge = outcome.into_stream().expect("stream");
        assert_eq!(bridge.serializer_name(), Some("ElementSeedSerializer"));
        let out: Vec<_> = bridge.collect::<Result<_, _>>().expect("serialize");
        assert_eq!(out[0], json!({"type": "EntitySeed", "vertex": "a"}));
    }

    #[test]
    fn list_value_is_bridged() {
        let outcome = dispatcher().execute(r#"{"op":"Produce","value":[1,2,3]}"#, "{}");
        let out: Vec<_> = outcome
            .into_stream()
            .expect("stream")
            .collect::<Result<_, _>>()
            .expect("serialize");
        assert_eq!(out, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn empty_sequence_is_an_exhausted_stream() {
        let outcome = dispatcher().execute(r#"{"op":"Seeds","vertices":[]}"#, "{}");
        let mut bridge = outcome.into_stream().expect("stream");
        assert!(bridge.serializer_name().is_none());
        assert!(bridge.next().is_none());
    }

    #[test]
    fn properties_pass_through_unserialized() {
        let outcome = dispatcher().execute(r#"{"op":"Properties"}"#, "{}");
        let value = outcome.into_value().expect("value");
        assert!(matches!(value, EngineValue::Properties(_)));
        assert_eq!(value.to_generic(), json!({"graphId": "g1"}));
    }

    #[test]
    fn outcomes_collapse_to_generic_values() {
        let d = dispatcher();
        let generic = |op: &str| {
            d.execute(op, "{}")
                .into_generic(d.registry())
                .expect("generic")
        };

        assert_eq!(generic(r#"{"op":"Nothing"}"#), GenericValue::Null);
        assert_eq!(generic(r#"{"op":"Flush"}"#), json!(0));
        assert_eq!(generic(r#"{"op":"BrokenFlush"}"#), json!(1));
        assert_eq!(generic(r#"{"op":"Properties"}"#), json!({"graphId": "g1"}));
        assert_eq!(
            generic(r#"{"op":"Seeds","vertices":["a"]}"#),
            json!([{"type": "EntitySeed", "vertex": "a"}])
        );
    }

    #[test]
    fn unserializable_stream_element_is_a_conversion_error() {
        let registry = SerializerRegistry::new();
        registry.register(TypeTag::ENTITY_SEED, Arc::new(CardinalityEstimatorSerializer));
        let d = OperationDispatcher::new(ScriptedEngine, Arc::new(registry));

        let result = d
            .execute(r#"{"op":"Seeds","vertices":["a"]}"#, "{}")
            .into_generic(d.registry());
        assert!(matches!(result, Err(BridgeError::Serialization(_))));
    }
}
