//! # Session Tests
//!
//! End-to-end behavior of a session over the in-memory engine.
//!
//! ## Groups
//! - Classification: output, input and effect-only outcomes
//! - Streaming: lazy bridging, serializer choice and resource release
//! - Generic results: outcomes collapsed to one generic value per operation
//! - Registration: configured names and custom types

use graphbridge_core::{
    BridgeConfig, BridgeError, CustomValue, DispatchOutcome, EngineValue, GenericValue,
    GraphSession, MemoryGraph, SerializerRegistry, Serializer, Status, TypeTag,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

const NO_USER: &str = r#"{"userId":"tester"}"#;

fn session() -> GraphSession<MemoryGraph> {
    let session = GraphSession::new(MemoryGraph::new("people"));
    let outcome = session.execute(
        &json!({
            "class": "AddElements",
            "input": [
                {"class": "Entity", "group": "person", "vertex": "alice",
                 "properties": {"age": 31}},
                {"class": "Entity", "group": "person", "vertex": "bob"},
                {"class": "Edge", "group": "knows", "source": "alice", "destination": "bob"},
                {"class": "Edge", "group": "knows", "source": "bob", "destination": "carol"}
            ]
        })
        .to_string(),
        NO_USER,
    );
    assert_eq!(outcome.status(), Some(Status::Success));
    session
}

fn collect(outcome: DispatchOutcome) -> Vec<GenericValue> {
    outcome
        .into_stream()
        .expect("stream outcome")
        .collect::<Result<_, _>>()
        .expect("serialize")
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

mod classification {
    use super::*;

    #[test]
    fn count_is_a_populated_value() {
        let outcome = session().execute(r#"{"class":"CountAllElements"}"#, NO_USER);
        assert_eq!(outcome.into_value(), Some(EngineValue::Long(4)));
    }

    #[test]
    fn failing_input_is_status_one() {
        let outcome = session().execute(
            r#"{"class":"AddElements","input":[{"class":"Entity","group":"","vertex":1}]}"#,
            NO_USER,
        );
        assert_eq!(outcome.status().map(Status::code), Some(1));
    }

    #[test]
    fn effect_only_is_status_zero() {
        let session = session();
        let outcome = session.execute(r#"{"class":"DeleteAllData"}"#, NO_USER);
        assert_eq!(outcome.status().map(Status::code), Some(0));
        assert_eq!(session.engine().element_count(), 0);
    }

    #[test]
    fn undecodable_operation_is_an_empty_value() {
        let session = session();
        assert!(session.execute(r#"{"class":"Teleport"}"#, NO_USER).is_empty_value());
        assert!(matches!(
            session.try_execute(r#"{"class":"Teleport"}"#, NO_USER),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn unknown_seed_variant_fails_to_decode() {
        let result = session().try_execute(
            r#"{"class":"GetElements","input":[{"type":"PathSeed"}]}"#,
            NO_USER,
        );
        assert!(matches!(result, Err(BridgeError::Decode(_))));
    }

    #[test]
    fn graph_properties_pass_through() {
        let outcome = session().execute(r#"{"class":"GetGraphProperties"}"#, NO_USER);
        let value = outcome.into_value().expect("properties");
        assert_eq!(value.type_tag(), TypeTag::PROPERTIES);
        assert_eq!(value.to_generic(), json!({"graphId": "people"}));
    }

    #[test]
    fn vertex_estimate_is_a_value() {
        let session = session();
        let value = session
            .execute(r#"{"class":"EstimateVertexCount"}"#, NO_USER)
            .into_value()
            .expect("estimator");

        assert_eq!(value.type_tag(), TypeTag::CARDINALITY_ESTIMATOR);
        let count = session.registry().serialize_value(&value).expect("serialize");
        assert_eq!(count, json!(3));
    }
}

// =============================================================================
// GENERIC RESULTS
// =============================================================================

mod generic_results {
    use super::*;

    #[test]
    fn single_values_go_through_the_registry() {
        let session = session();
        assert_eq!(
            session.execute_generic(r#"{"class":"CountAllElements"}"#, NO_USER),
            json!(4)
        );
        assert_eq!(
            session.execute_generic(r#"{"class":"EstimateVertexCount"}"#, NO_USER),
            json!(3)
        );
        assert_eq!(
            session.execute_generic(r#"{"class":"GetGraphProperties"}"#, NO_USER),
            json!({"graphId": "people"})
        );
    }

    #[test]
    fn streams_become_sequences() {
        let session = session();
        let out = session
            .try_execute_generic(
                r#"{"class":"GetAdjacentIds","input":[{"type":"EntitySeed","vertex":"alice"}]}"#,
                NO_USER,
            )
            .expect("generic");

        assert_eq!(out, json!([{"type": "EntitySeed", "vertex": "bob"}]));
        assert_eq!(session.engine().open_scans(), 0);
    }

    #[test]
    fn statuses_become_codes() {
        let session = session();
        assert_eq!(
            session.execute_generic(
                r#"{"class":"AddElements","input":[{"class":"Entity","group":"","vertex":1}]}"#,
                NO_USER,
            ),
            json!(1)
        );
        assert_eq!(
            session.execute_generic(r#"{"class":"DeleteAllData"}"#, NO_USER),
            json!(0)
        );
    }

    #[test]
    fn undecodable_operation_is_null_or_an_error() {
        let session = session();
        assert_eq!(
            session.execute_generic(r#"{"class":"Teleport"}"#, NO_USER),
            GenericValue::Null
        );
        assert!(matches!(
            session.try_execute_generic(r#"{"class":"Teleport"}"#, NO_USER),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn unserializable_stream_is_null_or_an_error() {
        let config = BridgeConfig::from_toml_str(
            "[serializers]\nEntity = \"CardinalityEstimatorSerializer\"",
        )
        .expect("parse");
        let (session, report) = GraphSession::from_config(MemoryGraph::new("g"), &config);
        assert!(report.is_clean());
        session.execute(
            r#"{"class":"AddElements","input":[{"class":"Entity","group":"person","vertex":"x"}]}"#,
            NO_USER,
        );

        let all = r#"{"class":"GetAllElements"}"#;
        assert_eq!(session.execute_generic(all, NO_USER), GenericValue::Null);
        assert!(matches!(
            session.try_execute_generic(all, NO_USER),
            Err(BridgeError::Serialization(_))
        ));
        assert_eq!(session.engine().open_scans(), 0);
    }
}

// =============================================================================
// STREAMING
// =============================================================================

mod streaming {
    use super::*;

    #[test]
    fn elements_are_serialized_as_maps() {
        let out = collect(session().execute(
            r#"{"class":"GetElements","groups":["person"],
                "input":[{"type":"EntitySeed","vertex":"alice"}]}"#,
            NO_USER,
        ));
        assert_eq!(
            out,
            vec![json!({
                "type": "Entity",
                "group": "person",
                "vertex": "alice",
                "properties": {"age": 31}
            })]
        );
    }

    #[test]
    fn adjacent_ids_are_encoded_seeds() {
        let out = collect(session().execute(
            r#"{"class":"GetAdjacentIds","input":[{"type":"EntitySeed","vertex":"bob"}]}"#,
            NO_USER,
        ));
        assert_eq!(
            out,
            vec![
                json!({"type": "EntitySeed", "vertex": "alice"}),
                json!({"type": "EntitySeed", "vertex": "carol"}),
            ]
        );
    }

    #[test]
    fn empty_result_is_an_exhausted_stream() {
        let session = session();
        let mut bridge = session
            .execute(
                r#"{"class":"GetElements","input":[{"type":"EntitySeed","vertex":"nobody"}]}"#,
                NO_USER,
            )
            .into_stream()
            .expect("stream");

        assert!(bridge.serializer_name().is_none());
        assert!(bridge.next().is_none());
        assert_eq!(session.engine().open_scans(), 0);
    }

    #[test]
    fn abandoned_stream_releases_its_scan() {
        let session = session();
        let mut bridge = session
            .execute(r#"{"class":"GetAllElements"}"#, NO_USER)
            .into_stream()
            .expect("stream");

        assert!(bridge.next().is_some());
        assert_eq!(session.engine().open_scans(), 1);
        drop(bridge);
        assert_eq!(session.engine().open_scans(), 0);
    }

    #[test]
    fn exhausted_stream_releases_its_scan() {
        let session = session();
        let out = collect(session.execute(r#"{"class":"GetAllElements"}"#, NO_USER));
        assert_eq!(out.len(), 4);
        assert_eq!(session.engine().open_scans(), 0);
    }

    #[test]
    fn raw_elements_without_defaults() {
        let config = BridgeConfig::from_toml_str("register_defaults = false").expect("parse");
        let (session, report) = GraphSession::from_config(MemoryGraph::new("raw"), &config);
        assert!(report.is_clean());

        session.execute(
            r#"{"class":"AddElements","input":[{"class":"Entity","group":"person","vertex":"x"}]}"#,
            NO_USER,
        );
        let out = collect(session.execute(r#"{"class":"GetAllElements"}"#, NO_USER));
        assert_eq!(
            out,
            vec![json!({"class": "Entity", "group": "person", "vertex": "x", "properties": {}})]
        );
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

mod registration {
    use super::*;

    #[derive(Debug)]
    struct Money {
        cents: i64,
    }

    impl CustomValue for Money {
        fn type_tag(&self) -> TypeTag {
            TypeTag::new("Money")
        }

        fn to_generic(&self) -> GenericValue {
            json!({"class": "Money", "cents": self.cents})
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct MoneySerializer;

    impl Serializer for MoneySerializer {
        fn name(&self) -> &str {
            "MoneySerializer"
        }

        fn can_handle(&self, tag: &TypeTag) -> bool {
            tag.as_str() == "Money"
        }

        fn serialize(
            &self,
            value: &EngineValue,
            _registry: &SerializerRegistry,
        ) -> Result<GenericValue, BridgeError> {
            let EngineValue::Custom(custom) = value else {
                return Err(BridgeError::Serialization("not money".into()));
            };
            let money = custom
                .as_any()
                .downcast_ref::<Money>()
                .ok_or_else(|| BridgeError::Serialization("not money".into()))?;
            Ok(json!(format!("{}.{:02}", money.cents / 100, money.cents % 100)))
        }
    }

    #[test]
    fn custom_vertex_type_is_serialized_inside_seeds() {
        let mut session = GraphSession::new(MemoryGraph::new("g"));
        session.catalog_mut().declare_type(TypeTag::new("Money"));
        session
            .catalog_mut()
            .define_serializer("MoneySerializer", || Arc::new(MoneySerializer));
        session
            .register_serializer("Money", "MoneySerializer")
            .expect("register");

        let seed =
            graphbridge_core::ElementSeed::entity(EngineValue::custom(Money { cents: 1250 }));
        let out = session
            .registry()
            .serialize_value(&EngineValue::from(seed))
            .expect("serialize");

        assert_eq!(out, json!({"type": "EntitySeed", "vertex": "12.50"}));
    }

    #[test]
    fn unknown_names_are_reported_at_registration() {
        let session = GraphSession::new(MemoryGraph::new("g"));
        let err = session
            .register_serializer("CardinalityEstimator", "NoSuchSerializer")
            .expect_err("unknown serializer");
        assert_eq!(err.to_string(), "Cannot resolve serializer 'NoSuchSerializer'");
    }

    #[test]
    fn estimator_serializer_scenario() {
        let config = BridgeConfig::from_toml_str(
            r#"
            register_defaults = false
            [serializers]
            CardinalityEstimator = "CardinalityEstimatorSerializer"
            EntitySeed = "ElementSeedSerializer"
            "#,
        )
        .expect("parse");
        let (session, report) = GraphSession::from_config(MemoryGraph::new("g"), &config);
        assert_eq!(report.registered(), 2);

        let mut estimator = graphbridge_core::CardinalityEstimator::new();
        for i in 0..42 {
            estimator.offer(format!("vertex-{}", i));
        }
        let seed = graphbridge_core::ElementSeed::entity(estimator);
        let out = session
            .registry()
            .serialize_value(&EngineValue::from(seed))
            .expect("serialize");

        assert_eq!(out, json!({"type": "EntitySeed", "vertex": 42}));
    }
}
