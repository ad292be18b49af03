//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use graphbridge_core::{
    BridgeConfig, BridgeError, GenericValue, GraphSession, MemoryGraph, RegistrationReport,
    read_bounded,
};
use std::path::Path;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of an operations file (16 MB).
const MAX_OPERATIONS_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum size of a caller identity file (64 KB).
const MAX_USER_FILE_SIZE: u64 = 64 * 1024;

/// Graph id of the session the CLI runs against.
const CLI_GRAPH_ID: &str = "graphbridge-cli";

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    pub json: bool,
    pub verbose: bool,
}

// =============================================================================
// SESSION & RENDERING
// =============================================================================

/// Build the CLI session, applying `config` when given.
pub fn load_session(
    config: Option<&Path>,
) -> Result<(GraphSession<MemoryGraph>, RegistrationReport), BridgeError> {
    let config = match config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    Ok(GraphSession::from_config(
        MemoryGraph::new(CLI_GRAPH_ID),
        &config,
    ))
}

/// Split an operations document into individual descriptors.
pub fn parse_operations(text: &str) -> Result<Vec<GenericValue>, BridgeError> {
    let document: GenericValue = serde_json::from_str(text)
        .map_err(|e| BridgeError::Decode(format!("operations file: {}", e)))?;
    match document {
        GenericValue::Array(operations) => Ok(operations),
        single => Ok(vec![single]),
    }
}

/// Execute every descriptor in order and collect one generic value per
/// descriptor.
///
/// In strict mode the first decode, engine or serialization failure ends the
/// run. Otherwise a failing descriptor is logged and yields `null`, and the
/// rest of the batch still runs.
pub fn run_operations(
    session: &GraphSession<MemoryGraph>,
    operations: &[GenericValue],
    user: &str,
    strict: bool,
) -> Result<Vec<GenericValue>, BridgeError> {
    operations
        .iter()
        .map(|operation| {
            let text = operation.to_string();
            if strict {
                session.try_execute_generic(&text, user)
            } else {
                Ok(session.execute_generic(&text, user))
            }
        })
        .collect()
}

/// Generic form of a registration report.
pub fn report_json(report: &RegistrationReport) -> GenericValue {
    let entries: Vec<GenericValue> = report
        .entries()
        .iter()
        .map(|entry| {
            serde_json::json!({
                "type": entry.type_name,
                "serializer": entry.serializer_name,
                "registered": entry.is_registered(),
                "error": entry.result.as_ref().err().map(ToString::to_string),
            })
        })
        .collect();

    serde_json::json!({
        "registered": report.registered(),
        "failed": report.entries().len() - report.registered(),
        "entries": entries,
    })
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Execute operation descriptors against a fresh in-memory graph.
pub fn cmd_run(
    file: &Path,
    user: Option<&Path>,
    config: Option<&Path>,
    strict: bool,
    output: OutputMode,
) -> Result<(), BridgeError> {
    let operations = parse_operations(&read_bounded(file, MAX_OPERATIONS_FILE_SIZE)?)?;
    let user = match user {
        Some(path) => read_bounded(path, MAX_USER_FILE_SIZE)?,
        None => "{}".to_string(),
    };

    let (session, report) = load_session(config)?;
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            tracing::warn!("skipping serializer entry {}: {}", failure.type_name, e);
        }
    }

    let results = run_operations(&session, &operations, &user, strict)?;

    if output.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&GenericValue::Array(results)).unwrap_or_default()
        );
        return Ok(());
    }

    for (index, (operation, result)) in operations.iter().zip(&results).enumerate() {
        if output.verbose {
            println!("[{}] {}", index, operation);
        }
        println!("[{}] => {}", index, result);
    }

    Ok(())
}

// =============================================================================
// CHECK-CONFIG COMMAND
// =============================================================================

/// Resolve every entry of a configuration file and report the outcome.
pub fn cmd_check_config(config: &Path, output: OutputMode) -> Result<(), BridgeError> {
    let (session, report) = load_session(Some(config))?;

    if output.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report_json(&report)).unwrap_or_default()
        );
        return report.into_result();
    }

    println!("graphbridge Configuration");
    println!("=========================");
    println!("File: {}", config.display());
    println!();
    for entry in report.entries() {
        match &entry.result {
            Ok(tag) => println!("  ok    {} -> {}", tag, entry.serializer_name),
            Err(e) => println!("  FAIL  {} -> {}: {}", entry.type_name, entry.serializer_name, e),
        }
    }
    println!();
    println!("Registered types: {}", session.registry().len());
    if output.verbose {
        for tag in session.registry().registered_tags() {
            println!("  {}", tag);
        }
    }

    report.into_result()
}
