//! # Bridge Configuration
//!
//! Startup-time serializer registrations, read from TOML:
//!
//! ```toml
//! register_defaults = true
//!
//! [serializers]
//! CardinalityEstimator = "CardinalityEstimatorSerializer"
//! ```
//!
//! Keys of `[serializers]` are type names, values are serializer names. Both
//! are resolved through a [`crate::registry::SerializerCatalog`] when a session
//! is built, never here.

use crate::primitives::MAX_CONFIG_FILE_SIZE;
use crate::types::BridgeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn default_register_defaults() -> bool {
    true
}

/// Parsed bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Whether the built-in serializers are registered before `serializers`.
    #[serde(default = "default_register_defaults")]
    pub register_defaults: bool,

    /// Type name to serializer name.
    #[serde(default)]
    pub serializers: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            register_defaults: true,
            serializers: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, BridgeError> {
        toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Load a configuration file.
    ///
    /// The path must name an existing regular file no larger than
    /// [`MAX_CONFIG_FILE_SIZE`].
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = read_bounded(path, MAX_CONFIG_FILE_SIZE)?;
        let config = Self::from_toml_str(&text)?;

        tracing::debug!(
            "loaded {} serializer entries from {}",
            config.serializers.len(),
            path.display()
        );
        Ok(config)
    }

    /// Configured entries as `(type name, serializer name)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.serializers
            .iter()
            .map(|(type_name, serializer)| (type_name.as_str(), serializer.as_str()))
    }
}

// =============================================================================
// FILE INPUT
// =============================================================================

/// Read a whole text file after checking its path and size.
///
/// The path must name an existing regular file of at most `max_size` bytes.
/// Every failure is a [`BridgeError::Io`].
pub fn read_bounded(path: &Path, max_size: u64) -> Result<String, BridgeError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, max_size)?;
    std::fs::read_to_string(&validated_path)
        .map_err(|e| BridgeError::Io(format!("Cannot read '{}': {}", path.display(), e)))
}

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), BridgeError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| BridgeError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(BridgeError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

fn validate_file_path(path: &Path) -> Result<PathBuf, BridgeError> {
    let canonical = path.canonicalize().map_err(|e| {
        BridgeError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(BridgeError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").expect("parse");
        assert_eq!(config, BridgeConfig::default());
        assert!(config.register_defaults);
    }

    #[test]
    fn parses_serializer_table() {
        let config = BridgeConfig::from_toml_str(
            r#"
            register_defaults = false

            [serializers]
            CardinalityEstimator = "CardinalityEstimatorSerializer"
            Entity = "ElementMapSerializer"
            "#,
        )
        .expect("parse");

        assert!(!config.register_defaults);
        let entries: Vec<_> = config.entries().collect();
        assert_eq!(
            entries,
            vec![
                ("CardinalityEstimator", "CardinalityEstimatorSerializer"),
                ("Entity", "ElementMapSerializer"),
            ]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = BridgeConfig::from_toml_str("serialisers = 3");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let result = BridgeConfig::from_toml_str("[serializers\n");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[serializers]\nEdge = \"ElementMapSerializer\"").expect("write");

        let config = BridgeConfig::load(file.path()).expect("load");
        assert_eq!(
            config.serializers.get("Edge").map(String::as_str),
            Some("ElementMapSerializer")
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = BridgeConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = BridgeConfig::load(dir.path());
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let padding = "#".repeat(1024);
        for _ in 0..1025 {
            writeln!(file, "{}", padding).expect("write");
        }

        let result = BridgeConfig::load(file.path());
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[test]
    fn read_bounded_enforces_the_given_limit() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "0123456789").expect("write");

        assert_eq!(read_bounded(file.path(), 10).expect("read"), "0123456789");
        assert!(matches!(
            read_bounded(file.path(), 9),
            Err(BridgeError::Io(_))
        ));
    }
}
