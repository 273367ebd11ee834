//! Serialization of generated artifacts.
//!
//! AsyncAPI documents are written as YAML or JSON; TypeScript declarations are already
//! text. Both end up on disk through [`write_to_file`].

use crate::asyncapi_builder::AsyncApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an AsyncAPI document to YAML format.
pub fn serialize_yaml(doc: &AsyncApiDocument) -> Result<String> {
    debug!("Serializing AsyncAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize AsyncAPI document to YAML")
}

/// Serializes an AsyncAPI document to pretty-printed JSON.
pub fn serialize_json(doc: &AsyncApiDocument) -> Result<String> {
    debug!("Serializing AsyncAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize AsyncAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// Existing files are overwritten.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asyncapi_builder::AsyncApiBuilder;
    use crate::config::{DocumentInfo, GeneratorConfig};
    use crate::events::{Direction, EventInfo, Namespace};
    use crate::schema::SchemaNode;
    use crate::schema_generator::SchemaGenerator;
    use tempfile::TempDir;

    fn create_test_document() -> AsyncApiDocument {
        let config = GeneratorConfig {
            info: DocumentInfo {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("A test API".to_string()),
            },
            ..GeneratorConfig::default()
        };
        let schema_gen = SchemaGenerator::new();
        let mut builder = AsyncApiBuilder::new(&config);
        let namespace = Namespace::new("/").with_event(EventInfo::new(
            "hello",
            Direction::Out,
            SchemaNode::tuple(vec![SchemaNode::string().nullable()]),
        ));
        builder.add_namespace(&namespace, &schema_gen).unwrap();
        builder.build(schema_gen)
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.contains("asyncapi: 3.0.0"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("description: A test API"));
        assert!(yaml.contains("channels:"));
        assert!(yaml.contains("RootSendHello:"));
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize_json(&create_test_document()).unwrap();

        assert!(json.contains('\n'));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["asyncapi"], "3.0.0");
        assert_eq!(
            parsed["channels"]["Root"]["messages"]["HelloOutgoing"]["payload"]["items"][0]["type"],
            serde_json::json!(["string", "null"])
        );
    }

    #[test]
    fn test_roundtrip_yaml_serialization() {
        let doc = create_test_document();
        let yaml = serialize_yaml(&doc).unwrap();
        let deserialized: AsyncApiDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized, doc);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("asyncapi.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("types.ts");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }
}
