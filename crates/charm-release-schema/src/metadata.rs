use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Resource type handled by the release pipeline. Every other type is skipped.
pub const OCI_IMAGE: &str = "oci-image";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read metadata file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse metadata: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("charm name not found in metadata")]
    MissingName,
    #[error("resource '{resource}' has type oci-image but no upstream-source")]
    MissingUpstreamSource { resource: String },
    #[error("resource '{resource}' has an invalid image reference '{reference}', expected '<name>:<tag>'")]
    InvalidImageReference { resource: String, reference: String },
}

/// Raw charm metadata as written by the charm author.
///
/// Only the keys the release pipeline needs are modelled; the rest of the
/// document belongs to the packaging tool and is ignored here.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CharmMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resources: Option<BTreeMap<String, ResourceDescriptor>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResourceDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "upstream-source", default)]
    pub upstream_source: Option<String>,
}

pub fn parse_metadata_str(input: &str) -> Result<CharmMetadata, ManifestError> {
    Ok(serde_yaml::from_str(input)?)
}

pub fn parse_metadata_file(path: impl AsRef<Path>) -> Result<CharmMetadata, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_metadata_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_metadata() {
        let input = r#"
name: my-charm
display-name: My Charm
summary: A charm for testing.
containers:
  app:
    resource: app-image
resources:
  app-image:
    type: oci-image
    description: OCI image for the app
    upstream-source: registry/app:1.0
  config-file:
    type: file
    filename: config.yaml
"#;
        let metadata = parse_metadata_str(input).expect("should parse");
        assert_eq!(metadata.name.as_deref(), Some("my-charm"));
        let resources = metadata.resources.unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources["app-image"].kind, OCI_IMAGE);
        assert_eq!(
            resources["app-image"].upstream_source.as_deref(),
            Some("registry/app:1.0")
        );
        assert_eq!(resources["config-file"].kind, "file");
        assert!(resources["config-file"].upstream_source.is_none());
    }

    #[test]
    fn parses_metadata_without_resources() {
        let metadata = parse_metadata_str("name: bare-charm\n").unwrap();
        assert_eq!(metadata.name.as_deref(), Some("bare-charm"));
        assert!(metadata.resources.is_none());
    }

    #[test]
    fn tolerates_null_resources() {
        let metadata = parse_metadata_str("name: bare-charm\nresources:\n").unwrap();
        assert!(metadata.resources.is_none());
    }

    #[test]
    fn rejects_invalid_yaml() {
        let err = parse_metadata_str("name: [unclosed\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn rejects_resource_without_type() {
        let input = r"
name: my-charm
resources:
  app-image:
    upstream-source: registry/app:1.0
";
        assert!(parse_metadata_str(input).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_metadata_file(dir.path().join("metadata.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
