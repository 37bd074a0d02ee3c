use crate::metadata::{parse_metadata_file, CharmMetadata, ManifestError, OCI_IMAGE};
use crate::types::ImageReference;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Validated view of the charm metadata used by the release pipeline.
///
/// The name is trimmed and guaranteed non-empty, and every `oci-image`
/// resource carries a parsed image reference. Resources are ordered by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResourceKind {
    OciImage(ImageReference),
    Other(String),
}

impl CharmMetadata {
    /// Validate the metadata and resolve every resource descriptor.
    pub fn normalize(&self) -> Result<Manifest, ManifestError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ManifestError::MissingName)?
            .to_owned();

        let mut resources = Vec::new();
        for (resource_name, descriptor) in self.resources.iter().flatten() {
            let kind = if descriptor.kind == OCI_IMAGE {
                let source = descriptor
                    .upstream_source
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ManifestError::MissingUpstreamSource {
                        resource: resource_name.clone(),
                    })?;
                let image = ImageReference::parse(source).ok_or_else(|| {
                    ManifestError::InvalidImageReference {
                        resource: resource_name.clone(),
                        reference: source.to_owned(),
                    }
                })?;
                ResourceKind::OciImage(image)
            } else {
                ResourceKind::Other(descriptor.kind.clone())
            };
            resources.push(Resource {
                name: resource_name.clone(),
                kind,
            });
        }

        Ok(Manifest { name, resources })
    }
}

impl Manifest {
    /// Resources the pipeline uploads, paired with their image reference.
    pub fn oci_images(&self) -> impl Iterator<Item = (&str, &ImageReference)> {
        self.resources.iter().filter_map(|r| match &r.kind {
            ResourceKind::OciImage(image) => Some((r.name.as_str(), image)),
            ResourceKind::Other(_) => None,
        })
    }
}

/// Read, parse, and normalize a metadata file in one step.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    parse_metadata_file(path)?.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::parse_metadata_str;

    #[test]
    fn normalizes_resources() {
        let input = r"
name: ' my-charm '
resources:
  zeta-image:
    type: oci-image
    upstream-source: registry/zeta:2.1
  alpha-image:
    type: oci-image
    upstream-source: registry/alpha:latest
  settings:
    type: file
    filename: settings.yaml
";
        let manifest = parse_metadata_str(input).unwrap().normalize().unwrap();
        assert_eq!(manifest.name, "my-charm");
        assert_eq!(manifest.resources.len(), 3);
        assert_eq!(manifest.resources[0].name, "alpha-image");

        let images: Vec<_> = manifest.oci_images().collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].0, "alpha-image");
        assert_eq!(images[0].1.tag, "latest");
        assert_eq!(images[1].0, "zeta-image");
        assert_eq!(images[1].1.name, "registry/zeta");
    }

    #[test]
    fn missing_name_is_rejected() {
        let metadata = parse_metadata_str("resources: {}\n").unwrap();
        assert!(matches!(
            metadata.normalize(),
            Err(ManifestError::MissingName)
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let metadata = parse_metadata_str("name: '   '\n").unwrap();
        assert!(matches!(
            metadata.normalize(),
            Err(ManifestError::MissingName)
        ));
    }

    #[test]
    fn oci_image_without_source_is_rejected() {
        let input = r"
name: my-charm
resources:
  app-image:
    type: oci-image
";
        let err = parse_metadata_str(input).unwrap().normalize().unwrap_err();
        assert!(
            matches!(err, ManifestError::MissingUpstreamSource { ref resource } if resource == "app-image")
        );
    }

    #[test]
    fn untagged_image_is_rejected() {
        let input = r"
name: my-charm
resources:
  app-image:
    type: oci-image
    upstream-source: registry/app
";
        let err = parse_metadata_str(input).unwrap().normalize().unwrap_err();
        assert!(matches!(err, ManifestError::InvalidImageReference { .. }));
    }

    #[test]
    fn other_resource_types_need_no_source() {
        let input = r"
name: my-charm
resources:
  blob:
    type: file
";
        let manifest = parse_metadata_str(input).unwrap().normalize().unwrap();
        assert_eq!(manifest.oci_images().count(), 0);
        assert_eq!(
            manifest.resources[0].kind,
            ResourceKind::Other("file".to_owned())
        );
    }

    #[test]
    fn load_manifest_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.yaml");
        std::fs::write(&path, "name: file-charm\n").unwrap();
        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.name, "file-charm");
        assert!(manifest.resources.is_empty());
    }
}
