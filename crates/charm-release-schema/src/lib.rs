//! Charm metadata parsing and normalization for charm-release.
//!
//! This crate defines the schema layer: YAML metadata parsing (`CharmMetadata`),
//! the normalized representation consumed by the release pipeline (`Manifest`),
//! and container image references split into name and tag (`ImageReference`).

pub mod metadata;
pub mod normalize;
pub mod types;

pub use metadata::{
    parse_metadata_file, parse_metadata_str, CharmMetadata, ManifestError, ResourceDescriptor,
    OCI_IMAGE,
};
pub use normalize::{load_manifest, Manifest, Resource, ResourceKind};
pub use types::{ImageDigest, ImageReference, Revision};
