//! Release pipeline for charm-release.
//!
//! This crate ties the schema and runtime layers together into the `Releaser`:
//! load metadata, pack the charm, pin and upload every OCI image resource by
//! digest, upload the charm, and release it to a channel. It also provides the
//! stage state machine, charm identity reconciliation, and the error taxonomy
//! that maps the first failure of a run to a process exit code.

pub mod identity;
pub mod lifecycle;
pub mod releaser;

pub use identity::{charm_name_from_artifact, reconcile_charm_name};
pub use lifecycle::{validate_transition, ResourceStep, Stage};
pub use releaser::{
    CharmRevision, ReleaseReport, ReleaseRequest, Releaser, ResourceRevision, RevisionOrigin,
};

use charm_release_runtime::RuntimeError;
use charm_release_schema::ManifestError;
use thiserror::Error;

/// Exit code for failures detected by charm-release itself rather than by a tool.
pub const EXIT_VALIDATION: u8 = 1;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("failed to pack the charm: {reason}")]
    PackagingFailed { code: u8, reason: String },
    #[error("failed to pull image {image} (exit code {code})")]
    ImagePullFailed { image: String, code: u8 },
    #[error("failed to list local tags of image {image} (exit code {code})")]
    ImageQueryFailed { image: String, code: u8 },
    #[error("Could not find tag {tag} for image {image}")]
    DigestNotFound { image: String, tag: String },
    #[error("failed to upload resource '{resource}': {reason}")]
    ResourceUploadFailed {
        resource: String,
        code: u8,
        reason: String,
    },
    #[error("could not find the charm revision in upload {stream}: {detail}")]
    RevisionNotFound { stream: &'static str, detail: String },
    #[error("failed to release {charm} revision {revision} to {channel} (exit code {code})")]
    ReleaseFailed {
        charm: String,
        revision: String,
        channel: String,
        code: u8,
    },
    #[error("charm name mismatch: metadata declares '{manifest}' but the artifact is named '{artifact}'")]
    IdentityMismatch { manifest: String, artifact: String },
    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl CoreError {
    /// Process exit code for this failure: the failing tool's own code when a
    /// tool exited non-zero, otherwise [`EXIT_VALIDATION`].
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PackagingFailed { code, .. }
            | Self::ImagePullFailed { code, .. }
            | Self::ImageQueryFailed { code, .. }
            | Self::ResourceUploadFailed { code, .. }
            | Self::ReleaseFailed { code, .. } => *code,
            Self::Manifest(_)
            | Self::Runtime(_)
            | Self::DigestNotFound { .. }
            | Self::RevisionNotFound { .. }
            | Self::IdentityMismatch { .. }
            | Self::InvalidTransition { .. } => EXIT_VALIDATION,
        }
    }
}
