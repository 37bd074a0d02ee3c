use crate::identity::reconcile_charm_name;
use crate::lifecycle::{validate_transition, ResourceStep, Stage};
use crate::{CoreError, EXIT_VALIDATION};
use charm_release_runtime::charmcraft::{
    parse_created_revision, parse_existing_revision, parse_packed_artifact,
    parse_resource_revision,
};
use charm_release_runtime::docker::find_digest;
use charm_release_runtime::{Charmcraft, Docker, ToolConfig, ToolRunner};
use charm_release_schema::{load_manifest, ImageReference, Manifest, ResourceKind, Revision};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Metadata file charmcraft keeps at the root of a charm directory.
const METADATA_FILE: &str = "metadata.yaml";

/// What to release: a charm directory to pack, or an artifact that is already packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    metadata: Option<PathBuf>,
    artifact: Option<PathBuf>,
}

impl ReleaseRequest {
    /// Pack the charm whose metadata lives at `path`, then release it.
    pub fn from_metadata(path: impl Into<PathBuf>) -> Self {
        Self {
            metadata: Some(path.into()),
            artifact: None,
        }
    }

    /// Release a prebuilt artifact. Resources are read from a `metadata.yaml`
    /// next to it when present.
    pub fn from_artifact(path: impl Into<PathBuf>) -> Self {
        Self {
            metadata: None,
            artifact: Some(path.into()),
        }
    }

    /// Read resources from this metadata file instead of the artifact's directory.
    #[must_use]
    pub fn with_metadata(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata = Some(path.into());
        self
    }

    pub fn metadata(&self) -> Option<&Path> {
        self.metadata.as_deref()
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Directory `charmcraft pack` runs in: the one holding the metadata file.
    pub fn charm_dir(&self) -> PathBuf {
        self.metadata
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionOrigin {
    /// The upload created a new revision.
    Created,
    /// The store already held byte-identical content under this revision.
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharmRevision {
    pub revision: Revision,
    pub origin: RevisionOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRevision {
    pub resource: String,
    pub revision: Revision,
}

impl fmt::Display for ResourceRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.revision)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    pub charm: String,
    pub artifact: PathBuf,
    pub revision: Revision,
    pub origin: RevisionOrigin,
    pub channel: String,
    pub resources: Vec<ResourceRevision>,
}

/// Drives one release run through the external tools.
///
/// Every stage returns the first error it meets; nothing is retried or rolled
/// back, and later stages never run after a failure.
pub struct Releaser<'a> {
    runner: &'a dyn ToolRunner,
    config: ToolConfig,
}

impl<'a> Releaser<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: ToolConfig) -> Self {
        debug!(
            "using {} tool runner (charmcraft: {}, docker: {})",
            runner.name(),
            config.charmcraft,
            config.docker
        );
        Self { runner, config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn charmcraft(&self) -> Charmcraft<'_> {
        Charmcraft::new(self.runner, &self.config.charmcraft)
    }

    fn docker(&self) -> Docker<'_> {
        Docker::new(self.runner, &self.config.docker)
    }

    /// Run the whole pipeline: load, pack, resolve resources, upload, release.
    pub fn release(
        &self,
        request: &ReleaseRequest,
        progress: &dyn Fn(&str),
    ) -> Result<ReleaseReport, CoreError> {
        let mut stage = Stage::Idle;

        advance(&mut stage, Stage::Load)?;
        progress("loading charm metadata");
        let manifest = self.load(request)?;

        advance(&mut stage, Stage::Pack)?;
        let artifact = if let Some(prebuilt) = request.artifact() {
            info!("using prebuilt artifact {}", prebuilt.display());
            prebuilt.to_path_buf()
        } else {
            progress("packing charm");
            self.pack(&request.charm_dir())?
        };
        let charm = reconcile_charm_name(manifest.as_ref().map(|m| m.name.as_str()), &artifact)?;
        info!("releasing charm '{charm}' from {}", artifact.display());

        advance(&mut stage, Stage::ResolveResources)?;
        let resources = match manifest {
            Some(ref m) => self.resolve_resources(&charm, m, progress)?,
            None => Vec::new(),
        };

        advance(&mut stage, Stage::UploadArtifact)?;
        progress("uploading charm");
        let uploaded = self.upload_artifact(&artifact)?;

        advance(&mut stage, Stage::Release)?;
        progress(&format!("releasing to {}", self.config.channel));
        self.publish(&charm, &uploaded.revision, &resources)?;

        advance(&mut stage, Stage::Released)?;
        Ok(ReleaseReport {
            charm,
            artifact,
            revision: uploaded.revision,
            origin: uploaded.origin,
            channel: self.config.channel.clone(),
            resources,
        })
    }

    /// Load the metadata named by the request, or the one next to a prebuilt artifact.
    pub fn load(&self, request: &ReleaseRequest) -> Result<Option<Manifest>, CoreError> {
        if let Some(path) = request.metadata() {
            debug!("loading metadata from {}", path.display());
            return Ok(Some(load_manifest(path)?));
        }

        let Some(artifact) = request.artifact() else {
            return Ok(None);
        };
        let sibling = artifact
            .parent()
            .unwrap_or(Path::new("."))
            .join(METADATA_FILE);
        if sibling.is_file() {
            debug!("loading metadata from {}", sibling.display());
            Ok(Some(load_manifest(&sibling)?))
        } else {
            info!(
                "no {METADATA_FILE} next to {}; releasing without resources",
                artifact.display()
            );
            Ok(None)
        }
    }

    /// Pack the charm in `charm_dir` and return the path of the artifact.
    pub fn pack(&self, charm_dir: &Path) -> Result<PathBuf, CoreError> {
        info!("packing charm in {}", charm_dir.display());
        let out = self.charmcraft().pack(charm_dir)?;
        if !out.success() {
            return Err(CoreError::PackagingFailed {
                code: out.exit_code(),
                reason: format!("charmcraft pack exited with {}: {}", out.code, out.stderr_tail()),
            });
        }

        let file_name = parse_packed_artifact(&out.stdout).ok_or_else(|| {
            CoreError::PackagingFailed {
                code: EXIT_VALIDATION,
                reason: "charmcraft pack succeeded but reported no .charm file".to_owned(),
            }
        })?;
        let artifact = charm_dir.join(file_name);
        debug!("packed artifact at {}", artifact.display());
        Ok(artifact)
    }

    /// Resolve and upload every OCI image resource, one at a time, in manifest order.
    pub fn resolve_resources(
        &self,
        charm: &str,
        manifest: &Manifest,
        progress: &dyn Fn(&str),
    ) -> Result<Vec<ResourceRevision>, CoreError> {
        for resource in &manifest.resources {
            if let ResourceKind::Other(ref kind) = resource.kind {
                debug!("skipping resource '{}' of type {kind}", resource.name);
            }
        }

        let mut revisions = Vec::new();
        for (name, image) in manifest.oci_images() {
            progress(&format!("uploading resource {name} ({image})"));
            revisions.push(self.resolve_resource(charm, name, image)?);
        }
        Ok(revisions)
    }

    /// Pull `image`, pin it to the digest of its exact tag, and upload it as `resource`.
    pub fn resolve_resource(
        &self,
        charm: &str,
        resource: &str,
        image: &ImageReference,
    ) -> Result<ResourceRevision, CoreError> {
        debug!("{resource}: {}", ResourceStep::Pull);
        let pulled = self.docker().pull(image)?;
        if !pulled.success() {
            return Err(CoreError::ImagePullFailed {
                image: image.to_string(),
                code: pulled.exit_code(),
            });
        }

        debug!("{resource}: {}", ResourceStep::DigestLookup);
        let listed = self.docker().list_digests(&image.name)?;
        if !listed.success() {
            return Err(CoreError::ImageQueryFailed {
                image: image.name.clone(),
                code: listed.exit_code(),
            });
        }
        let digest =
            find_digest(&listed.stdout, &image.tag).ok_or_else(|| CoreError::DigestNotFound {
                image: image.name.clone(),
                tag: image.tag.clone(),
            })?;
        debug!("{image} resolved to {digest}");

        debug!("{resource}: {}", ResourceStep::Upload);
        let uploaded = self.charmcraft().upload_resource(charm, resource, &digest)?;
        if !uploaded.success() {
            return Err(CoreError::ResourceUploadFailed {
                resource: resource.to_owned(),
                code: uploaded.exit_code(),
                reason: format!(
                    "charmcraft upload-resource exited with {}: {}",
                    uploaded.code,
                    uploaded.stderr_tail()
                ),
            });
        }
        let revision = parse_resource_revision(&uploaded.stdout).ok_or_else(|| {
            CoreError::ResourceUploadFailed {
                resource: resource.to_owned(),
                code: EXIT_VALIDATION,
                reason: "no revision in upload-resource output".to_owned(),
            }
        })?;

        info!("Revision of resource {resource}: {revision}");
        Ok(ResourceRevision {
            resource: resource.to_owned(),
            revision,
        })
    }

    /// Upload the artifact. A duplicate of an existing revision counts as success.
    pub fn upload_artifact(&self, artifact: &Path) -> Result<CharmRevision, CoreError> {
        info!("uploading {}", artifact.display());
        let out = self.charmcraft().upload(artifact)?;

        let uploaded = if out.success() {
            parse_created_revision(&out.stdout)
                .map(|revision| CharmRevision {
                    revision,
                    origin: RevisionOrigin::Created,
                })
                .ok_or_else(|| CoreError::RevisionNotFound {
                    stream: "stdout",
                    detail: "no 'Revision ... created' line".to_owned(),
                })?
        } else {
            parse_existing_revision(&out.stderr)
                .map(|revision| CharmRevision {
                    revision,
                    origin: RevisionOrigin::Existing,
                })
                .ok_or_else(|| CoreError::RevisionNotFound {
                    stream: "stderr",
                    detail: format!(
                        "charmcraft upload exited with {}: {}",
                        out.code,
                        out.stderr_tail()
                    ),
                })?
        };

        match uploaded.origin {
            RevisionOrigin::Created => info!("uploaded charm as revision {}", uploaded.revision),
            RevisionOrigin::Existing => info!(
                "identical charm already uploaded as revision {}",
                uploaded.revision
            ),
        }
        Ok(uploaded)
    }

    /// Release `charm` at `revision` to the configured channel with all resources attached.
    pub fn publish(
        &self,
        charm: &str,
        revision: &Revision,
        resources: &[ResourceRevision],
    ) -> Result<(), CoreError> {
        let channel = &self.config.channel;
        info!("releasing {charm} revision {revision} to {channel}");
        let flags: Vec<String> = resources.iter().map(ToString::to_string).collect();
        let out = self.charmcraft().release(charm, revision, channel, &flags)?;
        if !out.success() {
            return Err(CoreError::ReleaseFailed {
                charm: charm.to_owned(),
                revision: revision.to_string(),
                channel: channel.clone(),
                code: out.exit_code(),
            });
        }
        Ok(())
    }
}

fn advance(stage: &mut Stage, to: Stage) -> Result<(), CoreError> {
    validate_transition(*stage, to)?;
    debug!("stage {stage} -> {to}");
    *stage = to;
    Ok(())
}
