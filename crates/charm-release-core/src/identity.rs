//! Charm identity: the single name used for every store call of a run.
//!
//! The metadata `name` is authoritative. Packed artifacts are named
//! `<name>_<bases>.charm`, so when both are known they must agree; a prebuilt
//! artifact with no metadata falls back to its file name prefix.

use crate::CoreError;
use charm_release_runtime::charmcraft::CHARM_SUFFIX;
use charm_release_schema::ManifestError;
use std::path::Path;
use tracing::debug;

/// Charm name encoded in an artifact file name: everything before the first `_`.
pub fn charm_name_from_artifact(artifact: &Path) -> Option<String> {
    let file_name = artifact.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(CHARM_SUFFIX).unwrap_or(file_name);
    let name = stem.split('_').next()?.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

/// Pick the charm name for the run and check it against the artifact name.
pub fn reconcile_charm_name(
    manifest_name: Option<&str>,
    artifact: &Path,
) -> Result<String, CoreError> {
    let from_artifact = charm_name_from_artifact(artifact);
    match (manifest_name, from_artifact) {
        (Some(declared), Some(derived)) if declared != derived => {
            Err(CoreError::IdentityMismatch {
                manifest: declared.to_owned(),
                artifact: derived,
            })
        }
        (Some(declared), _) => Ok(declared.to_owned()),
        (None, Some(derived)) => {
            debug!("no metadata loaded; using charm name '{derived}' from artifact name");
            Ok(derived)
        }
        (None, None) => Err(CoreError::Manifest(ManifestError::MissingName)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_before_first_underscore() {
        assert_eq!(
            charm_name_from_artifact(Path::new("/out/my-charm_ubuntu-22.04-amd64.charm")).unwrap(),
            "my-charm"
        );
        assert_eq!(
            charm_name_from_artifact(Path::new("my-charm_amd64.charm")).unwrap(),
            "my-charm"
        );
    }

    #[test]
    fn derives_name_without_bases_suffix() {
        assert_eq!(
            charm_name_from_artifact(Path::new("plain.charm")).unwrap(),
            "plain"
        );
    }

    #[test]
    fn no_name_from_degenerate_file_names() {
        assert!(charm_name_from_artifact(Path::new("_amd64.charm")).is_none());
        assert!(charm_name_from_artifact(Path::new("/")).is_none());
    }

    #[test]
    fn manifest_name_wins_when_consistent() {
        let name =
            reconcile_charm_name(Some("my-charm"), Path::new("my-charm_amd64.charm")).unwrap();
        assert_eq!(name, "my-charm");
    }

    #[test]
    fn mismatched_names_are_rejected() {
        let err = reconcile_charm_name(Some("my-charm"), Path::new("old-name_amd64.charm"))
            .unwrap_err();
        assert!(matches!(err, CoreError::IdentityMismatch { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn artifact_name_used_without_manifest() {
        let name = reconcile_charm_name(None, Path::new("solo_amd64.charm")).unwrap();
        assert_eq!(name, "solo");
    }

    #[test]
    fn no_identity_at_all_is_missing_name() {
        let err = reconcile_charm_name(None, Path::new("_.charm")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Manifest(ManifestError::MissingName)
        ));
    }
}
