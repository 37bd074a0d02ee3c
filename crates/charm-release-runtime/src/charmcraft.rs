//! `charmcraft` command lines and the parsers for their output.
//!
//! Each accessor below encodes one textual contract of the tool. They are the
//! only places in the workspace that know what charmcraft prints.

use crate::runner::{Invocation, ToolOutput, ToolRunner};
use crate::RuntimeError;
use charm_release_schema::{ImageDigest, Revision};
use std::path::Path;

/// File suffix of a packed charm artifact.
pub const CHARM_SUFFIX: &str = ".charm";

/// Phrase charmcraft prints on stderr when an identical charm was uploaded before.
///
/// There is no structured form of this message; a wording change upstream
/// breaks duplicate detection.
pub const EXISTING_REVISION_MARKER: &str = "Revision of the existing package is:";

pub struct Charmcraft<'a> {
    runner: &'a dyn ToolRunner,
    program: &'a str,
}

impl<'a> Charmcraft<'a> {
    pub fn new(runner: &'a dyn ToolRunner, program: &'a str) -> Self {
        Self { runner, program }
    }

    /// `charmcraft pack`, run from inside the charm directory.
    pub fn pack(&self, charm_dir: &Path) -> Result<ToolOutput, RuntimeError> {
        self.runner
            .run(&Invocation::new(self.program).arg("pack").cwd(charm_dir))
    }

    /// `charmcraft upload-resource --image <digest> <charm> <resource>`.
    pub fn upload_resource(
        &self,
        charm: &str,
        resource: &str,
        digest: &ImageDigest,
    ) -> Result<ToolOutput, RuntimeError> {
        self.runner.run(
            &Invocation::new(self.program)
                .args(["upload-resource", "--image"])
                .arg(digest.as_str())
                .args([charm, resource]),
        )
    }

    /// `charmcraft upload <artifact>`.
    pub fn upload(&self, artifact: &Path) -> Result<ToolOutput, RuntimeError> {
        self.runner.run(
            &Invocation::new(self.program)
                .arg("upload")
                .arg(artifact.to_string_lossy()),
        )
    }

    /// `charmcraft release <charm> --revision <rev> --channel=<channel> [--resource=<name>:<rev>]...`.
    pub fn release(
        &self,
        charm: &str,
        revision: &Revision,
        channel: &str,
        resources: &[String],
    ) -> Result<ToolOutput, RuntimeError> {
        self.runner.run(
            &Invocation::new(self.program)
                .args(["release", charm, "--revision", revision.as_str()])
                .arg(format!("--channel={channel}"))
                .args(resources.iter().map(|r| format!("--resource={r}"))),
        )
    }
}

/// File name of the packed charm: the first stdout line ending in `.charm`, trimmed.
pub fn parse_packed_artifact(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.len() > CHARM_SUFFIX.len() && line.ends_with(CHARM_SUFFIX))
        .map(str::to_owned)
}

/// Revision from the first `upload-resource` stdout line starting with `Revision`.
pub fn parse_resource_revision(stdout: &str) -> Option<Revision> {
    stdout
        .lines()
        .filter(|line| line.starts_with("Revision"))
        .find_map(second_token)
}

/// Revision from a successful `upload`: the line mentioning both `Revision` and `created`.
pub fn parse_created_revision(stdout: &str) -> Option<Revision> {
    stdout
        .lines()
        .filter(|line| line.contains("Revision") && line.contains("created"))
        .find_map(second_token)
}

/// Revision of the already-uploaded identical charm, from a rejected `upload`'s stderr.
pub fn parse_existing_revision(stderr: &str) -> Option<Revision> {
    stderr
        .lines()
        .filter(|line| line.contains(EXISTING_REVISION_MARKER))
        .find_map(|line| {
            let rev = line.rsplit(": ").next()?.trim();
            (!rev.is_empty()).then(|| Revision::new(rev))
        })
}

fn second_token(line: &str) -> Option<Revision> {
    line.split_whitespace().nth(1).map(Revision::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    const PACK_TRANSCRIPT: &str = "\
Packing the charm.
Created 'my-charm_ubuntu-22.04-amd64.charm'.
Charms packed:
    my-charm_ubuntu-22.04-amd64.charm
";

    #[test]
    fn finds_packed_artifact_name() {
        assert_eq!(
            parse_packed_artifact(PACK_TRANSCRIPT).as_deref(),
            Some("my-charm_ubuntu-22.04-amd64.charm")
        );
    }

    #[test]
    fn pack_without_artifact_line() {
        assert!(parse_packed_artifact("Packing the charm.\nDone.\n").is_none());
        assert!(parse_packed_artifact("").is_none());
        assert!(parse_packed_artifact("   .charm\n").is_none());
    }

    #[test]
    fn pack_skips_bare_suffix_line() {
        let out = "  .charm\nmy-charm_amd64.charm\n";
        assert_eq!(
            parse_packed_artifact(out).as_deref(),
            Some("my-charm_amd64.charm")
        );
    }

    #[test]
    fn resource_revision_from_upload_output() {
        let out = "Revision 3 created of resource 'app-image' for charm 'my-charm'.\n";
        assert_eq!(parse_resource_revision(out).unwrap(), "3");
    }

    #[test]
    fn resource_revision_requires_line_prefix() {
        assert!(parse_resource_revision("Uploaded. Revision 3 created\n").is_none());
        assert!(parse_resource_revision("Revision\n").is_none());
    }

    #[test]
    fn created_revision_from_upload_output() {
        assert_eq!(
            parse_created_revision("Revision 7 created\n").unwrap(),
            "7"
        );
        assert_eq!(
            parse_created_revision("Uploading...\nRevision 12 of 'my-charm' created\n").unwrap(),
            "12"
        );
        assert!(parse_created_revision("Revision 7 rejected\n").is_none());
    }

    #[test]
    fn existing_revision_from_rejected_upload() {
        let stderr = "Uploading...\nThe store rejected the upload. Revision of the existing package is: 4\n";
        assert_eq!(parse_existing_revision(stderr).unwrap(), "4");
        assert!(parse_existing_revision("Upload failed: unauthorized\n").is_none());
        assert!(parse_existing_revision("Revision of the existing package is: \n").is_none());
    }

    #[test]
    fn release_builds_resource_flags() {
        let runner = MockRunner::new().respond(
            "charmcraft",
            &[
                "release",
                "my-charm",
                "--revision",
                "9",
                "--channel=beta",
                "--resource=app-image:3",
            ],
            ToolOutput::ok("Released.\n"),
        );
        let cc = Charmcraft::new(&runner, "charmcraft");
        let out = cc
            .release(
                "my-charm",
                &Revision::new("9"),
                "beta",
                &["app-image:3".to_owned()],
            )
            .unwrap();
        assert!(out.success());
    }

    #[test]
    fn pack_runs_in_charm_dir() {
        let runner = MockRunner::new().respond("charmcraft", &["pack"], ToolOutput::ok(""));
        Charmcraft::new(&runner, "charmcraft")
            .pack(Path::new("/work/my-charm"))
            .unwrap();
        let calls = runner.calls();
        assert_eq!(calls[0].cwd.as_deref(), Some(Path::new("/work/my-charm")));
    }

    #[test]
    fn upload_resource_passes_digest() {
        let runner = MockRunner::new().respond(
            "charmcraft",
            &[
                "upload-resource",
                "--image",
                "sha256:abc",
                "my-charm",
                "app-image",
            ],
            ToolOutput::ok("Revision 1 created\n"),
        );
        let out = Charmcraft::new(&runner, "charmcraft")
            .upload_resource("my-charm", "app-image", &ImageDigest::new("sha256:abc"))
            .unwrap();
        assert_eq!(parse_resource_revision(&out.stdout).unwrap(), "1");
    }
}
