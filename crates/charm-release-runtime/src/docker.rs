//! `docker` command lines for pulling images and resolving their digests.

use crate::runner::{Invocation, ToolOutput, ToolRunner};
use crate::RuntimeError;
use charm_release_schema::{ImageDigest, ImageReference};
use tracing::debug;

/// Placeholder docker prints for images that have no registry digest.
const NO_DIGEST: &str = "<none>";

pub struct Docker<'a> {
    runner: &'a dyn ToolRunner,
    program: &'a str,
}

impl<'a> Docker<'a> {
    pub fn new(runner: &'a dyn ToolRunner, program: &'a str) -> Self {
        Self { runner, program }
    }

    /// `docker pull <name:tag>`.
    pub fn pull(&self, image: &ImageReference) -> Result<ToolOutput, RuntimeError> {
        self.runner.run(
            &Invocation::new(self.program)
                .arg("pull")
                .arg(image.to_string()),
        )
    }

    /// List every local tag of `image_name` with its untruncated digest.
    pub fn list_digests(&self, image_name: &str) -> Result<ToolOutput, RuntimeError> {
        self.runner.run(
            &Invocation::new(self.program)
                .args(["images", "--no-trunc", "--filter"])
                .arg(format!("reference={image_name}"))
                .args(["--format", "{{.Tag}} {{.Digest}}"]),
        )
    }
}

/// A `tag digest` pair from `docker images --format "{{.Tag}} {{.Digest}}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDigest {
    pub tag: String,
    pub digest: ImageDigest,
}

/// Parse one pair per line. Lines that are not exactly two fields, and tags
/// without a registry digest, are dropped.
pub fn parse_tag_digests(stdout: &str) -> Vec<TagDigest> {
    let mut pairs = Vec::new();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [tag, digest] = fields.as_slice() else {
            if !line.trim().is_empty() {
                debug!("ignoring unexpected docker images line: {line}");
            }
            continue;
        };
        if *digest == NO_DIGEST {
            continue;
        }
        pairs.push(TagDigest {
            tag: (*tag).to_owned(),
            digest: ImageDigest::new(*digest),
        });
    }
    pairs
}

/// Digest of the entry whose tag is exactly `tag`.
pub fn find_digest(stdout: &str, tag: &str) -> Option<ImageDigest> {
    parse_tag_digests(stdout)
        .into_iter()
        .find(|p| p.tag == tag)
        .map(|p| p.digest)
}
