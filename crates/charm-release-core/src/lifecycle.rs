use crate::CoreError;
use std::fmt;

/// Stages of a release run, visited exactly once each in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Load,
    Pack,
    ResolveResources,
    UploadArtifact,
    Release,
    Released,
}

impl Stage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Load),
            Self::Load => Some(Self::Pack),
            Self::Pack => Some(Self::ResolveResources),
            Self::ResolveResources => Some(Self::UploadArtifact),
            Self::UploadArtifact => Some(Self::Release),
            Self::Release => Some(Self::Released),
            Self::Released => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Load => "load",
            Self::Pack => "pack",
            Self::ResolveResources => "resolve-resources",
            Self::UploadArtifact => "upload-artifact",
            Self::Release => "release",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

/// Steps of resolving a single OCI image resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStep {
    Pull,
    DigestLookup,
    Upload,
}

impl fmt::Display for ResourceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pull => "pull",
            Self::DigestLookup => "digest-lookup",
            Self::Upload => "upload",
        };
        f.write_str(name)
    }
}

pub fn validate_transition(from: Stage, to: Stage) -> Result<(), CoreError> {
    if from.next() == Some(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
