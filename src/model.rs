use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A requirement reduced to an exact, processable name/version pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
}

impl ResolvedPackage {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            version: version.trim().to_string(),
        }
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}-{}{}", self.name, self.version, extension)
    }

    pub fn file_prefix(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Wheel,
    SourceArchive,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub url: String,
    pub extension: String,
    pub kind: ArtifactKind,
    /// HEAD answer seen while locating; absent for index listings.
    pub remote: Option<ArtifactHead>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionUrl {
    pub url: String,
    pub package_type: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHead {
    pub exists: bool,
    pub content_length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPaths {
    pub python: PathBuf,
    pub pip: PathBuf,
}
