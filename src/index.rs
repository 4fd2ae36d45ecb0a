use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::config::IndexEndpoints;
use crate::error::{AcquireError, AcquireResult};
use crate::model::{ArtifactHead, DistributionUrl};
use crate::report::Reporter;
use crate::requirement::strip_declaration;
use crate::transport::{BodyStream, DOWNLOAD_TIMEOUT, METADATA_TIMEOUT, Transport};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("version pattern is a valid regex"));

#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    #[serde(default)]
    info: ReleaseInfo,
    #[serde(default)]
    urls: Vec<ReleaseFile>,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    url: String,
    #[serde(default)]
    packagetype: String,
    #[serde(default)]
    filename: String,
}

/// Anything that can list the declared dependencies of a release.
pub trait DependencySource {
    fn dependencies(&self, name: &str, version: &str) -> AcquireResult<Vec<String>>;
}

pub fn is_numeric_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

pub struct IndexClient<'a> {
    transport: &'a dyn Transport,
    endpoints: &'a IndexEndpoints,
    reporter: &'a dyn Reporter,
}

impl<'a> IndexClient<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        endpoints: &'a IndexEndpoints,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            transport,
            endpoints,
            reporter,
        }
    }

    pub fn endpoints(&self) -> &IndexEndpoints {
        self.endpoints
    }

    /// Declared dependencies of a release, markers and extras stripped. A
    /// malformed version yields an empty list without a request; transport
    /// and parse failures come back as errors for the caller to report.
    pub fn fetch_dependencies(&self, name: &str, version: &str) -> AcquireResult<Vec<String>> {
        let name = name.trim().to_lowercase();
        let version = version.trim();

        if !is_numeric_version(version) {
            self.reporter
                .warn(&format!("Invalid version for {name}: {version}"));
            return Ok(Vec::new());
        }

        let metadata = self.fetch_release(&name, version)?;
        let dependencies = metadata
            .info
            .requires_dist
            .unwrap_or_default()
            .iter()
            .map(|declaration| strip_declaration(declaration))
            .filter(|base| !base.is_empty() && !base.starts_with("python"))
            .map(str::to_string)
            .collect::<Vec<_>>();

        self.reporter.debug(&format!(
            "{name} {version} declares {} dependencies",
            dependencies.len()
        ));
        Ok(dependencies)
    }

    pub fn fetch_distribution_urls(
        &self,
        name: &str,
        version: &str,
    ) -> AcquireResult<Vec<DistributionUrl>> {
        let metadata = self.fetch_release(name, version)?;
        Ok(metadata
            .urls
            .into_iter()
            .map(|file| DistributionUrl {
                url: file.url,
                package_type: file.packagetype,
                filename: file.filename,
            })
            .collect())
    }

    /// Existence and size of an artifact, without downloading its body.
    pub fn head_artifact(&self, url: &str) -> AcquireResult<ArtifactHead> {
        let response = self.transport.head(url, METADATA_TIMEOUT)?;
        Ok(ArtifactHead {
            exists: response.status == 200,
            content_length: response.content_length.unwrap_or(0),
        })
    }

    pub fn open_artifact(&self, url: &str) -> AcquireResult<BodyStream> {
        self.transport.stream(url, DOWNLOAD_TIMEOUT)
    }

    fn fetch_release(&self, name: &str, version: &str) -> AcquireResult<ReleaseMetadata> {
        let url = self.endpoints.release_metadata_url(name, version);
        let body = self.transport.get_text(&url, METADATA_TIMEOUT)?;
        serde_json::from_str(&body).map_err(|e| AcquireError::MalformedMetadata {
            url,
            reason: e.to_string(),
        })
    }
}

impl DependencySource for IndexClient<'_> {
    fn dependencies(&self, name: &str, version: &str) -> AcquireResult<Vec<String>> {
        self.fetch_dependencies(name, version)
    }
}
