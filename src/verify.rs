use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::cancel::CancelFlag;
use crate::error::{AcquireError, AcquireResult};
use crate::index::IndexClient;
use crate::locator::ArtifactLocator;
use crate::model::ResolvedPackage;
use crate::report::Reporter;
use crate::requirement::Requirement;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub missing: Vec<String>,
    pub stale: Vec<String>,
    /// Requirements without a usable version; never cached, never touched.
    pub unpinned: Vec<String>,
}

impl VerifyReport {
    pub fn needs_download(&self) -> Vec<String> {
        self.missing.iter().chain(&self.stale).cloned().collect()
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

/// Artifacts in `dir` named `{name}-{version}*`, sorted.
pub fn find_local_artifacts(dir: &Path, package: &ResolvedPackage) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(&package.file_prefix())
    );
    let Ok(paths) = glob::glob(&pattern) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .collect();
    found.sort();
    found
}

pub struct CacheVerifier<'a> {
    locator: &'a ArtifactLocator<'a>,
    index: &'a IndexClient<'a>,
    reporter: &'a dyn Reporter,
    cancel: CancelFlag,
}

impl<'a> CacheVerifier<'a> {
    pub fn new(
        locator: &'a ArtifactLocator<'a>,
        index: &'a IndexClient<'a>,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            locator,
            index,
            reporter,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Classifies requirements against the local cache. Stale files are
    /// deleted on the spot.
    pub fn verify(&self, requirements: &[String], dir: &Path) -> VerifyReport {
        let mut report = VerifyReport::default();

        for requirement in requirements {
            if self.cancel.is_cancelled() {
                self.reporter.warn("Cache verification interrupted");
                break;
            }
            let Some(package) = Requirement::parse(requirement).resolved() else {
                report.unpinned.push(requirement.clone());
                continue;
            };

            let Some(local) = find_local_artifacts(dir, &package).into_iter().next() else {
                report.missing.push(requirement.clone());
                continue;
            };

            if let Err(error) = self.check(&package, &local) {
                self.reporter
                    .debug(&format!("{requirement} is stale: {error}"));
                report.stale.push(requirement.clone());
                if let Err(e) = fs::remove_file(&local) {
                    self.reporter
                        .error(&format!("Failed to remove {}: {e}", local.display()));
                }
            }
        }

        report
    }

    fn check(&self, package: &ResolvedPackage, local: &Path) -> AcquireResult<()> {
        let location = self.locator.locate(&package.name, &package.version)?;
        let head = match location.remote {
            Some(head) => head,
            None => self.index.head_artifact(&location.url)?,
        };
        let local_size = fs::metadata(local)
            .map_err(|e| AcquireError::io(local, e))?
            .len();

        if !head.exists || head.content_length != local_size {
            return Err(AcquireError::IntegrityMismatch {
                path: local.to_path_buf(),
                local: local_size,
                remote: head.content_length,
            });
        }
        Ok(())
    }
}
