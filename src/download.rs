use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::cancel::CancelFlag;
use crate::error::{AcquireError, AcquireResult};
use crate::index::IndexClient;
use crate::locator::ArtifactLocator;
use crate::model::ResolvedPackage;
use crate::report::Reporter;
use crate::requirement::Requirement;

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
}

pub struct Downloader<'a> {
    locator: &'a ArtifactLocator<'a>,
    index: &'a IndexClient<'a>,
    reporter: &'a dyn Reporter,
    cancel: CancelFlag,
}

impl<'a> Downloader<'a> {
    pub fn new(
        locator: &'a ArtifactLocator<'a>,
        index: &'a IndexClient<'a>,
        reporter: &'a dyn Reporter,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            locator,
            index,
            reporter,
            cancel,
        }
    }

    /// Returns true when the artifact is on disk afterwards. Failures are
    /// already reported.
    pub fn download(&self, requirement: &str, destination: &Path) -> bool {
        let Some(package) = Requirement::parse(requirement).resolved() else {
            self.reporter.warn(&format!(
                "Package {requirement} has no version specified, skipping..."
            ));
            return false;
        };

        match self.fetch(&package, destination) {
            Ok(DownloadOutcome::AlreadyPresent(path)) => {
                self.reporter.info(&format!(
                    "Package {} already present at {}",
                    package.name,
                    path.display()
                ));
                true
            }
            Ok(DownloadOutcome::Downloaded(_)) => {
                self.reporter
                    .success(&format!("Package {} downloaded successfully!", package.name));
                true
            }
            Err(error) if error.is_not_found() => {
                self.reporter.warn(&format!("{error}, skipping {requirement}"));
                false
            }
            Err(error) => {
                self.reporter
                    .error(&format!("Failed to download {}: {error}", package.name));
                false
            }
        }
    }

    /// Downloads every requirement and returns the ones that failed.
    pub fn download_all(&self, requirements: &[String], destination: &Path) -> Vec<String> {
        let mut failed = Vec::new();
        for requirement in requirements {
            if self.cancel.is_cancelled() {
                failed.push(requirement.clone());
                continue;
            }
            if !self.download(requirement, destination) {
                failed.push(requirement.clone());
            }
        }
        failed
    }

    pub fn fetch(
        &self,
        package: &ResolvedPackage,
        destination: &Path,
    ) -> AcquireResult<DownloadOutcome> {
        let location = self.locator.locate(&package.name, &package.version)?;
        let target = destination.join(package.file_name(&location.extension));
        if target.exists() {
            return Ok(DownloadOutcome::AlreadyPresent(target));
        }
        self.reporter.debug(&format!(
            "Fetching {} {} as {:?} from {}",
            package.name, package.version, location.kind, location.url
        ));

        self.reporter
            .info(&format!("Downloading {}...", package.name));
        fs::create_dir_all(destination).map_err(|e| AcquireError::io(destination, e))?;

        let _transfer = self.cancel.transfer();
        // Dropping the temp file on any early return removes it.
        let partial =
            NamedTempFile::new_in(destination).map_err(|e| AcquireError::io(destination, e))?;
        let body = self.index.open_artifact(&location.url)?;
        let bar = self.reporter.progress(&package.name, body.content_length);

        let streamed = self.stream_into(body.reader, partial, &location.url, &bar);
        bar.finish_and_clear();
        let partial = streamed?;

        partial
            .persist(&target)
            .map_err(|e| AcquireError::io(&target, e.error))?;
        Ok(DownloadOutcome::Downloaded(target))
    }

    fn stream_into(
        &self,
        mut reader: Box<dyn Read>,
        partial: NamedTempFile,
        url: &str,
        bar: &indicatif::ProgressBar,
    ) -> AcquireResult<NamedTempFile> {
        let path = partial.path().to_path_buf();
        let mut writer = BufWriter::new(partial);
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            if self.cancel.is_cancelled() {
                return Err(AcquireError::Interrupted {
                    url: url.to_string(),
                });
            }

            let read = reader.read(&mut buffer).map_err(|e| AcquireError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..read])
                .map_err(|e| AcquireError::io(&path, e))?;
            bar.inc(read as u64);
        }

        writer
            .into_inner()
            .map_err(|e| AcquireError::io(&path, e.into_error()))
    }
}
