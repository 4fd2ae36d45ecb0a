use crate::error::{AcquireError, AcquireResult};
use crate::index::IndexClient;
use crate::model::{ArtifactKind, ArtifactLocation, DistributionUrl};
use crate::report::Reporter;

const WHEEL_EXTENSION: &str = ".whl";
const SOURCE_EXTENSION: &str = ".tar.gz";
const INSTALLABLE_TYPES: &[&str] = &["bdist_wheel", "wheel", "sdist"];

pub struct ArtifactLocator<'a> {
    index: &'a IndexClient<'a>,
    reporter: &'a dyn Reporter,
}

impl<'a> ArtifactLocator<'a> {
    pub fn new(index: &'a IndexClient<'a>, reporter: &'a dyn Reporter) -> Self {
        Self { index, reporter }
    }

    /// Finds one downloadable artifact: wheel, then source archive, then
    /// whatever the index lists for the release.
    pub fn locate(&self, name: &str, version: &str) -> AcquireResult<ArtifactLocation> {
        let endpoints = self.index.endpoints();

        let wheel_url = endpoints.wheel_url(name, version);
        let head = self.index.head_artifact(&wheel_url)?;
        if head.exists {
            return Ok(ArtifactLocation {
                url: wheel_url,
                extension: WHEEL_EXTENSION.to_string(),
                kind: ArtifactKind::Wheel,
                remote: Some(head),
            });
        }

        let source_url = endpoints.source_archive_url(name, version);
        let head = self.index.head_artifact(&source_url)?;
        if head.exists {
            return Ok(ArtifactLocation {
                url: source_url,
                extension: SOURCE_EXTENSION.to_string(),
                kind: ArtifactKind::SourceArchive,
                remote: Some(head),
            });
        }

        let listed = match self.index.fetch_distribution_urls(name, version) {
            Ok(listed) => listed,
            Err(error @ AcquireError::Network { .. }) => return Err(error),
            Err(error) => {
                self.reporter
                    .debug(&format!("Index lookup for {name} {version} failed: {error}"));
                Vec::new()
            }
        };

        choose_listed(&listed).ok_or_else(|| AcquireError::NotFound {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

fn choose_listed(listed: &[DistributionUrl]) -> Option<ArtifactLocation> {
    listed
        .iter()
        .find(|item| INSTALLABLE_TYPES.contains(&item.package_type.as_str()))
        .map(|item| ArtifactLocation {
            url: item.url.clone(),
            extension: extension_of(&item.filename),
            kind: ArtifactKind::Indexed,
            remote: None,
        })
}

pub fn extension_of(filename: &str) -> String {
    if filename.ends_with(SOURCE_EXTENSION) {
        return SOURCE_EXTENSION.to_string();
    }
    match filename.rfind('.') {
        Some(pos) if pos > 0 => filename[pos..].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{ArtifactLocator, extension_of};
    use crate::config::IndexEndpoints;
    use crate::index::IndexClient;
    use crate::model::{ArtifactHead, ArtifactKind};
    use crate::testing::{FakeTransport, RecordingReporter};

    const WHEEL: &str =
        "https://files.pythonhosted.org/packages/py3/s/six/six-1.16.0-py3-none-any.whl";
    const SDIST: &str = "https://files.pythonhosted.org/packages/source/s/six/six-1.16.0.tar.gz";
    const METADATA: &str = "https://pypi.org/pypi/six/1.16.0/json";

    fn locate(transport: &FakeTransport) -> crate::error::AcquireResult<crate::model::ArtifactLocation> {
        let endpoints = IndexEndpoints::default();
        let reporter = RecordingReporter::default();
        let index = IndexClient::new(transport, &endpoints, &reporter);
        ArtifactLocator::new(&index, &reporter).locate("six", "1.16.0")
    }

    #[test]
    fn prefers_wheel_over_source_archive() -> Result<()> {
        let transport = FakeTransport::new().with_head(WHEEL, 10).with_head(SDIST, 20);
        let location = locate(&transport)?;
        assert_eq!(location.url, WHEEL);
        assert_eq!(location.extension, ".whl");
        assert_eq!(location.kind, ArtifactKind::Wheel);
        assert_eq!(
            location.remote,
            Some(ArtifactHead {
                exists: true,
                content_length: 10
            })
        );
        assert_eq!(transport.request_count(), 1);
        Ok(())
    }

    #[test]
    fn falls_back_to_source_archive() -> Result<()> {
        let transport = FakeTransport::new().with_head(SDIST, 20);
        let location = locate(&transport)?;
        assert_eq!(location.url, SDIST);
        assert_eq!(location.extension, ".tar.gz");
        Ok(())
    }

    #[test]
    fn falls_back_to_index_listing() -> Result<()> {
        let body = r#"{"info": {}, "urls": [
            {"url": "https://files/six.exe", "packagetype": "bdist_wininst", "filename": "six.exe"},
            {"url": "https://files/six-1.16.0-py2.py3-none-any.whl", "packagetype": "bdist_wheel", "filename": "six-1.16.0-py2.py3-none-any.whl"}
        ]}"#;
        let transport = FakeTransport::new().with_text(METADATA, body);
        let location = locate(&transport)?;
        assert_eq!(location.url, "https://files/six-1.16.0-py2.py3-none-any.whl");
        assert_eq!(location.extension, ".whl");
        assert_eq!(location.kind, ArtifactKind::Indexed);
        assert_eq!(location.remote, None);
        Ok(())
    }

    #[test]
    fn not_found_when_nothing_qualifies() {
        let body = r#"{"info": {}, "urls": [
            {"url": "https://files/six.egg", "packagetype": "bdist_egg", "filename": "six.egg"}
        ]}"#;
        let transport = FakeTransport::new().with_text(METADATA, body);
        let error = locate(&transport).expect_err("no qualifying artifact");
        assert!(error.is_not_found());

        let empty = FakeTransport::new();
        let error = locate(&empty).expect_err("index has no release");
        assert!(error.is_not_found());
    }

    #[test]
    fn network_failure_is_not_reported_as_not_found() {
        let transport = FakeTransport::offline();
        let error = locate(&transport).expect_err("offline");
        assert!(!error.is_not_found());
    }

    #[test]
    fn derives_extension_from_filename() {
        assert_eq!(extension_of("pkg-1.0.tar.gz"), ".tar.gz");
        assert_eq!(extension_of("pkg-1.0-py3-none-any.whl"), ".whl");
        assert_eq!(extension_of("pkg-1.0.zip"), ".zip");
        assert_eq!(extension_of("noext"), "");
    }
}
