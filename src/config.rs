use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";
pub const DEFAULT_FILES_URL: &str = "https://files.pythonhosted.org";

const INDEX_URL_ENV: &str = "HERMES_INDEX_URL";
const FILES_URL_ENV: &str = "HERMES_FILES_URL";
const PYTHON_ENV: &str = "HERMES_PYTHON";

const REQUIREMENTS_FILE: &str = "requirements.txt";
const CACHE_DIR: &str = "requirements";
const VENV_DIR: &str = "venv";
const LOGS_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEndpoints {
    pub index_url: String,
    pub files_url: String,
}

impl Default for IndexEndpoints {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            files_url: DEFAULT_FILES_URL.to_string(),
        }
    }
}

impl IndexEndpoints {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |key: &str, fallback: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            index_url: pick(INDEX_URL_ENV, DEFAULT_INDEX_URL),
            files_url: pick(FILES_URL_ENV, DEFAULT_FILES_URL),
        }
    }

    pub fn with_overrides(mut self, index_url: Option<String>, files_url: Option<String>) -> Self {
        if let Some(url) = index_url {
            self.index_url = url;
        }
        if let Some(url) = files_url {
            self.files_url = url;
        }
        self
    }

    pub fn release_metadata_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/pypi/{}/{}/json",
            self.index_url.trim_end_matches('/'),
            name,
            version
        )
    }

    pub fn wheel_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/packages/py3/{}/{}/{}-{}-py3-none-any.whl",
            self.files_url.trim_end_matches('/'),
            first_letter(name),
            name,
            name,
            version
        )
    }

    pub fn source_archive_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/packages/source/{}/{}/{}-{}.tar.gz",
            self.files_url.trim_end_matches('/'),
            first_letter(name),
            name,
            name,
            version
        )
    }
}

fn first_letter(name: &str) -> String {
    name.chars().next().map(String::from).unwrap_or_default()
}

pub fn python_interpreter() -> String {
    match env::var(PYTHON_ENV) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ if cfg!(windows) => "python".to_string(),
        _ => "python3".to_string(),
    }
}

/// Directory layout of an installer root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn requirements_file(&self) -> PathBuf {
        self.root.join(REQUIREMENTS_FILE)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.root.join(VENV_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in [self.logs_dir(), self.cache_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let requirements = self.requirements_file();
        if !requirements.exists() {
            return Err(anyhow!("{} not found", requirements.display()));
        }
        Ok(())
    }
}
