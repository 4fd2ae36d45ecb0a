use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AcquireError, AcquireResult};
use crate::model::EnvironmentPaths;

pub trait EnvironmentProvisioner {
    /// Creates the environment unless it exists. Returns true when created.
    fn create(&self, path: &Path) -> AcquireResult<bool>;

    fn locate(&self, path: &Path) -> AcquireResult<EnvironmentPaths>;
}

pub fn environment_paths(venv: &Path) -> EnvironmentPaths {
    if cfg!(windows) {
        EnvironmentPaths {
            python: venv.join("Scripts").join("python.exe"),
            pip: venv.join("Scripts").join("pip.exe"),
        }
    } else {
        EnvironmentPaths {
            python: venv.join("bin").join("python"),
            pip: venv.join("bin").join("pip"),
        }
    }
}

/// Provisions environments with `python -m venv`.
pub struct VenvProvisioner {
    python: String,
}

impl VenvProvisioner {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl EnvironmentProvisioner for VenvProvisioner {
    fn create(&self, path: &Path) -> AcquireResult<bool> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "virtual environment already exists");
            return Ok(false);
        }

        let output = Command::new(&self.python)
            .arg("-m")
            .arg("venv")
            .arg(path)
            .output()
            .map_err(|e| AcquireError::io(PathBuf::from(&self.python), e))?;

        if !output.status.success() {
            tracing::error!(
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "venv creation failed"
            );
            return Err(AcquireError::EnvironmentMissing {
                path: path.to_path_buf(),
            });
        }

        self.locate(path)?;
        Ok(true)
    }

    fn locate(&self, path: &Path) -> AcquireResult<EnvironmentPaths> {
        let paths = environment_paths(path);
        if !path.exists() || !paths.python.exists() || !paths.pip.exists() {
            return Err(AcquireError::EnvironmentMissing {
                path: path.to_path_buf(),
            });
        }
        Ok(paths)
    }
}
