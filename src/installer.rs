use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};

use crate::report::Reporter;
use crate::requirement::Requirement;
use crate::verify::find_local_artifacts;

pub trait PackageInstaller {
    fn upgrade_self(&self, pip: &Path) -> Result<()>;

    /// Installs one requirement, offline from `find_links` when given.
    fn install(&self, pip: &Path, requirement: &str, find_links: Option<&Path>) -> Result<()>;
}

pub struct PipInstaller;

fn run_pip(pip: &Path, args: &[&OsStr]) -> Result<()> {
    let status = Command::new(pip)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run {}", pip.display()))?;
    if status.success() {
        return Ok(());
    }

    let rendered = args
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    Err(anyhow!(
        "`{} {}` exited with code {:?}",
        pip.display(),
        rendered,
        status.code()
    ))
}

impl PackageInstaller for PipInstaller {
    fn upgrade_self(&self, pip: &Path) -> Result<()> {
        run_pip(pip, &[OsStr::new("install"), OsStr::new("--upgrade"), OsStr::new("pip")])
    }

    fn install(&self, pip: &Path, requirement: &str, find_links: Option<&Path>) -> Result<()> {
        let Some(dir) = find_links else {
            return run_pip(pip, &[OsStr::new("install"), OsStr::new(requirement)]);
        };

        let dir = dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", dir.display()))?;
        run_pip(
            pip,
            &[
                OsStr::new("install"),
                OsStr::new("--no-index"),
                OsStr::new("--find-links"),
                dir.as_os_str(),
                OsStr::new(requirement),
            ],
        )
    }
}

/// Installs each requirement offline when its artifact is cached, from the
/// network otherwise. The first failure aborts.
pub fn install_requirements(
    installer: &dyn PackageInstaller,
    pip: &Path,
    requirements: &[String],
    cache_dir: &Path,
    reporter: &dyn Reporter,
) -> Result<()> {
    reporter.highlight("Installing packages...");

    for requirement in requirements {
        let parsed = Requirement::parse(requirement);
        let cached = parsed
            .resolved()
            .map(|package| !find_local_artifacts(cache_dir, &package).is_empty())
            .unwrap_or(false);

        if cached {
            reporter.info(&format!("Installing {}...", parsed.name));
            installer.install(pip, requirement, Some(cache_dir))?;
        } else {
            reporter.warn(&format!(
                "No local artifact for {}, installing from the index...",
                parsed.name
            ));
            installer.install(pip, requirement, None)?;
        }
    }

    reporter.success("All packages installed successfully!");
    Ok(())
}
