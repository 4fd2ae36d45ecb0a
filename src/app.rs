use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::config::{IndexEndpoints, Layout};
use crate::cancel::CancelFlag;
use crate::download::Downloader;
use crate::environment::EnvironmentProvisioner;
use crate::index::IndexClient;
use crate::installer::{PackageInstaller, install_requirements};
use crate::locator::ArtifactLocator;
use crate::report::Reporter;
use crate::requirement::read_requirements;
use crate::transport::Transport;
use crate::verify::{CacheVerifier, VerifyReport};
use crate::walker::DependencyWalker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Install { assume_yes: bool, no_deps: bool },
    Resolve,
    Verify,
    Download { requirements: Vec<String> },
}

/// Collaborators of a run; the binary wires real ones, tests wire fakes.
pub struct Services<'a> {
    pub transport: &'a dyn Transport,
    pub reporter: &'a dyn Reporter,
    pub provisioner: &'a dyn EnvironmentProvisioner,
    pub installer: &'a dyn PackageInstaller,
    pub endpoints: &'a IndexEndpoints,
    pub cancel: CancelFlag,
}

pub fn run(services: &Services<'_>, layout: &Layout, command: CliCommand) -> Result<()> {
    let reporter = services.reporter;
    let index = IndexClient::new(services.transport, services.endpoints, reporter);
    let locator = ArtifactLocator::new(&index, reporter);
    let downloader = Downloader::new(&locator, &index, reporter, services.cancel.clone());
    let verifier =
        CacheVerifier::new(&locator, &index, reporter).with_cancel(services.cancel.clone());
    let walker = DependencyWalker::new(&index, reporter).with_cancel(services.cancel.clone());

    match command {
        CliCommand::Resolve => {
            let seeds = read_requirements(&layout.requirements_file())?;
            let closure = walker.resolve_closure(&seeds);
            check_cancelled(&services.cancel)?;
            if closure.is_empty() {
                reporter.warn("requirements.txt lists no packages");
                return Ok(());
            }
            reporter.highlight(&format!("Resolved {} requirement(s):", closure.len()));
            for raw in closure.iter() {
                println!("- {raw}");
            }
        }
        CliCommand::Verify => {
            let seeds = read_requirements(&layout.requirements_file())?;
            let report = verifier.verify(&seeds, &layout.cache_dir());
            check_cancelled(&services.cancel)?;
            print_report(reporter, &report);
        }
        CliCommand::Download { requirements } => {
            let requirements = if requirements.is_empty() {
                read_requirements(&layout.requirements_file())?
            } else {
                requirements
            };
            let failed = downloader.download_all(&requirements, &layout.cache_dir());
            check_cancelled(&services.cancel)?;
            if !failed.is_empty() {
                return Err(anyhow!(
                    "{} package(s) failed to download: {}",
                    failed.len(),
                    failed.join(", ")
                ));
            }
            reporter.success("All packages downloaded!");
        }
        CliCommand::Install {
            assume_yes,
            no_deps,
        } => {
            reporter.highlight("=== Hermes Installer ===");
            if !assume_yes && !confirm("Start the installation process?")? {
                reporter.info("Installation cancelled by user.");
                return Ok(());
            }

            layout.ensure()?;
            let seeds = read_requirements(&layout.requirements_file())?;
            reporter.debug(&format!("Read {} requirement(s)", seeds.len()));

            let targets = if no_deps {
                seeds.clone()
            } else {
                reporter.info("Resolving dependencies...");
                walker.resolve_closure(&seeds).into_vec()
            };
            check_cancelled(&services.cancel)?;

            reporter.info("Checking packages in the local cache...");
            let report = verifier.verify(&targets, &layout.cache_dir());
            check_cancelled(&services.cancel)?;
            print_report(reporter, &report);

            if !report.is_clean() {
                reporter.info("Downloading missing and stale packages...");
                let failed = downloader.download_all(&report.needs_download(), &layout.cache_dir());
                check_cancelled(&services.cancel)?;
                if !failed.is_empty() {
                    reporter.warn(&format!("Failed to download: {}", failed.join(", ")));
                    if !assume_yes && !confirm("Some downloads failed. Continue anyway?")? {
                        reporter.error("Installation cancelled by user.");
                        return Ok(());
                    }
                }
            }

            if !assume_yes && !confirm("Install the packages now?")? {
                reporter.error("Installation cancelled by user.");
                return Ok(());
            }
            check_cancelled(&services.cancel)?;

            install_into_environment(services, layout, &seeds)?;
        }
    }

    Ok(())
}

fn install_into_environment(services: &Services<'_>, layout: &Layout, seeds: &[String]) -> Result<()> {
    let reporter = services.reporter;
    let venv = layout.venv_dir();

    if services.provisioner.create(&venv)? {
        reporter.success("Virtual environment created!");
    }
    let paths = services
        .provisioner
        .locate(&venv)
        .context("Failed to activate the virtual environment")?;
    reporter.debug(&format!(
        "Environment python: {}, pip: {}",
        paths.python.display(),
        paths.pip.display()
    ));

    reporter.info("Upgrading pip...");
    services.installer.upgrade_self(&paths.pip)?;

    install_requirements(
        services.installer,
        &paths.pip,
        seeds,
        &layout.cache_dir(),
        reporter,
    )?;

    reporter.success("Installation finished successfully!");
    reporter.highlight("To activate the virtual environment:");
    println!("{}", activation_hint(Path::new("venv")));
    Ok(())
}

fn activation_hint(venv: &Path) -> String {
    if cfg!(windows) {
        format!("{}\\Scripts\\activate", venv.display())
    } else {
        format!("source {}/bin/activate", venv.display())
    }
}

fn check_cancelled(cancel: &CancelFlag) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(anyhow!("Interrupted by user"));
    }
    Ok(())
}

fn print_report(reporter: &dyn Reporter, report: &VerifyReport) {
    if !report.missing.is_empty() {
        reporter.warn("Missing packages:");
        for requirement in &report.missing {
            println!("- {requirement}");
        }
    }
    if !report.stale.is_empty() {
        reporter.warn("Outdated or corrupted packages:");
        for requirement in &report.stale {
            println!("- {requirement}");
        }
    }
    if !report.unpinned.is_empty() {
        reporter.debug(&format!(
            "Requirements without a version: {}",
            report.unpinned.join(", ")
        ));
    }
    if report.is_clean() {
        reporter.success("All packages are up to date!");
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read answer")?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
