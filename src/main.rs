mod app;
mod cancel;
mod config;
mod download;
mod environment;
mod error;
mod index;
mod installer;
mod locator;
mod logging;
mod model;
mod report;
mod requirement;
#[cfg(test)]
mod testing;
mod transport;
mod verify;
mod walker;

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{CliCommand, Services};
use crate::config::{IndexEndpoints, Layout};
use crate::cancel::CancelFlag;
use crate::environment::VenvProvisioner;
use crate::installer::PipInstaller;
use crate::report::{ConsoleReporter, Reporter};
use crate::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "hermes-installer")]
#[command(about = "Downloads, verifies and installs Python packages into a local virtual environment")]
struct Cli {
    /// Installer root holding requirements.txt, requirements/, venv/ and logs/.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Package index base URL.
    #[arg(long, global = true)]
    index_url: Option<String>,

    /// Artifact host base URL.
    #[arg(long, global = true)]
    files_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolves, downloads and installs everything in requirements.txt.
    Install {
        /// Answer yes to every prompt.
        #[arg(short, long)]
        yes: bool,

        /// Only fetch the listed requirements, not their dependencies.
        #[arg(long)]
        no_deps: bool,
    },

    /// Prints the transitive requirement set.
    Resolve,

    /// Checks cached artifacts against the index and drops broken ones.
    Verify,

    /// Downloads the given requirements (or requirements.txt) into the cache.
    Download { requirements: Vec<String> },
}

fn main() {
    if let Err(error) = run_main() {
        ConsoleReporter.error(&format!("Error: {error:#}"));
        std::process::exit(1);
    }
}

fn run_main() -> Result<()> {
    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir()?,
    };
    let layout = Layout::new(root);
    let _log_guard = logging::init(&layout.logs_dir())?;
    tracing::debug!(root = %layout.root().display(), "starting hermes-installer");

    let reporter = ConsoleReporter;
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    let handler = move || {
        // Nothing to clean up outside a transfer, so stop right away.
        if !handler_flag.interrupt() {
            std::process::exit(130);
        }
    };
    if let Err(error) = ctrlc::set_handler(handler) {
        reporter.warn(&format!("Failed to install the Ctrl+C handler: {error}"));
    }

    let endpoints = IndexEndpoints::from_env().with_overrides(cli.index_url, cli.files_url);
    let transport = HttpTransport::new()?;
    let provisioner = VenvProvisioner::new(config::python_interpreter());
    let installer = PipInstaller;

    let command = match cli.command.unwrap_or(Commands::Install {
        yes: false,
        no_deps: false,
    }) {
        Commands::Install { yes, no_deps } => CliCommand::Install {
            assume_yes: yes,
            no_deps,
        },
        Commands::Resolve => CliCommand::Resolve,
        Commands::Verify => CliCommand::Verify,
        Commands::Download { requirements } => CliCommand::Download { requirements },
    };

    let services = Services {
        transport: &transport,
        reporter: &reporter,
        provisioner: &provisioner,
        installer: &installer,
        endpoints: &endpoints,
        cancel,
    };

    let outcome = app::run(&services, &layout, command);
    tracing::debug!(ok = outcome.is_ok(), "finishing hermes-installer");
    outcome
}
