// Entrypoint for the `progress` CLI.
// - Parses flags, sets up logging, builds the real collaborators and hands
//   them to the workflow.
// - The exit code reflects whether the session ended normally.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use toggl_progress::api::ApiClient;
use toggl_progress::config::{FileStore, Settings, DEFAULT_TIMEOUT_SECS};
use toggl_progress::logging;
use toggl_progress::ui::{TerminalPrompter, TerminalRenderer};
use toggl_progress::workflow::{Outcome, Workflow};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "progress",
    version,
    about = "View progress on Toggl projects",
    disable_version_flag = true
)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: (),

    /// Use the local development backend (http://localhost:3000)
    #[arg(long)]
    dev: bool,

    /// Backend base URL, overriding --dev
    #[arg(long, env = "PROGRESS_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// Seconds to wait for each backend request
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Delete the stored API key and log file, then exit
    #[arg(long)]
    reset: bool,

    /// Mirror log output on stderr
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.reset {
        // before logging opens its file in the same directory
        return reset(&FileStore::in_home());
    }
    logging::init(cli.verbose);

    match run(cli) {
        Ok(Outcome::Finished) => ExitCode::SUCCESS,
        Ok(Outcome::Failed) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let store = FileStore::in_home();
    let settings = Settings::resolve(cli.api_url, cli.dev, cli.timeout);
    info!(base_url = %settings.base_url, "starting session");
    let api = ApiClient::new(&settings).context("Failed to build HTTP client")?;

    let mut workflow = Workflow::new(
        store,
        api,
        TerminalPrompter,
        TerminalRenderer::new(),
        || Local::now().date_naive(),
    );
    Ok(workflow.run())
}

fn reset(store: &FileStore) -> ExitCode {
    match store.reset() {
        Ok(0) => {
            println!("Nothing to remove in {}", store.dir().display());
            ExitCode::SUCCESS
        }
        Ok(removed) => {
            println!("Removed {removed} file(s) from {}", store.dir().display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
