// The interactive session: a small state machine that walks the user from
// API key to progress bar. Each state handler does one suspension (a
// prompt or a backend call) and returns the next state, carrying whatever
// it produced. The driver is a plain loop, so "check another project?"
// and "pick a different project" never grow the stack.

use crate::api::{Client, ClientSummary, Estimate, EstimateUpdate, Gateway, ProjectEstimate};
use crate::config::{ApiKey, CredentialStore};
use crate::error::{ConfigError, WorkflowError};
use crate::report::{self, Report};
use crate::ui::{Prompter, Renderer};
use chrono::NaiveDate;
use tracing::{error, info, warn};

pub const API_KEY_PROMPT: &str =
    "Please enter your Toggl API key (visit \"My Profile\" on https://toggl.com/ )";
pub const START_DATE_PROMPT: &str = "Please enter a starting date (YYYY-MM-DD)";
pub const WORKSPACE_PROMPT: &str = "Please select a Workspace";
pub const CLIENT_PROMPT: &str = "Please select a Client";
pub const PROJECT_PROMPT: &str = "Please select a Project";
pub const SET_ESTIMATE_PROMPT: &str = "No estimate found, would you like to set one?";
pub const ESTIMATE_PROMPT: &str = "Please enter an estimate in number of hours";
pub const RATE_PROMPT: &str = "Please enter an hourly rate in dollars";
pub const AGAIN_PROMPT: &str = "Check another project?";

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user declined to check another project.
    Finished,
    /// A step failed; the error was logged and shown.
    Failed,
}

/// What is known once a client has been loaded. Re-selecting a project
/// reuses it without going back to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub start_date: String,
    pub workspace_id: u64,
    pub client: Client,
}

#[derive(Debug)]
enum State {
    AcquireCredential,
    PromptStartDate,
    SelectWorkspace {
        start_date: String,
    },
    SelectClient {
        start_date: String,
        workspace_id: u64,
    },
    LoadClientDetail {
        start_date: String,
        workspace_id: u64,
        client: ClientSummary,
    },
    SelectProject(Session),
    FetchProjectEstimate(Session, String),
    EstimateMissing(Session, ProjectEstimate),
    SetEstimate(Session, ProjectEstimate),
    ShowResults(Session, String, Estimate),
    RepeatOrExit,
    Done,
}

/// Today's date, read each time a start date is asked for.
pub type Clock = Box<dyn Fn() -> NaiveDate>;

/// Drives one or more sessions against the given collaborators.
pub struct Workflow<S, G, P, R> {
    store: S,
    gateway: G,
    prompter: P,
    renderer: R,
    clock: Clock,
    api_key: Option<ApiKey>,
}

impl<S, G, P, R> Workflow<S, G, P, R>
where
    S: CredentialStore,
    G: Gateway,
    P: Prompter,
    R: Renderer,
{
    pub fn new(
        store: S,
        gateway: G,
        prompter: P,
        renderer: R,
        clock: impl Fn() -> NaiveDate + 'static,
    ) -> Self {
        Workflow {
            store,
            gateway,
            prompter,
            renderer,
            clock: Box::new(clock),
            api_key: None,
        }
    }

    /// Run until the user is done or a step fails. Failures are logged,
    /// shown as a short message and never escape as errors.
    pub fn run(&mut self) -> Outcome {
        let mut state = State::AcquireCredential;
        loop {
            if let State::Done = state {
                return Outcome::Finished;
            }
            state = match self.step(state) {
                Ok(next) => next,
                Err(e) => {
                    self.report_failure(&e);
                    return Outcome::Failed;
                }
            };
        }
    }

    fn report_failure(&mut self, e: &WorkflowError) {
        error!(error = %e, "session aborted");
        self.renderer.stop();
        self.renderer.notice(&e.user_message());
    }

    fn step(&mut self, state: State) -> Result<State, WorkflowError> {
        match state {
            State::AcquireCredential => self.acquire_credential(),
            State::PromptStartDate => self.prompt_start_date(),
            State::SelectWorkspace { start_date } => self.select_workspace(start_date),
            State::SelectClient {
                start_date,
                workspace_id,
            } => self.select_client(start_date, workspace_id),
            State::LoadClientDetail {
                start_date,
                workspace_id,
                client,
            } => self.load_client_detail(start_date, workspace_id, client),
            State::SelectProject(session) => self.select_project(session),
            State::FetchProjectEstimate(session, project) => {
                self.fetch_project_estimate(session, project)
            }
            State::EstimateMissing(session, project) => self.estimate_missing(session, project),
            State::SetEstimate(session, project) => self.set_estimate(session, project),
            State::ShowResults(session, project, estimate) => {
                self.show_results(session, project, estimate)
            }
            State::RepeatOrExit => self.repeat_or_exit(),
            State::Done => Ok(State::Done),
        }
    }

    fn key(&self) -> Result<&ApiKey, WorkflowError> {
        // only reachable after AcquireCredential succeeded
        self.api_key.as_ref().ok_or_else(|| {
            WorkflowError::Config(ConfigError::NotFound {
                path: "config.json".into(),
            })
        })
    }

    fn acquire_credential(&mut self) -> Result<State, WorkflowError> {
        let key = match self.store.load() {
            Ok(key) => key,
            Err(ConfigError::NotFound { path }) => {
                info!(path = %path.display(), "no config file, asking for API key");
                let entered = self.prompter.input(
                    API_KEY_PROMPT,
                    None,
                    Some(report::validate_api_key),
                )?;
                self.store.save(&ApiKey::new(entered.trim()))?;
                self.store.load()?
            }
            Err(e) => return Err(e.into()),
        };
        self.api_key = Some(key);
        Ok(State::PromptStartDate)
    }

    fn prompt_start_date(&mut self) -> Result<State, WorkflowError> {
        let default = report::default_start_date((self.clock)());
        let start_date = self.prompter.input(
            START_DATE_PROMPT,
            Some(&default),
            Some(report::validate_date),
        )?;
        info!(%start_date, "start date chosen");
        Ok(State::SelectWorkspace { start_date })
    }

    fn select_workspace(&mut self, start_date: String) -> Result<State, WorkflowError> {
        self.renderer.start("Loading Workspaces");
        let workspaces = self
            .gateway
            .workspaces(self.key()?)
            .inspect_err(|_| self.renderer.fail("Failed to load Workspaces"))?;
        self.renderer.succeed("Loaded Workspaces");
        if workspaces.is_empty() {
            return Err(WorkflowError::NoWorkspaces);
        }

        let names: Vec<String> = workspaces.iter().map(|w| w.name.clone()).collect();
        let choice = self.prompter.select(WORKSPACE_PROMPT, &names)?;
        let workspace = &workspaces[choice];
        info!(workspace_id = workspace.id, name = %workspace.name, "workspace selected");
        Ok(State::SelectClient {
            start_date,
            workspace_id: workspace.id,
        })
    }

    fn select_client(
        &mut self,
        start_date: String,
        workspace_id: u64,
    ) -> Result<State, WorkflowError> {
        self.renderer.start("Loading Clients");
        let mut clients = self
            .gateway
            .clients(workspace_id, self.key()?)
            .inspect_err(|_| self.renderer.fail("Failed to load Clients"))?;
        self.renderer.succeed("Loaded Clients");
        if clients.is_empty() {
            return Err(WorkflowError::NoClients);
        }

        let names: Vec<String> = clients.iter().map(|c| c.name.clone()).collect();
        let choice = self.prompter.select(CLIENT_PROMPT, &names)?;
        let client = clients.swap_remove(choice);
        info!(client_id = client.id, name = %client.name, "client selected");
        Ok(State::LoadClientDetail {
            start_date,
            workspace_id,
            client,
        })
    }

    fn load_client_detail(
        &mut self,
        start_date: String,
        workspace_id: u64,
        summary: ClientSummary,
    ) -> Result<State, WorkflowError> {
        self.renderer
            .start(&format!("Loading info for {}", summary.name));
        let client = self
            .gateway
            .client(workspace_id, summary.id, &start_date, self.key()?)
            .inspect_err(|_| {
                self.renderer
                    .fail(&format!("Failed to load info for {}", summary.name))
            })?;
        self.renderer
            .succeed(&format!("Loaded info for {}", summary.name));
        if client.projects.is_empty() {
            return Err(WorkflowError::NoProjects {
                client: client.name,
            });
        }
        Ok(State::SelectProject(Session {
            start_date,
            workspace_id,
            client,
        }))
    }

    fn select_project(&mut self, session: Session) -> Result<State, WorkflowError> {
        let names: Vec<String> = session
            .client
            .projects
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let choice = self.prompter.select(PROJECT_PROMPT, &names)?;
        let project = names[choice].clone();
        Ok(State::FetchProjectEstimate(session, project))
    }

    fn fetch_project_estimate(
        &mut self,
        session: Session,
        project_name: String,
    ) -> Result<State, WorkflowError> {
        self.renderer
            .start(&format!("Loading info for {project_name}"));
        let project = self
            .gateway
            .project(session.client.id, &project_name, self.key()?)
            .inspect_err(|_| {
                self.renderer
                    .fail(&format!("Failed to load info for {project_name}"))
            })?;
        self.renderer.stop();

        match project.estimate() {
            Some(estimate) => Ok(State::ShowResults(session, project_name, estimate)),
            None => Ok(State::EstimateMissing(session, project)),
        }
    }

    fn estimate_missing(
        &mut self,
        session: Session,
        project: ProjectEstimate,
    ) -> Result<State, WorkflowError> {
        info!(project = %project.name, "project has no estimate");
        if self.prompter.confirm(SET_ESTIMATE_PROMPT)? {
            Ok(State::SetEstimate(session, project))
        } else {
            Ok(State::SelectProject(session))
        }
    }

    fn set_estimate(
        &mut self,
        session: Session,
        project: ProjectEstimate,
    ) -> Result<State, WorkflowError> {
        let hours = self
            .prompter
            .input(ESTIMATE_PROMPT, None, Some(report::validate_hours))?;
        let rate = self
            .prompter
            .input(RATE_PROMPT, None, Some(report::validate_rate))?;
        let requested = Estimate {
            hours: number(&hours, report::HOURS_MESSAGE)?,
            rate: number(&rate, report::RATE_MESSAGE)?,
        };

        let update = EstimateUpdate {
            client_id: session.client.id,
            project_name: project.name.clone(),
            estimate: requested.hours,
            rate: requested.rate,
        };
        self.renderer
            .start(&format!("Saving info for {}", project.name));
        let updated = self
            .gateway
            .update_project(&update, self.key()?)
            .inspect_err(|_| {
                self.renderer
                    .fail(&format!("Failed to save info for {}", project.name))
            })?;
        self.renderer
            .succeed(&format!("Saved info for {}", project.name));
        info!(project = %project.name, hours = requested.hours, rate = requested.rate, "estimate saved");

        let estimate = updated.estimate().unwrap_or(requested);
        Ok(State::ShowResults(session, project.name, estimate))
    }

    fn show_results(
        &mut self,
        session: Session,
        project_name: String,
        estimate: Estimate,
    ) -> Result<State, WorkflowError> {
        let effort = match session.client.project(&project_name) {
            Some(p) => p.effort,
            None => {
                warn!(project = %project_name, client = %session.client.name, "no effort recorded");
                0
            }
        };
        let report = Report::new(project_name, effort, estimate);
        info!(
            project = %report.project,
            percentage = report.percentage,
            cost = report.cost,
            price = report.price,
            "progress computed"
        );
        self.renderer.show(&report);
        Ok(State::RepeatOrExit)
    }

    fn repeat_or_exit(&mut self) -> Result<State, WorkflowError> {
        if self.prompter.confirm(AGAIN_PROMPT)? {
            Ok(State::PromptStartDate)
        } else {
            Ok(State::Done)
        }
    }
}

/// Parse a prompt answer that already passed its validator.
fn number(input: &str, message: &str) -> Result<f64, WorkflowError> {
    report::parse_validated(input).ok_or_else(|| {
        WorkflowError::Prompt(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            message.to_string(),
        ))
    })
}
