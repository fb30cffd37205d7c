// Error types shared by the credential store, the API client and the
// interactive workflow. Every failure the workflow can hit ends up as a
// `WorkflowError`, which knows the short message shown to the user.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the local credential file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file does not exist yet (first run).
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Reading failed for a reason other than the file being absent.
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating the directory, writing or deleting failed.
    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not the JSON object we wrote.
    #[error("config file {} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the progress backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service could not be reached at all.
    #[error("could not connect to {url}")]
    ConnectionRefused { url: String },

    /// The service answered with a non-success status.
    #[error("request failed with {status}: {body}")]
    Application { status: u16, body: String },

    /// No usable response: timeout, dropped connection or undecodable body.
    #[error("no response: {message}")]
    NoResponse { message: String },

    /// The stored key cannot be sent as an HTTP header value.
    #[error("API key contains characters not allowed in a header")]
    InvalidApiKey,
}

/// Everything that can end an interactive session early.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no workspaces found for this API key")]
    NoWorkspaces,

    #[error("no clients found in this workspace")]
    NoClients,

    #[error("client {client} has no projects")]
    NoProjects { client: String },

    #[error("prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

impl WorkflowError {
    /// Short text shown on the console. Full detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Config(ConfigError::Malformed { path, .. }) => {
                format!("The config file {} could not be read", path.display())
            }
            WorkflowError::Config(ConfigError::Write { .. }) => {
                "There was an error with writing to the filesystem".to_string()
            }
            WorkflowError::Config(_) => "Could not read the config file".to_string(),
            WorkflowError::Api(ApiError::ConnectionRefused { .. }) => {
                "Could not connect to server".to_string()
            }
            WorkflowError::Api(ApiError::Application { status, body }) => {
                if body.trim().is_empty() {
                    format!("Request failed with status {status}")
                } else {
                    body.clone()
                }
            }
            WorkflowError::Api(ApiError::NoResponse { .. }) => {
                "No response from server".to_string()
            }
            WorkflowError::Api(ApiError::InvalidApiKey) => {
                "The stored API key is not valid, run with --reset to enter it again".to_string()
            }
            WorkflowError::NoWorkspaces => "No workspaces found".to_string(),
            WorkflowError::NoClients => "No clients found in this workspace".to_string(),
            WorkflowError::NoProjects { client } => format!("{client} has no projects"),
            WorkflowError::Prompt(e) => format!("Input aborted: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_refused_is_reported_as_could_not_connect() {
        let err = WorkflowError::from(ApiError::ConnectionRefused {
            url: "http://localhost:3000/workspaces".into(),
        });
        assert_eq!(err.user_message(), "Could not connect to server");
    }

    #[test]
    fn application_error_echoes_the_body() {
        let err = WorkflowError::from(ApiError::Application {
            status: 403,
            body: "Invalid API key".into(),
        });
        assert_eq!(err.user_message(), "Invalid API key");
    }

    #[test]
    fn empty_application_body_falls_back_to_status() {
        for body in ["", "  \n"] {
            let err = WorkflowError::from(ApiError::Application {
                status: 502,
                body: body.into(),
            });
            assert_eq!(err.user_message(), "Request failed with status 502");
        }
    }

    #[test]
    fn read_and_write_failures_have_distinct_messages() {
        let denied = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let read = WorkflowError::from(ConfigError::Read {
            path: "config.json".into(),
            source: denied(),
        });
        let write = WorkflowError::from(ConfigError::Write {
            path: "config.json".into(),
            source: denied(),
        });

        assert_eq!(read.user_message(), "Could not read the config file");
        assert_eq!(
            write.user_message(),
            "There was an error with writing to the filesystem"
        );
    }
}
