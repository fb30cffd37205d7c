// API client module: a small blocking HTTP client for the progress
// backend, which wraps the Toggl reports API and stores per-project
// estimates. The workflow only sees the `Gateway` trait, so tests can
// swap the network for canned answers.

use crate::config::{ApiKey, Settings};
use crate::error::ApiError;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Header carrying the Toggl API key on every request.
pub const ACCESS_KEY_HEADER: &str = "access-key";

/// A Toggl workspace as listed by `GET /workspaces`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Workspace {
    pub id: u64,
    pub name: String,
}

/// A client as listed by `GET /clients/{workspace}`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ClientSummary {
    pub id: u64,
    pub name: String,
}

/// A client with the effort of each of its projects since a start date.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Client {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub projects: Vec<ProjectEffort>,
}

impl Client {
    pub fn project(&self, name: &str) -> Option<&ProjectEffort> {
        self.projects.iter().find(|p| p.name == name)
    }
}

/// Tracked time for one project, in milliseconds.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectEffort {
    pub name: String,
    #[serde(default)]
    pub effort: u64,
}

/// The stored estimate record for a project. Both numbers are absent
/// until someone sets an estimate.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectEstimate {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub estimate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rate: Option<f64>,
}

/// A usable estimate: positive hours and an hourly rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub hours: f64,
    pub rate: f64,
}

impl ProjectEstimate {
    /// `None` when either number is missing or the estimate is zero.
    pub fn estimate(&self) -> Option<Estimate> {
        match (self.estimate, self.rate) {
            (Some(hours), Some(rate)) if hours > 0.0 => Some(Estimate { hours, rate }),
            _ => None,
        }
    }
}

/// Body of `PATCH /project`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EstimateUpdate {
    pub client_id: u64,
    pub project_name: String,
    pub estimate: f64,
    pub rate: f64,
}

/// Accepts a JSON number, a numeric string, an empty string or null.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a number, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// The backend operations the workflow needs. One call at a time.
pub trait Gateway {
    fn workspaces(&self, key: &ApiKey) -> Result<Vec<Workspace>, ApiError>;

    fn clients(&self, workspace_id: u64, key: &ApiKey) -> Result<Vec<ClientSummary>, ApiError>;

    /// Client detail with effort counted from `start_date` (`YYYY-MM-DD`).
    fn client(
        &self,
        workspace_id: u64,
        client_id: u64,
        start_date: &str,
        key: &ApiKey,
    ) -> Result<Client, ApiError>;

    fn project(
        &self,
        client_id: u64,
        project_name: &str,
        key: &ApiKey,
    ) -> Result<ProjectEstimate, ApiError>;

    fn update_project(
        &self,
        update: &EstimateUpdate,
        key: &ApiKey,
    ) -> Result<ProjectEstimate, ApiError>;
}

/// Blocking `Gateway` over HTTP. Holds the reqwest client and the base
/// URL chosen from the command line or environment.
#[derive(Clone)]
pub struct ApiClient {
    client: HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(ApiClient {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// JSON content type plus the `access-key` header.
    fn auth_headers(&self, key: &ApiKey) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let value = HeaderValue::from_str(key.as_str()).map_err(|_| ApiError::InvalidApiKey)?;
        headers.insert(ACCESS_KEY_HEADER, value);
        Ok(headers)
    }

    /// Send a request and decode a JSON success body. Non-success
    /// statuses become `ApiError::Application` carrying the body text.
    fn send<T: DeserializeOwned>(&self, req: RequestBuilder, url: &str) -> Result<T, ApiError> {
        debug!(url, "sending request");
        let res = req.send().map_err(|e| classify(url, e))?;
        let status = res.status();
        if !status.is_success() {
            let txt = res.text().unwrap_or_else(|_| "".into());
            debug!(url, status = status.as_u16(), "request rejected");
            return Err(ApiError::Application {
                status: status.as_u16(),
                body: txt,
            });
        }
        res.json::<T>().map_err(|e| ApiError::NoResponse {
            message: format!("could not decode response from {url}: {e}"),
        })
    }
}

/// Split transport failures into "unreachable" and everything else.
fn classify(url: &str, err: reqwest::Error) -> ApiError {
    if err.is_connect() {
        ApiError::ConnectionRefused {
            url: url.to_string(),
        }
    } else {
        ApiError::NoResponse {
            message: err.to_string(),
        }
    }
}

impl Gateway for ApiClient {
    fn workspaces(&self, key: &ApiKey) -> Result<Vec<Workspace>, ApiError> {
        let url = self.url("/workspaces");
        let req = self.client.get(&url).headers(self.auth_headers(key)?);
        self.send(req, &url)
    }

    fn clients(&self, workspace_id: u64, key: &ApiKey) -> Result<Vec<ClientSummary>, ApiError> {
        let url = self.url(&format!("/clients/{workspace_id}"));
        let req = self.client.get(&url).headers(self.auth_headers(key)?);
        self.send(req, &url)
    }

    fn client(
        &self,
        workspace_id: u64,
        client_id: u64,
        start_date: &str,
        key: &ApiKey,
    ) -> Result<Client, ApiError> {
        let url = self.url(&format!("/workspace/{workspace_id}/client/{client_id}"));
        let req = self
            .client
            .get(&url)
            .query(&[("start_date", start_date)])
            .headers(self.auth_headers(key)?);
        self.send(req, &url)
    }

    fn project(
        &self,
        client_id: u64,
        project_name: &str,
        key: &ApiKey,
    ) -> Result<ProjectEstimate, ApiError> {
        let url = self.url("/project");
        let client_id = client_id.to_string();
        let req = self
            .client
            .get(&url)
            .query(&[
                ("client_id", client_id.as_str()),
                ("project_name", project_name),
            ])
            .headers(self.auth_headers(key)?);
        self.send(req, &url)
    }

    fn update_project(
        &self,
        update: &EstimateUpdate,
        key: &ApiKey,
    ) -> Result<ProjectEstimate, ApiError> {
        let url = self.url("/project");
        let req = self
            .client
            .patch(&url)
            .json(update)
            .headers(self.auth_headers(key)?);
        self.send(req, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_accepts_numbers_and_numeric_strings() {
        let p: ProjectEstimate =
            serde_json::from_str(r#"{"name":"Site","estimate":"10","rate":100}"#).unwrap();
        assert_eq!(
            p.estimate(),
            Some(Estimate {
                hours: 10.0,
                rate: 100.0
            })
        );
    }

    #[test]
    fn missing_or_zero_estimate_is_none() {
        let absent: ProjectEstimate = serde_json::from_str(r#"{"name":"Site"}"#).unwrap();
        assert_eq!(absent.estimate(), None);

        let nulls: ProjectEstimate =
            serde_json::from_str(r#"{"name":"Site","estimate":null,"rate":null}"#).unwrap();
        assert_eq!(nulls.estimate(), None);

        let zero: ProjectEstimate =
            serde_json::from_str(r#"{"name":"Site","estimate":0,"rate":50}"#).unwrap();
        assert_eq!(zero.estimate(), None);

        let no_rate: ProjectEstimate =
            serde_json::from_str(r#"{"name":"Site","estimate":12,"rate":""}"#).unwrap();
        assert_eq!(no_rate.estimate(), None);
    }

    #[test]
    fn non_numeric_estimate_is_a_decode_error() {
        let res = serde_json::from_str::<ProjectEstimate>(r#"{"name":"Site","estimate":"lots"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn client_detail_finds_projects_by_name() {
        let client: Client = serde_json::from_str(
            r#"{"id":7,"name":"Acme","projects":[{"name":"Site","effort":3600000},{"name":"App"}]}"#,
        )
        .unwrap();
        assert_eq!(client.project("Site").map(|p| p.effort), Some(3_600_000));
        assert_eq!(client.project("App").map(|p| p.effort), Some(0));
        assert!(client.project("Other").is_none());
    }

    #[test]
    fn update_serializes_numbers() {
        let update = EstimateUpdate {
            client_id: 7,
            project_name: "Site".into(),
            estimate: 10.0,
            rate: 95.5,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({
                "client_id": 7,
                "project_name": "Site",
                "estimate": 10.0,
                "rate": 95.5
            })
        );
    }
}
