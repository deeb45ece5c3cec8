//! Minimal blocking ONTAP REST client.
//!
//! Covers what the share ACL gateway needs: JSON requests with basic auth,
//! error decoding, and waiting on asynchronous jobs. No retries and no
//! pagination.

use super::error::{ClientError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

/// Delay between job status polls.
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Connection settings for one cluster.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Cluster management hostname or address
    pub hostname: String,
    pub username: String,
    pub password: String,
    /// Verify the cluster's TLS certificate
    pub validate_certs: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long to wait for an asynchronous job
    pub job_timeout: Duration,
}

/// State of an asynchronous ONTAP job.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JobState {
    Running,
    Success,
    Failure {
        code: Option<String>,
        message: String,
    },
}

/// Blocking REST client bound to one cluster.
#[derive(Clone)]
pub struct RestClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, e.g. `https://cluster1/api`.
    api_base: String,
    /// Precomputed `Authorization` header value.
    auth_header: String,
    job_timeout: Duration,
}

impl RestClient {
    /// Create a client from explicit connection settings.
    pub fn new(settings: &ClientSettings) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!settings.validate_certs)
            .build();
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.timeout))
            .tls_config(tls)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: format!("https://{}/api", settings.hostname),
            auth_header: basic_auth(&settings.username, &settings.password),
            job_timeout: settings.job_timeout,
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// GET a collection endpoint and return its `records`.
    pub fn get_records(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>> {
        let url = self.url(path);
        log::debug!("GET {url}");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, *value);
        }

        let body = self.finish(request.call())?;
        records(body)
    }

    /// POST a body, waiting for any job it starts.
    pub fn post(&self, path: &str, query: &[(&str, &str)], body: &Value) -> Result<Value> {
        let url = self.url(path);
        log::debug!("POST {url}");

        let mut request = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, *value);
        }

        let response = self.finish(request.send_json(body))?;
        self.wait_for_job(&response)?;
        Ok(response)
    }

    /// PATCH a body, waiting for any job it starts.
    pub fn patch(&self, path: &str, body: &Value) -> Result<()> {
        let url = self.url(path);
        log::debug!("PATCH {url}");

        let response = self.finish(
            self.agent
                .patch(&url)
                .header("Authorization", &self.auth_header)
                .header("Accept", "application/json")
                .send_json(body),
        )?;
        self.wait_for_job(&response)
    }

    /// DELETE a record, waiting for any job it starts.
    pub fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        log::debug!("DELETE {url}");

        let response = self.finish(
            self.agent
                .delete(&url)
                .header("Authorization", &self.auth_header)
                .header("Accept", "application/json")
                .call(),
        )?;
        self.wait_for_job(&response)
    }

    /// Turn a raw response into its JSON body or a classified error.
    fn finish(
        &self,
        result: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<Value> {
        let mut response = result?;
        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        decode_response(status, &text)
    }

    /// Poll a job referenced by a response until it ends.
    fn wait_for_job(&self, response: &Value) -> Result<()> {
        let Some(uuid) = job_uuid(response) else {
            return Ok(());
        };

        log::debug!("Waiting for job {uuid}");
        let started = Instant::now();
        loop {
            let job = self.job(&uuid)?;
            match job_state(&job) {
                JobState::Success => return Ok(()),
                JobState::Failure { code, message } => {
                    return Err(ClientError::JobFailed {
                        uuid,
                        code,
                        message,
                    });
                }
                JobState::Running => {}
            }

            if started.elapsed() >= self.job_timeout {
                return Err(ClientError::JobTimeout {
                    uuid,
                    timeout_secs: self.job_timeout.as_secs(),
                });
            }
            thread::sleep(JOB_POLL_INTERVAL);
        }
    }

    fn job(&self, uuid: &str) -> Result<Value> {
        let url = self.url(&format!("/cluster/jobs/{uuid}"));
        self.finish(
            self.agent
                .get(&url)
                .header("Authorization", &self.auth_header)
                .header("Accept", "application/json")
                .query("fields", "state,message,code")
                .call(),
        )
    }
}

/// Build a basic auth header value.
fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Decode a response body, mapping non-success statuses to errors.
fn decode_response(status: u16, text: &str) -> Result<Value> {
    let body: Option<Value> = if text.trim().is_empty() {
        None
    } else {
        serde_json::from_str(text).ok()
    };

    if (200..300).contains(&status) {
        return match body {
            Some(value) => Ok(value),
            None if text.trim().is_empty() => Ok(Value::Null),
            None => Err(ClientError::InvalidResponse(format!(
                "expected JSON, got: {}",
                text.chars().take(200).collect::<String>()
            ))),
        };
    }

    let error = body.as_ref().and_then(|b| b.get("error"));
    let code = error.and_then(|e| error_code(e.get("code")));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| text.trim().to_string());

    Err(ClientError::Api {
        status,
        code,
        message,
    })
}

/// Extract `records` from a collection response.
fn records(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(ClientError::InvalidResponse(format!(
                "records is not an array: {other}"
            ))),
            None => Ok(Vec::new()),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(ClientError::InvalidResponse(format!(
            "expected an object, got: {other}"
        ))),
    }
}

/// Job UUID referenced by a mutating response, if any.
fn job_uuid(response: &Value) -> Option<String> {
    response
        .get("job")
        .and_then(|job| job.get("uuid"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn job_state(job: &Value) -> JobState {
    match job.get("state").and_then(Value::as_str) {
        Some("success") => JobState::Success,
        Some("failure") => JobState::Failure {
            code: error_code(job.get("code")),
            message: job
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        },
        _ => JobState::Running,
    }
}

/// ONTAP error codes arrive as strings in error bodies and as numbers on jobs
fn error_code(code: Option<&Value>) -> Option<String> {
    match code? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_auth() {
        assert_eq!(basic_auth("admin", "netapp1!"), "Basic YWRtaW46bmV0YXBwMSE=");
    }

    #[test]
    fn test_decode_success_bodies() {
        assert_eq!(decode_response(200, "").unwrap(), Value::Null);
        assert_eq!(
            decode_response(201, r#"{"num_records": 0}"#).unwrap(),
            json!({"num_records": 0})
        );
        assert!(matches!(
            decode_response(200, "<html>").unwrap_err(),
            ClientError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_decode_ontap_error() {
        let body = r#"{"error": {"message": "entry doesn't exist", "code": "4", "target": "uuid"}}"#;
        match decode_response(404, body).unwrap_err() {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("4"));
                assert_eq!(message, "entry doesn't exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_non_json_error() {
        match decode_response(502, "Bad Gateway").unwrap_err() {
            ClientError::Api { code, message, .. } => {
                assert!(code.is_none());
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_records() {
        let body = json!({"records": [{"name": "a"}, {"name": "b"}], "num_records": 2});
        assert_eq!(records(body).unwrap().len(), 2);
        assert!(records(json!({"num_records": 0})).unwrap().is_empty());
        assert!(records(json!([1, 2])).is_err());
    }

    #[test]
    fn test_job_parsing() {
        let accepted = json!({"job": {"uuid": "abc-123", "_links": {}}});
        assert_eq!(job_uuid(&accepted).as_deref(), Some("abc-123"));
        assert_eq!(job_uuid(&json!({"num_records": 1})), None);

        assert_eq!(job_state(&json!({"state": "running"})), JobState::Running);
        assert_eq!(job_state(&json!({"state": "queued"})), JobState::Running);
        assert_eq!(job_state(&json!({"state": "success"})), JobState::Success);
        assert_eq!(
            job_state(&json!({"state": "failure", "message": "duplicate entry"})),
            JobState::Failure {
                code: None,
                message: "duplicate entry".into()
            }
        );
        assert_eq!(
            job_state(&json!({"state": "failure", "code": 4, "message": "entry doesn't exist"})),
            JobState::Failure {
                code: Some("4".into()),
                message: "entry doesn't exist".into()
            }
        );
    }

    #[test]
    fn test_api_base() {
        let client = RestClient::new(&ClientSettings {
            hostname: "cluster1.example.com".into(),
            username: "admin".into(),
            password: "secret".into(),
            validate_certs: true,
            timeout: Duration::from_secs(30),
            job_timeout: Duration::from_secs(600),
        });
        assert_eq!(client.api_base(), "https://cluster1.example.com/api");
    }
}
