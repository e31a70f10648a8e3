//! SQL transport
//!
//! [`SqlTransport`] is the seam the reconciliation engine depends on; the
//! engine never sees HTTP. [`DremioClient`] implements it against Dremio's
//! REST SQL surface: login for a token, submit a statement as a job, poll
//! the job to a terminal state, and page through the results when the
//! caller expects rows.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::result::{Row, TabularResult};

/// Results page size. Dremio caps a single results request at 500 rows.
const RESULTS_PAGE_LIMIT: usize = 500;

/// Transport seam for running SQL against the remote service.
///
/// `expect_rows` distinguishes reads (decode the row set) from DDL/DML
/// (only success matters; an empty result is returned).
#[async_trait]
pub trait SqlTransport: Send + Sync {
    /// Run one statement to completion.
    async fn run_statement(&self, sql: &str, expect_rows: bool) -> ClientResult<TabularResult>;

    /// Release the session.
    async fn disconnect(&self) -> ClientResult<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct SqlSubmitRequest<'a> {
    sql: &'a str,
}

#[derive(Deserialize)]
struct SqlSubmitResponse {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    job_state: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResultsPage {
    row_count: usize,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// REST SQL client for a Dremio coordinator.
pub struct DremioClient {
    config: ClientConfig,
    http: Client,
    token: String,
}

impl std::fmt::Debug for DremioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DremioClient")
            .field("config", &self.config.redacted())
            .finish()
    }
}

impl DremioClient {
    /// Authenticate against the coordinator and return a connected client.
    #[instrument(skip(config), fields(host = %config.host))]
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ClientError::InvalidConfiguration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let url = format!("{}/apiv2/login", config.base_url());
        let response = http
            .post(&url)
            .json(&LoginRequest {
                user_name: &config.username,
                password: &config.password,
            })
            .send()
            .await
            .map_err(|e| {
                ClientError::connection_failed_with_source(
                    format!("failed to reach {}", config.host),
                    e,
                )
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ClientError::AuthenticationFailed);
            }
            status if !status.is_success() => {
                return Err(ClientError::connection_failed(format!(
                    "login returned status {status}"
                )));
            }
            _ => {}
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            ClientError::invalid_response_with_source("failed to decode login response", e)
        })?;

        info!(host = %config.host, username = %config.username, "connected");

        Ok(Self {
            config,
            http,
            token: login.token,
        })
    }

    fn auth_header(&self) -> String {
        format!("_dremio{}", self.token)
    }

    /// Submit a statement, returning the job id.
    async fn submit(&self, sql: &str) -> ClientResult<String> {
        let url = format!("{}/api/v3/sql", self.config.base_url());
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&SqlSubmitRequest { sql })
            .send()
            .await
            .map_err(|e| ClientError::connection_failed_with_source("failed to submit job", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthenticationFailed);
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error_message)
                .unwrap_or_else(|| format!("submit returned status {status}"));
            return Err(ClientError::statement_rejected(message));
        }

        let submitted: SqlSubmitResponse = response.json().await.map_err(|e| {
            ClientError::invalid_response_with_source("failed to decode submit response", e)
        })?;
        Ok(submitted.id)
    }

    /// Poll a job until it reaches a terminal state or the budget runs out.
    async fn wait_for_completion(&self, job_id: &str) -> ClientResult<()> {
        let url = format!("{}/api/v3/job/{}", self.config.base_url(), job_id);
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.poll_budget_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let response = self
                .http
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, self.auth_header())
                .send()
                .await
                .map_err(|e| {
                    ClientError::connection_failed_with_source("failed to poll job", e)
                })?;

            if !response.status().is_success() {
                return Err(ClientError::invalid_response(format!(
                    "job status returned status {}",
                    response.status()
                )));
            }

            let status: JobStatus = response.json().await.map_err(|e| {
                ClientError::invalid_response_with_source("failed to decode job status", e)
            })?;

            match status.job_state.as_str() {
                "COMPLETED" => return Ok(()),
                "FAILED" | "CANCELED" => {
                    return Err(ClientError::JobFailed {
                        job_id: job_id.to_string(),
                        message: status
                            .error_message
                            .unwrap_or_else(|| status.job_state.clone()),
                    });
                }
                state => {
                    debug!(job_id, state, "job still running");
                }
            }

            if started.elapsed() >= budget {
                warn!(job_id, "poll budget exhausted");
                return Err(ClientError::JobTimeout {
                    job_id: job_id.to_string(),
                    budget_secs: self.config.poll_budget_secs,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Fetch all result pages for a completed job.
    async fn fetch_results(&self, job_id: &str) -> ClientResult<TabularResult> {
        let url = format!("{}/api/v3/job/{}/results", self.config.base_url(), job_id);
        let mut result = TabularResult::empty();
        let mut offset = 0usize;

        loop {
            let response = self
                .http
                .get(&url)
                .query(&[("offset", offset.to_string()), ("limit", RESULTS_PAGE_LIMIT.to_string())])
                .header(reqwest::header::AUTHORIZATION, self.auth_header())
                .send()
                .await
                .map_err(|e| {
                    ClientError::connection_failed_with_source("failed to fetch results", e)
                })?;

            if !response.status().is_success() {
                return Err(ClientError::invalid_response(format!(
                    "results returned status {}",
                    response.status()
                )));
            }

            let page: JobResultsPage = response.json().await.map_err(|e| {
                ClientError::invalid_response_with_source("failed to decode results page", e)
            })?;

            offset += page.rows.len();
            let done = page.rows.is_empty() || offset >= page.row_count;
            result.extend(TabularResult::from_rows(page.rows));
            if done {
                return Ok(result);
            }
        }
    }
}

#[async_trait]
impl SqlTransport for DremioClient {
    #[instrument(skip(self, sql))]
    async fn run_statement(&self, sql: &str, expect_rows: bool) -> ClientResult<TabularResult> {
        debug!(sql, "submitting statement");
        let job_id = self.submit(sql).await?;
        self.wait_for_completion(&job_id).await?;
        if expect_rows {
            self.fetch_results(&job_id).await
        } else {
            Ok(TabularResult::empty())
        }
    }

    async fn disconnect(&self) -> ClientResult<()> {
        // The REST session is token-scoped; there is nothing to tear down
        // server-side. Kept on the trait so pooled transports can release
        // resources.
        debug!(host = %self.config.host, "disconnected");
        Ok(())
    }
}
