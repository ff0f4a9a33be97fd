//! HTTP client for the E-utilities search and detail endpoints
//!
//! This module handles:
//! - Building the HTTP client with a proper user agent string
//! - Search requests (JSON) returning a total count and one page of identifiers
//! - Detail requests (XML) for a batch of identifiers
//! - Classifying transport errors and HTTP statuses into [`Failure`] values
//!
//! Retrying is left to the caller.

use crate::config::{Config, EndpointConfig, UserAgentConfig};
use crate::harvest::Failure;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Total number of records matching the query
    pub count: u64,
    /// Identifiers on this page
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    count: String,
    #[serde(default)]
    idlist: Vec<String>,
}

/// Formats the user agent string
///
/// `Name/Version (+mailto:contact)` when a contact address is configured,
/// otherwise a generic compatible string.
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    match &config.contact_email {
        Some(email) => format!(
            "{}/{} (+mailto:{})",
            config.client_name, config.client_version, email
        ),
        None => format!(
            "Mozilla/5.0 (compatible; {}/{})",
            config.client_name, config.client_version
        ),
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use pubmed_harvester::config::Config;
/// use pubmed_harvester::harvest::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(&config.user_agent))
        .timeout(Duration::from_secs(config.endpoint.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the two E-utilities endpoints
#[derive(Debug, Clone)]
pub struct EutilsClient {
    client: Client,
    endpoint: EndpointConfig,
    tool: String,
    email: Option<String>,
}

impl EutilsClient {
    /// Creates a client from the harvester configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            endpoint: config.endpoint.clone(),
            tool: config.user_agent.client_name.clone(),
            email: config.user_agent.contact_email.clone(),
        })
    }

    /// Parameters sent with every request
    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", self.endpoint.database.clone()),
            ("tool", self.tool.clone()),
        ];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.endpoint.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Requests one page of identifiers for `term`
    ///
    /// `retmax = 0` asks only for the total count.
    pub async fn search(&self, term: &str, retmax: u32, retstart: u32) -> Result<SearchPage, Failure> {
        let mut params = self.common_params();
        params.push(("term", term.to_string()));
        params.push(("retmax", retmax.to_string()));
        params.push(("retstart", retstart.to_string()));
        params.push(("retmode", "json".to_string()));

        let response = self
            .client
            .get(self.endpoint.search_url.as_str())
            .query(&params)
            .send()
            .await?;
        let body = check_status(response)?.text().await?;

        parse_search_response(&body)
    }

    /// Requests full records for a batch of identifiers, returning the raw XML
    pub async fn fetch(&self, ids: &[String]) -> Result<String, Failure> {
        let mut params = self.common_params();
        params.push(("id", ids.join(",")));
        params.push(("retmode", "xml".to_string()));

        let response = self
            .client
            .get(self.endpoint.fetch_url.as_str())
            .query(&params)
            .send()
            .await?;

        Ok(check_status(response)?.text().await?)
    }
}

/// Maps non-success statuses to failures
fn check_status(response: Response) -> Result<Response, Failure> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Failure::RateLimited);
    }
    if !status.is_success() {
        return Err(Failure::HttpStatus {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Decodes a search response body
fn parse_search_response(body: &str) -> Result<SearchPage, Failure> {
    let envelope: SearchEnvelope = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Failure::Parse(format!("{} (response starts with {:?})", e, preview))
    })?;

    let count = envelope
        .esearchresult
        .count
        .trim()
        .parse::<u64>()
        .map_err(|e| Failure::Parse(format!("invalid count: {}", e)))?;

    Ok(SearchPage {
        count,
        ids: envelope.esearchresult.idlist,
    })
}
