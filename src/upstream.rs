//! One HTTP call at a time, through the scheduler.
//!
//! [`UpstreamClient::call`] queues a GET on its [`RequestScheduler`], turns a
//! throttling response into a retry, and classifies whatever comes back:
//! `204` becomes `None`, other successes become the parsed body, everything
//! else an [`ProxyError::Upstream`] carrying the upstream status.

use std::time::Duration;

use reqwest::{
    Client, StatusCode, Url,
    header::{CONTENT_TYPE, RETRY_AFTER},
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    error::{ProxyError, Result},
    scheduler::{Attempt, RequestScheduler},
    utils,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP client used for upstream calls.
pub fn http_client(user_agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Joins `path` onto `base` and appends `query` in order.
pub fn build_url(base: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
    let raw = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url =
        Url::parse(&raw).map_err(|e| ProxyError::bad_request(format!("Invalid path {path}: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url)
}

/// Parses an upstream body without trusting the declared content type.
///
/// The text is parsed as JSON whatever the content type says. When that
/// fails, an error payload with the status and a short excerpt of the body
/// is returned instead.
pub fn parse_body(content_type: &str, status: StatusCode, text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) => {
            if content_type.contains("json") {
                debug!(error = %e, "Body declared as JSON failed to parse");
            }
            json!({
                "error": {
                    "status": status.as_u16(),
                    "message": utils::excerpt(text),
                }
            })
        }
    }
}

/// Status and parsed body of a settled upstream call.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    /// `None` for `204 No Content`.
    pub body: Option<Value>,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    scheduler: RequestScheduler,
}

impl UpstreamClient {
    pub fn new(http: Client, scheduler: RequestScheduler) -> Self {
        Self { http, scheduler }
    }

    /// GETs `url`, optionally with a bearer token.
    ///
    /// Returns `Ok(None)` for `204 No Content`.
    pub async fn call(&self, url: &str, token: Option<&str>) -> Result<Option<Value>> {
        let label = log_path(url);
        let http = self.http.clone();
        let url = url.to_string();
        let token = token.map(str::to_owned);

        let reply = self
            .scheduler
            .enqueue(label.clone(), move || {
                send_once(http.clone(), url.clone(), token.clone())
            })
            .await?;

        classify(&label, reply)
    }
}

async fn send_once(
    http: Client,
    url: String,
    token: Option<String>,
) -> Result<Attempt<UpstreamReply>> {
    let mut request = http.get(&url);
    if let Some(token) = &token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Ok(Attempt::Throttled { retry_after });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(Attempt::Done(UpstreamReply { status, body: None }));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = response.text().await?;

    Ok(Attempt::Done(UpstreamReply {
        status,
        body: Some(parse_body(&content_type, status, &text)),
    }))
}

fn classify(label: &str, reply: UpstreamReply) -> Result<Option<Value>> {
    if reply.status.is_success() {
        return Ok(reply.body);
    }

    let message = reply
        .body
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| format!("HTTP_{}", reply.status.as_u16()));
    warn!(
        path = label,
        status = reply.status.as_u16(),
        message = %message,
        "Upstream call failed"
    );
    Err(ProxyError::upstream(reply.status.as_u16(), message))
}

/// Message of an `{ "error": { "message" } }` or `{ "error": "..." }` body.
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_owned)
}

/// Path of `url` without host or query, for logs.
fn log_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().trim_start_matches('/').to_string())
        .unwrap_or_else(|_| url.to_string())
}
