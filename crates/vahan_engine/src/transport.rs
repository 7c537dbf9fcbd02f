use std::future::Future;

use futures_util::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER,
    USER_AGENT,
};
use reqwest::StatusCode;
use scrape_logging::{scrape_debug, scrape_error, scrape_warn};
use vahan_core::{SessionState, VIEW_STATE_FIELD};

use crate::config::{RetryPolicy, ScrapeConfig};
use crate::decode::decode_body;
use crate::envelope::{parse_partial_response, PartialResponse};
use crate::types::{AttemptError, FailureKind, TransportError};

const PARTIAL_AJAX_FIELD: &str = "javax.faces.partial.ajax";
const SOURCE_FIELD: &str = "javax.faces.source";
const EXECUTE_FIELD: &str = "javax.faces.partial.execute";
const RENDER_FIELD: &str = "javax.faces.partial.render";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const BOOTSTRAP_SOURCE: &str = "<bootstrap>";

/// One partial-update request: which control fired, what the server should
/// process and re-render, and any fields overriding the session's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjaxRequest {
    pub source: String,
    pub execute: String,
    pub render: String,
    pub overrides: Vec<(String, String)>,
}

impl AjaxRequest {
    pub fn new(
        source: impl Into<String>,
        execute: impl Into<String>,
        render: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            execute: execute.into(),
            render: render.into(),
            overrides: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    fn describe(&self) -> String {
        format!(
            "source={} execute={} render={}",
            self.source, self.execute, self.render
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjaxResponse {
    /// The refreshed token, or the submitted one when the server sent none.
    pub view_state: String,
    pub envelope: PartialResponse,
}

/// Sends exchanges against the portal. Implementations never mutate the
/// session; applying the returned token is the caller's job.
#[async_trait::async_trait]
pub trait AjaxTransport: Send + Sync {
    /// Initial full-page GET.
    async fn load(&self) -> Result<String, TransportError>;

    async fn exchange(
        &self,
        session: &SessionState,
        request: &AjaxRequest,
    ) -> Result<AjaxResponse, TransportError>;
}

/// Form-urlencoded POST body for an exchange.
///
/// Order: protocol fields, form marker, view state, session fields, then the
/// request's overrides. An override replaces the session field of the same
/// name instead of duplicating it.
pub fn encode_form_body(session: &SessionState, request: &AjaxRequest) -> String {
    let mut body = url::form_urlencoded::Serializer::new(String::new());
    body.append_pair(PARTIAL_AJAX_FIELD, "true")
        .append_pair(SOURCE_FIELD, &request.source)
        .append_pair(EXECUTE_FIELD, &request.execute)
        .append_pair(RENDER_FIELD, &request.render)
        .append_pair(session.form_id(), session.form_id())
        .append_pair(VIEW_STATE_FIELD, session.view_state());

    for (name, value) in session.submission_fields() {
        if request.overrides.iter().any(|(k, _)| *k == name) {
            continue;
        }
        body.append_pair(&name, &value);
    }
    for (name, value) in &request.overrides {
        body.append_pair(name, value);
    }
    body.finish()
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    url: reqwest::Url,
    retry: RetryPolicy,
    max_bytes: u64,
}

impl ReqwestTransport {
    /// A fresh HTTP session (own connection pool and cookie jar).
    pub fn new(config: &ScrapeConfig) -> Result<Self, TransportError> {
        let url = reqwest::Url::parse(&config.base_url)
            .map_err(|err| TransportError::setup(FailureKind::InvalidUrl, err.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(REFERER, header_value(url.as_str())?);
        headers.insert(ORIGIN, header_value(&url.origin().ascii_serialization())?);

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|err| TransportError::setup(FailureKind::ClientSetup, err.to_string()))?;

        Ok(Self {
            client,
            url,
            retry: config.retry_policy(),
            max_bytes: config.max_bytes,
        })
    }

    async fn attempt_get(&self) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        self.read_body(response).await
    }

    async fn attempt_post(&self, body: String) -> Result<PartialResponse, AttemptError> {
        let response = self
            .client
            .post(self.url.clone())
            .headers(ajax_headers())
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(AttemptError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let text = self.read_body(response).await?;
        parse_partial_response(&text)
            .map_err(|err| AttemptError::new(FailureKind::MalformedEnvelope, err.to_string()))
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, AttemptError> {
        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(self.too_large(content_len));
            }
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(decode_body(&bytes, content_type.as_deref()).text)
    }

    fn too_large(&self, actual: u64) -> AttemptError {
        AttemptError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl AjaxTransport for ReqwestTransport {
    async fn load(&self) -> Result<String, TransportError> {
        retry_with_backoff(self.retry, BOOTSTRAP_SOURCE, BOOTSTRAP_SOURCE, || {
            self.attempt_get()
        })
        .await
    }

    async fn exchange(
        &self,
        session: &SessionState,
        request: &AjaxRequest,
    ) -> Result<AjaxResponse, TransportError> {
        let body = encode_form_body(session, request);
        let context = request.describe();
        scrape_debug!("exchange {} body_len={}", context, body.len());

        let envelope = retry_with_backoff(self.retry, &request.source, &context, || {
            self.attempt_post(body.clone())
        })
        .await?;

        let view_state = envelope
            .view_state()
            .map(str::to_string)
            .unwrap_or_else(|| session.view_state().to_string());
        Ok(AjaxResponse {
            view_state,
            envelope,
        })
    }
}

/// Run `op` until it succeeds or the policy's attempts are spent, sleeping
/// `backoff * attempt` between attempts. The last failure is surfaced.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    source_id: &str,
    context: &str,
    mut op: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                scrape_warn!(
                    "attempt {}/{} failed for {}: {} ({})",
                    attempt,
                    max_attempts,
                    context,
                    err.kind,
                    err.message
                );
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
            Err(err) => {
                scrape_error!(
                    "giving up on {} after {} attempt(s): {} ({})",
                    context,
                    attempt,
                    err.kind,
                    err.message
                );
                return Err(TransportError::exhausted(source_id, attempt, err));
            }
        }
    }
}

fn ajax_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("faces-request"),
        HeaderValue::from_static("partial/ajax"),
    );
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    headers
}

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value)
        .map_err(|err| TransportError::setup(FailureKind::ClientSetup, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        return AttemptError::new(FailureKind::Timeout, err.to_string());
    }
    AttemptError::new(FailureKind::Network, err.to_string())
}
