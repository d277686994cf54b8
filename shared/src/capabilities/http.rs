use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::model::{ImageAsset, SubmissionId};
use crate::{UPLOAD_CONTENT_TYPE, UPLOAD_FIELD_NAME, UPLOAD_FILE_NAME};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_TIMEOUT_MS: u64 = 300_000;
pub const MAX_HEADER_NAME_LENGTH: usize = 256;
pub const MAX_HEADER_VALUE_LENGTH: usize = 8192;
pub const MAX_HEADERS_COUNT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NetworkPolicy {
    #[default]
    PublicOnly,
    AllowPrivate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    scheme: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        Self::with_policy(url, NetworkPolicy::PublicOnly)
    }

    /// Inference servers usually live on the LAN next to the device.
    pub fn allowing_private(url: impl Into<String>) -> Result<Self, HttpError> {
        Self::with_policy(url, NetworkPolicy::AllowPrivate)
    }

    pub fn with_policy(url: impl Into<String>, policy: NetworkPolicy) -> Result<Self, HttpError> {
        let url = url.into();

        if url.trim().is_empty() {
            return Err(HttpError::InvalidUrl {
                url: String::new(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(url.trim()).map_err(|e| HttpError::InvalidUrl {
            url: Self::truncate_url(&url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        let Some(host) = parsed.host_str().map(str::to_lowercase) else {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: "URL must have a host".to_string(),
            });
        };

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        if policy == NetworkPolicy::PublicOnly && Self::is_private_host(&host) {
            return Err(HttpError::PrivateNetworkBlocked {
                url: Self::truncate_url(&url),
                host,
            });
        }

        Ok(Self {
            url: parsed.to_string(),
            scheme,
            host,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn is_private_host(host: &str) -> bool {
        if matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]" | "0.0.0.0") {
            return true;
        }

        if host.ends_with(".local") || host.ends_with(".localhost") || host.ends_with(".internal")
        {
            return true;
        }

        if host.starts_with("10.") || host.starts_with("192.168.") || host.starts_with("169.254.")
        {
            return true;
        }

        if let Some(rest) = host.strip_prefix("172.") {
            let second = rest.split('.').next().and_then(|o| o.parse::<u8>().ok());
            if matches!(second, Some(16..=31)) {
                return true;
            }
        }

        host.starts_with("[fd") || host.starts_with("[fe80:")
    }

    fn truncate_url(url: &str) -> String {
        match url.char_indices().nth(100) {
            Some((idx, _)) => format!("{}...", &url[..idx]),
            None => url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpHeaders {
    headers: Vec<(String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HttpError> {
        if self.headers.len() >= MAX_HEADERS_COUNT {
            return Err(HttpError::InvalidHeader {
                name: String::new(),
                reason: format!("more than {MAX_HEADERS_COUNT} headers"),
            });
        }

        let name = name.into();
        let value = value.into();

        Self::validate_header_name(&name)?;
        Self::validate_header_value(&name, &value)?;

        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value));

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    fn validate_header_name(name: &str) -> Result<(), HttpError> {
        if name.is_empty() || name.len() > MAX_HEADER_NAME_LENGTH {
            return Err(HttpError::InvalidHeader {
                name: name.chars().take(50).collect(),
                reason: format!("header name must be 1..={MAX_HEADER_NAME_LENGTH} bytes"),
            });
        }

        if let Some(c) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(HttpError::InvalidHeader {
                name: name.to_string(),
                reason: format!("invalid character '{c}' in header name"),
            });
        }

        // set by the transport from the multipart body
        let lower = name.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "host" | "content-length" | "content-type" | "transfer-encoding"
        ) {
            return Err(HttpError::InvalidHeader {
                name: name.to_string(),
                reason: "this header is managed automatically".to_string(),
            });
        }

        Ok(())
    }

    fn validate_header_value(name: &str, value: &str) -> Result<(), HttpError> {
        if value.len() > MAX_HEADER_VALUE_LENGTH {
            return Err(HttpError::InvalidHeader {
                name: name.to_string(),
                reason: format!(
                    "header value exceeds maximum length of {MAX_HEADER_VALUE_LENGTH} bytes"
                ),
            });
        }

        if value.contains(['\r', '\n', '\0']) {
            return Err(HttpError::InvalidHeader {
                name: name.to_string(),
                reason: "header value contains invalid characters (CR, LF, or NULL)".to_string(),
            });
        }

        Ok(())
    }
}

impl From<Vec<(String, String)>> for HttpHeaders {
    fn from(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }

    pub fn is_idempotent(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

/// One file part of a `multipart/form-data` body. The transport reads the
/// bytes from `uri` when it sends the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub uri: String,
}

impl FilePart {
    /// The fixed upload shape the inference service expects.
    pub fn upload(asset: &ImageAsset) -> Self {
        Self {
            field: UPLOAD_FIELD_NAME.to_string(),
            file_name: UPLOAD_FILE_NAME.to_string(),
            content_type: UPLOAD_CONTENT_TYPE.to_string(),
            uri: asset.uri().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    method: HttpMethod,
    url: ValidatedUrl,
    headers: HttpHeaders,
    parts: Vec<FilePart>,
    timeout_ms: Option<u64>,
    request_id: String,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: ValidatedUrl) -> Self {
        Self {
            method,
            url,
            headers: HttpHeaders::new(),
            parts: Vec::new(),
            timeout_ms: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Single-part image upload for one submission.
    pub fn upload(
        url: &ValidatedUrl,
        asset: &ImageAsset,
        submission: &SubmissionId,
    ) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Post, url.clone())
            .with_request_id(submission.as_str())
            .with_header("Accept", "application/json")?
            .with_part(FilePart::upload(asset))
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, HttpError> {
        self.headers.insert(name, value)?;
        Ok(self)
    }

    pub fn with_part(mut self, part: FilePart) -> Result<Self, HttpError> {
        if self.method.is_idempotent() {
            return Err(HttpError::InvalidRequest {
                reason: format!("{} requests cannot have a body", self.method.as_str()),
            });
        }
        self.parts.push(part);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, HttpError> {
        let Some(timeout) = timeout else {
            self.timeout_ms = None;
            return Ok(self);
        };
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 || ms > MAX_TIMEOUT_MS {
            return Err(HttpError::InvalidRequest {
                reason: format!("timeout must be within 1..={MAX_TIMEOUT_MS}ms"),
            });
        }
        self.timeout_ms = Some(ms);
        Ok(self)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &ValidatedUrl {
        &self.url
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn parts(&self) -> &[FilePart] {
        &self.parts
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("private network access blocked: {url} resolves to {host}")]
    PrivateNetworkBlocked { url: String, host: String },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("could not read upload '{file_name}': {message}")]
    UploadUnreadable { file_name: String, message: String },

    #[error("connection failed to {host}: {message}")]
    ConnectionError { host: String, message: String },

    #[error("timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64, request_id: String },

    #[error("request abandoned before a response arrived")]
    Abandoned { request_id: String },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String, request_id: String },
}

impl HttpError {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            HttpError::Timeout { request_id, .. }
            | HttpError::Abandoned { request_id }
            | HttpError::InvalidResponse { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: HttpHeaders,
    body: Vec<u8>,
    request_id: String,
    duration_ms: u64,
}

impl HttpResponse {
    pub fn new(
        status: u16,
        headers: HttpHeaders,
        body: Vec<u8>,
        request_id: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            request_id,
            duration_ms,
        }
    }

    /// Shorthand for shells and tests that only care about status and body.
    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, HttpHeaders::new(), body.into(), String::new(), 0)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

pub type HttpResult = Result<HttpResponse, HttpError>;

/// Executes requests built by the core. Any status code is a response;
/// only failures to get one are errors.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> HttpResult;
}
