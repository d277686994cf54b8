//! `reqwest`-backed transport for shells that let the core do its own I/O.

use std::path::PathBuf;
use std::time::Instant;

use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument};
use url::Url;

use super::http::{
    FilePart, HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpResult,
    HttpTransport,
};

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpError::InvalidRequest {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn build_form(parts: &[FilePart]) -> Result<Form, HttpError> {
        let mut form = Form::new();
        for part in parts {
            let data = tokio::fs::read(local_path(&part.uri)).await.map_err(|e| {
                HttpError::UploadUnreadable {
                    file_name: part.file_name.clone(),
                    message: e.to_string(),
                }
            })?;
            let format = image::guess_format(&data).map_err(|e| HttpError::UploadUnreadable {
                file_name: part.file_name.clone(),
                message: format!("not a recognised image: {e}"),
            })?;
            debug!(field = %part.field, ?format, bytes = data.len(), "attaching upload");
            let file = Part::bytes(data)
                .file_name(part.file_name.clone())
                .mime_str(&part.content_type)
                .map_err(|e| HttpError::InvalidRequest {
                    reason: e.to_string(),
                })?;
            form = form.part(part.field.clone(), file);
        }
        Ok(form)
    }

    fn transport_error(e: &reqwest::Error, request: &HttpRequest) -> HttpError {
        if e.is_timeout() {
            return HttpError::Timeout {
                timeout_ms: request.timeout().map_or(0, |t| {
                    u64::try_from(t.as_millis()).unwrap_or(u64::MAX)
                }),
                request_id: request.request_id().to_string(),
            };
        }
        HttpError::ConnectionError {
            host: request.url().host().to_string(),
            message: e.to_string(),
        }
    }
}

/// Accepts `file://` URLs and plain paths.
fn local_path(uri: &str) -> PathBuf {
    Url::parse(uri)
        .ok()
        .filter(|u| u.scheme() == "file")
        .and_then(|u| u.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(uri))
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip_all, fields(request_id = request.request_id(), host = request.url().host()))]
    async fn execute(&self, request: HttpRequest) -> HttpResult {
        let started = Instant::now();

        let method = match request.method() {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, request.url().as_str());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if !request.parts().is_empty() {
            builder = builder.multipart(Self::build_form(request.parts()).await?);
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::transport_error(&e, &request))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&e, &request))?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(status, duration_ms, bytes = body.len(), "response received");

        Ok(HttpResponse::new(
            status,
            HttpHeaders::from(headers),
            body.to_vec(),
            request.request_id().to_string(),
            duration_ms,
        ))
    }
}
