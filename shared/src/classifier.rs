//! Turns what came back from the transport into either a diagnosis or a
//! stored failure. Pure functions; nothing here retries.

use serde::Deserialize;
use serde_json::Value;

use crate::capabilities::{HttpError, HttpResponse, HttpResult};
use crate::model::DiagnosisResult;
use crate::{ErrorKind, FailureInfo, MAX_ERROR_EXCERPT_CHARS};

/// Success body of the inference service. Every field is required.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    diagnostico_text: String,
    descricao_text: String,
    laudo_text: String,
}

impl From<PredictResponse> for DiagnosisResult {
    fn from(r: PredictResponse) -> Self {
        Self {
            diagnostic_text: r.diagnostico_text,
            description_text: r.descricao_text,
            report_text: r.laudo_text,
        }
    }
}

/// A submission attempt that did not produce a diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedAttempt {
    /// No response was received.
    Transport(HttpError),
    /// A response arrived with a non-success status.
    Rejected { status: u16, body: Vec<u8> },
    /// Success status, but the body is not the expected object.
    Malformed { status: u16, reason: String },
}

pub fn classify(attempt: &FailedAttempt) -> FailureInfo {
    match attempt {
        FailedAttempt::Transport(e) => FailureInfo::new(ErrorKind::NetworkFailure, e.to_string()),
        FailedAttempt::Rejected { status, body } => FailureInfo::new(
            ErrorKind::ServerError { status: *status },
            format!("HTTP {status}: {}", server_message(body)),
        ),
        FailedAttempt::Malformed { status, reason } => FailureInfo::new(
            ErrorKind::MalformedResponse,
            format!("HTTP {status}: {reason}"),
        ),
    }
}

/// Validates a whole transport outcome.
pub fn evaluate(result: &HttpResult) -> Result<DiagnosisResult, FailureInfo> {
    match result {
        Err(e) => Err(classify(&FailedAttempt::Transport(e.clone()))),
        Ok(response) if !response.is_success() => Err(classify(&FailedAttempt::Rejected {
            status: response.status(),
            body: response.body().to_vec(),
        })),
        Ok(response) => parse_diagnosis(response).map_err(|reason| {
            classify(&FailedAttempt::Malformed {
                status: response.status(),
                reason,
            })
        }),
    }
}

fn parse_diagnosis(response: &HttpResponse) -> Result<DiagnosisResult, String> {
    let value: Value = serde_json::from_slice(response.body())
        .map_err(|e| format!("body is not JSON: {e}"))?;
    if !value.is_object() {
        return Err("body is not a JSON object".to_string());
    }
    serde_json::from_value::<PredictResponse>(value)
        .map(DiagnosisResult::from)
        .map_err(|e| format!("unexpected shape: {e}"))
}

/// The `error` string of a JSON object body, or the raw body; truncated either way.
fn server_message(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        if let Some(Value::String(message)) = map.get("error") {
            return excerpt(message);
        }
    }
    excerpt(&String::from_utf8_lossy(body))
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "(empty body)".to_string();
    }
    match text.char_indices().nth(MAX_ERROR_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn respond(status: u16, body: &str) -> HttpResult {
        Ok(HttpResponse::with_body(status, body))
    }

    #[test]
    fn test_well_formed_success() {
        let body = json!({"diagnostico_text": "A", "descricao_text": "B", "laudo_text": "C"});
        let result = evaluate(&respond(200, &body.to_string())).unwrap();
        assert_eq!(
            result,
            DiagnosisResult {
                diagnostic_text: "A".into(),
                description_text: "B".into(),
                report_text: "C".into(),
            }
        );
    }

    #[test]
    fn test_extra_fields_tolerated() {
        let body = json!({
            "diagnostico_text": "A", "descricao_text": "B", "laudo_text": "C", "confidence": 0.9
        });
        assert!(evaluate(&respond(200, &body.to_string())).is_ok());
    }

    #[test]
    fn test_server_error_uses_error_field() {
        let failure = evaluate(&respond(500, r#"{"error":"model unavailable"}"#)).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::ServerError { status: 500 });
        assert!(failure.detail.contains("model unavailable"));
        assert!(failure.detail.contains("500"));
    }

    #[test]
    fn test_server_error_non_json_body_truncated() {
        let html = format!("<html>{}</html>", "x".repeat(500));
        let failure = evaluate(&respond(502, &html)).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::ServerError { status: 502 });
        assert!(failure.detail.starts_with("HTTP 502: <html>"));
        assert!(failure.detail.ends_with("..."));
        assert!(failure.detail.len() < 300);
    }

    #[test]
    fn test_server_error_field_truncated() {
        let body = json!({"error": "traceback ".repeat(100)}).to_string();
        let failure = evaluate(&respond(500, &body)).unwrap_err();
        assert!(failure.detail.starts_with("HTTP 500: traceback"));
        assert!(failure.detail.ends_with("..."));
        assert_eq!(
            failure.detail.chars().count(),
            "HTTP 500: ".len() + MAX_ERROR_EXCERPT_CHARS + 3
        );
    }

    #[test]
    fn test_server_error_object_without_error_field() {
        let failure = evaluate(&respond(400, r#"{"message":"nope"}"#)).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::ServerError { status: 400 });
        assert!(failure.detail.contains(r#"{"message":"nope"}"#));
    }

    #[test]
    fn test_server_error_empty_body() {
        let failure = evaluate(&respond(503, "")).unwrap_err();
        assert_eq!(failure.detail, "HTTP 503: (empty body)");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "é".repeat(MAX_ERROR_EXCERPT_CHARS + 10);
        let cut = excerpt(&text);
        assert_eq!(cut.chars().count(), MAX_ERROR_EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_missing_fields_malformed() {
        let failure = evaluate(&respond(200, r#"{"foo":"bar"}"#)).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_partial_fields_malformed() {
        let body = json!({"diagnostico_text": "A", "descricao_text": "B"});
        let failure = evaluate(&respond(200, &body.to_string())).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::MalformedResponse);
        assert!(failure.detail.contains("laudo_text"));
    }

    #[test]
    fn test_null_and_non_string_fields_malformed() {
        let nulls = json!({"diagnostico_text": null, "descricao_text": "B", "laudo_text": "C"});
        assert!(evaluate(&respond(200, &nulls.to_string())).is_err());

        let numbers = json!({"diagnostico_text": 1, "descricao_text": "B", "laudo_text": "C"});
        assert!(evaluate(&respond(200, &numbers.to_string())).is_err());
    }

    #[test]
    fn test_array_body_malformed() {
        let failure = evaluate(&respond(200, r#"["A","B","C"]"#)).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::MalformedResponse);
        assert!(failure.detail.contains("not a JSON object"));
    }

    #[test]
    fn test_non_json_success_malformed() {
        let failure = evaluate(&respond(200, "OK")).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_transport_failure() {
        let result: HttpResult = Err(HttpError::ConnectionError {
            host: "10.0.0.2".into(),
            message: "connection refused".into(),
        });
        let failure = evaluate(&result).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::NetworkFailure);
        assert!(failure.detail.contains("connection refused"));
    }
}
