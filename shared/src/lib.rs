// lib.rs - shared core for the dermscan mobile shells

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod event;
pub mod model;
pub mod theme;
pub mod view;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use capabilities::Capabilities;
pub use config::{ClientConfig, ConfigError, ResolvedConfig};
pub use controller::RequestLifecycleController;
pub use event::{Event, Transition};
pub use model::{DiagnosisResult, ImageAsset, Model, RequestState, SubmissionId};
pub use view::ViewModel;

/// Multipart field the inference service reads the upload from.
pub const UPLOAD_FIELD_NAME: &str = "image";
pub const UPLOAD_FILE_NAME: &str = "photo.jpg";
pub const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";
pub const MAX_ERROR_EXCERPT_CHARS: usize = 200;

// ============================================================================
// Stored failures (state == Failed)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkFailure,
    ServerError { status: u16 },
    MalformedResponse,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NetworkFailure => "NETWORK_FAILURE",
            Self::ServerError { .. } => "SERVER_ERROR",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
        }
    }

    #[must_use]
    pub const fn status(self) -> Option<u16> {
        match self {
            Self::ServerError { status } => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: ErrorKind,
    pub detail: String,
}

impl FailureInfo {
    #[must_use]
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::NetworkFailure => {
                "Unable to reach the analysis service. Check your connection and try again."
                    .into()
            }
            ErrorKind::ServerError { status } => {
                format!("The analysis service returned an error ({status}): {}", self.detail)
            }
            ErrorKind::MalformedResponse => {
                "The analysis service sent an unexpected answer. Please try again.".into()
            }
        }
    }
}

impl fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.detail)
    }
}

// ============================================================================
// Synchronous rejections (surfaced as a notice, state unchanged)
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerError {
    #[error("camera and media library access denied")]
    PermissionDenied { settings_required: bool },

    #[error("no image selected")]
    NoImageSelected,

    #[error("a submission is already in flight")]
    AlreadyInFlight,

    #[error("image acquisition failed: {0}")]
    Acquisition(capabilities::CameraError),
}

impl From<capabilities::CameraError> for ControllerError {
    fn from(e: capabilities::CameraError) -> Self {
        if e.is_permission_error() {
            Self::PermissionDenied {
                settings_required: e.should_show_settings(),
            }
        } else {
            Self::Acquisition(e)
        }
    }
}

impl ControllerError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::NoImageSelected => "NO_IMAGE_SELECTED",
            Self::AlreadyInFlight => "ALREADY_IN_FLIGHT",
            Self::Acquisition(_) => "ACQUISITION_FAILED",
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::PermissionDenied {
                settings_required: true,
            } => "Camera and gallery access are required. Please enable them in Settings.".into(),
            Self::PermissionDenied {
                settings_required: false,
            } => "You need to allow access to the camera and the gallery.".into(),
            Self::NoImageSelected => "Capture or import an image first.".into(),
            Self::AlreadyInFlight => "An analysis is already running. Please wait.".into(),
            Self::Acquisition(e) => format!("Could not get the image: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CameraError;

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(ErrorKind::NetworkFailure.code(), "NETWORK_FAILURE");
        assert_eq!(ErrorKind::ServerError { status: 500 }.code(), "SERVER_ERROR");
        assert_eq!(ErrorKind::MalformedResponse.code(), "MALFORMED_RESPONSE");
        assert_eq!(ErrorKind::ServerError { status: 503 }.status(), Some(503));
        assert_eq!(ErrorKind::NetworkFailure.status(), None);
    }

    #[test]
    fn test_failure_display_includes_code() {
        let failure = FailureInfo::new(ErrorKind::ServerError { status: 500 }, "HTTP 500: boom");
        assert_eq!(failure.to_string(), "[SERVER_ERROR] HTTP 500: boom");
        assert!(failure.user_facing_message().contains("500"));
    }

    #[test]
    fn test_error_kind_serializes_tagged() {
        let json = serde_json::to_value(ErrorKind::ServerError { status: 502 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "server_error", "status": 502}));
    }

    #[test]
    fn test_user_facing_message() {
        let denied = ControllerError::PermissionDenied {
            settings_required: true,
        };
        assert!(denied.user_facing_message().contains("Settings"));
        assert_eq!(denied.code(), "PERMISSION_DENIED");

        let busy = ControllerError::AlreadyInFlight;
        assert!(busy.user_facing_message().contains("already"));

        let acquisition: ControllerError = CameraError::Unavailable {
            reason: "no camera".into(),
        }
        .into();
        assert_eq!(acquisition.code(), "ACQUISITION_FAILED");
        assert!(acquisition.user_facing_message().contains("no camera"));

        let permanent: ControllerError = CameraError::PermissionDeniedPermanently.into();
        assert_eq!(
            permanent,
            ControllerError::PermissionDenied {
                settings_required: true
            }
        );
    }
}
