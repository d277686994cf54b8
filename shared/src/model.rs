use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{CameraError, ImageFormat};
use crate::event::{Event, Transition};
use crate::{ControllerError, FailureInfo};

pub const DEFAULT_FILE_NAME: &str = "photo.jpg";

/// Reference to a locally available photo; never the bytes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "RawImageAsset")]
pub struct ImageAsset {
    uri: String,
    mime_type: String,
    file_name: String,
}

impl ImageAsset {
    pub fn new(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self, CameraError> {
        let uri = uri.into();
        let mime_type = mime_type.into().trim().to_lowercase();
        let file_name = file_name.into();

        if uri.trim().is_empty() {
            return Err(CameraError::InvalidImage {
                reason: "image uri is empty".to_string(),
            });
        }

        let Some(format) = ImageFormat::from_mime_type(&mime_type) else {
            return Err(CameraError::InvalidImage {
                reason: format!("unsupported image type '{mime_type}'"),
            });
        };
        let mime_type = format.mime_type().to_string();

        let file_name = if file_name.trim().is_empty() {
            file_name_from_uri(&uri).unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
        } else {
            file_name
        };

        Ok(Self {
            uri,
            mime_type,
            file_name,
        })
    }

    /// Builds an asset when the picker only reported a uri.
    pub fn from_uri(uri: impl Into<String>) -> Result<Self, CameraError> {
        let uri = uri.into();
        let format = match file_name_from_uri(&uri).and_then(|name| {
            name.rsplit_once('.').map(|(_, ext)| ext.to_string())
        }) {
            // content uris usually carry no extension
            None => ImageFormat::default(),
            Some(ext) => {
                ImageFormat::from_extension(&ext).ok_or_else(|| CameraError::InvalidImage {
                    reason: format!("unsupported image extension '.{ext}'"),
                })?
            }
        };
        Self::new(uri, format.mime_type(), String::new())
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Wire shape of an asset; checked by `ImageAsset::new` on the way in.
#[derive(Deserialize)]
struct RawImageAsset {
    uri: String,
    mime_type: String,
    #[serde(default)]
    file_name: String,
}

impl TryFrom<RawImageAsset> for ImageAsset {
    type Error = CameraError;

    fn try_from(raw: RawImageAsset) -> Result<Self, Self::Error> {
        Self::new(raw.uri, raw.mime_type, raw.file_name)
    }
}

// Uris can embed user paths; log the file name only.
impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("uri_len", &self.uri.len())
            .finish()
    }
}

fn file_name_from_uri(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// The three free-text fields returned by the inference service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosisResult {
    pub diagnostic_text: String,
    pub description_text: String,
    pub report_text: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RequestState {
    #[default]
    Idle,
    ImageSelected,
    Submitting,
    Success,
    Failed,
}

impl RequestState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ImageSelected => "image_selected",
            Self::Submitting => "submitting",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Each variant carries exactly the data its state allows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    ImageSelected {
        asset: ImageAsset,
    },
    Submitting {
        asset: ImageAsset,
        submission: SubmissionId,
    },
    Success {
        asset: ImageAsset,
        result: DiagnosisResult,
    },
    Failed {
        asset: ImageAsset,
        failure: FailureInfo,
    },
}

/// The controller's state record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Model {
    phase: Phase,
    /// Set exactly while `phase` is `Submitting`; `reset` abandons it.
    in_flight: Option<SubmissionId>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn state(&self) -> RequestState {
        match self.phase {
            Phase::Idle => RequestState::Idle,
            Phase::ImageSelected { .. } => RequestState::ImageSelected,
            Phase::Submitting { .. } => RequestState::Submitting,
            Phase::Success { .. } => RequestState::Success,
            Phase::Failed { .. } => RequestState::Failed,
        }
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        match &self.phase {
            Phase::Idle => None,
            Phase::ImageSelected { asset }
            | Phase::Submitting { asset, .. }
            | Phase::Success { asset, .. }
            | Phase::Failed { asset, .. } => Some(asset),
        }
    }

    pub fn result(&self) -> Option<&DiagnosisResult> {
        match &self.phase {
            Phase::Success { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureInfo> {
        match &self.phase {
            Phase::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> Option<&SubmissionId> {
        self.in_flight.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Applies one event. Rejections leave the model untouched.
    pub fn apply(&mut self, event: Event) -> Result<Transition, ControllerError> {
        match event {
            Event::ImageSelected(asset) => {
                if matches!(self.phase, Phase::Submitting { .. }) {
                    return Err(ControllerError::AlreadyInFlight);
                }
                self.phase = Phase::ImageSelected { asset };
                Ok(Transition::Changed)
            }

            Event::SelectionCancelled => Ok(Transition::Unchanged),

            Event::SubmitRequested { submission } => {
                let asset = match &self.phase {
                    Phase::Idle => return Err(ControllerError::NoImageSelected),
                    Phase::Submitting { .. } => return Err(ControllerError::AlreadyInFlight),
                    Phase::ImageSelected { asset }
                    | Phase::Success { asset, .. }
                    | Phase::Failed { asset, .. } => asset.clone(),
                };
                if self.in_flight.is_some() {
                    return Err(ControllerError::AlreadyInFlight);
                }

                self.in_flight = Some(submission.clone());
                self.phase = Phase::Submitting {
                    asset: asset.clone(),
                    submission,
                };
                Ok(Transition::StartSubmission(asset))
            }

            Event::SubmissionFinished {
                submission,
                outcome,
            } => {
                if self.in_flight.as_ref() != Some(&submission) {
                    return Ok(Transition::Unchanged);
                }
                let asset = match &self.phase {
                    Phase::Submitting {
                        asset,
                        submission: current,
                    } if *current == submission => asset.clone(),
                    _ => return Ok(Transition::Unchanged),
                };
                self.in_flight = None;

                self.phase = match outcome {
                    Ok(result) => Phase::Success { asset, result },
                    Err(failure) => Phase::Failed { asset, failure },
                };
                Ok(Transition::Changed)
            }

            Event::ResetRequested => {
                if matches!(self.phase, Phase::Idle) && self.in_flight.is_none() {
                    return Ok(Transition::Unchanged);
                }
                // the pending response, if any, no longer matches and is ignored
                self.phase = Phase::Idle;
                self.in_flight = None;
                Ok(Transition::Changed)
            }
        }
    }
}
