//! What the shell renders. Built fresh from a snapshot, never stored.

use serde::Serialize;

use crate::model::{DiagnosisResult, Model, RequestState};
use crate::theme::Palette;
use crate::FailureInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePreview {
    pub uri: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNotice {
    pub code: &'static str,
    pub title: &'static str,
    pub message: String,
}

impl From<&FailureInfo> for FailureNotice {
    fn from(failure: &FailureInfo) -> Self {
        Self {
            code: failure.code(),
            title: "Analysis failed",
            message: failure.user_facing_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub state: RequestState,
    pub image: Option<ImagePreview>,
    pub diagnosis: Option<DiagnosisResult>,
    pub failure: Option<FailureNotice>,
    pub is_busy: bool,
    pub can_acquire: bool,
    pub can_submit: bool,
    pub can_remove_image: bool,
    pub palette: Palette,
}

impl ViewModel {
    pub fn new(model: &Model, palette: &Palette) -> Self {
        let state = model.state();
        let busy = state == RequestState::Submitting;
        let image = model.image().map(|asset| ImagePreview {
            uri: asset.uri().to_string(),
            file_name: asset.file_name().to_string(),
        });

        Self {
            state,
            can_acquire: !busy,
            can_submit: image.is_some() && !busy,
            can_remove_image: image.is_some() && !busy,
            image,
            diagnosis: model.result().cloned(),
            failure: model.failure().map(FailureNotice::from),
            is_busy: busy,
            palette: *palette,
        }
    }
}
