use serde::{Deserialize, Serialize};

use crate::model::{DiagnosisResult, ImageAsset, SubmissionId};
use crate::FailureInfo;

/// Everything that can move the request lifecycle.
///
/// Platform results arrive as events too, so `Model::apply` stays a pure
/// function of the prior model and what was observed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    ImageSelected(ImageAsset),
    SelectionCancelled,
    SubmitRequested {
        submission: SubmissionId,
    },
    SubmissionFinished {
        submission: SubmissionId,
        outcome: Result<DiagnosisResult, FailureInfo>,
    },
    ResetRequested,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImageSelected(_) => "image_selected",
            Self::SelectionCancelled => "selection_cancelled",
            Self::SubmitRequested { .. } => "submit_requested",
            Self::SubmissionFinished { .. } => "submission_finished",
            Self::ResetRequested => "reset_requested",
        }
    }
}

/// What the controller has to do after an accepted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Changed,
    StartSubmission(ImageAsset),
}

impl Transition {
    pub fn is_observable(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}
