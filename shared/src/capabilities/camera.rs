use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::permissions::{PermissionGate, PermissionStatus};
use crate::model::ImageAsset;

/// Full resolution; the classifier works on the original pixels.
pub const FULL_QUALITY: u8 = 100;

/// Rear camera; the shell does not offer switching.
pub const CAPTURE_CONFIG: CaptureConfig = CaptureConfig {
    media: MediaFilter::Images,
    quality: FULL_QUALITY,
};

pub const GALLERY_PICK_CONFIG: GalleryPickConfig = GalleryPickConfig {
    media: MediaFilter::Images,
    quality: FULL_QUALITY,
    allow_multiple: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFilter {
    Images,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Only formats the upload path can recognise from their bytes.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub media: MediaFilter,
    pub quality: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryPickConfig {
    pub media: MediaFilter,
    pub quality: u8,
    pub allow_multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraOutput {
    Photos(Vec<ImageAsset>),
    Cancelled,
}

impl CameraOutput {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CameraOutput::Cancelled)
    }

    /// Single selection only; extra assets are ignored.
    pub fn into_first(self) -> Option<ImageAsset> {
        match self {
            CameraOutput::Photos(assets) => assets.into_iter().next(),
            CameraOutput::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera permission denied permanently - user must enable in settings")]
    PermissionDeniedPermanently,

    #[error("camera unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("capture cancelled by user")]
    Cancelled,

    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },
}

impl CameraError {
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied | CameraError::PermissionDeniedPermanently
        )
    }

    pub fn should_show_settings(&self) -> bool {
        matches!(self, CameraError::PermissionDeniedPermanently)
    }
}

pub type CameraResult = Result<CameraOutput, CameraError>;

/// Native camera and gallery pickers, implemented by the shell.
#[async_trait::async_trait]
pub trait ImagePicker: Send + Sync {
    async fn capture_photo(&self, config: &CaptureConfig) -> CameraResult;
    async fn pick_from_gallery(&self, config: &GalleryPickConfig) -> CameraResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    Asset(ImageAsset),
    Cancelled,
}

/// Permission check followed by a single picker round-trip.
pub struct ImageAcquisition {
    gate: Arc<PermissionGate>,
    picker: Arc<dyn ImagePicker>,
}

impl ImageAcquisition {
    pub fn new(gate: Arc<PermissionGate>, picker: Arc<dyn ImagePicker>) -> Self {
        Self { gate, picker }
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    #[instrument(skip(self))]
    pub async fn capture_from_camera(&self) -> Result<Acquired, CameraError> {
        self.ensure_access().await?;
        let output = self.picker.capture_photo(&CAPTURE_CONFIG).await;
        Self::settle(output, "camera")
    }

    #[instrument(skip(self))]
    pub async fn pick_from_library(&self) -> Result<Acquired, CameraError> {
        self.ensure_access().await?;
        let output = self.picker.pick_from_gallery(&GALLERY_PICK_CONFIG).await;
        Self::settle(output, "library")
    }

    async fn ensure_access(&self) -> Result<(), CameraError> {
        match self.gate.request_access().await {
            PermissionStatus::Granted => Ok(()),
            _ if self.gate.settings_required() => Err(CameraError::PermissionDeniedPermanently),
            _ => Err(CameraError::PermissionDenied),
        }
    }

    fn settle(output: CameraResult, source: &'static str) -> Result<Acquired, CameraError> {
        match output {
            Ok(output) => match output.into_first() {
                Some(asset) => {
                    info!(source, file_name = asset.file_name(), "image acquired");
                    Ok(Acquired::Asset(asset))
                }
                None => {
                    debug!(source, "picker cancelled");
                    Ok(Acquired::Cancelled)
                }
            },
            Err(CameraError::Cancelled) => {
                debug!(source, "picker cancelled");
                Ok(Acquired::Cancelled)
            }
            Err(e) => Err(e),
        }
    }
}
