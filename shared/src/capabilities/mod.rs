mod camera;
mod http;
mod permissions;

#[cfg(feature = "native-http")]
mod native;

pub use self::camera::{
    Acquired, CameraError, CameraOutput, CameraResult, CaptureConfig, GalleryPickConfig,
    ImageAcquisition, ImageFormat, ImagePicker, MediaFilter, CAPTURE_CONFIG, FULL_QUALITY,
    GALLERY_PICK_CONFIG,
};
pub use self::http::{
    FilePart, HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpResult,
    HttpTransport, NetworkPolicy, ValidatedUrl, MAX_TIMEOUT_MS, MAX_URL_LENGTH,
};
pub use self::permissions::{
    PermissionGate, PermissionResponse, PermissionService, PermissionStatus,
};

#[cfg(feature = "native-http")]
pub use self::native::ReqwestTransport;

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
}

/// Platform services the shell hands to the core.
#[derive(Clone)]
pub struct Capabilities {
    pub permissions: Arc<dyn PermissionService>,
    pub picker: Arc<dyn ImagePicker>,
    pub http: Arc<dyn HttpTransport>,
}

impl Capabilities {
    pub fn new(
        permissions: Arc<dyn PermissionService>,
        picker: Arc<dyn ImagePicker>,
        http: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            permissions,
            picker,
            http,
        }
    }

    /// Uses the bundled `reqwest` transport for HTTP.
    #[cfg(feature = "native-http")]
    pub fn with_native_http(
        permissions: Arc<dyn PermissionService>,
        picker: Arc<dyn ImagePicker>,
    ) -> Result<Self, CapabilityError> {
        Ok(Self::new(
            permissions,
            picker,
            Arc::new(ReqwestTransport::new()?),
        ))
    }
}
