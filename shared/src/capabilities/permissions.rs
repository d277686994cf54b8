use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument, warn};

/// What the OS answered for a single permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionResponse {
    Granted,
    Denied,
    DeniedPermanently,
    Restricted,
    NotDetermined,
}

impl PermissionResponse {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionResponse::Granted)
    }

    pub fn should_show_settings_prompt(&self) -> bool {
        matches!(
            self,
            PermissionResponse::DeniedPermanently | PermissionResponse::Restricted
        )
    }
}

/// Process-wide view of camera + media library access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Native permission prompts, implemented by the shell.
#[async_trait::async_trait]
pub trait PermissionService: Send + Sync {
    async fn request_camera(&self) -> PermissionResponse;
    async fn request_media_library(&self) -> PermissionResponse;
}

#[derive(Debug, Clone, Copy, Default)]
struct GateState {
    status: PermissionStatus,
    settings_required: bool,
}

/// Requests both grants on every call; the user may flip them in system
/// settings at any time, so nothing is cached beyond the last answer.
pub struct PermissionGate {
    service: Arc<dyn PermissionService>,
    state: Mutex<GateState>,
}

impl PermissionGate {
    pub fn new(service: Arc<dyn PermissionService>) -> Self {
        Self {
            service,
            state: Mutex::new(GateState::default()),
        }
    }

    #[instrument(skip(self))]
    pub async fn request_access(&self) -> PermissionStatus {
        let (camera, library) = tokio::join!(
            self.service.request_camera(),
            self.service.request_media_library()
        );

        let granted = camera.is_granted() && library.is_granted();
        let next = GateState {
            status: if granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            },
            settings_required: !granted
                && (camera.should_show_settings_prompt() || library.should_show_settings_prompt()),
        };

        if granted {
            debug!("camera and media library access granted");
        } else {
            warn!(
                ?camera,
                ?library,
                settings_required = next.settings_required,
                "permission denied"
            );
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        next.status
    }

    pub fn status(&self) -> PermissionStatus {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// True when the last denial can only be undone from system settings.
    pub fn settings_required(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .settings_required
    }
}
