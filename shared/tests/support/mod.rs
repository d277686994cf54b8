#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dermscan_shared::capabilities::{
    CameraOutput, CameraResult, Capabilities, CaptureConfig, GalleryPickConfig, HttpError,
    HttpRequest, HttpResponse, HttpResult, HttpTransport, ImagePicker, PermissionResponse,
    PermissionService,
};
use dermscan_shared::ImageAsset;

pub const ENDPOINT: &str = "http://172.25.153.3:5000/predict";

pub struct FixedPermissions {
    pub camera: PermissionResponse,
    pub library: PermissionResponse,
}

impl FixedPermissions {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self {
            camera: PermissionResponse::Granted,
            library: PermissionResponse::Granted,
        })
    }

    pub fn denied(camera: PermissionResponse) -> Arc<Self> {
        Arc::new(Self {
            camera,
            library: PermissionResponse::Granted,
        })
    }
}

#[async_trait]
impl PermissionService for FixedPermissions {
    async fn request_camera(&self) -> PermissionResponse {
        self.camera
    }

    async fn request_media_library(&self) -> PermissionResponse {
        self.library
    }
}

/// Hands out queued picker results; cancels once the queue is empty.
#[derive(Default)]
pub struct QueuePicker {
    queue: Mutex<VecDeque<CameraResult>>,
    pub opened: AtomicUsize,
}

impl QueuePicker {
    pub fn with(results: Vec<CameraResult>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(results.into()),
            opened: AtomicUsize::new(0),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn next(&self) -> CameraResult {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(CameraOutput::Cancelled))
    }
}

#[async_trait]
impl ImagePicker for QueuePicker {
    async fn capture_photo(&self, _config: &CaptureConfig) -> CameraResult {
        self.next()
    }

    async fn pick_from_gallery(&self, _config: &GalleryPickConfig) -> CameraResult {
        self.next()
    }
}

/// Answers every request from a queue and records what it was sent.
#[derive(Default)]
pub struct CannedTransport {
    replies: Mutex<VecDeque<HttpResult>>,
    pub seen: Mutex<Vec<HttpRequest>>,
}

impl CannedTransport {
    pub fn with(replies: Vec<HttpResult>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for CannedTransport {
    async fn execute(&self, request: HttpRequest) -> HttpResult {
        self.seen.lock().unwrap().push(request.clone());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(HttpError::ConnectionError {
                host: request.url().host().to_string(),
                message: "connection refused".into(),
            })
        })
    }
}

pub fn json_reply(status: u16, body: serde_json::Value) -> HttpResult {
    Ok(HttpResponse::with_body(status, body.to_string()))
}

pub fn diagnosis_body() -> serde_json::Value {
    serde_json::json!({
        "diagnostico_text": "A",
        "descricao_text": "B",
        "laudo_text": "C",
    })
}

pub fn photo(name: &str) -> ImageAsset {
    ImageAsset::new(format!("file:///data/user/0/cache/{name}"), "image/jpeg", name).unwrap()
}

pub fn photos(names: &[&str]) -> CameraResult {
    Ok(CameraOutput::Photos(names.iter().map(|n| photo(n)).collect()))
}

pub fn capabilities(
    permissions: Arc<FixedPermissions>,
    picker: Arc<QueuePicker>,
    http: Arc<dyn HttpTransport>,
) -> Capabilities {
    Capabilities::new(permissions, picker, http)
}
