//! The request lifecycle controller.
//!
//! The state record lives inside a watch channel and is only changed through
//! [`Model::apply`] inside `send_if_modified`, so every transition and its
//! publication happen in one critical section that never spans an `.await`.
//! Observers therefore never see a half-applied transition.

use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{
    Acquired, Capabilities, HttpError, HttpRequest, HttpResult, HttpTransport, ImageAcquisition,
    PermissionGate, PermissionStatus,
};
use crate::classifier::{self, FailedAttempt};
use crate::config::{ClientConfig, ConfigError, ResolvedConfig};
use crate::event::{Event, Transition};
use crate::model::{ImageAsset, Model, RequestState, SubmissionId};
use crate::theme::Palette;
use crate::view::ViewModel;
use crate::ControllerError;

struct Inner {
    config: ResolvedConfig,
    acquisition: ImageAcquisition,
    http: Arc<dyn HttpTransport>,
    state: watch::Sender<Model>,
    /// Wakes the pending `submit` so it drops its transport call.
    resets: Notify,
}

/// Cheap to clone; clones share one state record.
#[derive(Clone)]
pub struct RequestLifecycleController {
    inner: Arc<Inner>,
}

impl RequestLifecycleController {
    pub fn new(config: ResolvedConfig, caps: Capabilities) -> Self {
        let gate = Arc::new(PermissionGate::new(caps.permissions));
        let (state, _) = watch::channel(Model::new());
        Self {
            inner: Arc::new(Inner {
                config,
                acquisition: ImageAcquisition::new(gate, caps.picker),
                http: caps.http,
                state,
                resets: Notify::new(),
            }),
        }
    }

    pub fn from_config(config: &ClientConfig, caps: Capabilities) -> Result<Self, ConfigError> {
        Ok(Self::new(config.resolve()?, caps))
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> Model {
        self.inner.state.borrow().clone()
    }

    pub fn state(&self) -> RequestState {
        self.inner.state.borrow().state()
    }

    /// Every accepted transition publishes exactly one new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Model> {
        self.inner.state.subscribe()
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.inner.acquisition.gate().status()
    }

    pub fn view(&self, palette: &Palette) -> ViewModel {
        ViewModel::new(&self.inner.state.borrow(), palette)
    }

    pub fn select_image(&self, asset: ImageAsset) -> Result<RequestState, ControllerError> {
        self.dispatch(Event::ImageSelected(asset))?;
        Ok(self.state())
    }

    #[instrument(skip(self))]
    pub async fn capture_from_camera(&self) -> Result<RequestState, ControllerError> {
        self.refuse_while_submitting()?;
        let acquired = self.inner.acquisition.capture_from_camera().await;
        self.settle_acquisition(acquired)
    }

    #[instrument(skip(self))]
    pub async fn pick_from_library(&self) -> Result<RequestState, ControllerError> {
        self.refuse_while_submitting()?;
        let acquired = self.inner.acquisition.pick_from_library().await;
        self.settle_acquisition(acquired)
    }

    /// Uploads the held image and waits for the verdict.
    ///
    /// The single-flight check runs before anything is awaited, so a second
    /// call while one is pending never reaches the transport. A `reset` while
    /// waiting ends the transport call and returns the post-reset state.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<RequestState, ControllerError> {
        let reset = self.inner.resets.notified();
        tokio::pin!(reset);
        reset.as_mut().enable();

        let submission = SubmissionId::generate();
        let transition = self.dispatch(Event::SubmitRequested {
            submission: submission.clone(),
        })?;
        let Transition::StartSubmission(asset) = transition else {
            return Ok(self.state());
        };

        let mut guard = InFlightGuard {
            controller: self,
            submission: Some(submission.clone()),
        };
        let result = tokio::select! {
            result = self.transmit(&asset, &submission) => result,
            () = &mut reset => {
                info!(%submission, "submission abandoned by reset");
                guard.disarm();
                return Ok(self.state());
            }
        };
        guard.disarm();

        let outcome = classifier::evaluate(&result);
        match &outcome {
            Ok(_) => info!(%submission, "diagnosis received"),
            Err(failure) => warn!(%submission, code = failure.code(), detail = %failure.detail, "submission failed"),
        }

        self.dispatch(Event::SubmissionFinished {
            submission,
            outcome,
        })?;
        Ok(self.state())
    }

    pub fn reset(&self) -> RequestState {
        // reset is accepted from every state
        let _ = self.dispatch(Event::ResetRequested);
        self.inner.resets.notify_waiters();
        self.state()
    }

    async fn transmit(&self, asset: &ImageAsset, submission: &SubmissionId) -> HttpResult {
        let request = HttpRequest::upload(&self.inner.config.endpoint, asset, submission)?
            .with_timeout(self.inner.config.request_timeout)?;
        debug!(
            request_id = request.request_id(),
            host = request.url().host(),
            file_name = asset.file_name(),
            "sending image"
        );

        let Some(limit) = request.timeout() else {
            return self.inner.http.execute(request).await;
        };
        let request_id = request.request_id().to_string();
        match tokio::time::timeout(limit, self.inner.http.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(HttpError::Timeout {
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                request_id,
            }),
        }
    }

    fn refuse_while_submitting(&self) -> Result<(), ControllerError> {
        if self.state() == RequestState::Submitting {
            warn!("acquisition refused while a submission is in flight");
            return Err(ControllerError::AlreadyInFlight);
        }
        Ok(())
    }

    fn settle_acquisition(
        &self,
        acquired: Result<Acquired, crate::capabilities::CameraError>,
    ) -> Result<RequestState, ControllerError> {
        match acquired {
            Ok(Acquired::Asset(asset)) => self.select_image(asset),
            Ok(Acquired::Cancelled) => {
                self.dispatch(Event::SelectionCancelled)?;
                Ok(self.state())
            }
            Err(e) => {
                let err = ControllerError::from(e);
                warn!(code = err.code(), error = %err, "image acquisition failed");
                Err(err)
            }
        }
    }

    fn dispatch(&self, event: Event) -> Result<Transition, ControllerError> {
        let name = event.name();
        let mut outcome = Ok(Transition::Unchanged);
        self.inner.state.send_if_modified(|model| {
            outcome = model.apply(event);
            matches!(&outcome, Ok(t) if t.is_observable())
        });

        match &outcome {
            Ok(transition) => debug!(event = name, ?transition, state = %self.state(), "event applied"),
            Err(e) => warn!(event = name, code = e.code(), state = %self.state(), "event rejected"),
        }
        outcome
    }
}

/// Finishes the submission as abandoned if the `submit` future is dropped
/// before the transport answers, so the state cannot stay `Submitting`.
struct InFlightGuard<'a> {
    controller: &'a RequestLifecycleController,
    submission: Option<SubmissionId>,
}

impl InFlightGuard<'_> {
    fn disarm(&mut self) {
        self.submission = None;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let Some(submission) = self.submission.take() else {
            return;
        };
        warn!(%submission, "submission abandoned before completion");
        let failure = classifier::classify(&FailedAttempt::Transport(HttpError::Abandoned {
            request_id: submission.to_string(),
        }));
        let _ = self.controller.dispatch(Event::SubmissionFinished {
            submission,
            outcome: Err(failure),
        });
    }
}
