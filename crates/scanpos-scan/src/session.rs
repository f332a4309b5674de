//! # Scan Session Controller
//!
//! Orchestrates permission, acquisition, the video sink and the decode loop
//! into one "start scanning → one code or one failure" operation.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ScanPhase                                       │
//! │                                                                         │
//! │   Idle ──start()──► RequestingPermission ──► AcquiringCamera            │
//! │    ▲                 (skipped if granted)          │                    │
//! │    │                                               ▼                    │
//! │    │                Scanning ◄──────────── AwaitingFirstFrame           │
//! │    │                   │   ▲                (no timeout)                │
//! │    │        confirmed  │   └── track ended ► one silent reconnect       │
//! │    │                   ▼                                                │
//! │    ├────────────── Confirmed ──► on_code_detected(code) ──► Idle        │
//! │    │                                                                    │
//! │    ├── stop() from any phase (no callback)                              │
//! │    │                                                                    │
//! │    └── Failed(reason) ◄── any stage error ──► on_error(message)         │
//! │                                                                         │
//! │   submit_manual_code() works in every phase: it tears down whatever   │
//! │   is active and takes the same delivery path as a confirmed code.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! All mutable per-session state (cancellation token, stream lease) lives in
//! one `ActiveSession` value held in a single slot. Whoever takes the value
//! out of the slot owns the teardown, so teardown and delivery happen at
//! most once per session no matter how many tasks race to finish it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use scanpos_core::validation::normalize_manual_code;
use scanpos_core::CameraPermissionState;

use crate::acquirer::{StreamAcquirer, StreamLease};
use crate::config::ScannerConfig;
use crate::decode_loop::{AttemptOutcome, AttemptReport, DecodeLoop};
use crate::decoder::{DecodeHints, FrameDecoder};
use crate::device::{MediaDevices, MediaStream};
use crate::error::{DeviceFailure, ScanError, ScanResult};
use crate::events::{DetectionSource, NoOpEmitter, ScanEventEmitter};
use crate::permission::{PermissionGate, PermissionRequest};
use crate::sink::{VideoSink, VideoSurface};

// =============================================================================
// Phase & Status
// =============================================================================

/// Why a session ended in [`ScanPhase::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    PermissionDenied,
    DeviceUnavailable,
    Playback,
}

impl From<&ScanError> for FailureReason {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::PermissionDenied => FailureReason::PermissionDenied,
            ScanError::Playback(_) => FailureReason::Playback,
            _ => FailureReason::DeviceUnavailable,
        }
    }
}

/// Where the controller is in the scan state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    RequestingPermission,
    AcquiringCamera,
    AwaitingFirstFrame,
    Scanning,
    Confirmed,
    Failed(FailureReason),
}

impl ScanPhase {
    /// Returns true while a session holds, or is getting, the camera.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ScanPhase::RequestingPermission
                | ScanPhase::AcquiringCamera
                | ScanPhase::AwaitingFirstFrame
                | ScanPhase::Scanning
        )
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "idle"),
            ScanPhase::RequestingPermission => write!(f, "requesting permission"),
            ScanPhase::AcquiringCamera => write!(f, "acquiring camera"),
            ScanPhase::AwaitingFirstFrame => write!(f, "preparing camera"),
            ScanPhase::Scanning => write!(f, "scanning"),
            ScanPhase::Confirmed => write!(f, "confirmed"),
            ScanPhase::Failed(reason) => write!(f, "failed ({:?})", reason),
        }
    }
}

/// Observational view of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanStatus {
    pub session_id: Option<Uuid>,
    pub phase: ScanPhase,
    pub permission: CameraPermissionState,
    pub is_scanning: bool,
    pub video_ready: bool,
    /// Decode attempts, including skipped ones.
    pub attempt_count: u64,
    pub skipped_count: u64,
    /// Decoder faults; never surfaced individually.
    pub error_count: u64,
    pub current_interval_ms: u64,
    pub last_detected_value: Option<String>,
    pub consecutive_matches: u32,
    pub last_error: Option<String>,
    /// Silent reacquisitions after an unexpected track end.
    pub reconnects: u32,
}

impl ScanStatus {
    fn idle(permission: CameraPermissionState) -> Self {
        ScanStatus {
            permission,
            ..Default::default()
        }
    }
}

// =============================================================================
// Active Session
// =============================================================================

struct ActiveSession<S: MediaStream> {
    id: Uuid,
    cancel: CancellationToken,
    lease: Option<StreamLease<S>>,
}

/// How the wait for a stream's first frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstFrame {
    Ready,
    TrackEnded,
}

async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> ScanResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScanError::Cancelled),
        out = fut => Ok(out),
    }
}

struct Inner<M: MediaDevices, D: FrameDecoder> {
    config: ScannerConfig,
    gate: PermissionGate<M>,
    acquirer: StreamAcquirer<M>,
    sink: VideoSink,
    decode_loop: DecodeLoop<D>,
    surface: VideoSurface,
    emitter: Arc<dyn ScanEventEmitter>,
    slot: Mutex<Option<ActiveSession<M::Stream>>>,
    status: watch::Sender<ScanStatus>,
}

impl<M: MediaDevices, D: FrameDecoder> Inner<M, D> {
    fn slot(&self) -> MutexGuard<'_, Option<ActiveSession<M::Stream>>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, id: Uuid) -> bool {
        self.slot().as_ref().is_some_and(|s| s.id == id)
    }

    /// Takes the active session out of the slot. With `expected` set, only a
    /// session with that id is taken.
    fn take_session(&self, expected: Option<Uuid>) -> Option<ActiveSession<M::Stream>> {
        let mut slot = self.slot();
        match (expected, slot.as_ref()) {
            (Some(id), Some(active)) if active.id != id => None,
            _ => slot.take(),
        }
    }

    fn teardown(&self, session: ActiveSession<M::Stream>) {
        session.cancel.cancel();
        self.sink.unbind(&self.surface);
        if let Some(lease) = session.lease {
            lease.release();
        }
        debug!(session_id = %session.id, "Scan session torn down");
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut ScanStatus)) {
        self.status.send_if_modified(|status| {
            if status.session_id != Some(id) {
                return false;
            }
            f(status);
            true
        });
    }

    fn set_phase(&self, id: Uuid, phase: ScanPhase) {
        debug!(session_id = %id, phase = %phase, "Scan phase");
        self.update(id, |s| {
            s.phase = phase;
            s.is_scanning = phase.is_active();
        });
    }

    fn sync_permission(&self) {
        let permission = self.gate.current();
        self.status.send_if_modified(|s| {
            if s.permission == permission {
                return false;
            }
            s.permission = permission;
            true
        });
    }

    fn reset_idle(&self) {
        self.status.send_replace(ScanStatus::idle(self.gate.current()));
    }

    fn record_attempt(&self, id: Uuid, report: &AttemptReport) {
        self.update(id, |s| {
            s.attempt_count = report.attempt;
            match report.outcome {
                AttemptOutcome::Skipped => s.skipped_count += 1,
                AttemptOutcome::Failed(_) => s.error_count += 1,
                AttemptOutcome::NotFound | AttemptOutcome::Detected(_) => {}
            }
            s.current_interval_ms = report.interval_ms;
            s.consecutive_matches = report.consecutive_matches;
            s.last_detected_value = report.last_value.clone();
        });
    }

    /// Puts `lease` into the session slot. Releases it and reports
    /// `Cancelled` if the session is no longer current.
    fn install_lease(&self, id: Uuid, lease: StreamLease<M::Stream>) -> ScanResult<()> {
        let mut slot = self.slot();
        match slot.as_mut() {
            Some(active) if active.id == id => {
                if let Some(old) = active.lease.replace(lease) {
                    old.release();
                }
                Ok(())
            }
            _ => {
                drop(slot);
                lease.release();
                Err(ScanError::Cancelled)
            }
        }
    }

    /// Ends session `id` with `err`. No-op if it already ended.
    fn fail(&self, id: Uuid, err: &ScanError) {
        let Some(session) = self.take_session(Some(id)) else {
            debug!(session_id = %id, error = %err, "Ignoring failure of inactive session");
            return;
        };
        self.teardown(session);

        let message = err.user_message();
        self.sync_permission();
        self.update(id, |s| {
            s.phase = ScanPhase::Failed(FailureReason::from(err));
            s.is_scanning = false;
            s.video_ready = false;
            s.last_error = Some(message.clone());
        });
        if err.is_permission_error() {
            warn!(session_id = %id, "Scan failed: camera permission denied");
        } else {
            error!(session_id = %id, error = %err, "Scan failed");
        }
        self.emitter.on_error(&message);
    }

    /// Hands `code` to the emitter, ending the session first.
    ///
    /// Camera deliveries name their session and are dropped if it is gone;
    /// manual deliveries end whatever session is active.
    fn deliver(&self, expected: Option<Uuid>, code: &str, source: DetectionSource) -> bool {
        let session = self.take_session(expected);
        if expected.is_some() && session.is_none() {
            debug!(code = %code, "Dropping code from a session that already ended");
            return false;
        }
        let id = session.as_ref().map(|s| s.id);
        if let Some(session) = session {
            self.teardown(session);
        }

        self.status.send_modify(|s| {
            s.session_id = id;
            s.phase = ScanPhase::Confirmed;
            s.is_scanning = false;
            s.video_ready = false;
            s.last_detected_value = Some(code.to_string());
        });
        info!(code = %code, source = %source, "Code detected");
        self.emitter.on_code_detected(code);
        self.reset_idle();
        true
    }

    async fn resolve_permission(&self) -> CameraPermissionState {
        let current = self.gate.current();
        if current == CameraPermissionState::Granted {
            return current;
        }
        match self.gate.check_permission().await {
            CameraPermissionState::Unknown => self.gate.current(),
            checked => checked,
        }
    }

    async fn run_startup(self: &Arc<Self>, id: Uuid, cancel: &CancellationToken) -> ScanResult<()> {
        let permission = until_cancelled(cancel, self.resolve_permission()).await?;
        self.sync_permission();
        match permission {
            CameraPermissionState::Granted => {}
            CameraPermissionState::Denied => return Err(ScanError::PermissionDenied),
            CameraPermissionState::Prompt | CameraPermissionState::Unknown => {
                self.set_phase(id, ScanPhase::RequestingPermission);
                let outcome = until_cancelled(cancel, self.gate.request_permission()).await?;
                self.sync_permission();
                if let Some(err) = outcome.into_error() {
                    return Err(err);
                }
            }
        }

        self.set_phase(id, ScanPhase::AcquiringCamera);
        let lease = match until_cancelled(cancel, self.acquirer.acquire(None)).await? {
            Ok(lease) => lease,
            Err(err) => {
                if err.kind() == DeviceFailure::PermissionDenied {
                    self.gate.record(CameraPermissionState::Denied);
                }
                return Err(err.into());
            }
        };
        self.gate.record(CameraPermissionState::Granted);
        self.sync_permission();
        self.install_lease(id, lease.clone())?;

        self.set_phase(id, ScanPhase::AwaitingFirstFrame);
        let lease = match self.bind_and_wait(id, &lease, cancel).await? {
            FirstFrame::Ready => lease,
            FirstFrame::TrackEnded => self.recover_track_end(id, &lease, cancel).await?,
        };

        if !self.is_current(id) {
            return Err(ScanError::Cancelled);
        }
        self.set_phase(id, ScanPhase::Scanning);
        info!(session_id = %id, rung = lease.rung(), "Scanning");

        self.spawn_decode_task(id, cancel.clone());
        self.spawn_track_watcher(id, lease, cancel.clone());
        Ok(())
    }

    /// Binds `lease` to the surface and waits for its first frame, watching
    /// for the track to end in the meantime.
    async fn bind_and_wait(
        &self,
        id: Uuid,
        lease: &StreamLease<M::Stream>,
        cancel: &CancellationToken,
    ) -> ScanResult<FirstFrame> {
        if cancel.is_cancelled() || !self.is_current(id) {
            return Err(ScanError::Cancelled);
        }
        let stream: Arc<dyn MediaStream> = lease.stream_handle();
        if let Err(err) = self.sink.bind(stream, &self.surface) {
            self.sink.unbind(&self.surface);
            return Err(if cancel.is_cancelled() { ScanError::Cancelled } else { err });
        }
        // A stop() that raced the bind has already unbound the surface once.
        if cancel.is_cancelled() {
            self.sink.unbind(&self.surface);
            return Err(ScanError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            ended = lease.ended_unexpectedly() => {
                if ended {
                    Ok(FirstFrame::TrackEnded)
                } else {
                    Err(ScanError::Cancelled)
                }
            }
            polls = self.sink.wait_until_ready(&self.surface) => {
                debug!(session_id = %id, polls, "First frame available");
                self.update(id, |s| s.video_ready = true);
                Ok(FirstFrame::Ready)
            }
        }
    }

    fn spawn_decode_task(self: &Arc<Self>, id: Uuid, cancel: CancellationToken) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let confirmed = inner
                .decode_loop
                .run(
                    &inner.surface,
                    &cancel,
                    inner.config.confirm,
                    inner.config.decode.cadence,
                    |report| inner.record_attempt(id, report),
                )
                .await;
            if let Some(code) = confirmed {
                inner.deliver(Some(id), &code, DetectionSource::Camera);
            }
        });
    }

    fn spawn_track_watcher(self: &Arc<Self>, id: Uuid, lease: StreamLease<M::Stream>, cancel: CancellationToken) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let mut lease = lease;
            loop {
                let ended = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    ended = lease.ended_unexpectedly() => ended,
                };
                if !ended || cancel.is_cancelled() {
                    return;
                }

                match inner.recover_track_end(id, &lease, &cancel).await {
                    Ok(next) => lease = next,
                    Err(ScanError::Cancelled) => return,
                    Err(err) => {
                        inner.fail(id, &err);
                        return;
                    }
                }
            }
        });
    }

    /// Handles an unexpected track end: one silent reacquisition, or a
    /// device failure when reconnecting is disabled or the new stream also
    /// ends before its first frame.
    async fn recover_track_end(
        &self,
        id: Uuid,
        ended: &StreamLease<M::Stream>,
        cancel: &CancellationToken,
    ) -> ScanResult<StreamLease<M::Stream>> {
        warn!(session_id = %id, stream = ended.stream().id(), "Camera track ended unexpectedly");
        if !self.config.camera.reconnect_on_track_end {
            return Err(stream_ended());
        }
        self.reconnect(id, ended, cancel).await
    }

    /// One silent reacquisition after an unexpected track end.
    async fn reconnect(
        &self,
        id: Uuid,
        previous: &StreamLease<M::Stream>,
        cancel: &CancellationToken,
    ) -> ScanResult<StreamLease<M::Stream>> {
        self.update(id, |s| {
            s.video_ready = false;
            s.reconnects += 1;
        });
        self.sink.unbind(&self.surface);

        let lease = until_cancelled(cancel, self.acquirer.acquire(Some(previous)))
            .await?
            .map_err(|err| ScanError::DeviceUnavailable {
                kind: err.kind(),
                message: err.to_string(),
            })?;
        self.install_lease(id, lease.clone())?;
        if self.bind_and_wait(id, &lease, cancel).await? == FirstFrame::TrackEnded {
            warn!(session_id = %id, "Reconnected camera ended before its first frame");
            return Err(stream_ended());
        }
        info!(session_id = %id, rung = lease.rung(), "Camera reconnected");
        Ok(lease)
    }
}

fn stream_ended() -> ScanError {
    ScanError::DeviceUnavailable {
        kind: DeviceFailure::Other,
        message: "the camera stream ended".into(),
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Public face of the scan state machine.
///
/// Dropping the controller stops any active session.
pub struct ScanSessionController<M: MediaDevices, D: FrameDecoder> {
    inner: Arc<Inner<M, D>>,
}

impl<M: MediaDevices, D: FrameDecoder> ScanSessionController<M, D> {
    pub fn new(
        config: ScannerConfig,
        devices: Arc<M>,
        decoder: Arc<D>,
        emitter: Arc<dyn ScanEventEmitter>,
    ) -> ScanResult<Self> {
        config.validate()?;

        let hints = DecodeHints::from(&config.decode);
        let (status, _) = watch::channel(ScanStatus::idle(CameraPermissionState::Unknown));
        let inner = Inner {
            gate: PermissionGate::new(Arc::clone(&devices)),
            acquirer: StreamAcquirer::new(devices, config.camera.ladder.clone()),
            sink: VideoSink::new(config.camera.ready_poll_interval()),
            decode_loop: DecodeLoop::new(decoder, hints),
            surface: VideoSurface::new(),
            emitter,
            slot: Mutex::new(None),
            status,
            config,
        };

        Ok(ScanSessionController {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.inner.config
    }

    /// Starts a session and returns once frames are being decoded.
    ///
    /// An active session is torn down first, releasing its camera before a
    /// new one is requested. Failures are reported through `on_error` and
    /// returned; [`ScanError::Cancelled`] means `stop()` or a manual code
    /// ended the session while it was starting.
    pub async fn start(&self) -> ScanResult<()> {
        let inner = &self.inner;
        if let Some(previous) = inner.take_session(None) {
            info!(session_id = %previous.id, "Restarting scan session");
            inner.teardown(previous);
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *inner.slot() = Some(ActiveSession {
            id,
            cancel: cancel.clone(),
            lease: None,
        });
        inner.status.send_replace(ScanStatus {
            session_id: Some(id),
            current_interval_ms: inner.config.decode.cadence.initial_interval_ms,
            ..ScanStatus::idle(inner.gate.current())
        });
        info!(session_id = %id, "Scan session starting");

        match inner.run_startup(id, &cancel).await {
            Ok(()) => Ok(()),
            Err(ScanError::Cancelled) => {
                debug!(session_id = %id, "Scan session cancelled during startup");
                Err(ScanError::Cancelled)
            }
            Err(err) => {
                inner.fail(id, &err);
                Err(err)
            }
        }
    }

    /// Stops any active session and returns to idle. Never emits a code.
    ///
    /// Once this returns, no further decode attempts start and the camera
    /// tracks are stopped.
    pub fn stop(&self) {
        if let Some(session) = self.inner.take_session(None) {
            info!(session_id = %session.id, "Scan session stopped");
            self.inner.teardown(session);
        }
        self.inner.reset_idle();
    }

    /// Delivers a typed code through the same path as a camera detection,
    /// stopping any active session.
    pub fn submit_manual_code(&self, input: &str) -> ScanResult<String> {
        let code = normalize_manual_code(input)?;
        self.inner.deliver(None, &code, DetectionSource::Manual);
        Ok(code)
    }

    pub async fn check_permission(&self) -> CameraPermissionState {
        let state = self.inner.gate.check_permission().await;
        self.inner.sync_permission();
        state
    }

    pub async fn request_permission(&self) -> PermissionRequest {
        let outcome = self.inner.gate.request_permission().await;
        self.inner.sync_permission();
        outcome
    }

    pub fn permission(&self) -> CameraPermissionState {
        self.inner.gate.current()
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            permission: self.inner.gate.current(),
            ..self.inner.status.borrow().clone()
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.status.borrow().is_scanning
    }
}

impl<M: MediaDevices, D: FrameDecoder> Drop for ScanSessionController<M, D> {
    fn drop(&mut self) {
        if let Some(session) = self.inner.take_session(None) {
            debug!(session_id = %session.id, "Controller dropped with an active session");
            self.inner.teardown(session);
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a ScanSessionController with options.
pub struct ScanSessionBuilder<M: MediaDevices, D: FrameDecoder> {
    config: ScannerConfig,
    devices: Option<Arc<M>>,
    decoder: Option<Arc<D>>,
    emitter: Option<Arc<dyn ScanEventEmitter>>,
}

impl<M: MediaDevices, D: FrameDecoder> ScanSessionBuilder<M, D> {
    /// Creates a new builder with the given config.
    pub fn new(config: ScannerConfig) -> Self {
        ScanSessionBuilder {
            config,
            devices: None,
            decoder: None,
            emitter: None,
        }
    }

    /// Sets the camera backend.
    pub fn with_devices(mut self, devices: Arc<M>) -> Self {
        self.devices = Some(devices);
        self
    }

    /// Sets the frame decoder.
    pub fn with_decoder(mut self, decoder: Arc<D>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn ScanEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Builds the controller.
    pub fn build(self) -> ScanResult<ScanSessionController<M, D>> {
        let devices = self
            .devices
            .ok_or_else(|| ScanError::InvalidConfig("Camera backend required".into()))?;
        let decoder = self
            .decoder
            .ok_or_else(|| ScanError::InvalidConfig("Frame decoder required".into()))?;
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        ScanSessionController::new(self.config, devices, decoder, emitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDevices, ScriptedDecoder};

    #[test]
    fn test_phase_activity() {
        assert!(!ScanPhase::Idle.is_active());
        assert!(ScanPhase::AwaitingFirstFrame.is_active());
        assert!(ScanPhase::Scanning.is_active());
        assert!(!ScanPhase::Confirmed.is_active());
        assert!(!ScanPhase::Failed(FailureReason::Playback).is_active());
    }

    #[test]
    fn test_failure_reason_mapping() {
        assert_eq!(
            FailureReason::from(&ScanError::PermissionDenied),
            FailureReason::PermissionDenied
        );
        assert_eq!(
            FailureReason::from(&ScanError::Playback("no track".into())),
            FailureReason::Playback
        );
        assert_eq!(
            FailureReason::from(&ScanError::DeviceUnavailable {
                kind: DeviceFailure::Busy,
                message: "in use".into(),
            }),
            FailureReason::DeviceUnavailable
        );
    }

    #[test]
    fn test_builder_requires_backends() {
        let result = ScanSessionBuilder::<MockDevices, ScriptedDecoder>::new(ScannerConfig::default())
            .with_decoder(Arc::new(ScriptedDecoder::new(vec![])))
            .build();
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_validates_config() {
        let mut config = ScannerConfig::default();
        config.confirm.required_matches = 0;
        let result = ScanSessionBuilder::new(config)
            .with_devices(Arc::new(MockDevices::new()))
            .with_decoder(Arc::new(ScriptedDecoder::new(vec![])))
            .build();
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_bind_after_stop_reports_cancelled() {
        let controller = ScanSessionController::new(
            ScannerConfig::default(),
            Arc::new(MockDevices::new()),
            Arc::new(ScriptedDecoder::new(vec![])),
            Arc::new(NoOpEmitter),
        )
        .unwrap();
        let inner = &controller.inner;
        let lease = inner.acquirer.acquire(None).await.unwrap();

        // What stop() leaves behind: a cancelled token and a released stream.
        let cancel = CancellationToken::new();
        cancel.cancel();
        lease.release();

        let result = inner.bind_and_wait(Uuid::new_v4(), &lease, &cancel).await;
        assert_eq!(result, Err(ScanError::Cancelled));
        assert!(inner.surface.snapshot().frame.is_none());
    }

    #[test]
    fn test_stop_when_idle_is_harmless() {
        let controller = ScanSessionBuilder::new(ScannerConfig::default())
            .with_devices(Arc::new(MockDevices::new()))
            .with_decoder(Arc::new(ScriptedDecoder::new(vec![])))
            .build()
            .unwrap();
        controller.stop();
        controller.stop();
        assert_eq!(controller.status().phase, ScanPhase::Idle);
    }
}
