//! # In-Memory Doubles
//!
//! Scriptable implementations of the platform seams, used by this crate's
//! tests and by the terminal's tests. They record every request so tests can
//! assert on order and count.
//!
//! ```text
//! MockDevices      scripted get_user_media results, optional permission API
//! MockStream       live flag, stop counter, first-frame warmup, track state
//! ScriptedDecoder  queue of DecodeStep, in-flight accounting
//! RecordingEmitter every on_code_detected / on_error call
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{watch, Notify};

use scanpos_core::{CameraPermissionState, DetectionCandidate, Symbology};

use crate::decoder::{DecodeHints, FrameDecoder};
use crate::device::{MediaDevices, MediaStream, PermissionWatch, TrackState, VideoConstraints};
use crate::error::{DecodeError, DeviceError};
use crate::events::{ScanEvent, ScanEventEmitter};
use crate::frame::Frame;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// MockStream
// =============================================================================

struct StreamState {
    id: String,
    live: AtomicBool,
    stop_calls: AtomicUsize,
    warmup: AtomicU32,
    track: watch::Sender<TrackState>,
    frame: Arc<Frame>,
}

/// A fake camera stream with one video track and a fixed 4×4 grey frame.
#[derive(Clone)]
pub struct MockStream {
    state: Arc<StreamState>,
}

impl MockStream {
    /// `warmup` is the number of frame reads that return nothing before the
    /// first frame appears.
    pub fn new(id: impl Into<String>, warmup: u32) -> Self {
        let (track, _) = watch::channel(TrackState::Live);
        MockStream {
            state: Arc::new(StreamState {
                id: id.into(),
                live: AtomicBool::new(true),
                stop_calls: AtomicUsize::new(0),
                warmup: AtomicU32::new(warmup),
                track,
                frame: Arc::new(Frame::new(vec![128; 16], 4, 4, 0)),
            }),
        }
    }

    /// Number of `stop_tracks` calls, including no-op repeats.
    pub fn stop_calls(&self) -> usize {
        self.state.stop_calls.load(Ordering::SeqCst)
    }

    /// Simulates the device disappearing (cable pulled, OS revoked access).
    pub fn end_unexpectedly(&self) {
        self.state.live.store(false, Ordering::SeqCst);
        self.state.track.send_replace(TrackState::Ended);
    }
}

impl MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.state.id
    }

    fn live_track_count(&self) -> usize {
        usize::from(self.state.live.load(Ordering::SeqCst))
    }

    fn stop_tracks(&self) {
        self.state.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.live.swap(false, Ordering::SeqCst) {
            self.state.track.send_replace(TrackState::Ended);
        }
    }

    fn track_state(&self) -> watch::Receiver<TrackState> {
        self.state.track.subscribe()
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        if !self.state.live.load(Ordering::SeqCst) {
            return None;
        }
        let warming = self
            .state
            .warmup
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if warming {
            return None;
        }
        Some(Arc::clone(&self.state.frame))
    }
}

// =============================================================================
// MockDevices
// =============================================================================

struct DevicesState {
    script: VecDeque<Result<(), DeviceError>>,
    requests: Vec<VideoConstraints>,
    streams: Vec<MockStream>,
    warmup: u32,
}

/// Fake camera API. Requests succeed unless a failure has been scripted.
#[derive(Clone)]
pub struct MockDevices {
    state: Arc<Mutex<DevicesState>>,
    permission: Option<Arc<watch::Sender<CameraPermissionState>>>,
}

impl Default for MockDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevices {
    /// A device with no permission query API.
    pub fn new() -> Self {
        MockDevices {
            state: Arc::new(Mutex::new(DevicesState {
                script: VecDeque::new(),
                requests: Vec::new(),
                streams: Vec::new(),
                warmup: 0,
            })),
            permission: None,
        }
    }

    /// Exposes a permission query API reporting `state`.
    pub fn with_permission(mut self, state: CameraPermissionState) -> Self {
        let (tx, _) = watch::channel(state);
        self.permission = Some(Arc::new(tx));
        self
    }

    /// Streams created from now on need `polls` frame reads before their
    /// first frame.
    pub fn with_warmup(self, polls: u32) -> Self {
        lock(&self.state).warmup = polls;
        self
    }

    /// Like [`with_warmup`](Self::with_warmup), on a shared handle.
    pub fn set_warmup(&self, polls: u32) {
        lock(&self.state).warmup = polls;
    }

    /// Changes the platform permission as if the user edited settings.
    pub fn set_permission(&self, state: CameraPermissionState) {
        if let Some(tx) = &self.permission {
            tx.send_replace(state);
        }
    }

    /// The next request fails with `err`.
    pub fn fail_next(&self, err: DeviceError) {
        lock(&self.state).script.push_back(Err(err));
    }

    /// The next request succeeds. Only needed between scripted failures.
    pub fn succeed_next(&self) {
        lock(&self.state).script.push_back(Ok(()));
    }

    /// Every constraint set requested so far, in order.
    pub fn requests(&self) -> Vec<VideoConstraints> {
        lock(&self.state).requests.clone()
    }

    pub fn streams(&self) -> Vec<MockStream> {
        lock(&self.state).streams.clone()
    }

    pub fn last_stream(&self) -> Option<MockStream> {
        lock(&self.state).streams.last().cloned()
    }

    /// Streams that still have a live track.
    pub fn live_streams(&self) -> usize {
        lock(&self.state)
            .streams
            .iter()
            .filter(|s| s.live_track_count() > 0)
            .count()
    }
}

impl MediaDevices for MockDevices {
    type Stream = MockStream;

    async fn get_user_media(&self, constraints: &VideoConstraints) -> Result<MockStream, DeviceError> {
        let mut state = lock(&self.state);
        state.requests.push(constraints.clone());
        if let Some(Err(err)) = state.script.pop_front() {
            return Err(err);
        }
        let stream = MockStream::new(format!("mock-{}", state.streams.len() + 1), state.warmup);
        state.streams.push(stream.clone());
        Ok(stream)
    }

    async fn query_permission(&self) -> Option<PermissionWatch> {
        self.permission.as_ref().map(|tx| tx.subscribe())
    }
}

// =============================================================================
// ScriptedDecoder
// =============================================================================

/// One scripted decoder answer.
#[derive(Debug, Clone)]
pub enum DecodeStep {
    Found(DetectionCandidate),
    NotFound,
    Fail(String),
    /// Waits for the notify before answering with the inner step.
    Hold(Arc<Notify>, Box<DecodeStep>),
}

impl DecodeStep {
    /// An EAN-13 read of `text`.
    pub fn found(text: &str) -> Self {
        Self::found_as(text, Symbology::Ean13)
    }

    pub fn found_as(text: &str, format: Symbology) -> Self {
        DecodeStep::Found(DetectionCandidate::new(text, format))
    }
}

/// Answers decode calls from a queue; `NotFound` once the queue is empty.
#[derive(Default)]
pub struct ScriptedDecoder {
    steps: Mutex<VecDeque<DecodeStep>>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedDecoder {
    pub fn new(steps: Vec<DecodeStep>) -> Self {
        ScriptedDecoder {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    pub fn push(&self, step: DecodeStep) {
        lock(&self.steps).push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous decode calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        lock(&self.steps).len()
    }
}

impl FrameDecoder for ScriptedDecoder {
    async fn decode(&self, _frame: Arc<Frame>, _hints: &DecodeHints) -> Result<DetectionCandidate, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight {
            counter: Arc::clone(&self.in_flight),
        };

        let mut step = lock(&self.steps).pop_front().unwrap_or(DecodeStep::NotFound);
        loop {
            match step {
                DecodeStep::Found(candidate) => return Ok(candidate),
                DecodeStep::NotFound => return Err(DecodeError::NotFound),
                DecodeStep::Fail(message) => return Err(DecodeError::Failed(message)),
                DecodeStep::Hold(notify, next) => {
                    notify.notified().await;
                    step = *next;
                }
            }
        }
    }
}

// =============================================================================
// RecordingEmitter
// =============================================================================

/// Records every session outcome.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        lock(&self.events).clone()
    }

    pub fn detected(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ScanEvent::CodeDetected(code) => Some(code.clone()),
                ScanEvent::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Error(message) => Some(message.clone()),
                ScanEvent::CodeDetected(_) => None,
            })
            .collect()
    }
}

impl ScanEventEmitter for RecordingEmitter {
    fn on_code_detected(&self, code: &str) {
        lock(&self.events).push(ScanEvent::CodeDetected(code.to_string()));
    }

    fn on_error(&self, message: &str) {
        lock(&self.events).push(ScanEvent::Error(message.to_string()));
    }
}
