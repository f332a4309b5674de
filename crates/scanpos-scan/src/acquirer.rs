//! # Stream Acquirer
//!
//! Walks the constraint ladder until the platform hands back a stream, and
//! wraps that stream in a lease that guarantees its tracks are stopped.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Acquisition Ladder                                 │
//! │                                                                         │
//! │   previous lease ──► release()                                         │
//! │                        │                                                │
//! │                        ▼                                                │
//! │   rung 0 ── err ──► rung 1 ── err ──► rung 2 ── err ──► rung 3 ── err ─┼─► AcquireError
//! │     │ ok              │ ok              │ ok              │ ok         │   (last error)
//! │     ▼                 ▼                 ▼                 ▼            │
//! │   StreamLease { stream, rung }                                         │
//! │                                                                         │
//! │   At most one lease is live per acquirer caller: the previous one is   │
//! │   always released before the first rung is requested.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::device::{MediaDevices, MediaStream, TrackState, VideoConstraints};
use crate::error::{AcquireError, DeviceError};

// =============================================================================
// Stream Lease
// =============================================================================

struct LeaseInner<S: MediaStream> {
    stream: Arc<S>,
    released: AtomicBool,
    rung: usize,
}

impl<S: MediaStream> LeaseInner<S> {
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stream.stop_tracks();
        true
    }
}

impl<S: MediaStream> Drop for LeaseInner<S> {
    fn drop(&mut self) {
        if self.release() {
            debug!(stream = self.stream.id(), "Released camera stream on drop");
        }
    }
}

/// Exclusive handle on an acquired camera stream.
///
/// Clones share the same stream; the tracks stop on the first
/// [`release`](StreamLease::release) or when the last clone is dropped.
pub struct StreamLease<S: MediaStream> {
    inner: Arc<LeaseInner<S>>,
}

impl<S: MediaStream> Clone for StreamLease<S> {
    fn clone(&self) -> Self {
        StreamLease {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MediaStream> StreamLease<S> {
    fn new(stream: S, rung: usize) -> Self {
        StreamLease {
            inner: Arc::new(LeaseInner {
                stream: Arc::new(stream),
                released: AtomicBool::new(false),
                rung,
            }),
        }
    }

    pub fn stream(&self) -> &S {
        &self.inner.stream
    }

    pub fn stream_handle(&self) -> Arc<S> {
        Arc::clone(&self.inner.stream)
    }

    /// Index of the ladder rung that produced this stream.
    pub fn rung(&self) -> usize {
        self.inner.rung
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Stops every track. Returns false if the lease was already released.
    pub fn release(&self) -> bool {
        let released = self.inner.release();
        if released {
            debug!(stream = self.inner.stream.id(), "Released camera stream");
        }
        released
    }

    /// Resolves once the tracks end. Returns true when that happened without
    /// a release, meaning the device went away underneath us.
    pub async fn ended_unexpectedly(&self) -> bool {
        let mut state = self.inner.stream.track_state();
        // A dropped sender also means the stream is gone.
        let _ = state.wait_for(|s| *s == TrackState::Ended).await;
        !self.is_released()
    }
}

impl<S: MediaStream> std::fmt::Debug for StreamLease<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLease")
            .field("stream", &self.inner.stream.id())
            .field("rung", &self.inner.rung)
            .field("released", &self.is_released())
            .finish()
    }
}

// =============================================================================
// Acquirer
// =============================================================================

/// Requests camera streams through a fallback ladder.
pub struct StreamAcquirer<M: MediaDevices> {
    devices: Arc<M>,
    ladder: Vec<VideoConstraints>,
}

impl<M: MediaDevices> StreamAcquirer<M> {
    pub fn new(devices: Arc<M>, ladder: Vec<VideoConstraints>) -> Self {
        StreamAcquirer { devices, ladder }
    }

    pub fn ladder(&self) -> &[VideoConstraints] {
        &self.ladder
    }

    /// Acquires a new stream, releasing `previous` first.
    ///
    /// Every rung is tried in order, including after a permission error on
    /// an earlier rung. The error of the last rung classifies the failure.
    pub async fn acquire(
        &self,
        previous: Option<&StreamLease<M::Stream>>,
    ) -> Result<StreamLease<M::Stream>, AcquireError> {
        if let Some(previous) = previous {
            previous.release();
        }

        let mut last = DeviceError::not_found("no constraint sets configured");
        for (rung, constraints) in self.ladder.iter().enumerate() {
            debug!(rung, constraints = %constraints, "Requesting camera stream");
            match self.devices.get_user_media(constraints).await {
                Ok(stream) => {
                    info!(
                        rung,
                        stream = stream.id(),
                        constraints = %constraints,
                        "Camera stream acquired"
                    );
                    return Ok(StreamLease::new(stream, rung));
                }
                Err(err) => {
                    warn!(rung, constraints = %constraints, error = %err, "Constraint set rejected");
                    last = err;
                }
            }
        }

        Err(AcquireError {
            attempts: self.ladder.len(),
            last,
        })
    }
}
