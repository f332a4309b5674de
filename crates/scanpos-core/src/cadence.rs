//! # Decode Cadence
//!
//! Adaptive spacing between decode attempts, kept as a small value type with
//! pure transitions so it can be tested without a camera or a clock.
//!
//! ## Backoff Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Additive / Decay Backoff                            │
//! │                                                                         │
//! │  interval_ms                                                            │
//! │     300 ┤ · · · · · · · · · · · · · · · · · · · · ·  error ceiling     │
//! │     250 ┤ · · · · · · · · · · · · · ┌───── idle ceiling                 │
//! │         │                       ┌───┘                                   │
//! │     150 ┤───────┐           ┌───┘   run of not-found: +25 per attempt  │
//! │         │       └──┐    ┌───┘                                           │
//! │     100 ┤ · · · · ·└────┘ · · floor · · · · · · · · · · · · · · ·      │
//! │         └──────────────────────────────────────────────────► attempts   │
//! │           success: -50        errors: +50 (up to error ceiling)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Any successful decode, confirmed or not, speeds polling up.
//! - A run of not-found outcomes slows polling down to the idle ceiling.
//! - Decoder faults slow it further, up to the error ceiling.
//! - Skipped attempts (surface not ready) leave the cadence unchanged.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Policy
// =============================================================================

/// Tuning knobs for [`DecodeCadence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadencePolicy {
    /// Interval used for the first attempt of a session.
    #[serde(default = "default_initial_interval")]
    pub initial_interval_ms: u64,

    /// Fastest allowed polling.
    #[serde(default = "default_floor")]
    pub floor_ms: u64,

    /// Slowest polling reached through not-found outcomes alone.
    #[serde(default = "default_idle_ceiling")]
    pub idle_ceiling_ms: u64,

    /// Slowest polling reached after decoder faults.
    #[serde(default = "default_error_ceiling")]
    pub error_ceiling_ms: u64,

    /// Decrease applied after a successful decode.
    #[serde(default = "default_speedup_step")]
    pub speedup_step_ms: u64,

    /// Increase applied per not-found once the run threshold is reached.
    #[serde(default = "default_slowdown_step")]
    pub slowdown_step_ms: u64,

    /// Increase applied per decoder fault.
    #[serde(default = "default_error_step")]
    pub error_step_ms: u64,

    /// Consecutive not-found outcomes before slowing down.
    #[serde(default = "default_not_found_run")]
    pub not_found_run: u32,
}

fn default_initial_interval() -> u64 {
    150
}
fn default_floor() -> u64 {
    100
}
fn default_idle_ceiling() -> u64 {
    250
}
fn default_error_ceiling() -> u64 {
    300
}
fn default_speedup_step() -> u64 {
    50
}
fn default_slowdown_step() -> u64 {
    25
}
fn default_error_step() -> u64 {
    50
}
fn default_not_found_run() -> u32 {
    3
}

impl Default for CadencePolicy {
    fn default() -> Self {
        CadencePolicy {
            initial_interval_ms: default_initial_interval(),
            floor_ms: default_floor(),
            idle_ceiling_ms: default_idle_ceiling(),
            error_ceiling_ms: default_error_ceiling(),
            speedup_step_ms: default_speedup_step(),
            slowdown_step_ms: default_slowdown_step(),
            error_step_ms: default_error_step(),
            not_found_run: default_not_found_run(),
        }
    }
}

impl CadencePolicy {
    /// Checks the ordering `0 < floor <= initial`, `floor <= idle <= error`.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.floor_ms == 0 {
            return Err(ValidationError::OutOfRange {
                field: "floor_ms".to_string(),
                min: 1,
                max: self.idle_ceiling_ms as i64,
            });
        }
        if self.floor_ms > self.idle_ceiling_ms {
            return Err(ValidationError::InvalidFormat {
                field: "idle_ceiling_ms".to_string(),
                reason: format!(
                    "must be at least floor_ms ({}), got {}",
                    self.floor_ms, self.idle_ceiling_ms
                ),
            });
        }
        if self.idle_ceiling_ms > self.error_ceiling_ms {
            return Err(ValidationError::InvalidFormat {
                field: "error_ceiling_ms".to_string(),
                reason: format!(
                    "must be at least idle_ceiling_ms ({}), got {}",
                    self.idle_ceiling_ms, self.error_ceiling_ms
                ),
            });
        }
        if self.initial_interval_ms < self.floor_ms
            || self.initial_interval_ms > self.error_ceiling_ms
        {
            return Err(ValidationError::OutOfRange {
                field: "initial_interval_ms".to_string(),
                min: self.floor_ms as i64,
                max: self.error_ceiling_ms as i64,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Cadence State
// =============================================================================

/// Current decode interval plus the outcome streaks that drive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeCadence {
    policy: CadencePolicy,
    pub interval_ms: u64,
    pub consecutive_not_found: u32,
    pub consecutive_errors: u32,
}

impl DecodeCadence {
    pub fn new(policy: CadencePolicy) -> Self {
        DecodeCadence {
            policy,
            interval_ms: policy.initial_interval_ms,
            consecutive_not_found: 0,
            consecutive_errors: 0,
        }
    }

    /// Delay before the next attempt.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// After a successful decode (confirmed or not).
    #[must_use]
    pub fn on_success(self) -> Self {
        DecodeCadence {
            interval_ms: self
                .interval_ms
                .saturating_sub(self.policy.speedup_step_ms)
                .max(self.policy.floor_ms),
            consecutive_not_found: 0,
            consecutive_errors: 0,
            ..self
        }
    }

    /// After an attempt that found no code in the frame.
    #[must_use]
    pub fn on_not_found(self) -> Self {
        let run = self.consecutive_not_found.saturating_add(1);
        let mut interval_ms = self.interval_ms;
        // Error backoff above the idle ceiling is left to decay on success.
        if run >= self.policy.not_found_run && interval_ms < self.policy.idle_ceiling_ms {
            interval_ms = (interval_ms + self.policy.slowdown_step_ms).min(self.policy.idle_ceiling_ms);
        }
        DecodeCadence {
            interval_ms,
            consecutive_not_found: run,
            consecutive_errors: 0,
            ..self
        }
    }

    /// After a decoder fault other than not-found.
    #[must_use]
    pub fn on_error(self) -> Self {
        DecodeCadence {
            interval_ms: (self.interval_ms + self.policy.error_step_ms)
                .min(self.policy.error_ceiling_ms),
            consecutive_not_found: 0,
            consecutive_errors: self.consecutive_errors.saturating_add(1),
            ..self
        }
    }

    /// After an attempt skipped because the surface was not ready.
    #[must_use]
    pub fn on_skip(self) -> Self {
        self
    }

    pub fn policy(&self) -> &CadencePolicy {
        &self.policy
    }
}

impl Default for DecodeCadence {
    fn default() -> Self {
        DecodeCadence::new(CadencePolicy::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
