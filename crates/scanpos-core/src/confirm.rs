//! # Detection Confirmer
//!
//! A small debounce policy over the stream of decode outcomes: a value has
//! to be read identically on consecutive successful attempts before it is
//! trusted.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Detection Confirmer                                 │
//! │                                                                         │
//! │   state = { last_value, consecutive }      initial = { None, 0 }       │
//! │                                                                         │
//! │   candidate V                                                           │
//! │     ├── len(V) < min_length ──────────► reset { None, 0 }              │
//! │     ├── V == last_value ──────────────► consecutive += 1               │
//! │     └── V != last_value ──────────────► { Some(V), 1 }                 │
//! │                                                                         │
//! │   consecutive >= required_matches ────► Confirmed(V)  (once)           │
//! │                                                                         │
//! │   nothing decoded ────────────────────► reset { None, 0 }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Example with the default policy (2 matches, 3 chars):
//! ```text
//!   4902505130267 → Pending(1)
//!   1234567890123 → Pending(1)     different value restarts at 1
//!   4902505130267 → Pending(1)
//!   4902505130267 → Confirmed
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Policy
// =============================================================================

/// Thresholds of the confirmation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPolicy {
    /// Identical consecutive reads needed before a value is confirmed.
    #[serde(default = "default_required_matches")]
    pub required_matches: u32,

    /// Reads shorter than this (in characters) count as "nothing decoded".
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

fn default_required_matches() -> u32 {
    2
}

fn default_min_length() -> usize {
    3
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        ConfirmPolicy {
            required_matches: default_required_matches(),
            min_length: default_min_length(),
        }
    }
}

// =============================================================================
// Observation
// =============================================================================

/// What the confirmer concluded from one decode outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Value was shorter than the minimum length and reset the state.
    TooShort,

    /// Value seen, not yet trusted.
    Pending { value: String, count: u32 },

    /// Value crossed the threshold. Reported exactly once.
    Confirmed(String),

    /// A value was already confirmed; later reads are ignored.
    AlreadyConfirmed,
}

// =============================================================================
// Confirmer
// =============================================================================

/// Consecutive-match debounce filter.
#[derive(Debug, Clone)]
pub struct DetectionConfirmer {
    policy: ConfirmPolicy,
    last_value: Option<String>,
    consecutive: u32,
    confirmed: bool,
}

impl DetectionConfirmer {
    pub fn new(policy: ConfirmPolicy) -> Self {
        DetectionConfirmer {
            policy,
            last_value: None,
            consecutive: 0,
            confirmed: false,
        }
    }

    /// Feeds one successfully decoded value.
    pub fn observe(&mut self, value: &str) -> Observation {
        if self.confirmed {
            return Observation::AlreadyConfirmed;
        }

        if value.chars().count() < self.policy.min_length {
            self.observe_nothing();
            return Observation::TooShort;
        }

        match &self.last_value {
            Some(last) if last == value => self.consecutive += 1,
            _ => {
                self.last_value = Some(value.to_string());
                self.consecutive = 1;
            }
        }

        if self.consecutive >= self.policy.required_matches {
            self.confirmed = true;
            return Observation::Confirmed(value.to_string());
        }

        Observation::Pending {
            value: value.to_string(),
            count: self.consecutive,
        }
    }

    /// Records an attempt that decoded nothing.
    pub fn observe_nothing(&mut self) {
        if self.confirmed {
            return;
        }
        self.last_value = None;
        self.consecutive = 0;
    }

    /// Value currently being counted, if any.
    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }

    /// Number of identical consecutive reads of [`last_value`](Self::last_value).
    pub fn consecutive_matches(&self) -> u32 {
        self.consecutive
    }

    /// Returns true once a value has been confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn policy(&self) -> &ConfirmPolicy {
        &self.policy
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn confirmer() -> DetectionConfirmer {
        DetectionConfirmer::new(ConfirmPolicy::default())
    }

    #[test]
    fn test_two_consecutive_reads_confirm() {
        let mut c = confirmer();
        assert_eq!(
            c.observe("4902505130267"),
            Observation::Pending {
                value: "4902505130267".to_string(),
                count: 1
            }
        );
        assert_eq!(
            c.observe("4902505130267"),
            Observation::Confirmed("4902505130267".to_string())
        );
        assert!(c.is_confirmed());
    }

    #[test]
    fn test_interleaved_value_restarts_count() {
        let mut c = confirmer();
        c.observe("4902505130267");
        c.observe("1234567890123");
        let third = c.observe("4902505130267");

        assert!(matches!(third, Observation::Pending { count: 1, .. }));
        assert_eq!(c.consecutive_matches(), 1);
        assert_eq!(c.last_value(), Some("4902505130267"));
        assert!(!c.is_confirmed());
    }

    #[test]
    fn test_nothing_decoded_resets_to_zero() {
        let mut c = confirmer();
        c.observe("4902505130267");
        c.observe_nothing();
        assert_eq!(c.consecutive_matches(), 0);
        assert_eq!(c.last_value(), None);

        assert!(matches!(
            c.observe("4902505130267"),
            Observation::Pending { count: 1, .. }
        ));
    }

    #[test]
    fn test_short_values_count_as_nothing() {
        let mut c = confirmer();
        c.observe("4902505130267");
        assert_eq!(c.observe("12"), Observation::TooShort);
        assert_eq!(c.consecutive_matches(), 0);

        // Three characters is long enough.
        c.observe("abc");
        assert_eq!(c.observe("abc"), Observation::Confirmed("abc".to_string()));
    }

    #[test]
    fn test_confirmation_is_reported_once() {
        let mut c = confirmer();
        c.observe("4902505130267");
        c.observe("4902505130267");
        assert_eq!(c.observe("4902505130267"), Observation::AlreadyConfirmed);
        assert_eq!(c.observe("1234567890123"), Observation::AlreadyConfirmed);
    }

    #[test]
    fn test_custom_policy() {
        let mut c = DetectionConfirmer::new(ConfirmPolicy {
            required_matches: 3,
            min_length: 8,
        });
        assert_eq!(c.observe("1234567"), Observation::TooShort);
        c.observe("12345678");
        c.observe("12345678");
        assert_eq!(
            c.observe("12345678"),
            Observation::Confirmed("12345678".to_string())
        );
    }

    #[test]
    fn test_min_length_counts_characters() {
        let mut c = confirmer();
        // Three characters, nine bytes.
        assert!(matches!(c.observe("商品券"), Observation::Pending { .. }));
    }

    /// Reference model: the first adjacent pair of equal, long-enough reads.
    fn first_qualifying_pair(reads: &[Option<String>]) -> Option<String> {
        reads.windows(2).find_map(|w| match (&w[0], &w[1]) {
            (Some(a), Some(b)) if a == b && a.chars().count() >= 3 => Some(a.clone()),
            _ => None,
        })
    }

    proptest! {
        #[test]
        fn prop_confirms_iff_two_consecutive_equal_reads(
            reads in proptest::collection::vec(
                proptest::option::of(prop_oneof![
                    Just("4902505130267".to_string()),
                    Just("1234567890123".to_string()),
                    Just("ab".to_string()),
                    "[0-9]{1,4}",
                ]),
                0..24,
            )
        ) {
            let mut c = confirmer();
            let mut confirmed = Vec::new();
            for read in &reads {
                match read {
                    Some(v) => {
                        if let Observation::Confirmed(v) = c.observe(v) {
                            confirmed.push(v);
                        }
                    }
                    None => c.observe_nothing(),
                }
            }

            prop_assert!(confirmed.len() <= 1);
            prop_assert_eq!(confirmed.into_iter().next(), first_qualifying_pair(&reads));
        }
    }
}
