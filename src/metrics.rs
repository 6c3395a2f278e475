// Metrics aggregation and display smoothing
//
// The stand computes peak, impulse, burn time and average thrust over the full
// unsampled stream and sends partial snapshots over the wire. This side only
// merges those updates and smooths the displayed values so a 4 Hz metrics feed
// does not read as discrete jumps.

use crate::protocol::MetricsUpdate;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Point-in-time derived metrics as displayed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub peak: f64,
    pub impulse: f64,
    pub burn_time: f64,
    pub avg_thrust: f64,
    pub sample_count: u64,
    pub recording: bool,
}

/// Tuning for display value transitions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitionTuning {
    /// Length of one transition
    pub duration: Duration,
    /// Changes smaller than this jump directly; animating noise-level deltas
    /// reads as jitter
    pub jump_threshold: f64,
}

impl Default for TransitionTuning {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(200),
            jump_threshold: 0.01,
        }
    }
}

/// One in-flight interpolation from an old display value to a new one
///
/// Progress is computed from an explicit start instant and clamped to [0, 1],
/// then eased with ease-out-quad: `eased = 1 - (1 - p)^2`.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    from: f64,
    to: f64,
    started: Instant,
    duration: Duration,
}

impl Transition {
    pub fn new(from: f64, to: f64, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    /// Interpolated display value at `now`
    pub fn value_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started);
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        let eased = 1.0 - (1.0 - progress) * (1.0 - progress);
        self.from + (self.to - self.from) * eased
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }
}

/// A numeric display value with optional in-flight transition
#[derive(Debug, Clone, Copy)]
struct AnimatedValue {
    target: f64,
    transition: Option<Transition>,
    tuning: TransitionTuning,
}

impl AnimatedValue {
    fn new(tuning: TransitionTuning) -> Self {
        Self {
            target: 0.0,
            transition: None,
            tuning,
        }
    }

    /// Adopt a new target; a change below the jump threshold skips animation
    fn set(&mut self, target: f64, now: Instant) {
        let from = self.target;
        self.target = target;

        if (target - from).abs() < self.tuning.jump_threshold {
            self.transition = None;
        } else {
            self.transition = Some(Transition::new(from, target, now, self.tuning.duration));
        }
    }

    fn display(&self, now: Instant) -> f64 {
        match self.transition {
            Some(t) if !t.is_complete(now) => t.value_at(now),
            _ => self.target,
        }
    }

    fn reset(&mut self) {
        self.target = 0.0;
        self.transition = None;
    }
}

/// Merges partial peer snapshots and exposes smoothed values for display
pub struct MetricsAggregator {
    peak: AnimatedValue,
    impulse: AnimatedValue,
    burn_time: AnimatedValue,
    avg_thrust: AnimatedValue,
    sample_count: u64,
    recording: bool,
}

impl MetricsAggregator {
    pub fn new(tuning: TransitionTuning) -> Self {
        Self {
            peak: AnimatedValue::new(tuning),
            impulse: AnimatedValue::new(tuning),
            burn_time: AnimatedValue::new(tuning),
            avg_thrust: AnimatedValue::new(tuning),
            sample_count: 0,
            recording: false,
        }
    }

    /// Merge a partial update; absent fields retain their previous value.
    /// The sample count is shown unanimated.
    pub fn apply(&mut self, update: &MetricsUpdate, now: Instant) {
        if let Some(v) = update.peak {
            self.peak.set(v, now);
        }
        if let Some(v) = update.impulse {
            self.impulse.set(v, now);
        }
        if let Some(v) = update.burn {
            self.burn_time.set(v, now);
        }
        if let Some(v) = update.avg {
            self.avg_thrust.set(v, now);
        }
        if let Some(n) = update.samples {
            self.sample_count = n;
        }
        if let Some(r) = update.recording {
            self.recording = r;
        }
    }

    /// Target values, ignoring in-flight transitions
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            peak: self.peak.target,
            impulse: self.impulse.target,
            burn_time: self.burn_time.target,
            avg_thrust: self.avg_thrust.target,
            sample_count: self.sample_count,
            recording: self.recording,
        }
    }

    /// Smoothed values as they should be displayed at `now`
    pub fn display(&self, now: Instant) -> MetricsSnapshot {
        MetricsSnapshot {
            peak: self.peak.display(now),
            impulse: self.impulse.display(now),
            burn_time: self.burn_time.display(now),
            avg_thrust: self.avg_thrust.display(now),
            sample_count: self.sample_count,
            recording: self.recording,
        }
    }

    pub fn recording(&self) -> bool {
        self.recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Zero all tracked values and cancel in-flight transitions.
    /// The recording flag is lifecycle state, not a metric, and is untouched.
    pub fn reset(&mut self) {
        self.peak.reset();
        self.impulse.reset();
        self.burn_time.reset();
        self.avg_thrust.reset();
        self.sample_count = 0;
    }
}
