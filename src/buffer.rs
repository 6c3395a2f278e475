// Bounded rolling window of telemetry samples
//
// Append-only FIFO ring with peak tracking, independent of render cadence.
// Mutation happens only on the message-handling path; readers get consistent
// snapshots by copying, never by aliasing the live window.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One telemetry sample, immutable once appended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Peer-assigned monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Measured force in newtons (may be negative for compressive load)
    pub force_n: f64,
}

/// Largest absolute force seen since the last reset
///
/// `value` is monotonically non-decreasing across a recording session; the
/// timestamp is the first sample that achieved the maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    pub value: f64,
    pub timestamp_ms: u64,
}

/// Bounded sample window with FIFO eviction
///
/// Holds at most `capacity` samples; appending to a full window evicts the
/// oldest entries, never the sample being appended. Load cells can report
/// compressive force as negative, so the peak compares absolute values.
pub struct SampleBuffer {
    window: RwLock<VecDeque<Sample>>,
    peak: RwLock<PeakRecord>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sample buffer capacity must be non-zero");
        Self {
            window: RwLock::new(VecDeque::with_capacity(capacity)),
            peak: RwLock::new(PeakRecord::default()),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest entries if at capacity
    ///
    /// Returns the new peak record iff this sample strictly exceeded the
    /// previous peak magnitude.
    pub fn append(&self, sample: Sample) -> Option<PeakRecord> {
        {
            let mut window = self.window.write();
            window.push_back(sample);
            while window.len() > self.capacity {
                window.pop_front();
            }
        }

        let magnitude = sample.force_n.abs();
        let mut peak = self.peak.write();
        if magnitude > peak.value {
            *peak = PeakRecord {
                value: magnitude,
                timestamp_ms: sample.timestamp_ms,
            };
            Some(*peak)
        } else {
            None
        }
    }

    /// Current number of samples in the window
    pub fn len(&self) -> usize {
        self.window.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy of the current window contents, oldest first
    pub fn snapshot(&self) -> Vec<Sample> {
        self.window.read().iter().copied().collect()
    }

    /// Current peak record
    pub fn peak(&self) -> PeakRecord {
        *self.peak.read()
    }

    /// Clear all samples and zero the peak record
    pub fn reset(&self) {
        self.window.write().clear();
        *self.peak.write() = PeakRecord::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: u64, f: f64) -> Sample {
        Sample {
            timestamp_ms: t,
            force_n: f,
        }
    }

    #[test]
    fn test_append_and_snapshot() {
        let buffer = SampleBuffer::new(10);
        buffer.append(sample(0, 1.0));
        buffer.append(sample(12, 2.0));

        let snap = buffer.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0], sample(0, 1.0));
        assert_eq!(snap[1], sample(12, 2.0));
    }

    #[test]
    fn test_eviction_keeps_most_recent_in_order() {
        let buffer = SampleBuffer::new(3);
        for i in 0..7u64 {
            buffer.append(sample(i * 12, i as f64));
        }

        assert_eq!(buffer.len(), 3);
        let snap = buffer.snapshot();
        assert_eq!(
            snap.iter().map(|s| s.timestamp_ms).collect::<Vec<_>>(),
            vec![48, 60, 72]
        );
    }

    #[test]
    fn test_appended_sample_survives_eviction() {
        let buffer = SampleBuffer::new(1);
        buffer.append(sample(0, 1.0));
        buffer.append(sample(12, 2.0));

        let snap = buffer.snapshot();
        assert_eq!(snap, vec![sample(12, 2.0)]);
    }

    #[test]
    fn test_peak_uses_absolute_value() {
        let buffer = SampleBuffer::new(10);
        buffer.append(sample(0, 3.0));
        buffer.append(sample(12, -8.5));
        buffer.append(sample(24, 5.0));

        let peak = buffer.peak();
        assert_eq!(peak.value, 8.5);
        assert_eq!(peak.timestamp_ms, 12);
    }

    #[test]
    fn test_peak_first_achiever_wins_on_tie() {
        let buffer = SampleBuffer::new(10);
        buffer.append(sample(0, 4.0));
        buffer.append(sample(12, -4.0));

        assert_eq!(buffer.peak().timestamp_ms, 0);
    }

    #[test]
    fn test_append_reports_new_peak_only() {
        let buffer = SampleBuffer::new(10);
        assert!(buffer.append(sample(0, 2.0)).is_some());
        assert!(buffer.append(sample(12, 1.0)).is_none());
        assert!(buffer.append(sample(24, -2.0)).is_none()); // tie, not strictly greater
        let new_peak = buffer.append(sample(36, 6.0)).unwrap();
        assert_eq!(new_peak.value, 6.0);
        assert_eq!(new_peak.timestamp_ms, 36);
    }

    #[test]
    fn test_peak_survives_window_eviction() {
        let buffer = SampleBuffer::new(2);
        buffer.append(sample(0, 9.0));
        buffer.append(sample(12, 1.0));
        buffer.append(sample(24, 1.0)); // evicts the peak sample

        assert_eq!(buffer.peak().value, 9.0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let buffer = SampleBuffer::new(10);
        buffer.append(sample(0, 5.0));

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.peak(), PeakRecord::default());

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.peak(), PeakRecord::default());
    }
}
