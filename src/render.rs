// Render throttling between the sample stream and the chart collaborator
//
// The stand samples at ~80 Hz; redrawing a chart at that rate saturates the
// rendering pipeline. The throttle is a pure rate divider: every N appends it
// pushes the full window snapshot as one batch. Every sample stays in the
// buffer and in any later export; only the visual cadence is reduced. Peak
// annotations bypass the divider because peak events are rare and high-value.

use crate::buffer::{PeakRecord, SampleBuffer};
use serde::Serialize;

/// One point of the rendered time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Timestamp in milliseconds
    pub x: u64,
    /// Force magnitude in newtons
    pub y: f64,
}

/// Rendering collaborator interface
///
/// Any charting component that can draw a time series satisfies this. The
/// session pushes whole-window batches at a throttled cadence and peak
/// annotations immediately.
pub trait ChartSink: Send {
    /// Replace the displayed series with a full window snapshot
    fn push_batch(&mut self, series: &[ChartPoint]);

    /// Place or move the peak marker
    fn set_peak_annotation(&mut self, x: u64, y: f64, label: &str);

    /// Remove all displayed data and annotations
    fn clear(&mut self);
}

/// Rate divider between sample arrival and chart updates
pub struct RenderThrottle {
    batch_size: usize,
    annotation_floor: f64,
    counter: usize,
}

impl RenderThrottle {
    /// `batch_size` appends per chart push; `annotation_floor` suppresses peak
    /// markers for noise-level readings (newtons).
    pub fn new(batch_size: usize, annotation_floor: f64) -> Self {
        assert!(batch_size > 0, "batch size must be non-zero");
        Self {
            batch_size,
            annotation_floor,
            counter: 0,
        }
    }

    /// Account for one appended sample; push to the chart when the batch fills.
    ///
    /// Returns true when a batch was pushed. Chart points carry the force
    /// magnitude, matching the peak comparison.
    pub fn on_append(
        &mut self,
        buffer: &SampleBuffer,
        new_peak: Option<PeakRecord>,
        sink: &mut dyn ChartSink,
    ) -> bool {
        if let Some(peak) = new_peak {
            if peak.value >= self.annotation_floor {
                let label = format!("Peak: {:.1} N", peak.value);
                sink.set_peak_annotation(peak.timestamp_ms, peak.value, &label);
            }
        }

        self.counter += 1;
        if self.counter < self.batch_size {
            return false;
        }
        self.counter = 0;

        let series: Vec<ChartPoint> = buffer
            .snapshot()
            .iter()
            .map(|s| ChartPoint {
                x: s.timestamp_ms,
                y: s.force_n.abs(),
            })
            .collect();
        sink.push_batch(&series);
        true
    }

    /// Restart the divider, e.g. after a session reset
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
