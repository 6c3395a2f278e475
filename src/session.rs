// Session state and frame dispatch
//
// Owns the sample window, render throttle, metrics aggregator, recording flag
// and the export data log. Each decoded frame is routed to exactly one path.
// Event handlers are one-slot callbacks: registering again replaces the
// previous handler, it never accumulates subscribers.

use crate::buffer::{Sample, SampleBuffer};
use crate::config::SessionConfig;
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::protocol::Frame;
use crate::render::{ChartSink, RenderThrottle};
use crate::types::SessionStats;
use std::sync::Arc;
use std::time::Instant;

type MetricsHandler = Box<dyn FnMut(&MetricsSnapshot) + Send>;
type AckHandler = Box<dyn FnMut(&str) + Send>;

/// One streaming session against a thrust stand
pub struct Session {
    buffer: Arc<SampleBuffer>,
    throttle: RenderThrottle,
    metrics: MetricsAggregator,
    chart: Box<dyn ChartSink>,

    /// Samples accumulated while recording, for export
    data_log: Vec<Sample>,
    current_force: f64,
    stats: SessionStats,

    on_metrics: Option<MetricsHandler>,
    on_ack: Option<AckHandler>,
}

impl Session {
    pub fn new(config: &SessionConfig, chart: Box<dyn ChartSink>) -> Self {
        Self {
            buffer: Arc::new(SampleBuffer::new(config.max_samples)),
            throttle: RenderThrottle::new(config.batch_size, config.peak_annotation_floor),
            metrics: MetricsAggregator::new(config.transitions),
            chart,
            data_log: Vec::new(),
            current_force: 0.0,
            stats: SessionStats::default(),
            on_metrics: None,
            on_ack: None,
        }
    }

    /// Shared handle to the sample window
    pub fn buffer(&self) -> Arc<SampleBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn recording(&self) -> bool {
        self.metrics.recording()
    }

    /// Most recent raw force reading (signed)
    pub fn current_force(&self) -> f64 {
        self.current_force
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Current metrics targets
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Smoothed metrics for display at `now`
    pub fn display_metrics(&self, now: Instant) -> MetricsSnapshot {
        self.metrics.display(now)
    }

    /// Register the metrics handler; replaces any previous one
    pub fn on_metrics<F>(&mut self, handler: F)
    where
        F: FnMut(&MetricsSnapshot) + Send + 'static,
    {
        self.on_metrics = Some(Box::new(handler));
    }

    /// Register the command-ack handler; replaces any previous one
    pub fn on_ack<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_ack = Some(Box::new(handler));
    }

    /// Decode and dispatch one raw frame off the wire
    ///
    /// Malformed frames are logged and dropped; they never tear down the
    /// connection.
    pub fn handle_text(&mut self, text: &str) {
        match Frame::decode(text) {
            Ok(frame) => {
                self.stats.frames_decoded += 1;
                self.handle_frame(frame, Instant::now());
            }
            Err(e) => {
                self.stats.frames_dropped += 1;
                log::warn!("Dropping undecodable frame: {}", e);
            }
        }
    }

    /// Route one decoded frame
    pub fn handle_frame(&mut self, frame: Frame, now: Instant) {
        match frame {
            Frame::Data { t, f } => {
                self.stats.samples_received += 1;
                let sample = Sample {
                    timestamp_ms: t,
                    force_n: f,
                };
                let new_peak = self.buffer.append(sample);
                if self
                    .throttle
                    .on_append(&self.buffer, new_peak, self.chart.as_mut())
                {
                    self.stats.batches_pushed += 1;
                }
                self.current_force = f;
                if self.metrics.recording() {
                    self.data_log.push(sample);
                }
            }

            Frame::Metrics(update) => {
                self.metrics.apply(&update, now);
                let snapshot = self.metrics.snapshot();
                if let Some(handler) = self.on_metrics.as_mut() {
                    handler(&snapshot);
                }
            }

            Frame::Init { recording } => {
                log::info!("Session init: recording={}", recording);
                self.metrics.set_recording(recording);
            }

            Frame::Ack { cmd } => {
                log::debug!("Command acknowledged: {}", cmd);
                match cmd.as_str() {
                    "start" => self.metrics.set_recording(true),
                    "stop" => self.metrics.set_recording(false),
                    // The stand clears its session on tare and reset
                    "reset" | "tare" => self.reset_local(),
                    _ => {}
                }
                if let Some(handler) = self.on_ack.as_mut() {
                    handler(&cmd);
                }
            }

            Frame::Clear => {
                log::info!("Clear signal received");
                self.reset_local();
            }

            Frame::Unknown => {
                log::debug!("Ignoring frame with unknown type");
            }
        }
    }

    /// Samples for export: the recording log when present, otherwise the
    /// current window snapshot
    pub fn export_samples(&self) -> Vec<Sample> {
        if self.data_log.is_empty() {
            self.buffer.snapshot()
        } else {
            self.data_log.clone()
        }
    }

    /// Clear the window, metrics, data log and chart
    pub fn reset_local(&mut self) {
        self.buffer.reset();
        self.metrics.reset();
        self.data_log.clear();
        self.throttle.reset();
        self.chart.clear();
        self.current_force = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MetricsUpdate;
    use crate::render::ChartPoint;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct SinkLog {
        batches: Vec<Vec<ChartPoint>>,
        annotations: Vec<(u64, f64)>,
        clears: usize,
    }

    #[derive(Default, Clone)]
    struct RecordingSink(Arc<Mutex<SinkLog>>);

    impl ChartSink for RecordingSink {
        fn push_batch(&mut self, series: &[ChartPoint]) {
            self.0.lock().batches.push(series.to_vec());
        }

        fn set_peak_annotation(&mut self, x: u64, y: f64, _label: &str) {
            self.0.lock().annotations.push((x, y));
        }

        fn clear(&mut self) {
            self.0.lock().clears += 1;
        }
    }

    fn session() -> (Session, RecordingSink) {
        let sink = RecordingSink::default();
        let session = Session::new(&SessionConfig::default(), Box::new(sink.clone()));
        (session, sink)
    }

    fn data(t: u64, f: f64) -> Frame {
        Frame::Data { t, f }
    }

    #[test]
    fn test_start_ack_turns_recording_on() {
        let (mut session, _sink) = session();
        let now = Instant::now();

        session.handle_frame(Frame::Init { recording: false }, now);
        assert!(!session.recording());

        session.handle_frame(
            Frame::Ack {
                cmd: "start".to_string(),
            },
            now,
        );
        assert!(session.recording());

        session.handle_frame(
            Frame::Ack {
                cmd: "stop".to_string(),
            },
            now,
        );
        assert!(!session.recording());
    }

    #[test]
    fn test_partial_metrics_merge_across_frames() {
        let (mut session, _sink) = session();
        let now = Instant::now();

        session.handle_frame(
            Frame::Metrics(MetricsUpdate {
                peak: Some(12.5),
                ..Default::default()
            }),
            now,
        );
        session.handle_frame(
            Frame::Metrics(MetricsUpdate {
                impulse: Some(3.2),
                ..Default::default()
            }),
            now,
        );

        let snap = session.metrics();
        assert_eq!(snap.peak, 12.5);
        assert_eq!(snap.impulse, 3.2);
    }

    #[test]
    fn test_metrics_recording_field_overrides_local_state() {
        let (mut session, _sink) = session();
        let now = Instant::now();

        session.handle_frame(
            Frame::Metrics(MetricsUpdate {
                recording: Some(true),
                ..Default::default()
            }),
            now,
        );
        assert!(session.recording());
    }

    #[test]
    fn test_data_is_logged_only_while_recording() {
        let (mut session, _sink) = session();
        let now = Instant::now();

        session.handle_frame(data(0, 1.0), now);
        session.handle_frame(
            Frame::Ack {
                cmd: "start".to_string(),
            },
            now,
        );
        session.handle_frame(data(12, 2.0), now);
        session.handle_frame(data(24, 3.0), now);

        let log = session.export_samples();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].timestamp_ms, 12);
    }

    #[test]
    fn test_export_falls_back_to_window_snapshot() {
        let (mut session, _sink) = session();
        let now = Instant::now();

        session.handle_frame(data(0, 1.0), now);
        session.handle_frame(data(12, 2.0), now);

        // Never recorded, so export uses the live window
        assert_eq!(session.export_samples().len(), 2);
    }

    #[test]
    fn test_clear_frame_resets_local_state() {
        let (mut session, sink) = session();
        let now = Instant::now();

        for i in 0..10u64 {
            session.handle_frame(data(i * 12, 5.0), now);
        }
        session.handle_frame(Frame::Clear, now);

        assert!(session.buffer().is_empty());
        assert_eq!(session.metrics().peak, 0.0);
        assert_eq!(session.current_force(), 0.0);
        assert_eq!(sink.0.lock().clears, 1);
    }

    #[test]
    fn test_tare_ack_resets_like_clear() {
        let (mut session, sink) = session();
        let now = Instant::now();

        session.handle_frame(data(0, 5.0), now);
        session.handle_frame(
            Frame::Ack {
                cmd: "tare".to_string(),
            },
            now,
        );

        assert!(session.buffer().is_empty());
        assert_eq!(sink.0.lock().clears, 1);
    }

    #[test]
    fn test_batching_at_default_size() {
        let (mut session, sink) = session();
        let now = Instant::now();

        for i in 0..17u64 {
            session.handle_frame(data(i * 12, 1.0), now);
        }

        let log = sink.0.lock();
        assert_eq!(log.batches.len(), 2);
        assert_eq!(log.batches[0].len(), 8);
        assert_eq!(log.batches[1].len(), 16);
        assert_eq!(session.stats().batches_pushed, 2);
    }

    #[test]
    fn test_malformed_frames_are_dropped_not_fatal() {
        let (mut session, _sink) = session();

        session.handle_text("garbage");
        session.handle_text(r#"{"type":"data","t":0,"f":2.5}"#);

        let stats = session.stats();
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(session.current_force(), 2.5);
    }

    #[test]
    fn test_handler_registration_replaces() {
        let (mut session, _sink) = session();
        let now = Instant::now();

        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        let counter = Arc::clone(&first);
        session.on_ack(move |_| *counter.lock() += 1);
        let counter = Arc::clone(&second);
        session.on_ack(move |_| *counter.lock() += 1);

        session.handle_frame(
            Frame::Ack {
                cmd: "start".to_string(),
            },
            now,
        );

        assert_eq!(*first.lock(), 0);
        assert_eq!(*second.lock(), 1);
    }
}
