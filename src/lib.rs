pub mod buffer;
pub mod config;
pub mod connection;
pub mod export;
pub mod metrics;
pub mod protocol;
pub mod render;
pub mod session;
pub mod types;

pub use buffer::{PeakRecord, Sample, SampleBuffer};
pub use config::SessionConfig;
pub use connection::{CommandSender, ConnectionManager, ReconnectPolicy};
pub use metrics::{MetricsAggregator, MetricsSnapshot, TransitionTuning};
pub use protocol::{Command, Frame, MetricsUpdate};
pub use render::{ChartPoint, ChartSink, RenderThrottle};
pub use session::Session;
pub use types::{ConnectionState, SessionStats, TelemetryError, TelemetryResult};
