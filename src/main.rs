use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use thrustlink::{
    export, ChartPoint, ChartSink, Command, ConnectionManager, ReconnectPolicy, Session,
    SessionConfig,
};

#[derive(Parser)]
#[command(
    name = "thrustlink",
    version,
    about = "Real-time telemetry monitor for load-cell thrust test stands",
    long_about = "Connects to a thrust stand's WebSocket telemetry feed, tracks the\n\
                  sample window and metrics, and optionally exports the recorded\n\
                  data as CSV on shutdown."
)]
struct Cli {
    /// Stand host, with port if non-default
    #[arg(long, default_value = "192.168.4.1")]
    host: String,

    /// Use wss instead of ws
    #[arg(long)]
    secure: bool,

    /// Sample window capacity
    #[arg(long, default_value_t = 1600)]
    max_samples: usize,

    /// Appends per chart push
    #[arg(long, default_value_t = 8)]
    batch_size: usize,

    /// Maximum reconnect attempts before giving up
    #[arg(long, default_value_t = 50)]
    max_reconnects: u32,

    /// Send a start command as soon as the stand connects
    #[arg(long)]
    record: bool,

    /// Write recorded samples to this CSV file on exit
    #[arg(long)]
    export: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Stand-in chart collaborator that reports to the log
struct LogChartSink;

impl ChartSink for LogChartSink {
    fn push_batch(&mut self, series: &[ChartPoint]) {
        if let Some(last) = series.last() {
            log::debug!(
                "Chart batch: {} points, latest {:.2} N at {} ms",
                series.len(),
                last.y,
                last.x
            );
        }
    }

    fn set_peak_annotation(&mut self, x: u64, _y: f64, label: &str) {
        log::info!("{} at {} ms", label, x);
    }

    fn clear(&mut self) {
        log::info!("Chart cleared");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let config = SessionConfig {
        host: cli.host,
        secure: cli.secure,
        max_samples: cli.max_samples,
        batch_size: cli.batch_size,
        reconnect: ReconnectPolicy {
            max_attempts: cli.max_reconnects,
            ..ReconnectPolicy::default()
        },
        ..SessionConfig::default()
    };

    let mut session = Session::new(&config, Box::new(LogChartSink));
    session.on_metrics(|m| {
        log::info!(
            "Metrics: peak={:.2} N impulse={:.2} Ns burn={:.2} s avg={:.2} N samples={} recording={}",
            m.peak,
            m.impulse,
            m.burn_time,
            m.avg_thrust,
            m.sample_count,
            m.recording
        );
    });

    let mut manager = ConnectionManager::new(&config);
    let sender = manager.command_sender();

    let auto_start = cli.record;
    let connect_sender = sender.clone();
    manager.on_connect(move || {
        log::info!("Stand connected");
        if auto_start {
            match connect_sender.send(&Command::Start) {
                Ok(true) => log::info!("Recording start requested"),
                Ok(false) => log::warn!("Start command not delivered"),
                Err(e) => log::error!("Start command rejected: {}", e),
            }
        }
    });
    manager.on_disconnect(|| {
        log::warn!("Stand disconnected");
    });

    let token = manager.cancellation_token();
    let mut handle = tokio::spawn(manager.run(session));

    // Run until the user interrupts or the manager gives up reconnecting
    let session = tokio::select! {
        result = &mut handle => result,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down");
            token.cancel();
            handle.await
        }
    }
    .context("session task panicked")?
    .context("session ended with an error")?;

    if let Some(path) = cli.export {
        let samples = session.export_samples();
        if samples.is_empty() {
            log::warn!("No samples to export");
        } else {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            export::write_csv(file, &samples, &session.metrics())?;
            log::info!("Exported {} samples to {}", samples.len(), path.display());
        }
    }

    Ok(())
}
