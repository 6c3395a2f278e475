// CSV export of recorded telemetry
//
// Produces the stand's interchange format: a commented header with the final
// metrics followed by a timestamp/force table. Forces are written at 3
// decimals, matching the sensor's resolution on the wire.

use crate::buffer::Sample;
use crate::metrics::MetricsSnapshot;
use crate::types::TelemetryResult;
use std::io::Write;

/// Write samples and their closing metrics as CSV
pub fn write_csv<W: Write>(
    mut writer: W,
    samples: &[Sample],
    metrics: &MetricsSnapshot,
) -> TelemetryResult<()> {
    writeln!(writer, "# Thrust Test Data Export")?;
    writeln!(writer, "# Date: {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(writer, "# Peak Thrust: {:.2} N", metrics.peak)?;
    writeln!(writer, "# Total Impulse: {:.2} Ns", metrics.impulse)?;
    writeln!(writer, "# Burn Time: {:.2} s", metrics.burn_time)?;
    writeln!(writer, "# Average Thrust: {:.2} N", metrics.avg_thrust)?;
    writeln!(writer, "# Sample Count: {}", metrics.sample_count)?;
    writeln!(writer, "#")?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["timestamp_ms", "force_N"])?;
    for sample in samples {
        csv_writer.write_record([
            sample.timestamp_ms.to_string(),
            format!("{:.3}", sample.force_n),
        ])?;
    }
    csv_writer.flush()?;

    Ok(())
}
