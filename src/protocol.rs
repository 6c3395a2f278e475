// Message protocol codec
//
// Outgoing commands are sent as `{"cmd": "...", "value"?: n}`; incoming frames
// carry a `type` discriminator:
// {"type":"data","t":1234,"f":12.345}
// {"type":"metrics","peak":12.5,"impulse":3.2,"burn":1.8,"avg":7.1,"samples":144,"recording":true}
// {"type":"init","recording":false}
// {"type":"ack","cmd":"start"}
// {"type":"clear"}
// Unrecognized `type` tags decode to `Frame::Unknown` so newer firmware can
// add frame kinds without breaking older clients.

use crate::types::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};

/// Command issued to the remote sensor
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Zero-offset the load cell
    Tare,
    /// Begin a recording session
    Start,
    /// End the recording session
    Stop,
    /// Reset session state on the stand
    Reset,
    /// Calibrate against a known reference weight
    Calibrate { weight_grams: f64 },
}

/// Wire envelope for outgoing commands
#[derive(Debug, Serialize, Deserialize)]
struct WireCommand {
    cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
}

impl Command {
    /// Name of the command as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Tare => "tare",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Reset => "reset",
            Command::Calibrate { .. } => "calibrate",
        }
    }

    /// Validate command arguments before transmission
    ///
    /// Calibration requires a positive, finite reference weight; an invalid
    /// weight is rejected here and never sent.
    pub fn validate(&self) -> TelemetryResult<()> {
        match self {
            Command::Calibrate { weight_grams } => {
                if weight_grams.is_finite() && *weight_grams > 0.0 {
                    Ok(())
                } else {
                    Err(TelemetryError::InvalidCommand(format!(
                        "calibration weight must be a positive number of grams, got {}",
                        weight_grams
                    )))
                }
            }
            _ => Ok(()),
        }
    }

    /// Encode to the outgoing JSON envelope
    pub fn encode(&self) -> TelemetryResult<String> {
        self.validate()?;

        let wire = WireCommand {
            cmd: self.name().to_string(),
            value: match self {
                Command::Calibrate { weight_grams } => Some(*weight_grams),
                _ => None,
            },
        };

        serde_json::to_string(&wire).map_err(|e| TelemetryError::Decode(e.to_string()))
    }

    /// Decode a command envelope back into a `Command`
    pub fn decode(text: &str) -> TelemetryResult<Command> {
        let wire: WireCommand =
            serde_json::from_str(text).map_err(|e| TelemetryError::Decode(e.to_string()))?;

        let command = match wire.cmd.as_str() {
            "tare" => Command::Tare,
            "start" => Command::Start,
            "stop" => Command::Stop,
            "reset" => Command::Reset,
            "calibrate" => {
                let weight_grams = wire.value.ok_or_else(|| {
                    TelemetryError::InvalidCommand("calibrate requires a value".to_string())
                })?;
                Command::Calibrate { weight_grams }
            }
            other => {
                return Err(TelemetryError::Decode(format!(
                    "unrecognized command: {}",
                    other
                )))
            }
        };

        command.validate()?;
        Ok(command)
    }
}

/// Partial metrics update from the peer
///
/// All fields are optional: an absent field means "no change", not "reset to
/// zero". Impulse and burn time are integrated on the stand over the full
/// unsampled stream, so they are never recomputed locally.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impulse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<bool>,
}

/// Decoded incoming frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// One telemetry sample: peer-assigned monotonic timestamp (ms) and force (N)
    Data { t: u64, f: f64 },

    /// Authoritative metrics snapshot (partial)
    Metrics(MetricsUpdate),

    /// Sent once after connection establishment to synchronize session state
    Init {
        #[serde(default)]
        recording: bool,
    },

    /// Acknowledges a previously sent command by name
    Ack { cmd: String },

    /// Instructs the client to reset local state
    Clear,

    /// Forward-compatibility catch-all for unrecognized frame tags
    #[serde(other)]
    Unknown,
}

impl Frame {
    /// Decode an incoming JSON frame
    pub fn decode(text: &str) -> TelemetryResult<Frame> {
        serde_json::from_str(text).map_err(|e| TelemetryError::Decode(e.to_string()))
    }

    /// Encode a frame to its JSON envelope
    pub fn encode(&self) -> TelemetryResult<String> {
        serde_json::to_string(self).map_err(|e| TelemetryError::Decode(e.to_string()))
    }
}
