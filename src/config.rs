// Session configuration

use crate::connection::ReconnectPolicy;
use crate::metrics::TransitionTuning;
use serde::{Deserialize, Serialize};

/// Configuration for a telemetry session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stand host, with port if non-default (e.g. "192.168.4.1")
    pub host: String,

    /// Use the secure scheme (wss) for the transport
    #[serde(default)]
    pub secure: bool,

    /// Sample window capacity; 1600 is ~20 seconds at 80 Hz
    pub max_samples: usize,

    /// Appends per chart push; 8 yields ~10 Hz visual refresh from an 80 Hz feed
    pub batch_size: usize,

    /// Minimum peak magnitude (N) before a peak annotation is shown
    pub peak_annotation_floor: f64,

    /// Reconnect backoff policy
    pub reconnect: ReconnectPolicy,

    /// Display transition tuning
    #[serde(default)]
    pub transitions: TransitionTuning,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // The stand's access point address
            host: "192.168.4.1".to_string(),
            secure: false,
            max_samples: 1600,
            batch_size: 8,
            peak_annotation_floor: 0.5,
            reconnect: ReconnectPolicy::default(),
            transitions: TransitionTuning::default(),
        }
    }
}

impl SessionConfig {
    /// Telemetry endpoint URL, scheme-negotiated
    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}/ws", scheme, self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_scheme_negotiation() {
        let mut config = SessionConfig::default();
        assert_eq!(config.ws_url(), "ws://192.168.4.1/ws");

        config.secure = true;
        config.host = "stand.local:8443".to_string();
        assert_eq!(config.ws_url(), "wss://stand.local:8443/ws");
    }

    #[test]
    fn test_defaults_match_stand_tuning() {
        let config = SessionConfig::default();
        assert_eq!(config.max_samples, 1600);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.peak_annotation_floor, 0.5);
    }
}
