use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host-wide limits and listener configuration.
///
/// Plain data with a `Default` impl and serde derives so an external
/// CLI/daemon layer can load it from a config file without this crate
/// depending on any particular file format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostConfig {
    /// Maximum concurrently live sessions.
    pub max_sessions: usize,
    /// Ring buffer capacity for sessions that don't override it.
    pub default_buffer_size: usize,
    /// Protocol version advertised in this host's `Hello`.
    pub protocol_version: u8,
    /// Bind address for the WebSocket listener; `None` disables it.
    pub ws_bind: Option<String>,
    /// Platform pipe name for the pipe listener; `None` disables it.
    pub pipe_name: Option<String>,
    /// Interval between idle-session sweeps.
    #[serde(with = "duration_secs")]
    pub idle_sweep_interval: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            default_buffer_size: termalive_screen::DEFAULT_CAPACITY,
            protocol_version: termalive_protocol::PROTOCOL_VERSION,
            ws_bind: Some("127.0.0.1:7890".to_string()),
            pipe_name: Some("default".to_string()),
            idle_sweep_interval: Duration::from_secs(30),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
