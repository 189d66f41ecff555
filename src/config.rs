//! `NodeConfig` (spec §3) plus the ambient `LogConfig`/`TransportConfig`
//! sections SPEC_FULL.md §A/§C add, layered Master-Core-over-Local-over-
//! Default the same way the teacher's `Config` layers `#[serde(default)]`
//! sections.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CanControllerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub directory: String,
    pub file_prefix: String,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./logs".to_string(),
            file_prefix: "can_controller_node".to_string(),
            level: "info".to_string(),
        }
    }
}

/// The minimal BaseNode addressing a node needs injected (SPEC_FULL.md §F);
/// BaseNode's own wire protocol and framing remain out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub node_name: String,
    pub master_core_addr: SocketAddr,
    #[serde(default)]
    pub peer_addresses: HashMap<String, SocketAddr>,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:9101".parse().unwrap()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            node_name: "can_controller_node".to_string(),
            master_core_addr: "127.0.0.1:9100".parse().unwrap(),
            peer_addresses: HashMap::new(),
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_can_interface")]
    pub can_interface: String,
    #[serde(default = "default_can_channel")]
    pub can_channel: String,
    #[serde(default = "default_can_bitrate")]
    pub can_bitrate: u32,
    #[serde(default = "default_can_source_address")]
    pub can_source_address: u8,
    #[serde(default = "default_data_ttl_days")]
    pub data_ttl_days: i64,
    #[serde(default = "default_playback_enabled")]
    pub playback_enabled: bool,
    #[serde(default = "default_emergency_nodes")]
    pub emergency_nodes: Vec<String>,

    #[serde(default)]
    pub can_interface_1: Option<String>,
    #[serde(default)]
    pub can_channel_1: Option<String>,
    #[serde(default)]
    pub can_interface_2: Option<String>,
    #[serde(default)]
    pub can_channel_2: Option<String>,
    #[serde(default)]
    pub can_interface_3: Option<String>,
    #[serde(default)]
    pub can_channel_3: Option<String>,
    #[serde(default)]
    pub can_interface_4: Option<String>,
    #[serde(default)]
    pub can_channel_4: Option<String>,

    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

fn default_can_interface() -> String {
    "socketcan".to_string()
}
fn default_can_channel() -> String {
    "vcan0".to_string()
}
fn default_can_bitrate() -> u32 {
    250_000
}
fn default_can_source_address() -> u8 {
    0x91
}
fn default_data_ttl_days() -> i64 {
    7
}
fn default_playback_enabled() -> bool {
    true
}
fn default_emergency_nodes() -> Vec<String> {
    vec!["engine".to_string(), "steering".to_string(), "autopilot".to_string()]
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            can_interface: default_can_interface(),
            can_channel: default_can_channel(),
            can_bitrate: default_can_bitrate(),
            can_source_address: default_can_source_address(),
            data_ttl_days: default_data_ttl_days(),
            playback_enabled: default_playback_enabled(),
            emergency_nodes: default_emergency_nodes(),
            can_interface_1: None,
            can_channel_1: None,
            can_interface_2: None,
            can_channel_2: None,
            can_interface_3: None,
            can_channel_3: None,
            can_interface_4: None,
            can_channel_4: None,
            logging: LogConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CanControllerError::Config(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| CanControllerError::Config(e.to_string()))
    }

    /// The `can_interface_1..4`/`can_channel_1..4` candidates in order, for
    /// the Auto-Detect routine (spec §4.11), paired up and `None`-filtered.
    pub fn auto_detect_candidates(&self) -> Vec<(String, String)> {
        [
            (&self.can_interface_1, &self.can_channel_1),
            (&self.can_interface_2, &self.can_channel_2),
            (&self.can_interface_3, &self.can_channel_3),
            (&self.can_interface_4, &self.can_channel_4),
        ]
        .into_iter()
        .filter_map(|(iface, chan)| Some((iface.clone()?, chan.clone().unwrap_or_default())))
        .collect()
    }

    /// Merge `Master Core overrides Local overrides Default` (spec §3):
    /// apply `local` on top of `Default`, then `master_core` on top of that.
    /// `local` is a fully-resolved config (already defaulted by `from_file`),
    /// so dumping it whole is correct. `master_core` is a raw partial JSON
    /// payload — the same shape `on_config_updated` takes — so that a push
    /// naming only `data_ttl_days` doesn't also reassert every other field at
    /// its own default and clobber `local`'s overrides.
    pub fn layer(default: &NodeConfig, local: Option<&NodeConfig>, master_core: Option<&Value>) -> Result<NodeConfig> {
        let mut merged = serde_json::to_value(default).map_err(|e| CanControllerError::Config(e.to_string()))?;

        if let Some(local) = local {
            let local_value = serde_json::to_value(local).map_err(|e| CanControllerError::Config(e.to_string()))?;
            merge_json(&mut merged, &local_value);
        }
        if let Some(master_core) = master_core {
            merge_json(&mut merged, master_core);
        }

        serde_json::from_value(merged).map_err(|e| CanControllerError::Config(e.to_string()))
    }
}

fn merge_json(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_json(base_map.entry(key.clone()).or_insert(serde_json::Value::Null), value);
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = NodeConfig::default();
        assert_eq!(config.can_bitrate, 250_000);
        assert_eq!(config.can_source_address, 0x91);
        assert_eq!(config.data_ttl_days, 7);
        assert!(config.playback_enabled);
        assert_eq!(config.emergency_nodes, vec!["engine", "steering", "autopilot"]);
    }

    #[test]
    fn deserializes_partial_json_with_defaults_filled_in() {
        let json = r#"{ "can_channel": "can1" }"#;
        let config: NodeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.can_channel, "can1");
        assert_eq!(config.can_interface, "socketcan");
        assert_eq!(config.can_bitrate, 250_000);
    }

    #[test]
    fn layering_prefers_master_core_over_local_over_default() {
        let default = NodeConfig::default();
        let mut local = NodeConfig::default();
        local.can_channel = "vcan1".to_string();
        local.data_ttl_days = 14;

        // Master Core pushes a partial payload naming only what it overrides,
        // the same shape `on_config_updated` takes — not a fully-dumped
        // struct that would reassert every untouched field at its default.
        let master_core = serde_json::json!({ "data_ttl_days": 30 });

        let merged = NodeConfig::layer(&default, Some(&local), Some(&master_core)).unwrap();
        assert_eq!(merged.can_channel, "vcan1"); // from local, master core didn't override
        assert_eq!(merged.data_ttl_days, 30); // master core wins over local
        assert_eq!(merged.can_interface, default.can_interface); // untouched, falls through
    }

    #[test]
    fn auto_detect_candidates_skip_unset_slots() {
        let mut config = NodeConfig::default();
        config.can_interface_1 = Some("slcan".to_string());
        config.can_channel_1 = Some("/dev/ttyUSB0".to_string());
        config.can_interface_3 = Some("socketcan".to_string());

        let candidates = config.auto_detect_candidates();
        assert_eq!(candidates, vec![
            ("slcan".to_string(), "/dev/ttyUSB0".to_string()),
            ("socketcan".to_string(), String::new()),
        ]);
    }

    #[test]
    fn log_config_defaults() {
        let log = LogConfig::default();
        assert_eq!(log.level, "info");
    }

    #[test]
    fn round_trips_through_json() {
        let config = NodeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.can_bitrate, config.can_bitrate);
        assert_eq!(restored.emergency_nodes, config.emergency_nodes);
    }
}
