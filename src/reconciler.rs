//! Config Reconciler (spec §4.11): pulls config from Master Core at
//! startup, hot-restarts the bus when `{can_interface, can_channel,
//! can_bitrate}` change, and drives the Auto-Detect fallback.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;

use crate::canbus::{platform_default_candidates, CanBus};
use crate::config::NodeConfig;
use crate::error::Result;

const HOT_RESTART_PAUSE: Duration = Duration::from_millis(500);

pub struct ConfigReconciler {
    bus: Arc<CanBus>,
    config: Arc<RwLock<NodeConfig>>,
    data_ttl_days: Arc<AtomicI64>,
    degraded: AtomicBool,
}

impl ConfigReconciler {
    pub fn new(bus: Arc<CanBus>, config: Arc<RwLock<NodeConfig>>, data_ttl_days: Arc<AtomicI64>) -> Self {
        Self { bus, config, data_ttl_days, degraded: AtomicBool::new(false) }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// `master_core_config`, when present, stands in for the response the
    /// real BaseNode pull would deliver within the 500ms wait; BaseNode's
    /// request/response framing itself is out of scope (spec §1). It's a raw
    /// partial JSON payload naming only the fields Master Core overrides, the
    /// same shape `on_config_updated` takes.
    pub fn start(&self, master_core_config: Option<&Value>) -> Result<()> {
        let default = NodeConfig::default();
        let local = self.config.read().unwrap().clone();
        let merged = NodeConfig::layer(&default, Some(&local), master_core_config)?;

        self.data_ttl_days.store(merged.data_ttl_days, Ordering::SeqCst);
        *self.config.write().unwrap() = merged.clone();

        match self.bus.open(&merged.can_interface, &merged.can_channel, merged.can_bitrate) {
            Ok(()) => {
                self.degraded.store(false, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "initial bus open failed, falling back to auto-detect");
                self.auto_detect(&merged)
            }
        }
    }

    fn auto_detect(&self, config: &NodeConfig) -> Result<()> {
        let mut candidates = config.auto_detect_candidates();
        candidates.extend(
            platform_default_candidates()
                .into_iter()
                .map(|(iface, chan)| (iface.to_string(), chan.to_string())),
        );

        for (interface, channel) in candidates {
            if self.bus.open(&interface, &channel, 250_000).is_ok() {
                let mut guard = self.config.write().unwrap();
                guard.can_interface = interface.clone();
                guard.can_channel = channel.clone();
                drop(guard);
                self.degraded.store(false, Ordering::SeqCst);
                tracing::info!(interface, channel, "auto-detect succeeded");
                return Ok(());
            }
        }

        self.degraded.store(true, Ordering::SeqCst);
        tracing::warn!("auto-detect exhausted all candidates; entering degraded state");
        Ok(())
    }

    /// React to a config push from Master Core. Recognized keys update the
    /// in-memory config; a change to `{can_interface, can_channel,
    /// can_bitrate}` triggers a hot-restart.
    pub fn on_config_updated(&self, updates: &Value) -> Result<()> {
        let mut hot_restart_needed = false;
        let (interface, channel, bitrate) = {
            let mut config = self.config.write().unwrap();

            if let Some(v) = updates.get("can_interface").and_then(Value::as_str) {
                if v != config.can_interface {
                    config.can_interface = v.to_string();
                    hot_restart_needed = true;
                }
            }
            if let Some(v) = updates.get("can_channel").and_then(Value::as_str) {
                if v != config.can_channel {
                    config.can_channel = v.to_string();
                    hot_restart_needed = true;
                }
            }
            if let Some(v) = updates.get("can_bitrate").and_then(Value::as_u64) {
                let v = v as u32;
                if v != config.can_bitrate {
                    config.can_bitrate = v;
                    hot_restart_needed = true;
                }
            }
            if let Some(v) = updates.get("data_ttl_days").and_then(Value::as_i64) {
                config.data_ttl_days = v;
                self.data_ttl_days.store(v, Ordering::SeqCst);
            }
            if let Some(v) = updates.get("playback_enabled").and_then(Value::as_bool) {
                config.playback_enabled = v;
            }

            (config.can_interface.clone(), config.can_channel.clone(), config.can_bitrate)
        };

        if hot_restart_needed {
            tracing::info!(interface, channel, bitrate, "hot-restarting bus for config update");
            self.bus.close();
            std::thread::sleep(HOT_RESTART_PAUSE);
            match self.bus.open(&interface, &channel, bitrate) {
                Ok(()) => self.degraded.store(false, Ordering::SeqCst),
                Err(e) => {
                    tracing::error!(error = %e, "hot-restart reopen failed; remaining in degraded state");
                    self.degraded.store(true, Ordering::SeqCst);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reconciler() -> ConfigReconciler {
        let bus = Arc::new(CanBus::new());
        let config = Arc::new(RwLock::new(NodeConfig::default()));
        let ttl = Arc::new(AtomicI64::new(7));
        ConfigReconciler::new(bus, config, ttl)
    }

    #[test]
    fn start_materializes_ttl_from_master_core_override() {
        let reconciler = reconciler();
        let master_core = json!({ "data_ttl_days": 30 });

        reconciler.start(Some(&master_core)).unwrap();
        assert_eq!(reconciler.data_ttl_days.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn unrelated_key_update_does_not_trigger_hot_restart() {
        let reconciler = reconciler();
        reconciler.start(None).unwrap();
        let before = reconciler.is_degraded();
        reconciler.on_config_updated(&json!({ "playback_enabled": false })).unwrap();
        assert_eq!(reconciler.is_degraded(), before);
        assert!(!reconciler.config.read().unwrap().playback_enabled);
    }

    #[test]
    fn can_channel_change_triggers_hot_restart_attempt() {
        let reconciler = reconciler();
        // can_interface defaults to "socketcan", which will fail to open in
        // this sandboxed test environment (no vcan0 device) — that's fine,
        // we're only verifying the hot-restart path runs and degrades
        // gracefully instead of panicking.
        reconciler.on_config_updated(&json!({ "can_channel": "vcan1" })).unwrap();
        assert_eq!(reconciler.config.read().unwrap().can_channel, "vcan1");
    }

    #[test]
    fn auto_detect_enters_degraded_state_when_no_candidate_opens() {
        let reconciler = reconciler();
        let config = NodeConfig::default();
        reconciler.auto_detect(&config).unwrap();
        // In this sandboxed environment no real CAN device exists, so every
        // candidate fails and the node must still come up, just degraded.
        assert!(reconciler.is_degraded());
    }
}
