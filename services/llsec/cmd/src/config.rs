//! Configuration handling for the llsec node.
//!
//! Settings come from the shared YAML config file and are then overridden by
//! environment variables. Nothing is validated until [`NodeConfig::build_context`]
//! provisions a security context from them.

use anyhow::Result;
use llsec_security::{ConfigError, LinkKey, SecurityContext, SecurityPolicy, SecurityState, KeyStore};
use llsec_wire::{KeyIdMode, LinkAddr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Prefix of per-slot key entries in the service config map
const KEY_PREFIX: &str = "services.llsec.key.";

/// llsec node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's link address
    pub node_addr: LinkAddr,
    /// Whether the security sublayer is active
    pub enabled: bool,
    /// Raw security level (0..=7)
    pub level: u8,
    /// Raw key id mode (0..=3)
    pub key_id_mode: u8,
    /// Key slot used when no key is named on the frame
    pub default_key: usize,
    /// Whether nonces carry the frame counter
    pub frame_counter: bool,
    /// Key slot to 32 hex digits
    pub keys: BTreeMap<usize, String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let policy = SecurityPolicy::default();
        Self {
            node_addr: LinkAddr::new([0x00, 0x12, 0x4b, 0x00, 0x00, 0x00, 0x00, 0x01]),
            enabled: policy.is_enabled(),
            level: policy.level().value(),
            key_id_mode: policy.key_id_mode() as u8,
            default_key: usize::from(policy.default_key()),
            frame_counter: policy.uses_frame_counter(),
            keys: BTreeMap::new(),
        }
    }
}

/// Root configuration structure (matches the YAML structure)
#[derive(Debug, Deserialize)]
struct RootConfig {
    services: Option<ServicesConfig>,
}

#[derive(Debug, Deserialize)]
struct ServicesConfig {
    llsec: Option<ServiceConfig>,
}

#[derive(Debug, Deserialize)]
struct ServiceConfig {
    config: Option<HashMap<String, String>>,
}

impl NodeConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            if let Ok(root_config) = serde_yaml::from_str::<RootConfig>(&content) {
                config.apply_root_config(root_config);
                info!("Loaded configuration from {:?}", config_path.as_ref());
            } else {
                warn!("Failed to parse config file {:?}, using defaults", config_path.as_ref());
            }
        } else {
            warn!("Config file {:?} not found, using defaults", config_path.as_ref());
        }

        config.apply_environment_overrides();

        info!(
            "Final llsec configuration: node_addr={}, enabled={}, level={}, key_id_mode={}, default_key={}, keys={}",
            config.node_addr,
            config.enabled,
            config.level,
            config.key_id_mode,
            config.default_key,
            config.keys.len()
        );

        Ok(config)
    }

    fn apply_root_config(&mut self, root_config: RootConfig) {
        let Some(service) = root_config.services.and_then(|services| services.llsec) else {
            return;
        };
        if let Some(config_map) = service.config {
            for (key, value) in config_map {
                self.apply_entry(&key, value);
            }
        }
    }

    /// Apply one `services.llsec.*` entry; unknown keys and unparsable values
    /// are ignored
    fn apply_entry(&mut self, key: &str, value: String) {
        match key {
            "services.llsec.node_addr" => match value.parse() {
                Ok(addr) => self.node_addr = addr,
                Err(e) => warn!("Ignoring {}: {}", key, e),
            },
            "services.llsec.enabled" => {
                self.enabled = value.to_lowercase() == "true";
            }
            "services.llsec.level" => {
                if let Ok(level) = value.parse::<u8>() {
                    self.level = level;
                }
            }
            "services.llsec.key_id_mode" => {
                if let Ok(mode) = value.parse::<u8>() {
                    self.key_id_mode = mode;
                }
            }
            "services.llsec.default_key" => {
                if let Ok(index) = value.parse::<usize>() {
                    self.default_key = index;
                }
            }
            "services.llsec.frame_counter" => {
                self.frame_counter = value.to_lowercase() == "true";
            }
            _ => {
                if let Some(index) = key.strip_prefix(KEY_PREFIX) {
                    match index.parse::<usize>() {
                        Ok(index) => {
                            self.keys.insert(index, value);
                        }
                        Err(_) => warn!("Ignoring key entry with bad slot: {}", key),
                    }
                }
            }
        }
    }

    fn apply_environment_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = var("LLSEC_NODE_ADDR") {
            match addr.parse() {
                Ok(addr) => {
                    self.node_addr = addr;
                    info!("Node address overridden by environment: {}", self.node_addr);
                }
                Err(e) => warn!("Ignoring LLSEC_NODE_ADDR: {}", e),
            }
        }

        if let Some(enabled) = var("LLSEC_ENABLED") {
            self.enabled = enabled.to_lowercase() == "true";
            info!("Security overridden by environment: enabled={}", self.enabled);
        }

        if let Some(level) = var("LLSEC_LEVEL").and_then(|v| v.parse::<u8>().ok()) {
            self.level = level;
            info!("Security level overridden by environment: {}", level);
        }

        if let Some(mode) = var("LLSEC_KEY_ID_MODE").and_then(|v| v.parse::<u8>().ok()) {
            self.key_id_mode = mode;
            info!("Key id mode overridden by environment: {}", mode);
        }

        if let Some(index) = var("LLSEC_DEFAULT_KEY").and_then(|v| v.parse::<usize>().ok()) {
            self.default_key = index;
            info!("Default key overridden by environment: {}", index);
        }

        if let Some(frame_counter) = var("LLSEC_FRAME_COUNTER") {
            self.frame_counter = frame_counter.to_lowercase() == "true";
            info!("Frame counter overridden by environment: {}", self.frame_counter);
        }
    }

    /// Validated policy described by this configuration
    pub fn policy(&self) -> Result<SecurityPolicy, ConfigError> {
        let mut policy = SecurityPolicy::default();
        policy.set_enabled(self.enabled);
        policy.set_level_raw(self.level)?;
        let mode = KeyIdMode::try_from(self.key_id_mode)
            .map_err(|_| ConfigError::InvalidKeyIdMode(self.key_id_mode))?;
        policy.set_key_id_mode(mode);
        policy.set_default_key(self.default_key)?;
        policy.set_frame_counter(self.frame_counter);
        Ok(policy)
    }

    /// Provisioned key store
    pub fn key_store(&self) -> Result<KeyStore, ConfigError> {
        let mut keys = KeyStore::new();
        for (index, hex_key) in &self.keys {
            keys.set_key(*index, LinkKey::from_hex(hex_key)?)?;
        }
        Ok(keys)
    }

    /// Security context for this node
    pub fn build_context(&self) -> Result<SecurityContext, ConfigError> {
        self.build_context_for(self.node_addr)
    }

    /// Security context with this configuration's keys and policy for another
    /// address
    pub fn build_context_for(&self, addr: LinkAddr) -> Result<SecurityContext, ConfigError> {
        let state = SecurityState {
            keys: self.key_store()?,
            policy: self.policy()?,
        };
        Ok(SecurityContext::with_state(addr, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llsec_wire::SecurityLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, 5);
        assert_eq!(config.key_id_mode, 1);
        assert_eq!(config.default_key, 0);
        assert!(config.frame_counter);
        assert!(config.keys.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let yaml_content = r#"
services:
  llsec:
    enabled: true
    executable: ./llsec-node
    config:
      services.llsec.node_addr: "0012.4b00.0614.1234"
      services.llsec.level: "6"
      services.llsec.key_id_mode: "0"
      services.llsec.default_key: "2"
      services.llsec.frame_counter: "false"
      services.llsec.key.2: "000102030405060708090a0b0c0d0e0f"
      services.llsec.key.x: "00"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = NodeConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.node_addr, "0012.4b00.0614.1234".parse().unwrap());
        assert_eq!(config.level, 6);
        assert_eq!(config.key_id_mode, 0);
        assert_eq!(config.default_key, 2);
        assert!(!config.frame_counter);
        assert_eq!(config.keys.len(), 1);

        let ctx = config.build_context().unwrap();
        let policy = ctx.policy();
        assert_eq!(policy.level(), SecurityLevel::ENC_MIC_64);
        assert_eq!(policy.key_id_mode(), KeyIdMode::Implicit);
        assert_eq!(policy.default_key(), 2);
        assert!(ctx.read().keys.is_set(2));
        assert_eq!(ctx.local_addr(), config.node_addr);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = NodeConfig::load_from_file("/nonexistent/llsec.yaml").unwrap();
        assert_eq!(config.level, NodeConfig::default().level);
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("LLSEC_NODE_ADDR", "00:00:00:00:00:00:00:09"),
            ("LLSEC_ENABLED", "false"),
            ("LLSEC_LEVEL", "3"),
            ("LLSEC_KEY_ID_MODE", "2"),
            ("LLSEC_DEFAULT_KEY", "4"),
            ("LLSEC_FRAME_COUNTER", "FALSE"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.node_addr, LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 9]));
        assert!(!config.enabled);
        assert_eq!(config.level, 3);
        assert_eq!(config.key_id_mode, 2);
        assert_eq!(config.default_key, 4);
        assert!(!config.frame_counter);
    }

    #[test]
    fn test_build_context_rejects_bad_values() {
        let mut config = NodeConfig {
            level: 8,
            ..NodeConfig::default()
        };
        assert_eq!(config.build_context().err(), Some(ConfigError::InvalidLevel(8)));

        config.level = 5;
        config.key_id_mode = 4;
        assert_eq!(config.build_context().err(), Some(ConfigError::InvalidKeyIdMode(4)));

        config.key_id_mode = 1;
        config.default_key = 16;
        assert_eq!(config.build_context().err(), Some(ConfigError::KeyIndexOutOfRange(16)));

        config.default_key = 0;
        config.keys.insert(16, "00".repeat(16));
        assert_eq!(config.build_context().err(), Some(ConfigError::KeyIndexOutOfRange(16)));

        config.keys.clear();
        config.keys.insert(0, "abcd".to_string());
        assert!(matches!(config.build_context(), Err(ConfigError::InvalidKey(_))));
    }
}
