// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tessera_kernel::config::MIN_EPOCH_FREQUENCY;
use tessera_kernel::types::ShardAddress;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardMode {
    Leader,
    Follower,
}

impl FromStr for ShardMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LEADER" => Ok(ShardMode::Leader),
            "FOLLOWER" => Ok(ShardMode::Follower),
            other => Err(ConfigError::Invalid(format!("unknown shard mode {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStorageKind {
    Nop,
    ObjectStore,
}

impl FromStr for SnapshotStorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NOP" => Ok(SnapshotStorageKind::Nop),
            "OBJECT_STORE" | "LOG" => Ok(SnapshotStorageKind::ObjectStore),
            other => Err(ConfigError::Invalid(format!("unknown snapshot storage {:?}", other))),
        }
    }
}

/// Backend for the epoch log and snapshot objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Fs { root: PathBuf },
    S3 { bucket: String, region: String, endpoint: Option<String> },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub mode: ShardMode,
    /// Ticks per epoch.
    pub epoch_frequency: u64,
    /// Ticks per second.
    pub tick_rate: u32,
    pub snapshot_storage: SnapshotStorageKind,
    /// Epochs between snapshots.
    pub snapshot_frequency: u64,
    pub persona_verification: bool,
    /// Byte cap of the epoch stream; 0 disables the cap.
    pub log_max_bytes: u64,
    pub registry_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub address: ShardAddress,
    pub store: StoreConfig,
    /// Max messages pulled per log fetch.
    pub fetch_batch: usize,
    pub fetch_wait: Duration,
    /// Pause before refetching after a failed delivery.
    pub retry_delay: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            mode: ShardMode::Leader,
            epoch_frequency: MIN_EPOCH_FREQUENCY,
            tick_rate: 10,
            snapshot_storage: SnapshotStorageKind::Nop,
            snapshot_frequency: 10,
            persona_verification: false,
            log_max_bytes: 0,
            registry_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            address: ShardAddress::new("local", "tessera", "dev", "shard-0"),
            store: StoreConfig::Memory,
            fetch_batch: 16,
            fetch_wait: Duration::from_millis(500),
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl NodeConfig {
    /// Load from `TESSERA_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("TESSERA_MODE") {
            cfg.mode = v.parse()?;
        }
        if let Some(v) = lookup("TESSERA_EPOCH_FREQUENCY") {
            cfg.epoch_frequency = parse_num("TESSERA_EPOCH_FREQUENCY", &v)?;
        }
        if let Some(v) = lookup("TESSERA_TICK_RATE") {
            cfg.tick_rate = parse_num("TESSERA_TICK_RATE", &v)?;
        }
        if let Some(v) = lookup("TESSERA_SNAPSHOT_STORAGE") {
            cfg.snapshot_storage = v.parse()?;
        }
        if let Some(v) = lookup("TESSERA_SNAPSHOT_FREQUENCY") {
            cfg.snapshot_frequency = parse_num("TESSERA_SNAPSHOT_FREQUENCY", &v)?;
        }
        if let Some(v) = lookup("TESSERA_PERSONA_VERIFICATION") {
            cfg.persona_verification = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("TESSERA_LOG_MAX_BYTES") {
            cfg.log_max_bytes = parse_num("TESSERA_LOG_MAX_BYTES", &v)?;
        }
        cfg.registry_url = lookup("TESSERA_REGISTRY_URL").filter(|s| !s.is_empty());
        if let Some(v) = lookup("TESSERA_BIND_ADDR") {
            cfg.bind_addr = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("TESSERA_BIND_ADDR: bad address {:?}", v)))?;
        }

        let field = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        cfg.address = ShardAddress::new(
            field("TESSERA_REGION", &cfg.address.region),
            field("TESSERA_ORGANIZATION", &cfg.address.organization),
            field("TESSERA_PROJECT", &cfg.address.project),
            field("TESSERA_SERVICE_ID", &cfg.address.service_id),
        );

        cfg.store = match lookup("TESSERA_STORE").as_deref().unwrap_or("memory") {
            "memory" => StoreConfig::Memory,
            "fs" => StoreConfig::Fs {
                root: lookup("TESSERA_STORE_ROOT")
                    .map(PathBuf::from)
                    .ok_or_else(|| ConfigError::Missing("TESSERA_STORE_ROOT"))?,
            },
            "s3" => StoreConfig::S3 {
                bucket: lookup("TESSERA_S3_BUCKET").ok_or(ConfigError::Missing("TESSERA_S3_BUCKET"))?,
                region: lookup("TESSERA_S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: lookup("TESSERA_S3_ENDPOINT"),
            },
            other => return Err(ConfigError::Invalid(format!("unknown store backend {:?}", other))),
        };

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epoch_frequency < MIN_EPOCH_FREQUENCY {
            return Err(ConfigError::Invalid(format!(
                "epoch frequency must be at least {}, got {}",
                MIN_EPOCH_FREQUENCY, self.epoch_frequency
            )));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick rate must be greater than zero".into()));
        }
        if self.snapshot_frequency == 0 {
            return Err(ConfigError::Invalid("snapshot frequency must be at least 1".into()));
        }
        if self.fetch_batch == 0 {
            return Err(ConfigError::Invalid("fetch batch must be at least 1".into()));
        }
        if self.persona_verification && self.registry_url.is_none() {
            return Err(ConfigError::Missing("TESSERA_REGISTRY_URL"));
        }
        self.address
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

fn parse_num<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{}: not a number: {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let cfg = NodeConfig::from_lookup(lookup(&[
            ("TESSERA_MODE", "follower"),
            ("TESSERA_EPOCH_FREQUENCY", "20"),
            ("TESSERA_SNAPSHOT_STORAGE", "OBJECT_STORE"),
            ("TESSERA_STORE", "fs"),
            ("TESSERA_STORE_ROOT", "/var/lib/tessera"),
            ("TESSERA_PROJECT", "arena"),
        ]))
        .unwrap();

        assert_eq!(cfg.mode, ShardMode::Follower);
        assert_eq!(cfg.epoch_frequency, 20);
        assert_eq!(cfg.snapshot_storage, SnapshotStorageKind::ObjectStore);
        assert_eq!(cfg.store, StoreConfig::Fs { root: "/var/lib/tessera".into() });
        assert_eq!(cfg.address.project, "arena");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_validate_bounds() {
        let mut cfg = NodeConfig { epoch_frequency: 9, ..Default::default() };
        assert!(cfg.validate().is_err());

        cfg.epoch_frequency = 10;
        cfg.tick_rate = 0;
        assert!(cfg.validate().is_err());

        cfg.tick_rate = 1;
        cfg.snapshot_frequency = 0;
        assert!(cfg.validate().is_err());

        cfg.snapshot_frequency = 1;
        cfg.persona_verification = true;
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(NodeConfig::from_lookup(lookup(&[("TESSERA_MODE", "observer")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("TESSERA_TICK_RATE", "fast")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("TESSERA_STORE", "fs")])).is_err());
    }
}
