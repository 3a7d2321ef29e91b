use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;
use yaml_rust::YamlLoader;

/// Default per interface receive queue capacity
pub const DEFAULT_RX_QUEUE_SIZE: u32 = 64;
/// Default upper bound of re-evaluation passes a single packet may request
pub const DEFAULT_MAX_REPEATS: u32 = 16;
/// Lowest ethertype value accepted by default (IEEE 802.3 length/type boundary)
pub const DEFAULT_ETYPE_MIN: u16 = 0x0600;
/// Highest ethertype value accepted by default
pub const DEFAULT_ETYPE_MAX: u16 = 0x86DD;

#[derive(Clone, Debug)]
pub struct Config {
    /// Configure file dist location
    pub fpath: String,
    pub verbose_mode: bool,
    pub quiet: bool,
    /// Capacity of every interface's receive queue
    pub rx_queue_size: u32,
    /// Max ingress passes a packet may trigger with repeat verdicts
    pub max_repeats: u32,
    /// Send deadline in milliseconds, 0 means wait forever
    pub send_timeout_ms: u64,
    pub etype_min: u16,
    pub etype_max: u16,
    /// Whether attaching an interface starts its receiver task
    pub spawn_receivers: bool,
    pub doc: Yaml,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fpath: String::new(),
            verbose_mode: false,
            quiet: false,
            rx_queue_size: DEFAULT_RX_QUEUE_SIZE,
            max_repeats: DEFAULT_MAX_REPEATS,
            send_timeout_ms: 0,
            etype_min: DEFAULT_ETYPE_MIN,
            etype_max: DEFAULT_ETYPE_MAX,
            spawn_receivers: true,
            doc: Yaml::default(),
        }
    }
}

impl Config {
    /// Build a configuration from a YAML document, options missing from the document keep their defaults
    pub fn from_yaml_str(s: &str) -> Result<Config> {
        let docs = YamlLoader::load_from_str(s)?;
        let doc = docs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty configuration document"))?;

        let mut config = Config {
            doc: Yaml(doc),
            ..Default::default()
        };

        config.rx_queue_size = config.get_integer(
            "channel.rx.size",
            DEFAULT_RX_QUEUE_SIZE as i64,
            1,
            1_000_000,
        ) as u32;
        config.max_repeats =
            config.get_integer("verdict.repeat.max", DEFAULT_MAX_REPEATS as i64, 0, 65535) as u32;
        config.send_timeout_ms = config.get_integer("send.timeout.ms", 0, 0, 3_600_000) as u64;
        config.etype_min =
            config.get_integer("ethertype.min", DEFAULT_ETYPE_MIN as i64, 0, 0xFFFF) as u16;
        config.etype_max =
            config.get_integer("ethertype.max", DEFAULT_ETYPE_MAX as i64, 0, 0xFFFF) as u16;
        if config.etype_min > config.etype_max {
            warn!(
                "Option ethertype.min {:#06x} is greater than ethertype.max {:#06x}, set both to {:#06x}/{:#06x}",
                config.etype_min, config.etype_max, DEFAULT_ETYPE_MIN, DEFAULT_ETYPE_MAX
            );
            config.etype_min = DEFAULT_ETYPE_MIN;
            config.etype_max = DEFAULT_ETYPE_MAX;
        }
        config.spawn_receivers = config.get_boolean("rx.spawn", true);

        Ok(config)
    }

    pub fn send_timeout(&self) -> Option<Duration> {
        match self.send_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn get_integer(&self, key: &str, default: i64, min: i64, max: i64) -> i64 {
        get_integer(self.doc.as_ref(), key, default, min, max)
    }

    pub fn get_boolean(&self, key: &str, default: bool) -> bool {
        get_boolean(self.doc.as_ref(), key, default)
    }

    pub fn get_object(&self, key: &str) -> &yaml_rust::Yaml {
        get_object(self.doc.as_ref(), key)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
/// Simple wrapper struct to implement Default trait for yaml_rust::Yaml
pub struct Yaml(pub yaml_rust::Yaml);

impl Default for Yaml {
    fn default() -> Self {
        Self(yaml_rust::Yaml::Null)
    }
}

impl AsRef<yaml_rust::Yaml> for Yaml {
    fn as_ref(&self) -> &yaml_rust::Yaml {
        &self.0
    }
}

pub fn get_str_without_default(doc: &yaml_rust::Yaml, key: &str) -> Result<String> {
    match &doc[key] {
        yaml_rust::Yaml::String(s) => Ok(s.clone()),
        yaml_rust::Yaml::BadValue => Err(anyhow!("Option {} not found or bad string value", key)),
        _ => Err(anyhow!("Wrong value type for {}, expecting string", key)),
    }
}

pub fn get_boolean(doc: &yaml_rust::Yaml, key: &str, default: bool) -> bool {
    match doc[key] {
        yaml_rust::Yaml::Boolean(b) => b,
        yaml_rust::Yaml::BadValue => default,
        _ => {
            warn!(
                "Wrong value type for {}, expecting boolean, set {} to {}",
                key, key, default
            );
            default
        }
    }
}

pub fn get_integer(doc: &yaml_rust::Yaml, key: &str, default: i64, min: i64, max: i64) -> i64 {
    match doc[key] {
        yaml_rust::Yaml::Integer(i) => {
            if i < min || i > max {
                warn!(
                    "Option {} is less/greater than min/max value {}/{}, set {} to {}",
                    key, min, max, key, default
                );
                default
            } else {
                i
            }
        }
        // missing options silently keep their defaults
        yaml_rust::Yaml::BadValue => default,
        _ => {
            warn!(
                "Wrong value type for {}, expecting integer, set {} to {}",
                key, key, default
            );
            default
        }
    }
}

pub fn get_object<'a>(doc: &'a yaml_rust::Yaml, key: &str) -> &'a yaml_rust::Yaml {
    match &doc[key] {
        yaml_rust::Yaml::BadValue => &yaml_rust::Yaml::Null,
        obj => obj,
    }
}
