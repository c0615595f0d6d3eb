use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use super::{Error, Result};

/// How inbound TCP bytes are cut into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Every read delivery is treated as exactly one frame
    #[default]
    Delivery,
    /// Frames are reassembled from the stream using the length byte
    LengthPrefixed,
}

impl FromStr for FramingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(FramingMode::Delivery),
            "length" | "length_prefixed" => Ok(FramingMode::LengthPrefixed),
            other => Err(Error::config(format!("Unknown framing mode: {}", other))),
        }
    }
}

/// Configuration for the GT06 server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local address to listen on
    pub bind_addr: SocketAddr,
    /// Append-only JSON-lines packet log
    pub log_file: PathBuf,
    /// Frame delimitation strategy
    pub framing: FramingMode,
    /// Also map protocol number 0x22 to GPS
    pub extended_gps: bool,
    /// Validate markers, length byte and checksum of inbound frames
    pub strict_frames: bool,
    /// Close sessions that stay silent this long
    #[serde(serialize_with = "super::serde::serialize_opt_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_opt_duration")]
    pub idle_timeout: Option<Duration>,
    /// TCP keepalive idle time for accepted sockets
    #[serde(serialize_with = "super::serde::serialize_opt_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_opt_duration")]
    pub tcp_keepalive: Option<Duration>,
    /// Records the packet log may queue before appends are refused
    pub sink_capacity: usize,
    /// Fallback log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], super::DEFAULT_PORT)),
            log_file: PathBuf::from(super::DEFAULT_LOG_FILE),
            framing: FramingMode::default(),
            extended_gps: false,
            strict_frames: false,
            idle_timeout: None,
            tcp_keepalive: None,
            sink_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Builds a configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(port) = lookup("PORT") {
            config.bind_addr.set_port(parse_var("PORT", &port)?);
        }
        if let Some(addr) = lookup("GT06_BIND_ADDR") {
            config.bind_addr = parse_var("GT06_BIND_ADDR", &addr)?;
        }
        if let Some(path) = lookup("GT06_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }
        if let Some(framing) = lookup("GT06_FRAMING") {
            config.framing = framing.parse()?;
        }
        if let Some(flag) = lookup("GT06_EXTENDED_GPS") {
            config.extended_gps = parse_flag("GT06_EXTENDED_GPS", &flag)?;
        }
        if let Some(flag) = lookup("GT06_STRICT_FRAMES") {
            config.strict_frames = parse_flag("GT06_STRICT_FRAMES", &flag)?;
        }
        if let Some(secs) = lookup("GT06_IDLE_TIMEOUT_SECS") {
            config.idle_timeout = Some(Duration::from_secs(parse_var("GT06_IDLE_TIMEOUT_SECS", &secs)?));
        }
        if let Some(secs) = lookup("GT06_TCP_KEEPALIVE_SECS") {
            config.tcp_keepalive = Some(Duration::from_secs(parse_var("GT06_TCP_KEEPALIVE_SECS", &secs)?));
        }
        if let Some(capacity) = lookup("GT06_SINK_CAPACITY") {
            config.sink_capacity = parse_var("GT06_SINK_CAPACITY", &capacity)?;
        }
        if let Some(level) = lookup("GT06_LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks values that would make the server misbehave
    pub fn validate(&self) -> Result<()> {
        if self.sink_capacity == 0 {
            return Err(Error::config("sink_capacity must be greater than zero"));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(Error::config("idle_timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("Invalid value for {}: {}", key, e)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("Invalid value for {}: {}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr.port(), crate::core::DEFAULT_PORT);
        assert_eq!(config.log_file, PathBuf::from("packets.log.json"));
        assert_eq!(config.framing, FramingMode::Delivery);
        assert!(!config.extended_gps);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "6000"),
            ("GT06_FRAMING", "length"),
            ("GT06_EXTENDED_GPS", "true"),
            ("GT06_IDLE_TIMEOUT_SECS", "90"),
            ("GT06_LOG_FILE", "/tmp/gt06.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 6000);
        assert_eq!(config.framing, FramingMode::LengthPrefixed);
        assert!(config.extended_gps);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.log_file, PathBuf::from("/tmp/gt06.jsonl"));
    }

    #[test]
    fn test_bind_addr_wins_over_port() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "6000"),
            ("GT06_BIND_ADDR", "127.0.0.1:7000"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup_from(&[("GT06_FRAMING", "lines")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup_from(&[("GT06_SINK_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup_from(&[("GT06_IDLE_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: Config = serde_json::from_str(r#"{"framing":"length_prefixed"}"#).unwrap();
        assert_eq!(config.framing, FramingMode::LengthPrefixed);
        assert_eq!(config.sink_capacity, 1024);
        assert_eq!(config.idle_timeout, None);
    }
}
