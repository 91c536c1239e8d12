//! Configuration for the desk-io daemon
//!
//! Loads configuration from a TOML file. Every section falls back to the
//! Raspberry Pi reference setup, so a file only needs the values it changes.

use crate::error::Result;
use crate::height::ReadConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub relays: RelayConfig,
    pub height: HeightConfig,
    pub motion: MotionConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

/// Serial link to the desk controller
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port path
    pub port: String,
    /// Baud rate (the desk controller runs at 9600)
    pub baud_rate: u32,
    /// Upper bound for one blocking byte read.
    ///
    /// Also bounds how long a read holds the port, i.e. the worst-case delay
    /// a command write sees while the monitor is listening.
    pub read_timeout_ms: u64,
}

/// Relay GPIO lines (exported through sysfs before the daemon starts)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Sysfs GPIO class directory
    pub sysfs_root: String,
    /// BCM line number of relay 1
    pub relay_1: u32,
    /// BCM line number of relay 2
    pub relay_2: u32,
}

/// Height read sessions
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeightConfig {
    /// Budget for one read session
    pub read_timeout_ms: u64,
    /// Pause after draining stale input
    pub drain_settle_ms: u64,
}

/// Motion state machine tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Period of the held-key command while jogging
    pub jog_interval_ms: u64,
    /// Period of the seek loop
    pub seek_interval_ms: u64,
    /// Pause after energising relays before the first seek command
    pub relay_warmup_ms: u64,
    /// Coast time between a stop request and cutting relay power.
    ///
    /// Tuned to the desk's mechanism; the reference desk needs about 5 s.
    pub settle_delay_ms: u64,
    /// Seek stops once |current - target| is below this (display units)
    pub tolerance: f32,
    /// Budget for one sleep-height probe
    pub probe_timeout_ms: u64,
    /// Pause before each presence command inside a probe
    pub probe_interval_ms: u64,
    /// Pause after an in-seek probe before using its result
    pub probe_recovery_ms: u64,
    /// Consecutive failed probes before a seek gives up
    pub max_probe_failures: u32,
}

/// Background height monitor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Pause between read sessions
    pub poll_interval_ms: u64,
    /// Pause after a serial fault before retrying
    pub error_backoff_ms: u64,
    /// Run a sleep probe while no height has ever been read
    pub probe_when_empty: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error); RUST_LOG overrides
    pub level: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyAMA0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 50,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sysfs_root: "/sys/class/gpio".to_string(),
            relay_1: 17,
            relay_2: 27,
        }
    }
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 3000,
            drain_settle_ms: 100,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            jog_interval_ms: 500,
            seek_interval_ms: 500,
            relay_warmup_ms: 500,
            settle_delay_ms: 5000,
            tolerance: 1.0,
            probe_timeout_ms: 3000,
            probe_interval_ms: 500,
            probe_recovery_ms: 1000,
            max_probe_failures: 3,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            error_backoff_ms: 1000,
            probe_when_empty: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl HeightConfig {
    pub fn read_config(&self) -> ReadConfig {
        ReadConfig {
            timeout: Duration::from_millis(self.read_timeout_ms),
            drain_settle: Duration::from_millis(self.drain_settle_ms),
        }
    }
}

impl MotionConfig {
    pub fn jog_interval(&self) -> Duration {
        Duration::from_millis(self.jog_interval_ms)
    }

    pub fn seek_interval(&self) -> Duration {
        Duration::from_millis(self.seek_interval_ms)
    }

    pub fn relay_warmup(&self) -> Duration {
        Duration::from_millis(self.relay_warmup_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_recovery(&self) -> Duration {
        Duration::from_millis(self.probe_recovery_ms)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl AppConfig {
    /// Raspberry Pi reference setup
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use desk_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("/etc/desk-io.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::warn!("Config {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.relays.relay_1, 17);
        assert_eq!(config.relays.relay_2, 27);
        assert_eq!(config.motion.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.motion.tolerance, 1.0);
        assert_eq!(config.height.read_config().timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[relays]"));
        assert!(toml_string.contains("[motion]"));
        assert!(toml_string.contains("[monitor]"));
        assert!(toml_string.contains("port = \"/dev/ttyAMA0\""));

        let parsed: AppConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file() {
        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"

[motion]
settle_delay_ms = 1500
tolerance = 0.5
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.motion.settle_delay_ms, 1500);
        assert_eq!(config.motion.tolerance, 0.5);
        assert_eq!(config.motion.jog_interval_ms, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let err = toml::from_str::<AppConfig>("[serial]\nbaud_rate = \"fast\"\n")
            .map_err(crate::error::Error::from)
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
