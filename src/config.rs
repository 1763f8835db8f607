//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! `default_*` functions below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TelemetryLinkError};
use crate::telemetry::present::OutputMode;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Which end of the link this process is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Onboard computer: reads sensors, transmits telemetry, serves calibration
    Flight,

    /// Receiver station: decodes telemetry, requests calibration
    Ground,
}

/// Telemetry log file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Csv,
    Jsonl,
}

/// Radio bridge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    /// Serial device of the radio bridge; empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Retransmissions after the first attempt
    #[serde(default = "default_retry_count")]
    pub retry_count: u8,

    /// Delay between retransmissions in microseconds
    #[serde(default = "default_retry_delay_us")]
    pub retry_delay_us: u64,
}

/// Node behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_role")]
    pub role: Role,

    #[serde(default = "default_output")]
    pub output: OutputMode,

    /// Print every received telemetry record
    #[serde(default = "default_print_on_receive")]
    pub print_on_receive: bool,

    /// Scheduler tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Task intervals in milliseconds; values below 10 disable the task
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_sensor_interval_ms")]
    pub gps_update_ms: u32,

    #[serde(default = "default_sensor_interval_ms")]
    pub imu_update_ms: u32,

    #[serde(default = "default_sensor_interval_ms")]
    pub power_update_ms: u32,

    #[serde(default = "default_sensor_interval_ms")]
    pub photoresistor_update_ms: u32,

    #[serde(default = "default_send_interval_ms")]
    pub gps_send_ms: u32,

    #[serde(default = "default_send_interval_ms")]
    pub imu_send_ms: u32,

    #[serde(default = "default_send_interval_ms")]
    pub photoresistor_send_ms: u32,

    #[serde(default = "default_send_interval_ms")]
    pub power_send_ms: u32,

    #[serde(default = "default_calib_request_ms")]
    pub calib_request_interval_ms: u32,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub radio_poll_ms: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub console_poll_ms: u32,
}

/// Telemetry log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

// Default value functions
fn default_baud_rate() -> u32 { 115200 }
fn default_retry_count() -> u8 { 3 }
fn default_retry_delay_us() -> u64 { 250 }

fn default_role() -> Role { Role::Flight }
fn default_output() -> OutputMode { OutputMode::Machine }
fn default_print_on_receive() -> bool { true }
fn default_tick_ms() -> u64 { 1 }

fn default_sensor_interval_ms() -> u32 { 1000 }
fn default_send_interval_ms() -> u32 { 1000 }
fn default_calib_request_ms() -> u32 { 1000 }
fn default_log_interval_ms() -> u32 { 1000 }
fn default_poll_interval_ms() -> u32 { 10 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> LogFormat { LogFormat::Csv }

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            retry_count: default_retry_count(),
            retry_delay_us: default_retry_delay_us(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            output: default_output(),
            print_on_receive: default_print_on_receive(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            gps_update_ms: default_sensor_interval_ms(),
            imu_update_ms: default_sensor_interval_ms(),
            power_update_ms: default_sensor_interval_ms(),
            photoresistor_update_ms: default_sensor_interval_ms(),
            gps_send_ms: default_send_interval_ms(),
            imu_send_ms: default_send_interval_ms(),
            photoresistor_send_ms: default_send_interval_ms(),
            power_send_ms: default_send_interval_ms(),
            calib_request_interval_ms: default_calib_request_ms(),
            log_interval_ms: default_log_interval_ms(),
            radio_poll_ms: default_poll_interval_ms(),
            console_poll_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> TelemetryLinkError {
    TelemetryLinkError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use telemetry_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Schedule intervals are not validated: intervals below the scheduler
    /// minimum are a supported way to disable a task.
    pub fn validate(&self) -> Result<()> {
        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600].contains(&self.radio.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        // nRF24 auto-retransmit: 4-bit count, 250 µs delay steps up to 4000 µs
        if self.radio.retry_count > 15 {
            return Err(invalid("retry_count must be between 0 and 15"));
        }

        if self.radio.retry_delay_us < 250
            || self.radio.retry_delay_us > 4000
            || self.radio.retry_delay_us % 250 != 0
        {
            return Err(invalid("retry_delay_us must be a multiple of 250 between 250 and 4000"));
        }

        if self.node.tick_ms == 0 || self.node.tick_ms > 1000 {
            return Err(invalid("tick_ms must be between 1 and 1000"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}
