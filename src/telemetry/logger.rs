//! # Telemetry Logger
//!
//! Append-only log of store snapshots, one row per scheduler firing, written
//! to rotating files under the configured directory.
//!
//! - `csv`: `|`-separated columns in [`CSV_HEADER`] order
//! - `jsonl`: one JSON object per line with a UTC wall-clock timestamp
//!
//! A file is closed after `max_records_per_file` rows; only the newest
//! `max_files_to_keep` files are retained.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::store::TelemetryStore;
use crate::config::{LogFormat, TelemetryConfig};
use crate::error::Result;

/// Column separator of csv rows
pub const CSV_SEPARATOR: char = '|';

/// Column names of csv rows
pub const CSV_HEADER: &str = "main_v|battery_v|solar_v|pressure|temperature|azimuth|gyro_x|gyro_y|gyro_z|accel_x|accel_y|accel_z|mag_x|mag_y|mag_z|gps_alt|gps_lat|gps_lon|gps_speed|year|month|day|hour|minute|second|detections|uptime_ms";

const FILE_PREFIX: &str = "telemetry_";

/// One JSON line
#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    uptime_ms: u32,
    #[serde(flatten)]
    store: &'a TelemetryStore,
}

struct LogFile {
    writer: BufWriter<File>,
    path: PathBuf,
    records: usize,
}

/// Rotating telemetry log writer
pub struct TelemetryLogger {
    dir: PathBuf,
    format: LogFormat,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<LogFile>,
    sequence: u32,
}

impl std::fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("dir", &self.dir)
            .field("format", &self.format)
            .field("current", &self.current_path())
            .finish_non_exhaustive()
    }
}

impl TelemetryLogger {
    /// Create a logger; no file is opened until the first row
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.log_dir),
            format: config.format,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            current: None,
            sequence: 0,
        }
    }

    /// Path of the file currently being written, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Append one row for the current store snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the log directory or file cannot be created or written.
    /// The logger stays usable; the next call retries opening a file.
    pub fn append(&mut self, store: &TelemetryStore, uptime_ms: u32) -> Result<()> {
        if self.current.is_none() {
            self.open_next()?;
        }

        let row = self.format_row(store, uptime_ms)?;
        let rotate = match self.current.as_mut() {
            Some(file) => {
                if let Err(e) = writeln!(file.writer, "{}", row).and_then(|_| file.writer.flush()) {
                    self.current = None;
                    return Err(e.into());
                }
                file.records += 1;
                file.records >= self.max_records_per_file
            }
            None => false,
        };

        if rotate {
            if let Some(file) = self.current.take() {
                info!("Telemetry log {} full, rotating", file.path.display());
            }
        }

        Ok(())
    }

    fn format_row(&self, store: &TelemetryStore, uptime_ms: u32) -> Result<String> {
        match self.format {
            LogFormat::Csv => Ok(csv_row(store, uptime_ms)),
            LogFormat::Jsonl => {
                let entry = LogEntry {
                    timestamp: Utc::now().to_rfc3339(),
                    uptime_ms,
                    store,
                };
                Ok(serde_json::to_string(&entry)?)
            }
        }
    }

    fn extension(&self) -> &'static str {
        match self.format {
            LogFormat::Csv => "csv",
            LogFormat::Jsonl => "jsonl",
        }
    }

    fn open_next(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.sequence,
            self.extension()
        );
        self.sequence = self.sequence.wrapping_add(1);
        let path = self.dir.join(name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        if self.format == LogFormat::Csv {
            writeln!(writer, "{}", CSV_HEADER)?;
        }

        debug!("Opened telemetry log {}", path.display());
        self.current = Some(LogFile {
            writer,
            path,
            records: 0,
        });

        // retention is best effort
        if let Err(e) = self.prune() {
            warn!("Failed to prune telemetry logs in {}: {}", self.dir.display(), e);
        }
        Ok(())
    }

    /// Delete the oldest log files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let extension = self.extension();
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(FILE_PREFIX))
                    .unwrap_or(false)
                    && path.extension().and_then(|e| e.to_str()) == Some(extension)
            })
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            debug!("Removing old telemetry log {}", path.display());
            fs::remove_file(path)?;
        }

        Ok(())
    }
}

/// Format one csv row in [`CSV_HEADER`] order
pub fn csv_row(store: &TelemetryStore, uptime_ms: u32) -> String {
    let power = store.power();
    let imu = store.imu();
    let gps = store.gps();
    let dt = gps.datetime;

    let columns = [
        power.main_voltage.to_string(),
        power.battery_voltage.to_string(),
        power.solar_voltage.to_string(),
        imu.pressure.to_string(),
        imu.temperature.to_string(),
        gps.azimuth.to_string(),
        imu.gyro.x.to_string(),
        imu.gyro.y.to_string(),
        imu.gyro.z.to_string(),
        imu.accel.x.to_string(),
        imu.accel.y.to_string(),
        imu.accel.z.to_string(),
        imu.mag.x.to_string(),
        imu.mag.y.to_string(),
        imu.mag.z.to_string(),
        gps.altitude.to_string(),
        gps.latitude.to_string(),
        gps.longitude.to_string(),
        gps.speed.to_string(),
        dt.full_year().to_string(),
        dt.month.to_string(),
        dt.day.to_string(),
        dt.hour.to_string(),
        dt.minute.to_string(),
        dt.second.to_string(),
        power.detection_count.to_string(),
        uptime_ms.to_string(),
    ];

    columns.join(&CSV_SEPARATOR.to_string())
}
