//! # Presentation
//!
//! Renders store snapshots for the operator console, either as labelled
//! human-readable text or as one `;`-separated machine line per record.
//!
//! ## Machine lines
//!
//! Each line starts with a record id and ends with `\n`:
//!
//! | Id | Record | Fields after the id |
//! |----|--------|---------------------|
//! | 0 | Power/Detector | count; sync; main V; battery V; solar V |
//! | 1 | IMU | pressure; temp; accel xyz; mag xyz; gyro xyz; timestamp |
//! | 2 | GPS | lat; lon; alt; azimuth; speed; hour; minute; second; day; month; year; timestamp |
//! | 3 | Photoresistor (calibrated) | 8 values; timestamp |
//! | 4 | Photoresistor (raw ADC) | 8 values; timestamp |
//! | 5 | CalibRange | min; max for each of 8 channels |

use std::fmt::Display;

use serde::Deserialize;

use super::store::{CalibTable, TelemetryStore};
use crate::packet::protocol::*;

/// Field separator of machine lines
pub const SEPARATOR: char = ';';

pub const ID_POWER: u8 = 0;
pub const ID_IMU: u8 = 1;
pub const ID_GPS: u8 = 2;
pub const ID_PHOTORESISTOR_CALIBRATED: u8 = 3;
pub const ID_PHOTORESISTOR_RAW: u8 = 4;
pub const ID_CALIB_RANGE: u8 = 5;

/// Console rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Human,
    Machine,
}

/// Join an id and fields into one newline-terminated machine line
fn machine_line<I, T>(id: u8, fields: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let mut line = id.to_string();
    for field in fields {
        line.push(SEPARATOR);
        line.push_str(&field.to_string());
    }
    line.push('\n');
    line
}

/// Render sender uptime as `1d 2h 3m 4s`, omitting leading zero units
pub fn format_uptime(ms: u32) -> String {
    let total_seconds = ms / 1000;
    let days = total_seconds / 86_400;
    let hours = (total_seconds / 3600) % 24;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}d ", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}h ", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m ", minutes));
    }
    out.push_str(&format!("{}s", seconds));
    out
}

pub fn render_power(power: &PowerRecord, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!(
            "Detections: {}\nDetector sync: {}\nMain voltage: {:.2} V\nBattery voltage: {:.2} V\nSolar voltage: {:.2} V\n",
            power.detection_count,
            power.sync_timestamp,
            power.main_voltage,
            power.battery_voltage,
            power.solar_voltage,
        ),
        OutputMode::Machine => machine_line(
            ID_POWER,
            [
                power.detection_count.to_string(),
                power.sync_timestamp.to_string(),
                power.main_voltage.to_string(),
                power.battery_voltage.to_string(),
                power.solar_voltage.to_string(),
            ],
        ),
    }
}

pub fn render_imu(imu: &ImuRecord, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format!(
            "Pressure: {:.2} Pa\nTemperature: {:.2} °C\nAcceleration (X Y Z): {:.2} {:.2} {:.2} m/s²\nMagnetic field (X Y Z): {:.2} {:.2} {:.2} mGauss\nAngular rate (X Y Z): {:.2} {:.2} {:.2} °/s\nTime: {}\n",
            imu.pressure,
            imu.temperature,
            imu.accel.x,
            imu.accel.y,
            imu.accel.z,
            imu.mag.x,
            imu.mag.y,
            imu.mag.z,
            imu.gyro.x,
            imu.gyro.y,
            imu.gyro.z,
            format_uptime(imu.timestamp),
        ),
        OutputMode::Machine => machine_line(
            ID_IMU,
            [
                imu.pressure.to_string(),
                imu.temperature.to_string(),
                imu.accel.x.to_string(),
                imu.accel.y.to_string(),
                imu.accel.z.to_string(),
                imu.mag.x.to_string(),
                imu.mag.y.to_string(),
                imu.mag.z.to_string(),
                imu.gyro.x.to_string(),
                imu.gyro.y.to_string(),
                imu.gyro.z.to_string(),
                imu.timestamp.to_string(),
            ],
        ),
    }
}

pub fn render_gps(gps: &GpsRecord, mode: OutputMode) -> String {
    let dt = gps.datetime;
    match mode {
        OutputMode::Human => format!(
            "Latitude: {:.6} °\nLongitude: {:.6} °\nAltitude: {:.2} m\nAzimuth: {:.2} °\nSpeed: {} km/h\nDate: {:02}.{:02}.{}\nTime (UTC): {:02}:{:02}:{:02}\nTime: {}\n",
            gps.latitude,
            gps.longitude,
            gps.altitude,
            gps.azimuth,
            gps.speed,
            dt.day,
            dt.month,
            dt.full_year(),
            dt.hour,
            dt.minute,
            dt.second,
            format_uptime(gps.timestamp),
        ),
        OutputMode::Machine => machine_line(
            ID_GPS,
            [
                gps.latitude.to_string(),
                gps.longitude.to_string(),
                gps.altitude.to_string(),
                gps.azimuth.to_string(),
                gps.speed.to_string(),
                dt.hour.to_string(),
                dt.minute.to_string(),
                dt.second.to_string(),
                dt.day.to_string(),
                dt.month.to_string(),
                dt.full_year().to_string(),
                gps.timestamp.to_string(),
            ],
        ),
    }
}

pub fn render_photoresistor_calibrated(
    pht: &PhotoresistorRecord,
    calibration: &CalibTable,
    mode: OutputMode,
) -> String {
    let values: Vec<f32> = pht
        .adc
        .iter()
        .enumerate()
        .map(|(channel, &adc)| calibration.calibrate(channel, adc))
        .collect();

    match mode {
        OutputMode::Human => {
            let mut out = String::new();
            for (i, value) in values.iter().enumerate() {
                out.push_str(&format!("Photoresistor ({}): {:.2}\n", i + 1, value));
            }
            out.push_str(&format!("Time: {}\n", format_uptime(pht.timestamp)));
            out
        }
        OutputMode::Machine => machine_line(
            ID_PHOTORESISTOR_CALIBRATED,
            values
                .iter()
                .map(|v| v.to_string())
                .chain(std::iter::once(pht.timestamp.to_string())),
        ),
    }
}

pub fn render_photoresistor_raw(pht: &PhotoresistorRecord, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => {
            let mut out = String::new();
            for (i, adc) in pht.adc.iter().enumerate() {
                out.push_str(&format!("Photoresistor ADC ({}): {}\n", i + 1, adc));
            }
            out.push_str(&format!("Time: {}\n", format_uptime(pht.timestamp)));
            out
        }
        OutputMode::Machine => machine_line(
            ID_PHOTORESISTOR_RAW,
            pht.adc
                .iter()
                .map(|v| v.to_string())
                .chain(std::iter::once(pht.timestamp.to_string())),
        ),
    }
}

pub fn render_calibration(calibration: &CalibTable, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => {
            let mut out = String::new();
            for (i, range) in calibration.ranges.iter().enumerate() {
                out.push_str(&format!(
                    "Photoresistor range ({}): {:.2} {:.2}\n",
                    i + 1,
                    range.min,
                    range.max
                ));
            }
            if !calibration.is_complete() {
                out.push_str("Calibration incomplete\n");
            }
            out
        }
        OutputMode::Machine => machine_line(
            ID_CALIB_RANGE,
            calibration
                .ranges
                .iter()
                .flat_map(|r| [r.min.to_string(), r.max.to_string()]),
        ),
    }
}

/// Render the latest value of a class from the store
pub fn render_class(store: &TelemetryStore, class: TelemetryClass, mode: OutputMode) -> String {
    match class {
        TelemetryClass::Imu => render_imu(store.imu(), mode),
        TelemetryClass::Gps => render_gps(store.gps(), mode),
        TelemetryClass::Power => render_power(store.power(), mode),
        TelemetryClass::Photoresistor => {
            render_photoresistor_calibrated(store.photoresistor(), store.calibration(), mode)
        }
        TelemetryClass::CalibRange => render_calibration(store.calibration(), mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(line: &str) -> Vec<&str> {
        line.trim_end_matches('\n').split(SEPARATOR).collect()
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0s");
        assert_eq!(format_uptime(59_999), "59s");
        assert_eq!(format_uptime(61_000), "1m 1s");
        assert_eq!(format_uptime(3_600_000), "1h 0s");
        assert_eq!(format_uptime(90_061_000), "1d 1h 1m 1s");
    }

    #[test]
    fn test_machine_imu_field_order() {
        let imu = ImuRecord {
            pressure: 101_325.0,
            temperature: 20.5,
            gyro: Vector3::new(7.0, 8.0, 9.0),
            accel: Vector3::new(1.0, 2.0, 3.0),
            mag: Vector3::new(4.0, 5.0, 6.0),
            timestamp: 1234,
        };
        let line = render_imu(&imu, OutputMode::Machine);

        assert!(line.ends_with('\n'));
        assert_eq!(
            fields(&line),
            vec!["1", "101325", "20.5", "1", "2", "3", "4", "5", "6", "7", "8", "9", "1234"]
        );
    }

    #[test]
    fn test_machine_power_line() {
        let power = PowerRecord {
            detection_count: 3,
            sync_timestamp: 4,
            main_voltage: 5.5,
            battery_voltage: 3.5,
            solar_voltage: 0.0,
        };
        assert_eq!(render_power(&power, OutputMode::Machine), "0;3;4;5.5;3.5;0\n");
    }

    #[test]
    fn test_machine_gps_uses_full_year() {
        let gps = GpsRecord {
            datetime: crate::packet::datetime::PackedDatetime::new(26, 10, 19, 8, 5, 42),
            ..Default::default()
        };
        let line = render_gps(&gps, OutputMode::Machine);
        let f = fields(&line);
        assert_eq!(f[0], "2");
        assert_eq!(&f[6..12], &["8", "5", "42", "19", "10", "2026"]);
    }

    #[test]
    fn test_machine_photoresistor_lines() {
        let pht = PhotoresistorRecord {
            adc: [0, 1023, 0, 1023, 0, 1023, 0, 1023],
            timestamp: 5,
        };
        let calibration = CalibTable::from_ranges([ChannelRange::new(10.0, 20.0); 8]);

        let raw = render_photoresistor_raw(&pht, OutputMode::Machine);
        assert_eq!(raw, "4;0;1023;0;1023;0;1023;0;1023;5\n");

        let calibrated = render_photoresistor_calibrated(&pht, &calibration, OutputMode::Machine);
        assert_eq!(calibrated, "3;10;20;10;20;10;20;10;20;5\n");
    }

    #[test]
    fn test_machine_calibration_line() {
        let calibration = CalibTable::from_ranges([ChannelRange::new(1.0, 2.0); 8]);
        let line = render_calibration(&calibration, OutputMode::Machine);
        assert_eq!(fields(&line).len(), 1 + 16);
        assert!(line.starts_with("5;1;2;1;2"));
    }

    #[test]
    fn test_human_imu_mentions_units() {
        let text = render_imu(&ImuRecord::default(), OutputMode::Human);
        assert!(text.contains("Pa"));
        assert!(text.contains("°C"));
        assert!(text.contains("Time: 0s"));
        assert!(!text.contains(SEPARATOR));
    }

    #[test]
    fn test_human_calibration_flags_incomplete() {
        let text = render_calibration(&CalibTable::default(), OutputMode::Human);
        assert!(text.contains("Calibration incomplete"));
    }

    #[test]
    fn test_render_class_dispatch() {
        let store = TelemetryStore::new();
        let line = render_class(&store, TelemetryClass::Power, OutputMode::Machine);
        assert!(line.starts_with("0;"));
        let line = render_class(&store, TelemetryClass::Photoresistor, OutputMode::Machine);
        assert!(line.starts_with("3;"));
    }
}
