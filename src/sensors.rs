//! # Sensor Collaborator
//!
//! Boundary to the flight computer's sensor drivers. Each read returns `None`
//! when no fresh reading is available, in which case the store keeps its
//! previous value.

use chrono::Utc;

use crate::packet::datetime::PackedDatetime;
use crate::packet::protocol::*;

/// Source of flight-side readings
///
/// `now_ms` is the node's uptime clock, stamped into the records.
#[cfg_attr(test, mockall::automock)]
pub trait SensorSource: Send {
    fn read_imu(&mut self, now_ms: u32) -> Option<ImuRecord>;

    fn read_gps(&mut self, now_ms: u32) -> Option<GpsRecord>;

    fn read_power(&mut self, now_ms: u32) -> Option<PowerRecord>;

    fn read_photoresistors(&mut self, now_ms: u32) -> Option<PhotoresistorRecord>;

    /// Calibration ranges for all photoresistor channels, read once at start-up
    fn read_calibration(&mut self) -> Option<[ChannelRange; PHOTORESISTOR_CHANNELS]>;
}

/// Deterministic stand-in for the sensor drivers
///
/// Values drift slowly with each read so successive frames differ.
#[derive(Debug, Default)]
pub struct SimulatedSensors {
    reads: u32,
    detections: u32,
}

impl SimulatedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_phase(&mut self) -> f64 {
        self.reads = self.reads.wrapping_add(1);
        (f64::from(self.reads % 360)).to_radians()
    }
}

impl SensorSource for SimulatedSensors {
    fn read_imu(&mut self, now_ms: u32) -> Option<ImuRecord> {
        let phase = self.next_phase();
        Some(ImuRecord {
            pressure: 101_325.0 - 50.0 * phase.sin(),
            temperature: 20.0 + 2.0 * phase.cos(),
            gyro: Vector3::new(1.5 * phase.sin(), -0.5, 0.25),
            accel: Vector3::new(0.1 * phase.cos(), 0.0, 9.8),
            mag: Vector3::new(300.0, 20.0 * phase.sin(), -400.0),
            timestamp: now_ms,
        })
    }

    fn read_gps(&mut self, now_ms: u32) -> Option<GpsRecord> {
        let phase = self.next_phase() as f32;
        Some(GpsRecord {
            latitude: 55.7558 + 0.001 * phase.sin(),
            longitude: 37.6173 + 0.001 * phase.cos(),
            altitude: 150.0 + 10.0 * phase.sin(),
            azimuth: phase.to_degrees(),
            speed: 12,
            datetime: PackedDatetime::from_chrono(&Utc::now()).unwrap_or_default(),
            timestamp: now_ms,
        })
    }

    fn read_power(&mut self, now_ms: u32) -> Option<PowerRecord> {
        let phase = self.next_phase() as f32;
        self.detections = self.detections.wrapping_add(self.reads % 3);
        Some(PowerRecord {
            detection_count: self.detections,
            sync_timestamp: now_ms,
            main_voltage: 5.0 + 0.05 * phase.sin(),
            battery_voltage: 3.9 - 0.1 * phase.cos(),
            solar_voltage: 4.5 + 0.5 * phase.sin(),
        })
    }

    fn read_photoresistors(&mut self, now_ms: u32) -> Option<PhotoresistorRecord> {
        let phase = self.next_phase();
        let mut adc = [0u16; PHOTORESISTOR_CHANNELS];
        for (i, value) in adc.iter_mut().enumerate() {
            let level = 0.5 + 0.4 * (phase + i as f64 * 0.7).sin();
            *value = (level * f64::from(ADC_MAX)).round() as u16;
        }
        Some(PhotoresistorRecord {
            adc,
            timestamp: now_ms,
        })
    }

    fn read_calibration(&mut self) -> Option<[ChannelRange; PHOTORESISTOR_CHANNELS]> {
        let mut ranges = [ChannelRange::default(); PHOTORESISTOR_CHANNELS];
        for (i, range) in ranges.iter_mut().enumerate() {
            *range = ChannelRange::new(0.0, 1000.0 + 100.0 * i as f32);
        }
        Some(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::decoder::decode;
    use crate::packet::encoder::encode;

    #[test]
    fn test_simulated_readings_fit_the_frame() {
        let mut sensors = SimulatedSensors::new();

        for now in [0, 1_000, 60_000] {
            let imu = sensors.read_imu(now).unwrap();
            assert!(crate::packet::quantize::PRESSURE.contains(imu.pressure));
            assert!(crate::packet::quantize::TEMPERATURE.contains(imu.temperature));
            assert_eq!(imu.timestamp, now);

            for packet in [
                Packet::Imu(imu),
                Packet::Gps(sensors.read_gps(now).unwrap()),
                Packet::Power(sensors.read_power(now).unwrap()),
                Packet::Photoresistor(sensors.read_photoresistors(now).unwrap()),
            ] {
                assert_eq!(decode(&encode(&packet)).unwrap().kind(), packet.kind());
            }
        }
    }

    #[test]
    fn test_photoresistor_values_within_adc_range() {
        let mut sensors = SimulatedSensors::new();
        for _ in 0..50 {
            let pht = sensors.read_photoresistors(0).unwrap();
            assert!(pht.adc.iter().all(|&v| v <= ADC_MAX));
        }
    }

    #[test]
    fn test_detection_count_never_decreases() {
        let mut sensors = SimulatedSensors::new();
        let mut last = 0;
        for _ in 0..20 {
            let count = sensors.read_power(0).unwrap().detection_count;
            assert!(count >= last);
            last = count;
        }
    }

    #[test]
    fn test_simulated_calibration_is_complete() {
        let ranges = SimulatedSensors::new().read_calibration().unwrap();
        assert!(ranges.iter().all(|r| r.max > r.min));
    }
}
