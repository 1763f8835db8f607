//! # Fixed-Point Quantization
//!
//! Affine mapping of a bounded floating-point range onto a narrow unsigned
//! integer code so IMU telemetry fits a 32-byte frame.
//!
//! ```text
//! encode: round((v - min) / (max - min) * resolution)   if min <= v <= max
//!         0                                             otherwise
//! decode: code / resolution * (max - min) + min
//! ```
//!
//! ## Out-of-range values
//!
//! Values outside `[min, max]` (and NaN) saturate to code 0, not to the
//! nearest bound. Code 0 decodes to `min`, so an out-of-range reading is
//! indistinguishable on the ground from a reading of exactly `min`. This
//! matches the deployed flight firmware and is kept so both ends agree.

use super::protocol::{read_le, write_le, Frame};

/// One quantized field of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedField {
    /// Byte offset within the frame
    pub offset: usize,

    /// Width in bytes (1 to 4)
    pub width: usize,

    /// Lower bound of the representable range
    pub min: f64,

    /// Upper bound of the representable range
    pub max: f64,

    /// Code assigned to `max`
    pub resolution: u32,
}

impl QuantizedField {
    pub const fn new(offset: usize, width: usize, min: f64, max: f64, resolution: u32) -> Self {
        Self {
            offset,
            width,
            min,
            max,
            resolution,
        }
    }

    /// Whether `value` is inside the representable range
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Worst-case absolute error of a quantize/dequantize round trip
    pub fn step(&self) -> f64 {
        (self.max - self.min) / self.resolution as f64
    }

    /// Map a value to its integer code, saturating to 0 outside the range
    pub fn quantize(&self, value: f64) -> u32 {
        if !self.contains(value) {
            return 0;
        }

        let scaled = (value - self.min) / (self.max - self.min) * self.resolution as f64;
        (scaled.round() as u32).min(self.resolution)
    }

    /// Map an integer code back to a value
    pub fn dequantize(&self, code: u32) -> f64 {
        code as f64 / self.resolution as f64 * (self.max - self.min) + self.min
    }

    /// Quantize `value` into the frame at this field's offset
    pub fn write(&self, frame: &mut Frame, value: f64) {
        write_le(frame, self.offset, self.width, self.quantize(value));
    }

    /// Read and dequantize this field from the frame
    pub fn read(&self, frame: &Frame) -> f64 {
        self.dequantize(read_le(frame, self.offset, self.width))
    }
}

/// Barometric pressure, Pa
pub const PRESSURE: QuantizedField = QuantizedField::new(3, 3, 26_000.0, 126_000.0, 16_777_215);

/// Temperature, °C
pub const TEMPERATURE: QuantizedField = QuantizedField::new(6, 2, -30.0, 110.0, 4095);

pub const GYRO_X: QuantizedField = QuantizedField::new(8, 2, -250_000.0, 250_000.0, 65535);
pub const GYRO_Y: QuantizedField = QuantizedField::new(10, 2, -250_000.0, 250_000.0, 65535);
pub const GYRO_Z: QuantizedField = QuantizedField::new(12, 2, -250_000.0, 250_000.0, 65535);

pub const ACCEL_X: QuantizedField = QuantizedField::new(14, 2, -8_000.0, 8_000.0, 65535);
pub const ACCEL_Y: QuantizedField = QuantizedField::new(16, 2, -8_000.0, 8_000.0, 65535);
pub const ACCEL_Z: QuantizedField = QuantizedField::new(18, 2, -8_000.0, 8_000.0, 65535);

pub const MAG_X: QuantizedField = QuantizedField::new(20, 2, -16_000.0, 16_000.0, 65535);
pub const MAG_Y: QuantizedField = QuantizedField::new(22, 2, -16_000.0, 16_000.0, 65535);
pub const MAG_Z: QuantizedField = QuantizedField::new(24, 2, -16_000.0, 16_000.0, 65535);

/// Every quantized field of the IMU frame, in frame order
pub const IMU_FIELDS: [QuantizedField; 11] = [
    PRESSURE,
    TEMPERATURE,
    GYRO_X,
    GYRO_Y,
    GYRO_Z,
    ACCEL_X,
    ACCEL_Y,
    ACCEL_Z,
    MAG_X,
    MAG_Y,
    MAG_Z,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::protocol::{FRAME_SIZE, SENTINEL};

    fn sample_points(field: &QuantizedField, count: usize) -> Vec<f64> {
        (0..=count)
            .map(|i| field.min + (field.max - field.min) * i as f64 / count as f64)
            .collect()
    }

    #[test]
    fn test_round_trip_error_within_one_step() {
        for field in IMU_FIELDS {
            for v in sample_points(&field, 997) {
                let back = field.dequantize(field.quantize(v));
                assert!(
                    (back - v).abs() <= field.step(),
                    "field at offset {}: {} -> {} exceeds step {}",
                    field.offset,
                    v,
                    back,
                    field.step()
                );
            }
        }
    }

    #[test]
    fn test_bounds_map_to_code_range() {
        for field in IMU_FIELDS {
            assert_eq!(field.quantize(field.min), 0);
            assert_eq!(field.quantize(field.max), field.resolution);
        }
    }

    #[test]
    fn test_codes_fit_field_width() {
        for field in IMU_FIELDS {
            let max_code = if field.width >= 4 {
                u32::MAX as u64
            } else {
                (1u64 << (8 * field.width)) - 1
            };
            assert!(field.resolution as u64 <= max_code);
        }
    }

    #[test]
    fn test_below_range_aliases_minimum() {
        // Known property: out-of-range values share code 0 with the minimum
        for field in IMU_FIELDS {
            let epsilon = field.step();
            assert_eq!(field.quantize(field.min - epsilon), 0);
            assert_eq!(field.quantize(field.min), 0);
            assert_eq!(field.dequantize(field.quantize(field.min - epsilon)), field.min);
        }
    }

    #[test]
    fn test_above_range_saturates_to_zero_not_max() {
        assert_eq!(TEMPERATURE.quantize(110.5), 0);
        assert_eq!(TEMPERATURE.quantize(1e9), 0);
        assert_eq!(PRESSURE.quantize(200_000.0), 0);
    }

    #[test]
    fn test_nan_saturates_to_zero() {
        assert_eq!(ACCEL_X.quantize(f64::NAN), 0);
    }

    #[test]
    fn test_center_of_symmetric_range() {
        // 0 sits exactly between codes 32767 and 32768
        let code = GYRO_X.quantize(0.0);
        assert!(code == 32767 || code == 32768);
        assert!(GYRO_X.dequantize(code).abs() <= GYRO_X.step());
    }

    #[test]
    fn test_write_respects_width_and_offset() {
        let mut frame = [SENTINEL; FRAME_SIZE];
        TEMPERATURE.write(&mut frame, -30.0);
        assert_eq!(&frame[6..8], &[0x00, 0x00]);
        assert_eq!(frame[5], SENTINEL);
        assert_eq!(frame[8], SENTINEL);
        assert_eq!(TEMPERATURE.read(&frame), -30.0);
    }

    #[test]
    fn test_imu_fields_tile_the_payload() {
        let mut next = 3;
        for field in IMU_FIELDS {
            assert_eq!(field.offset, next, "gap or overlap before offset {}", field.offset);
            next = field.offset + field.width;
        }
        assert_eq!(next, 26, "timestamp starts right after the magnetometer");
    }
}
