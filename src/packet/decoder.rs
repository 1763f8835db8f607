//! # Packet Decoder
//!
//! Validates and decodes received frames. Validation runs in a fixed order:
//! checksum first, then the tag lookup, then the sentinel bytes declared for
//! that tag as a secondary type confirmation. Only then is the payload
//! extracted.

use std::ops::Range;

use super::checksum::verify;
use super::datetime::PackedDatetime;
use super::protocol::*;
use super::quantize::*;
use crate::error::{Result, TelemetryLinkError};

/// Decode a complete frame
///
/// # Errors
///
/// - `CorruptFrame` if the checksum does not match
/// - `UnknownType` if the tag is not in the protocol table or the sentinel
///   bytes declared for the tag are not all 0xFF
///
/// # Examples
///
/// ```
/// use telemetry_link::packet::decoder::decode;
/// use telemetry_link::packet::encoder::encode;
/// use telemetry_link::packet::protocol::Packet;
///
/// let frame = encode(&Packet::Ping);
/// assert_eq!(decode(&frame).unwrap(), Packet::Ping);
/// ```
pub fn decode(frame: &Frame) -> Result<Packet> {
    verify(frame)?;

    let tag = frame[0];
    let kind = PacketKind::from_tag(tag).ok_or(TelemetryLinkError::UnknownType(tag))?;

    for range in sentinel_ranges(kind, frame[2]).ok_or(TelemetryLinkError::UnknownType(tag))? {
        if frame[range.clone()].iter().any(|&b| b != SENTINEL) {
            return Err(TelemetryLinkError::UnknownType(tag));
        }
    }

    let packet = match kind {
        PacketKind::Ping => Packet::Ping,
        PacketKind::Imu => Packet::Imu(decode_imu(frame)),
        PacketKind::Gps => Packet::Gps(decode_gps(frame)),
        PacketKind::Power => Packet::Power(decode_power(frame)),
        PacketKind::Photoresistor => Packet::Photoresistor(decode_photoresistor(frame)),
        PacketKind::CalibRange if frame[2] == CALIB_REQUEST_PAGE => Packet::CalibRequest,
        PacketKind::CalibRange => {
            Packet::CalibPage(decode_calib_page(frame).ok_or(TelemetryLinkError::UnknownType(tag))?)
        }
    };

    Ok(packet)
}

/// Byte ranges that must hold the sentinel for a given frame kind
///
/// CalibRange frames depend on the page byte; `None` means the page byte
/// itself is invalid.
fn sentinel_ranges(kind: PacketKind, page: u8) -> Option<&'static [Range<usize>]> {
    const PING: &[Range<usize>] = &[1..30];
    const IMU: &[Range<usize>] = &[1..3];
    const GPS: &[Range<usize>] = &[1..3, 25..26];
    const POWER: &[Range<usize>] = &[1..3, 23..30];
    const PHOTORESISTOR: &[Range<usize>] = &[1..3, 19..26];
    const CALIB_FULL_PAGE: &[Range<usize>] = &[1..2, 27..30];
    const CALIB_LAST_PAGE: &[Range<usize>] = &[1..2, 19..30];
    const CALIB_REQUEST: &[Range<usize>] = &[1..2, 3..30];

    let ranges = match kind {
        PacketKind::Ping => PING,
        PacketKind::Imu => IMU,
        PacketKind::Gps => GPS,
        PacketKind::Power => POWER,
        PacketKind::Photoresistor => PHOTORESISTOR,
        PacketKind::CalibRange => match page {
            CALIB_REQUEST_PAGE => CALIB_REQUEST,
            p if CalibPage::is_valid_page(p) && CalibPage::ranges_on_page(p) == CALIB_RANGES_PER_PAGE => {
                CALIB_FULL_PAGE
            }
            p if CalibPage::is_valid_page(p) => CALIB_LAST_PAGE,
            _ => return None,
        },
    };

    Some(ranges)
}

/// Dequantize IMU payload
fn decode_imu(frame: &Frame) -> ImuRecord {
    ImuRecord {
        pressure: PRESSURE.read(frame),
        temperature: TEMPERATURE.read(frame),
        gyro: Vector3::new(GYRO_X.read(frame), GYRO_Y.read(frame), GYRO_Z.read(frame)),
        accel: Vector3::new(ACCEL_X.read(frame), ACCEL_Y.read(frame), ACCEL_Z.read(frame)),
        mag: Vector3::new(MAG_X.read(frame), MAG_Y.read(frame), MAG_Z.read(frame)),
        timestamp: read_u32(frame, 26),
    }
}

fn decode_gps(frame: &Frame) -> GpsRecord {
    GpsRecord {
        latitude: read_f32(frame, 3),
        longitude: read_f32(frame, 7),
        altitude: read_f32(frame, 11),
        azimuth: read_f32(frame, 15),
        speed: read_u16(frame, 19) as i16,
        datetime: PackedDatetime::decode(read_u32(frame, 21)),
        timestamp: read_u32(frame, 26),
    }
}

fn decode_power(frame: &Frame) -> PowerRecord {
    PowerRecord {
        detection_count: read_u32(frame, 3),
        sync_timestamp: read_u32(frame, 7),
        main_voltage: read_f32(frame, 11),
        battery_voltage: read_f32(frame, 15),
        solar_voltage: read_f32(frame, 19),
    }
}

fn decode_photoresistor(frame: &Frame) -> PhotoresistorRecord {
    let mut adc = [0u16; PHOTORESISTOR_CHANNELS];
    for (i, value) in adc.iter_mut().enumerate() {
        *value = read_u16(frame, 3 + 2 * i);
    }

    PhotoresistorRecord {
        adc,
        timestamp: read_u32(frame, 26),
    }
}

/// `None` if byte 2 is not a data page number
fn decode_calib_page(frame: &Frame) -> Option<CalibPage> {
    let page = frame[2];
    let mut ranges = [ChannelRange::default(); CALIB_RANGES_PER_PAGE];

    for (i, range) in ranges.iter_mut().take(CalibPage::ranges_on_page(page)).enumerate() {
        *range = ChannelRange::new(read_f32(frame, 3 + 8 * i), read_f32(frame, 7 + 8 * i));
    }

    CalibPage::new(page, ranges)
}
