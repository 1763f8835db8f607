//! # Packet Encoder
//!
//! Builds sealed 32-byte frames from typed packets. Every frame starts as
//! all-sentinel bytes, gets its tag and fields written at fixed offsets, and
//! is sealed with the checksum, so any byte not claimed by a field stays 0xFF.

use super::checksum::seal;
use super::protocol::*;
use super::quantize::*;

/// Encode a packet into a complete, sealed frame
///
/// # Examples
///
/// ```
/// use telemetry_link::packet::encoder::encode;
/// use telemetry_link::packet::protocol::{Packet, TAG_PING, FRAME_SIZE};
///
/// let frame = encode(&Packet::Ping);
/// assert_eq!(frame.len(), FRAME_SIZE);
/// assert_eq!(frame[0], TAG_PING);
/// ```
pub fn encode(packet: &Packet) -> Frame {
    let mut frame = [SENTINEL; FRAME_SIZE];
    frame[0] = packet.kind().tag();

    match packet {
        Packet::Ping | Packet::CalibRequest => {}
        Packet::Imu(imu) => encode_imu_payload(&mut frame, imu),
        Packet::Gps(gps) => encode_gps_payload(&mut frame, gps),
        Packet::Power(power) => encode_power_payload(&mut frame, power),
        Packet::Photoresistor(pht) => encode_photoresistor_payload(&mut frame, pht),
        Packet::CalibPage(page) => encode_calib_page_payload(&mut frame, page),
    }

    seal(&mut frame);
    frame
}

/// Quantize IMU readings into bytes 3..26, timestamp at 26..30
fn encode_imu_payload(frame: &mut Frame, imu: &ImuRecord) {
    PRESSURE.write(frame, imu.pressure);
    TEMPERATURE.write(frame, imu.temperature);

    GYRO_X.write(frame, imu.gyro.x);
    GYRO_Y.write(frame, imu.gyro.y);
    GYRO_Z.write(frame, imu.gyro.z);

    ACCEL_X.write(frame, imu.accel.x);
    ACCEL_Y.write(frame, imu.accel.y);
    ACCEL_Z.write(frame, imu.accel.z);

    MAG_X.write(frame, imu.mag.x);
    MAG_Y.write(frame, imu.mag.y);
    MAG_Z.write(frame, imu.mag.z);

    write_u32(frame, 26, imu.timestamp);
}

/// Raw floats and packed datetime; byte 25 stays sentinel
fn encode_gps_payload(frame: &mut Frame, gps: &GpsRecord) {
    write_f32(frame, 3, gps.latitude);
    write_f32(frame, 7, gps.longitude);
    write_f32(frame, 11, gps.altitude);
    write_f32(frame, 15, gps.azimuth);
    write_u16(frame, 19, gps.speed as u16);
    write_u32(frame, 21, gps.datetime.encode());
    write_u32(frame, 26, gps.timestamp);
}

/// Detector counters and rail voltages; bytes 23..30 stay sentinel
fn encode_power_payload(frame: &mut Frame, power: &PowerRecord) {
    write_u32(frame, 3, power.detection_count);
    write_u32(frame, 7, power.sync_timestamp);
    write_f32(frame, 11, power.main_voltage);
    write_f32(frame, 15, power.battery_voltage);
    write_f32(frame, 19, power.solar_voltage);
}

/// Eight ADC words at 3..19; bytes 19..26 stay sentinel
fn encode_photoresistor_payload(frame: &mut Frame, pht: &PhotoresistorRecord) {
    for (i, &value) in pht.adc.iter().enumerate() {
        write_u16(frame, 3 + 2 * i, value);
    }
    write_u32(frame, 26, pht.timestamp);
}

/// Page number at byte 2, then (min, max) float pairs from byte 3
fn encode_calib_page_payload(frame: &mut Frame, page: &CalibPage) {
    frame[2] = page.page();

    let count = CalibPage::ranges_on_page(page.page());
    for (i, range) in page.ranges.iter().take(count).enumerate() {
        write_f32(frame, 3 + 8 * i, range.min);
        write_f32(frame, 7 + 8 * i, range.max);
    }
}

/// Split a full calibration table into its three pages
pub fn calib_pages(ranges: &[ChannelRange; PHOTORESISTOR_CHANNELS]) -> [CalibPage; CALIB_PAGES] {
    std::array::from_fn(|i| {
        let number = (i + 1) as u8;
        let first = CalibPage::first_channel(number);
        let count = CalibPage::ranges_on_page(number);

        let mut page_ranges = [ChannelRange::default(); CALIB_RANGES_PER_PAGE];
        page_ranges[..count].copy_from_slice(&ranges[first..first + count]);
        CalibPage { page: number, ranges: page_ranges }
    })
}
