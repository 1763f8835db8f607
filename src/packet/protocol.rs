//! # Packet Protocol Constants and Types
//!
//! The canonical protocol table shared by the flight computer and the ground
//! receiver: frame geometry, type tags, typed telemetry records and the
//! explicit byte injection/extraction helpers every codec path goes through.

use serde::Serialize;

use super::datetime::PackedDatetime;

/// Every frame on the air is exactly this many bytes
pub const FRAME_SIZE: usize = 32;

/// Offset of the little-endian 16-bit checksum
pub const CHECKSUM_OFFSET: usize = 30;

/// Filler for unused and marker bytes
pub const SENTINEL: u8 = 0xFF;

/// Link check, no payload
pub const TAG_PING: u8 = 0x01;

/// Inertial/environment packet
pub const TAG_IMU: u8 = 0x1F;

/// GPS packet
pub const TAG_GPS: u8 = 0x24;

/// Photoresistor ADC packet
pub const TAG_PHOTORESISTOR: u8 = 0x2B;

/// Photoresistor calibration range packet (paged) and its request
pub const TAG_CALIB_RANGE: u8 = 0x46;

/// Power and particle detector packet
pub const TAG_POWER: u8 = 0x56;

/// Page byte marking a CalibRange frame as a request rather than data
pub const CALIB_REQUEST_PAGE: u8 = 0xFF;

/// Number of photoresistor channels
pub const PHOTORESISTOR_CHANNELS: usize = 8;

/// Number of CalibRange pages needed to carry all channels
pub const CALIB_PAGES: usize = 3;

/// Channel ranges carried by one full CalibRange page
pub const CALIB_RANGES_PER_PAGE: usize = 3;

/// Full-scale photoresistor ADC reading
pub const ADC_MAX: u16 = 1023;

/// One raw radio frame
pub type Frame = [u8; FRAME_SIZE];

/// Frame types known to the link, keyed by their tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Ping,
    Imu,
    Gps,
    Power,
    Photoresistor,
    CalibRange,
}

/// Tag lookup table; the single source of truth for tag values
pub const PACKET_TABLE: [(u8, PacketKind); 6] = [
    (TAG_PING, PacketKind::Ping),
    (TAG_IMU, PacketKind::Imu),
    (TAG_GPS, PacketKind::Gps),
    (TAG_POWER, PacketKind::Power),
    (TAG_PHOTORESISTOR, PacketKind::Photoresistor),
    (TAG_CALIB_RANGE, PacketKind::CalibRange),
];

impl PacketKind {
    /// Look up a packet kind by its tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        PACKET_TABLE
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, kind)| *kind)
    }

    /// Tag byte written at offset 0
    pub fn tag(self) -> u8 {
        match self {
            PacketKind::Ping => TAG_PING,
            PacketKind::Imu => TAG_IMU,
            PacketKind::Gps => TAG_GPS,
            PacketKind::Power => TAG_POWER,
            PacketKind::Photoresistor => TAG_PHOTORESISTOR,
            PacketKind::CalibRange => TAG_CALIB_RANGE,
        }
    }
}

/// Telemetry classes held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryClass {
    Imu,
    Gps,
    Power,
    Photoresistor,
    CalibRange,
}

/// Three-axis sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Inertial and environment telemetry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ImuRecord {
    /// Barometric pressure in Pa
    pub pressure: f64,

    /// Temperature in °C
    pub temperature: f64,

    /// Angular rate
    pub gyro: Vector3,

    /// Acceleration
    pub accel: Vector3,

    /// Magnetic field in mGauss
    pub mag: Vector3,

    /// Sender uptime in ms when the reading was taken
    pub timestamp: u32,
}

/// GPS fix
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GpsRecord {
    /// Latitude in degrees
    pub latitude: f32,

    /// Longitude in degrees
    pub longitude: f32,

    /// Altitude in meters
    pub altitude: f32,

    /// Azimuth in degrees
    pub azimuth: f32,

    /// Ground speed in km/h
    pub speed: i16,

    /// UTC date and time of the fix
    pub datetime: PackedDatetime,

    /// Sender uptime in ms when the fix was taken
    pub timestamp: u32,
}

/// Power rails and particle detector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PowerRecord {
    pub detection_count: u32,
    pub sync_timestamp: u32,
    pub main_voltage: f32,
    pub battery_voltage: f32,
    pub solar_voltage: f32,
}

/// Raw photoresistor ADC readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PhotoresistorRecord {
    pub adc: [u16; PHOTORESISTOR_CHANNELS],
    pub timestamp: u32,
}

/// Measurement range of one photoresistor channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChannelRange {
    pub min: f32,
    pub max: f32,
}

impl ChannelRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// One page of the photoresistor calibration table
///
/// The page number is always 1 to [`CALIB_PAGES`]; build pages with
/// [`CalibPage::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibPage {
    pub(super) page: u8,

    /// Ranges carried by this page; only the first `ranges_on_page(page)` are meaningful
    pub ranges: [ChannelRange; CALIB_RANGES_PER_PAGE],
}

impl CalibPage {
    /// Page with the given number, or `None` if it is not a data page
    pub fn new(page: u8, ranges: [ChannelRange; CALIB_RANGES_PER_PAGE]) -> Option<Self> {
        Self::is_valid_page(page).then_some(Self { page, ranges })
    }

    /// Page number, 1 to [`CALIB_PAGES`]
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Index of the first channel this page carries
    ///
    /// Page 0 maps to channel 0.
    pub fn first_channel(page: u8) -> usize {
        usize::from(page.saturating_sub(1)) * CALIB_RANGES_PER_PAGE
    }

    /// Number of channel ranges a page carries (3, 3, 2); 0 past the last page
    pub fn ranges_on_page(page: u8) -> usize {
        let first = Self::first_channel(page);
        PHOTORESISTOR_CHANNELS.saturating_sub(first).min(CALIB_RANGES_PER_PAGE)
    }

    /// Whether `page` is a valid data page number
    pub fn is_valid_page(page: u8) -> bool {
        (1..=CALIB_PAGES as u8).contains(&page)
    }
}

/// Decoded frame contents
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    Ping,
    Imu(ImuRecord),
    Gps(GpsRecord),
    Power(PowerRecord),
    Photoresistor(PhotoresistorRecord),
    CalibPage(CalibPage),
    CalibRequest,
}

impl Packet {
    /// Frame kind this packet is carried in
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Ping => PacketKind::Ping,
            Packet::Imu(_) => PacketKind::Imu,
            Packet::Gps(_) => PacketKind::Gps,
            Packet::Power(_) => PacketKind::Power,
            Packet::Photoresistor(_) => PacketKind::Photoresistor,
            Packet::CalibPage(_) | Packet::CalibRequest => PacketKind::CalibRange,
        }
    }
}

/// Write the low `width` bytes of `value` little-endian at `offset`
pub fn write_le(frame: &mut Frame, offset: usize, width: usize, value: u32) {
    let bytes = value.to_le_bytes();
    frame[offset..offset + width].copy_from_slice(&bytes[..width]);
}

/// Read `width` little-endian bytes at `offset` as an unsigned integer
pub fn read_le(frame: &Frame, offset: usize, width: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes[..width].copy_from_slice(&frame[offset..offset + width]);
    u32::from_le_bytes(bytes)
}

pub fn write_u16(frame: &mut Frame, offset: usize, value: u16) {
    frame[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u16(frame: &Frame, offset: usize) -> u16 {
    u16::from_le_bytes([frame[offset], frame[offset + 1]])
}

pub fn write_u32(frame: &mut Frame, offset: usize, value: u32) {
    frame[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u32(frame: &Frame, offset: usize) -> u32 {
    u32::from_le_bytes([
        frame[offset],
        frame[offset + 1],
        frame[offset + 2],
        frame[offset + 3],
    ])
}

pub fn write_f32(frame: &mut Frame, offset: usize, value: f32) {
    frame[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_f32(frame: &Frame, offset: usize) -> f32 {
    f32::from_bits(read_u32(frame, offset))
}
