//! # Telemetry Store
//!
//! Latest value per telemetry class. One slot per class, last write wins,
//! no history. All writes go through [`TelemetryStore::apply`]; readers get
//! zero-valued records for classes that were never populated.

use serde::Serialize;

use crate::packet::protocol::*;

/// Assembled photoresistor calibration table
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CalibTable {
    pub ranges: [ChannelRange; PHOTORESISTOR_CHANNELS],

    /// Bit `n - 1` set once page `n` has been received
    pub pages_received: u8,
}

impl CalibTable {
    const ALL_PAGES: u8 = (1 << CALIB_PAGES) - 1;

    /// Build a complete table from all eight ranges
    pub fn from_ranges(ranges: [ChannelRange; PHOTORESISTOR_CHANNELS]) -> Self {
        Self {
            ranges,
            pages_received: Self::ALL_PAGES,
        }
    }

    /// Merge one received page
    pub fn apply_page(&mut self, page: &CalibPage) {
        let number = page.page();
        let first = CalibPage::first_channel(number);
        let count = CalibPage::ranges_on_page(number);
        self.ranges[first..first + count].copy_from_slice(&page.ranges[..count]);
        self.pages_received |= 1 << (number - 1);
    }

    /// Whether every page has been received
    pub fn is_complete(&self) -> bool {
        self.pages_received & Self::ALL_PAGES == Self::ALL_PAGES
    }

    /// Map a raw ADC reading of `channel` onto its calibrated range
    ///
    /// Linear map of `0..=ADC_MAX` onto `[min, max]`.
    pub fn calibrate(&self, channel: usize, adc: u16) -> f32 {
        let range = self.ranges[channel];
        adc as f32 / ADC_MAX as f32 * (range.max - range.min) + range.min
    }
}

/// Snapshot of one telemetry class
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record {
    Imu(ImuRecord),
    Gps(GpsRecord),
    Power(PowerRecord),
    Photoresistor(PhotoresistorRecord),
    CalibRange(CalibTable),
}

/// Process-wide telemetry state, owned by the node and passed by reference
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetryStore {
    imu: ImuRecord,
    gps: GpsRecord,
    power: PowerRecord,
    photoresistor: PhotoresistorRecord,
    calibration: CalibTable,
}

impl TelemetryStore {
    /// Create a store with every class zero-valued
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a decoded packet
    ///
    /// Returns the class that changed, or `None` for control packets
    /// (ping, calibration request) that carry no telemetry.
    pub fn apply(&mut self, packet: &Packet) -> Option<TelemetryClass> {
        match packet {
            Packet::Imu(imu) => {
                self.imu = *imu;
                Some(TelemetryClass::Imu)
            }
            Packet::Gps(gps) => {
                self.gps = *gps;
                Some(TelemetryClass::Gps)
            }
            Packet::Power(power) => {
                self.power = *power;
                Some(TelemetryClass::Power)
            }
            Packet::Photoresistor(pht) => {
                self.photoresistor = *pht;
                Some(TelemetryClass::Photoresistor)
            }
            Packet::CalibPage(page) => {
                self.calibration.apply_page(page);
                Some(TelemetryClass::CalibRange)
            }
            Packet::Ping | Packet::CalibRequest => None,
        }
    }

    /// Latest value of a class, zero-valued if never populated
    pub fn latest(&self, class: TelemetryClass) -> Record {
        match class {
            TelemetryClass::Imu => Record::Imu(self.imu),
            TelemetryClass::Gps => Record::Gps(self.gps),
            TelemetryClass::Power => Record::Power(self.power),
            TelemetryClass::Photoresistor => Record::Photoresistor(self.photoresistor),
            TelemetryClass::CalibRange => Record::CalibRange(self.calibration),
        }
    }

    pub fn imu(&self) -> &ImuRecord {
        &self.imu
    }

    pub fn gps(&self) -> &GpsRecord {
        &self.gps
    }

    pub fn power(&self) -> &PowerRecord {
        &self.power
    }

    pub fn photoresistor(&self) -> &PhotoresistorRecord {
        &self.photoresistor
    }

    pub fn calibration(&self) -> &CalibTable {
        &self.calibration
    }
}
