//! # Packed GPS Date and Time
//!
//! Bit layout of the 32-bit little-endian word (LSB first):
//!
//! | Bits | Field | Range |
//! |------|-------|-------|
//! | 0-5 | year since 2000 | 0-63 |
//! | 6-9 | month | 1-12 |
//! | 10-14 | day | 1-31 |
//! | 15-19 | hour | 0-23 |
//! | 20-25 | minute | 0-59 |
//! | 26-31 | second | 0-59 |

use serde::Serialize;

const YEAR_SHIFT: u32 = 0;
const MONTH_SHIFT: u32 = 6;
const DAY_SHIFT: u32 = 10;
const HOUR_SHIFT: u32 = 15;
const MINUTE_SHIFT: u32 = 20;
const SECOND_SHIFT: u32 = 26;

const YEAR_MASK: u32 = 0x3F;
const MONTH_MASK: u32 = 0x0F;
const DAY_MASK: u32 = 0x1F;
const HOUR_MASK: u32 = 0x1F;
const MINUTE_MASK: u32 = 0x3F;
const SECOND_MASK: u32 = 0x3F;

/// Year offset applied to the 6-bit year field
pub const YEAR_BASE: u16 = 2000;

/// UTC date and time as reported by the GPS receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PackedDatetime {
    /// Years since 2000
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl PackedDatetime {
    pub fn new(year: u8, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Pack into the 32-bit wire word; each field is masked to its bit width
    pub fn encode(&self) -> u32 {
        ((self.year as u32 & YEAR_MASK) << YEAR_SHIFT)
            | ((self.month as u32 & MONTH_MASK) << MONTH_SHIFT)
            | ((self.day as u32 & DAY_MASK) << DAY_SHIFT)
            | ((self.hour as u32 & HOUR_MASK) << HOUR_SHIFT)
            | ((self.minute as u32 & MINUTE_MASK) << MINUTE_SHIFT)
            | ((self.second as u32 & SECOND_MASK) << SECOND_SHIFT)
    }

    /// Unpack the 32-bit wire word
    pub fn decode(value: u32) -> Self {
        Self {
            year: ((value >> YEAR_SHIFT) & YEAR_MASK) as u8,
            month: ((value >> MONTH_SHIFT) & MONTH_MASK) as u8,
            day: ((value >> DAY_SHIFT) & DAY_MASK) as u8,
            hour: ((value >> HOUR_SHIFT) & HOUR_MASK) as u8,
            minute: ((value >> MINUTE_SHIFT) & MINUTE_MASK) as u8,
            second: ((value >> SECOND_SHIFT) & SECOND_MASK) as u8,
        }
    }

    /// Calendar year
    pub fn full_year(&self) -> u16 {
        YEAR_BASE + self.year as u16
    }

    /// Build from a chrono timestamp; `None` if the year does not fit 6 bits
    pub fn from_chrono<T: chrono::Datelike + chrono::Timelike>(t: &T) -> Option<Self> {
        let year = t.year() - YEAR_BASE as i32;
        if !(0..=YEAR_MASK as i32).contains(&year) {
            return None;
        }

        Some(Self {
            year: year as u8,
            month: t.month() as u8,
            day: t.day() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second().min(59) as u8,
        })
    }
}
