//! Packed binary-coded-decimal helpers for the DS3231 time registers.
//!
//! Every time and calendar register on the DS3231 stores two decimal digits,
//! tens in the high nibble and units in the low nibble. The hour registers
//! additionally carry a 12/24-hour select bit and an AM/PM bit.

use crate::{Hours, TimeRepresentation};

/// A register byte that does not hold valid BCD (a nibble above 9).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidBcd(pub u8);

/// Packs `value` into BCD.
///
/// Only the low tens digit survives for values above 99, mirroring the width
/// of the hardware register.
#[must_use]
pub const fn encode(value: u8) -> u8 {
    (((value / 10) % 10) << 4) | (value % 10)
}

/// Unpacks a BCD byte, rejecting nibbles above 9.
///
/// # Errors
///
/// Returns [`InvalidBcd`] carrying the raw byte when either nibble is not a
/// decimal digit.
pub const fn decode(bcd: u8) -> Result<u8, InvalidBcd> {
    let tens = bcd >> 4;
    let ones = bcd & 0x0F;
    if tens > 9 || ones > 9 {
        return Err(InvalidBcd(bcd));
    }
    Ok(tens * 10 + ones)
}

/// Decodes an hours register into a 0-23 hour.
///
/// Bit 7 is ignored so alarm hour registers can be passed unmasked. In
/// 12-hour mode 12 AM maps to hour 0 and 12 PM to hour 12.
///
/// # Errors
///
/// Returns [`InvalidBcd`] when the hour digits are not BCD.
pub fn decode_hour(raw: u8) -> Result<u8, InvalidBcd> {
    let hours = Hours(raw & 0x7F);
    match hours.time_representation() {
        TimeRepresentation::TwentyFourHour => {
            decode(hours.twenty_four_hour()).map_err(|_| InvalidBcd(raw))
        }
        TimeRepresentation::TwelveHour => {
            let hour = decode(hours.twelve_hour()).map_err(|_| InvalidBcd(raw))?;
            let is_pm = hours.pm();
            Ok(match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            })
        }
    }
}

/// Encodes a 0-23 hour as a 24-hour BCD hours register.
#[must_use]
pub fn encode_hour(hour: u8) -> u8 {
    let mut hours = Hours::default();
    hours.set_time_representation(TimeRepresentation::TwentyFourHour);
    hours.set_twenty_four_hour(encode(hour));
    hours.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_roundtrip() {
        for v in 0..=99u8 {
            assert_eq!(decode(encode(v)), Ok(v), "value {v}");
        }
    }

    #[test]
    fn test_encode_digits() {
        assert_eq!(encode(0), 0x00);
        assert_eq!(encode(9), 0x09);
        assert_eq!(encode(10), 0x10);
        assert_eq!(encode(59), 0x59);
        assert_eq!(encode(99), 0x99);
        // tens digit truncated to the register width
        assert_eq!(encode(123), 0x23);
    }

    #[test]
    fn test_decode_rejects_bad_nibbles() {
        assert_eq!(decode(0x0A), Err(InvalidBcd(0x0A)));
        assert_eq!(decode(0xA0), Err(InvalidBcd(0xA0)));
        assert_eq!(decode(0x6A), Err(InvalidBcd(0x6A)));
        assert_eq!(decode(0xFF), Err(InvalidBcd(0xFF)));
        assert_eq!(decode(0x99), Ok(99));
    }

    #[test]
    fn test_hour_roundtrip() {
        for h in 0..=23u8 {
            let raw = encode_hour(h);
            assert_eq!(raw & 0x40, 0, "24-hour mode never sets bit 6");
            assert_eq!(decode_hour(raw), Ok(h), "hour {h}");
        }
    }

    #[test]
    fn test_encode_hour_bytes() {
        assert_eq!(encode_hour(0), 0x00);
        assert_eq!(encode_hour(9), 0x09);
        assert_eq!(encode_hour(15), 0x15);
        assert_eq!(encode_hour(23), 0x23);
    }

    #[test]
    fn test_decode_twelve_hour() {
        // 0x40 = 12-hour mode, 0x20 = PM
        assert_eq!(decode_hour(0x48), Ok(8)); // 8 AM
        assert_eq!(decode_hour(0x68), Ok(20)); // 8 PM
        assert_eq!(decode_hour(0x51), Ok(11)); // 11 AM
        assert_eq!(decode_hour(0x71), Ok(23)); // 11 PM
        assert_eq!(decode_hour(0x52), Ok(0)); // 12 AM
        assert_eq!(decode_hour(0x72), Ok(12)); // 12 PM
    }

    #[test]
    fn test_decode_hour_ignores_alarm_mask_bit() {
        assert_eq!(decode_hour(0x80 | 0x17), Ok(17));
        assert_eq!(decode_hour(0x80 | 0x62), Ok(14));
    }

    #[test]
    fn test_decode_hour_rejects_bad_nibble() {
        assert_eq!(decode_hour(0x0C), Err(InvalidBcd(0x0C)));
        assert_eq!(decode_hour(0x4B), Err(InvalidBcd(0x4B)));
        assert_eq!(decode_hour(0x8C), Err(InvalidBcd(0x8C)));
    }
}
