//! `DateTime` conversion and register utilities for the DS3231 RTC.
//!
//! This module provides the internal representation and conversion logic for the DS3231's date and time registers.
//! It converts between the seven BCD-encoded registers and chrono's `NaiveDateTime`.
//!
//! # Register Model
//!
//! The DS3231 stores date and time in 7 consecutive registers:
//! - Seconds, Minutes, Hours, Day, Date, Month, Year
//!
//! The day-of-week register is always written from the calendar date and is
//! never read back: chrono derives the weekday from the date itself. Bit 7 of
//! the month register is the century flag; it is honored on read but this
//! driver only writes years 2000-2099 and leaves it clear.
//!
//! # Error Handling
//!
//! Conversion errors are reported via [`DS3231DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::{bcd, Date, Day, Hours, Minutes, Month, RegAddr, Seconds, Year};

/// Internal representation of the DS3231 RTC date and time.
///
/// This struct models the 7 date/time registers of the DS3231, using strongly-typed bitfield wrappers for each field.
/// It is used for register-level I/O and conversion to/from chrono's `NaiveDateTime`.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct DS3231DateTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    day: Day,
    date: Date,
    month: Month,
    year: Year,
}

/// Decodes one BCD field, tagging failures with the register they came from.
fn field(register: RegAddr, bcd: u8) -> Result<u32, DS3231DateTimeError> {
    bcd::decode(bcd)
        .map(u32::from)
        .map_err(|bcd::InvalidBcd(value)| DS3231DateTimeError::CorruptRegister { register, value })
}

/// Range-checks `value` and packs it as BCD.
fn to_bcd(value: u32, max_value: u32) -> Result<u8, DS3231DateTimeError> {
    if value > max_value {
        return Err(DS3231DateTimeError::InvalidDateTime);
    }
    let value = u8::try_from(value).map_err(|_| DS3231DateTimeError::InvalidDateTime)?;
    Ok(bcd::encode(value))
}

impl DS3231DateTime {
    fn convert_year(year: i32) -> Result<Year, DS3231DateTimeError> {
        if year > 2099 {
            error!("Year {} is too late! must be before 2100", year);
            return Err(DS3231DateTimeError::YearNotBefore2100);
        }
        if year < 2000 {
            error!("Year {} is too early! must be greater than 1999", year);
            return Err(DS3231DateTimeError::YearNotAfter1999);
        }
        let offset = u8::try_from(year - 2000).map_err(|_| DS3231DateTimeError::InvalidDateTime)?;
        let mut value = Year::default();
        value.set_bcd(bcd::encode(offset));
        Ok(value)
    }

    /// Encodes `datetime` as 24-hour register values with a freshly computed weekday.
    pub(crate) fn from_datetime(datetime: &NaiveDateTime) -> Result<Self, DS3231DateTimeError> {
        let year = Self::convert_year(datetime.year())?;

        let mut seconds = Seconds::default();
        seconds.set_bcd(to_bcd(datetime.second(), 59)?);
        let mut minutes = Minutes::default();
        minutes.set_bcd(to_bcd(datetime.minute(), 59)?);
        let hours = Hours(bcd::encode_hour(datetime.hour() as u8));
        let mut day = Day::default();
        day.set_day(datetime.weekday().num_days_from_sunday() as u8);
        let mut date = Date::default();
        date.set_bcd(to_bcd(datetime.day(), 31)?);
        let mut month = Month::default();
        month.set_bcd(to_bcd(datetime.month(), 12)?);

        let raw = DS3231DateTime {
            seconds,
            minutes,
            hours,
            day,
            date,
            month,
            year,
        };

        debug!("raw={:?}", raw);

        Ok(raw)
    }

    /// Decodes the registers, ignoring the stored day of week.
    pub(crate) fn into_datetime(self) -> Result<NaiveDateTime, DS3231DateTimeError> {
        let seconds = field(RegAddr::Seconds, self.seconds.bcd())?;
        let minutes = field(RegAddr::Minutes, self.minutes.bcd())?;
        let hours = bcd::decode_hour(self.hours.0)
            .map(u32::from)
            .map_err(|bcd::InvalidBcd(value)| DS3231DateTimeError::CorruptRegister {
                register: RegAddr::Hours,
                value,
            })?;
        let date = field(RegAddr::Date, self.date.bcd())?;
        let month = field(RegAddr::Month, self.month.bcd())?;
        let year_offset = field(RegAddr::Year, self.year.bcd())?;
        let century_offset = if self.month.century() { 100 } else { 0 };
        let year = 2000_i32
            + i32::try_from(year_offset + century_offset)
                .map_err(|_| DS3231DateTimeError::InvalidDateTime)?;

        debug!(
            "decoded {}-{}-{} {}:{}:{}",
            year, month, date, hours, minutes, seconds
        );

        NaiveDate::from_ymd_opt(year, month, date)
            .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
            .ok_or(DS3231DateTimeError::InvalidDateTime)
    }
}

impl From<[u8; 7]> for DS3231DateTime {
    fn from(data: [u8; 7]) -> Self {
        DS3231DateTime {
            seconds: Seconds(data[0]),
            minutes: Minutes(data[1]),
            hours: Hours(data[2]),
            day: Day(data[3]),
            date: Date(data[4]),
            month: Month(data[5]),
            year: Year(data[6]),
        }
    }
}

impl From<&DS3231DateTime> for [u8; 7] {
    fn from(dt: &DS3231DateTime) -> [u8; 7] {
        [
            dt.seconds.0,
            dt.minutes.0,
            dt.hours.0,
            dt.day.0,
            dt.date.0,
            dt.month.0,
            dt.year.0,
        ]
    }
}

/// Errors that can occur during DS3231 date/time conversion or validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DS3231DateTimeError {
    /// The provided or decoded date/time is not a valid calendar value
    InvalidDateTime,
    /// The year is not before 2100 (the driver writes years 2000-2099 only)
    YearNotBefore2100,
    /// The year is not after 1999 (DS3231 only supports years >= 2000)
    YearNotAfter1999,
    /// A register held a digit above 9
    CorruptRegister {
        /// Register the byte was read from
        register: RegAddr,
        /// Raw register contents
        value: u8,
    },
}
