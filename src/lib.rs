//! Register-level driver for the DS3231 precision real-time clock.
//!
//! The DS3231 keeps calendar time, two alarms, a programmable square-wave
//! output and a temperature sensor behind a small set of I²C registers. This
//! crate converts between those packed BCD/bitfield registers and typed
//! values, validating everything it reads back from the chip.
//!
//! # Features
//!
//! - `async`: adds [`asynch::DS3231`], built on `embedded-hal-async`
//! - `log` / `defmt`: debug logging through the respective crate
//! - `temperature_f32`: [`Temperature::as_f32`]
//!
//! # Example
//!
//! ```rust,ignore
//! use ds3231_regs::{DS3231, DEFAULT_ADDRESS, SquareWavePinMode};
//!
//! let mut rtc = DS3231::new(i2c, DEFAULT_ADDRESS);
//! if !rtc.is_datetime_valid()? {
//!     rtc.set_datetime(&compile_time)?;
//! }
//! rtc.set_square_wave_pin_mode(SquareWavePinMode::AlarmOne)?;
//! let now = rtc.datetime()?;
//! let temp = rtc.temperature()?;
//! ```
#![no_std]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        #[allow(unused_macros)]
        macro_rules! debug { ($($arg:tt)*) => { defmt::debug!($($arg)*) }; }
        #[allow(unused_macros)]
        macro_rules! error { ($($arg:tt)*) => { defmt::error!($($arg)*) }; }
        #[allow(unused_macros)]
        macro_rules! trace { ($($arg:tt)*) => { defmt::trace!($($arg)*) }; }
    } else if #[cfg(feature = "log")] {
        #[allow(unused_macros)]
        macro_rules! debug { ($($arg:tt)*) => { log::debug!($($arg)*) }; }
        #[allow(unused_macros)]
        macro_rules! error { ($($arg:tt)*) => { log::error!($($arg)*) }; }
        #[allow(unused_macros)]
        macro_rules! trace { ($($arg:tt)*) => { log::trace!($($arg)*) }; }
    } else {
        #[allow(unused_macros)]
        macro_rules! debug { ($($arg:tt)*) => {}; }
        #[allow(unused_macros)]
        macro_rules! error { ($($arg:tt)*) => {}; }
        #[allow(unused_macros)]
        macro_rules! trace { ($($arg:tt)*) => {}; }
    }
}

mod alarm;
#[cfg(feature = "async")]
pub mod asynch;
pub mod bcd;
mod control;
mod datetime;
mod registers;
mod temperature;

use chrono::NaiveDateTime;
use embedded_hal::i2c::I2c;
use paste::paste;

pub use alarm::{AlarmError, AlarmOne, AlarmOneControl, AlarmTwo, AlarmTwoControl};
pub use control::{AlarmFlags, Config, SquareWavePinMode};
pub use datetime::DS3231DateTimeError;
pub use registers::*;
pub use temperature::Temperature;

pub(crate) use alarm::{DS3231Alarm1, DS3231Alarm2};
pub(crate) use datetime::DS3231DateTime;

/// Fixed I²C address of the DS3231.
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Longest burst the driver writes (the date/time block).
const MAX_BURST: usize = 7;

/// Errors returned by the DS3231 drivers.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DS3231Error<I2CE> {
    /// The I²C transaction failed
    I2c(I2CE),
    /// Date/time could not be encoded or decoded
    DateTime(DS3231DateTimeError),
    /// Alarm could not be encoded or decoded
    Alarm(AlarmError),
    /// CONV did not clear within the allowed number of polls
    ConversionTimeout,
    /// The oscillator stop flag is set, so the stored time is not usable
    TimeNotTrustworthy,
}

impl<I2CE> From<I2CE> for DS3231Error<I2CE> {
    fn from(e: I2CE) -> Self {
        DS3231Error::I2c(e)
    }
}

impl<I2CE> DS3231Error<I2CE> {
    /// The register and raw byte behind a corrupt-data error, if this is one.
    pub fn corrupt_register(&self) -> Option<(RegAddr, u8)> {
        match self {
            DS3231Error::DateTime(DS3231DateTimeError::CorruptRegister { register, value })
            | DS3231Error::Alarm(AlarmError::CorruptRegister { register, value }) => {
                Some((*register, *value))
            }
            _ => None,
        }
    }
}

/// DS3231 Real-Time Clock driver.
///
/// Holds only the bus and the device address; every call is one or two
/// complete register transactions.
pub struct DS3231<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> DS3231<I2C> {
    /// Creates a new DS3231 driver instance.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation, already initialised
    /// * `address` - The I2C address of the device (typically [`DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    fn read_registers<const N: usize>(
        &mut self,
        start: RegAddr,
    ) -> Result<[u8; N], DS3231Error<I2C::Error>> {
        let mut data = [0; N];
        self.i2c
            .write_read(self.address, &[start as u8], &mut data)?;
        Ok(data)
    }

    fn write_registers(
        &mut self,
        start: RegAddr,
        data: &[u8],
    ) -> Result<(), DS3231Error<I2C::Error>> {
        let mut buf = [0; MAX_BURST + 1];
        buf[0] = start as u8;
        buf[1..=data.len()].copy_from_slice(data);
        self.i2c.write(self.address, &buf[..=data.len()])?;
        Ok(())
    }

    /// Reads a single register.
    pub fn read_register<R: Register>(&mut self) -> Result<R, DS3231Error<I2C::Error>> {
        let [value] = self.read_registers::<1>(R::ADDR)?;
        Ok(R::from(value))
    }

    /// Writes a single register.
    pub fn write_register<R: Register>(&mut self, value: R) -> Result<(), DS3231Error<I2C::Error>> {
        self.write_registers(R::ADDR, &[value.into()])
    }

    /// Read-modify-write of a single register.
    ///
    /// `f` sees the current register value; whatever it leaves behind is
    /// written back in full. Returns what `f` returns.
    pub fn modify_register<R: Register, T>(
        &mut self,
        f: impl FnOnce(&mut R) -> T,
    ) -> Result<T, DS3231Error<I2C::Error>> {
        let mut value = self.read_register::<R>()?;
        let result = f(&mut value);
        self.write_register(value)?;
        Ok(result)
    }

    /// Applies `config` to the control register, leaving CONV and the alarm
    /// interrupt enables untouched.
    pub fn configure(&mut self, config: &Config) -> Result<(), DS3231Error<I2C::Error>> {
        debug!("DS3231: configure {:?}", config);
        self.modify_register(|control: &mut Control| config.apply(control))
    }

    /// Whether the stored date/time can be trusted (OSF clear).
    pub fn is_datetime_valid(&mut self) -> Result<bool, DS3231Error<I2C::Error>> {
        Ok(!self.status()?.oscillator_stop_flag())
    }

    /// Whether the oscillator is enabled (EOSC clear).
    pub fn is_running(&mut self) -> Result<bool, DS3231Error<I2C::Error>> {
        Ok(self.control()?.oscillator_enable() == Oscillator::Enabled)
    }

    /// Enables or disables the oscillator.
    pub fn set_running(&mut self, running: bool) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|control: &mut Control| {
            control.set_oscillator_enable(if running {
                Oscillator::Enabled
            } else {
                Oscillator::Disabled
            });
        })
    }

    /// Gets the current date and time from the device.
    ///
    /// The chip's day-of-week register is ignored.
    pub fn datetime(&mut self) -> Result<NaiveDateTime, DS3231Error<I2C::Error>> {
        let raw = DS3231DateTime::from(self.read_registers::<7>(RegAddr::Seconds)?);
        raw.into_datetime().map_err(DS3231Error::DateTime)
    }

    /// Gets the current date and time, failing with
    /// [`DS3231Error::TimeNotTrustworthy`] if the oscillator has stopped since
    /// the time was last set.
    pub fn trusted_datetime(&mut self) -> Result<NaiveDateTime, DS3231Error<I2C::Error>> {
        if !self.is_datetime_valid()? {
            return Err(DS3231Error::TimeNotTrustworthy);
        }
        self.datetime()
    }

    /// Sets the date and time (years 2000-2099) and clears the oscillator
    /// stop flag.
    ///
    /// OSF is cleared before the time registers are written. If this returns
    /// [`DS3231Error::I2c`], the time may not have been stored even though
    /// [`DS3231::is_datetime_valid`] now reports true, so retry the call.
    pub fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), DS3231Error<I2C::Error>> {
        let raw = DS3231DateTime::from_datetime(datetime).map_err(DS3231Error::DateTime)?;
        self.modify_register(|status: &mut Status| status.set_oscillator_stop_flag(false))?;
        let data: [u8; 7] = (&raw).into();
        self.write_registers(RegAddr::Seconds, &data)
    }

    /// Reads the temperature registers.
    pub fn temperature(&mut self) -> Result<Temperature, DS3231Error<I2C::Error>> {
        let data = self.read_registers::<2>(RegAddr::TemperatureMsb)?;
        Ok(Temperature::from(data))
    }

    /// Enables or disables the 32kHz output pin.
    pub fn enable_32khz_output(&mut self, enable: bool) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|status: &mut Status| status.set_enable_32khz_output(enable))
    }

    /// Selects what the INT/SQW pin outputs.
    pub fn set_square_wave_pin_mode(
        &mut self,
        mode: SquareWavePinMode,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        debug!("DS3231: square wave pin mode {:?}", mode);
        self.modify_register(|control: &mut Control| mode.apply(control))
    }

    /// Selects the square wave frequency, leaving all other control bits alone.
    pub fn set_square_wave_frequency(
        &mut self,
        frequency: SquareWaveFrequency,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|control: &mut Control| {
            control.set_square_wave_frequency(frequency);
        })
    }

    /// Reads the alarm 1 registers.
    pub fn alarm_one(&mut self) -> Result<AlarmOne, DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm1::from(self.read_registers::<4>(RegAddr::Alarm1Seconds)?);
        raw.into_alarm().map_err(DS3231Error::Alarm)
    }

    /// Writes the alarm 1 registers.
    pub fn set_alarm_one(&mut self, alarm: &AlarmOne) -> Result<(), DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm1::from_alarm(alarm).map_err(DS3231Error::Alarm)?;
        let data: [u8; 4] = (&raw).into();
        self.write_registers(RegAddr::Alarm1Seconds, &data)
    }

    /// Reads the alarm 2 registers.
    pub fn alarm_two(&mut self) -> Result<AlarmTwo, DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm2::from(self.read_registers::<3>(RegAddr::Alarm2Minutes)?);
        raw.into_alarm().map_err(DS3231Error::Alarm)
    }

    /// Writes the alarm 2 registers.
    pub fn set_alarm_two(&mut self, alarm: &AlarmTwo) -> Result<(), DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm2::from_alarm(alarm).map_err(DS3231Error::Alarm)?;
        let data: [u8; 3] = (&raw).into();
        self.write_registers(RegAddr::Alarm2Minutes, &data)
    }

    /// Returns which alarms have fired and clears their flags.
    ///
    /// A flag is reported once; a second call returns it clear unless the
    /// alarm has fired again in between.
    pub fn latch_alarms_triggered_flags(&mut self) -> Result<AlarmFlags, DS3231Error<I2C::Error>> {
        self.modify_register(AlarmFlags::latch)
    }

    /// Starts a temperature conversion and returns without waiting.
    pub fn force_temperature_conversion(&mut self) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|control: &mut Control| control.set_convert_temperature(true))
    }

    /// Starts a temperature conversion and polls the control register up to
    /// `max_polls` times for CONV to clear.
    ///
    /// # Errors
    /// [`DS3231Error::ConversionTimeout`] if CONV is still set after the last poll.
    pub fn force_temperature_conversion_blocking(
        &mut self,
        max_polls: u32,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        self.force_temperature_conversion()?;
        for poll in 0..max_polls {
            if !self.control()?.convert_temperature() {
                debug!("DS3231: conversion done after {} polls", poll + 1);
                return Ok(());
            }
            trace!("DS3231: conversion busy, poll {}", poll);
        }
        error!("DS3231: conversion still busy after {} polls", max_polls);
        Err(DS3231Error::ConversionTimeout)
    }

    /// Reads the aging offset.
    pub fn aging_offset(&mut self) -> Result<i8, DS3231Error<I2C::Error>> {
        Ok(self.read_register::<AgingOffset>()?.aging_offset())
    }

    /// Writes the aging offset.
    pub fn set_aging_offset(&mut self, offset: i8) -> Result<(), DS3231Error<I2C::Error>> {
        let mut value = AgingOffset::default();
        value.set_aging_offset(offset);
        self.write_register(value)
    }
}

// Raw register accessors
macro_rules! impl_register_access {
    ($(($name:ident, $typ:ty)),+) => {
        impl<I2C: I2c> DS3231<I2C> {
            $(
                paste! {
                    #[doc = concat!("Gets the value of the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, DS3231Error<I2C::Error>> {
                        self.read_register::<$typ>()
                    }

                    #[doc = concat!("Sets the value of the ", stringify!($name), " register.")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), DS3231Error<I2C::Error>> {
                        self.write_register(value)
                    }
                }
            )+
        }
    }
}

impl_register_access!((control, Control), (status, Status));
