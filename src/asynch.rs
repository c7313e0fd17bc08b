//! Async implementation of the DS3231 driver.
//!
//! Mirrors [`crate::DS3231`] operation for operation on top of
//! `embedded-hal-async`. Only available with the `async` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds3231_regs::asynch::DS3231;
//!
//! let mut rtc = DS3231::new(i2c, ds3231_regs::DEFAULT_ADDRESS);
//! rtc.force_temperature_conversion_blocking(100).await?;
//! let temp = rtc.temperature().await?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal_async::i2c::I2c;
use paste::paste;

use crate::{
    AgingOffset, AlarmFlags, AlarmOne, AlarmTwo, Config, Control, DS3231Alarm1, DS3231Alarm2,
    DS3231DateTime, DS3231Error, Oscillator, RegAddr, Register, SquareWaveFrequency,
    SquareWavePinMode, Status, Temperature, MAX_BURST,
};

/// DS3231 Real-Time Clock async driver.
pub struct DS3231<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> DS3231<I2C> {
    /// Creates a new DS3231 async driver instance.
    ///
    /// # Arguments
    /// * `i2c` - The async I2C bus implementation
    /// * `address` - The I2C address of the device (typically [`crate::DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    async fn read_registers<const N: usize>(
        &mut self,
        start: RegAddr,
    ) -> Result<[u8; N], DS3231Error<I2C::Error>> {
        let mut data = [0; N];
        self.i2c
            .write_read(self.address, &[start as u8], &mut data)
            .await?;
        Ok(data)
    }

    async fn write_registers(
        &mut self,
        start: RegAddr,
        data: &[u8],
    ) -> Result<(), DS3231Error<I2C::Error>> {
        let mut buf = [0; MAX_BURST + 1];
        buf[0] = start as u8;
        buf[1..=data.len()].copy_from_slice(data);
        self.i2c.write(self.address, &buf[..=data.len()]).await?;
        Ok(())
    }

    /// Reads a single register.
    pub async fn read_register<R: Register>(&mut self) -> Result<R, DS3231Error<I2C::Error>> {
        let [value] = self.read_registers::<1>(R::ADDR).await?;
        Ok(R::from(value))
    }

    /// Writes a single register.
    pub async fn write_register<R: Register>(
        &mut self,
        value: R,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        self.write_registers(R::ADDR, &[value.into()]).await
    }

    /// Read-modify-write of a single register; see [`crate::DS3231::modify_register`].
    pub async fn modify_register<R: Register, T>(
        &mut self,
        f: impl FnOnce(&mut R) -> T,
    ) -> Result<T, DS3231Error<I2C::Error>> {
        let mut value = self.read_register::<R>().await?;
        let result = f(&mut value);
        self.write_register(value).await?;
        Ok(result)
    }

    /// Applies `config` to the control register.
    pub async fn configure(&mut self, config: &Config) -> Result<(), DS3231Error<I2C::Error>> {
        debug!("DS3231: configure {:?}", config);
        self.modify_register(|control: &mut Control| config.apply(control))
            .await
    }

    /// Whether the stored date/time can be trusted (OSF clear).
    pub async fn is_datetime_valid(&mut self) -> Result<bool, DS3231Error<I2C::Error>> {
        Ok(!self.status().await?.oscillator_stop_flag())
    }

    /// Whether the oscillator is enabled.
    pub async fn is_running(&mut self) -> Result<bool, DS3231Error<I2C::Error>> {
        Ok(self.control().await?.oscillator_enable() == Oscillator::Enabled)
    }

    /// Enables or disables the oscillator.
    pub async fn set_running(&mut self, running: bool) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|control: &mut Control| {
            control.set_oscillator_enable(if running {
                Oscillator::Enabled
            } else {
                Oscillator::Disabled
            });
        })
        .await
    }

    /// Gets the current date and time from the device.
    pub async fn datetime(&mut self) -> Result<NaiveDateTime, DS3231Error<I2C::Error>> {
        let raw = DS3231DateTime::from(self.read_registers::<7>(RegAddr::Seconds).await?);
        raw.into_datetime().map_err(DS3231Error::DateTime)
    }

    /// Gets the current date and time unless the oscillator stop flag is set.
    pub async fn trusted_datetime(&mut self) -> Result<NaiveDateTime, DS3231Error<I2C::Error>> {
        if !self.is_datetime_valid().await? {
            return Err(DS3231Error::TimeNotTrustworthy);
        }
        self.datetime().await
    }

    /// Sets the date and time and clears the oscillator stop flag.
    ///
    /// See [`crate::DS3231::set_datetime`] for retrying after a bus error.
    pub async fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        let raw = DS3231DateTime::from_datetime(datetime).map_err(DS3231Error::DateTime)?;
        self.modify_register(|status: &mut Status| status.set_oscillator_stop_flag(false))
            .await?;
        let data: [u8; 7] = (&raw).into();
        self.write_registers(RegAddr::Seconds, &data).await
    }

    /// Reads the temperature registers.
    pub async fn temperature(&mut self) -> Result<Temperature, DS3231Error<I2C::Error>> {
        let data = self.read_registers::<2>(RegAddr::TemperatureMsb).await?;
        Ok(Temperature::from(data))
    }

    /// Enables or disables the 32kHz output pin.
    pub async fn enable_32khz_output(
        &mut self,
        enable: bool,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|status: &mut Status| status.set_enable_32khz_output(enable))
            .await
    }

    /// Selects what the INT/SQW pin outputs.
    pub async fn set_square_wave_pin_mode(
        &mut self,
        mode: SquareWavePinMode,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        debug!("DS3231: square wave pin mode {:?}", mode);
        self.modify_register(|control: &mut Control| mode.apply(control))
            .await
    }

    /// Selects the square wave frequency.
    pub async fn set_square_wave_frequency(
        &mut self,
        frequency: SquareWaveFrequency,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|control: &mut Control| {
            control.set_square_wave_frequency(frequency);
        })
        .await
    }

    /// Reads the alarm 1 registers.
    pub async fn alarm_one(&mut self) -> Result<AlarmOne, DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm1::from(self.read_registers::<4>(RegAddr::Alarm1Seconds).await?);
        raw.into_alarm().map_err(DS3231Error::Alarm)
    }

    /// Writes the alarm 1 registers.
    pub async fn set_alarm_one(&mut self, alarm: &AlarmOne) -> Result<(), DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm1::from_alarm(alarm).map_err(DS3231Error::Alarm)?;
        let data: [u8; 4] = (&raw).into();
        self.write_registers(RegAddr::Alarm1Seconds, &data).await
    }

    /// Reads the alarm 2 registers.
    pub async fn alarm_two(&mut self) -> Result<AlarmTwo, DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm2::from(self.read_registers::<3>(RegAddr::Alarm2Minutes).await?);
        raw.into_alarm().map_err(DS3231Error::Alarm)
    }

    /// Writes the alarm 2 registers.
    pub async fn set_alarm_two(&mut self, alarm: &AlarmTwo) -> Result<(), DS3231Error<I2C::Error>> {
        let raw = DS3231Alarm2::from_alarm(alarm).map_err(DS3231Error::Alarm)?;
        let data: [u8; 3] = (&raw).into();
        self.write_registers(RegAddr::Alarm2Minutes, &data).await
    }

    /// Returns which alarms have fired and clears their flags.
    pub async fn latch_alarms_triggered_flags(
        &mut self,
    ) -> Result<AlarmFlags, DS3231Error<I2C::Error>> {
        self.modify_register(AlarmFlags::latch).await
    }

    /// Starts a temperature conversion and returns without waiting.
    pub async fn force_temperature_conversion(&mut self) -> Result<(), DS3231Error<I2C::Error>> {
        self.modify_register(|control: &mut Control| control.set_convert_temperature(true))
            .await
    }

    /// Starts a temperature conversion and polls up to `max_polls` times for
    /// it to finish.
    pub async fn force_temperature_conversion_blocking(
        &mut self,
        max_polls: u32,
    ) -> Result<(), DS3231Error<I2C::Error>> {
        self.force_temperature_conversion().await?;
        for poll in 0..max_polls {
            if !self.control().await?.convert_temperature() {
                debug!("DS3231: conversion done after {} polls", poll + 1);
                return Ok(());
            }
            trace!("DS3231: conversion busy, poll {}", poll);
        }
        error!("DS3231: conversion still busy after {} polls", max_polls);
        Err(DS3231Error::ConversionTimeout)
    }

    /// Reads the aging offset.
    pub async fn aging_offset(&mut self) -> Result<i8, DS3231Error<I2C::Error>> {
        Ok(self.read_register::<AgingOffset>().await?.aging_offset())
    }

    /// Writes the aging offset.
    pub async fn set_aging_offset(&mut self, offset: i8) -> Result<(), DS3231Error<I2C::Error>> {
        let mut value = AgingOffset::default();
        value.set_aging_offset(offset);
        self.write_register(value).await
    }
}

macro_rules! impl_register_access {
    ($(($name:ident, $typ:ty)),+) => {
        impl<I2C: I2c> DS3231<I2C> {
            $(
                paste! {
                    #[doc = concat!("Gets the value of the ", stringify!($name), " register.")]
                    pub async fn $name(&mut self) -> Result<$typ, DS3231Error<I2C::Error>> {
                        self.read_register::<$typ>().await
                    }

                    #[doc = concat!("Sets the value of the ", stringify!($name), " register.")]
                    pub async fn [<set_ $name>](&mut self, value: $typ) -> Result<(), DS3231Error<I2C::Error>> {
                        self.write_register(value).await
                    }
                }
            )+
        }
    }
}

impl_register_access!((control, Control), (status, Status));

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use crate::{AlarmTwoControl, DEFAULT_ADDRESS};
    use alloc::vec;
    use chrono::NaiveDate;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = DEFAULT_ADDRESS;

    fn setup_mock(expectations: &[I2cTrans]) -> DS3231<I2cMock> {
        DS3231::new(I2cMock::new(expectations), DEVICE_ADDRESS)
    }

    fn read(reg: RegAddr, response: &[u8]) -> I2cTrans {
        I2cTrans::write_read(DEVICE_ADDRESS, vec![reg as u8], response.to_vec())
    }

    fn write(reg: RegAddr, data: &[u8]) -> I2cTrans {
        let mut bytes = vec![reg as u8];
        bytes.extend_from_slice(data);
        I2cTrans::write(DEVICE_ADDRESS, bytes)
    }

    #[tokio::test]
    async fn test_datetime_roundtrip() {
        let dt = NaiveDate::from_ymd_opt(2023, 12, 25)
            .unwrap()
            .and_hms_opt(18, 5, 9)
            .unwrap();
        let bytes = [0x09, 0x05, 0x18, 0x01, 0x25, 0x12, 0x23];
        let mut dev = setup_mock(&[
            read(RegAddr::Status, &[0x80]),
            write(RegAddr::Status, &[0x00]),
            write(RegAddr::Seconds, &bytes),
            read(RegAddr::Status, &[0x00]),
            read(RegAddr::Seconds, &bytes),
        ]);
        dev.set_datetime(&dt).await.unwrap();
        assert_eq!(dev.trusted_datetime().await.unwrap(), dt);
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_untrusted_datetime() {
        let mut dev = setup_mock(&[read(RegAddr::Status, &[0x88])]);
        assert_eq!(
            dev.trusted_datetime().await,
            Err(DS3231Error::TimeNotTrustworthy)
        );
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_temperature() {
        let mut dev = setup_mock(&[read(RegAddr::TemperatureMsb, &[0xF6, 0xC0])]);
        assert_eq!(dev.temperature().await.unwrap().centi_degrees(), -925);
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_latch_alarm_flags() {
        let mut dev = setup_mock(&[
            read(RegAddr::Status, &[0x0B]),
            write(RegAddr::Status, &[0x08]),
            read(RegAddr::Status, &[0x08]),
            write(RegAddr::Status, &[0x08]),
        ]);
        let flags = dev.latch_alarms_triggered_flags().await.unwrap();
        assert!(flags.alarm1 && flags.alarm2);
        assert!(!dev.latch_alarms_triggered_flags().await.unwrap().any());
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_conversion_timeout() {
        let mut dev = setup_mock(&[
            read(RegAddr::Control, &[0x1C]),
            write(RegAddr::Control, &[0x3C]),
            read(RegAddr::Control, &[0x3C]),
            read(RegAddr::Control, &[0x3C]),
        ]);
        assert_eq!(
            dev.force_temperature_conversion_blocking(2).await,
            Err(DS3231Error::ConversionTimeout)
        );
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_conversion_completes() {
        let mut dev = setup_mock(&[
            read(RegAddr::Control, &[0x1C]),
            write(RegAddr::Control, &[0x3C]),
            read(RegAddr::Control, &[0x1C]),
        ]);
        dev.force_temperature_conversion_blocking(10).await.unwrap();
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_square_wave_and_running() {
        let mut dev = setup_mock(&[
            read(RegAddr::Control, &[0x1C]),
            write(RegAddr::Control, &[0x1D]),
            read(RegAddr::Control, &[0x1D]),
            write(RegAddr::Control, &[0x0D]),
            read(RegAddr::Control, &[0x0D]),
            write(RegAddr::Control, &[0x8D]),
            read(RegAddr::Control, &[0x8D]),
        ]);
        dev.set_square_wave_pin_mode(SquareWavePinMode::AlarmOne)
            .await
            .unwrap();
        dev.set_square_wave_frequency(SquareWaveFrequency::Hz1024)
            .await
            .unwrap();
        dev.set_running(false).await.unwrap();
        assert!(!dev.is_running().await.unwrap());
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_alarm_two_and_aging_offset() {
        let alarm = AlarmTwo {
            day_of: 0,
            hour: 0,
            minute: 0,
            control: AlarmTwoControl::ONCE_PER_MINUTE,
        };
        let mut dev = setup_mock(&[
            write(RegAddr::Alarm2Minutes, &[0x80, 0x80, 0x80]),
            read(RegAddr::Alarm2Minutes, &[0x80, 0x80, 0x80]),
            read(RegAddr::AgingOffset, &[0x7F]),
            write(RegAddr::AgingOffset, &[0xFF]),
        ]);
        dev.set_alarm_two(&alarm).await.unwrap();
        assert_eq!(dev.alarm_two().await.unwrap(), alarm);
        assert_eq!(dev.aging_offset().await.unwrap(), 127);
        dev.set_aging_offset(-1).await.unwrap();
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_bus_error() {
        let mut dev = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Control as u8],
            vec![0],
        )
        .with_error(ErrorKind::Other)]);
        assert_eq!(
            dev.is_running().await,
            Err(DS3231Error::I2c(ErrorKind::Other))
        );
        dev.i2c.done();
    }
}
