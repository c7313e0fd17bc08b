//! Temperature readings from the DS3231's on-die sensor.

use crate::{TemperatureLsb, TemperatureMsb};

/// A temperature reading with quarter-degree resolution.
///
/// The value is `degrees + quarters * 0.25` °C. The fraction is always added,
/// so a reading of -10 degrees and 3 quarters is -9.25 °C.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature {
    degrees: i8,
    quarters: u8,
}

impl Temperature {
    /// Whole degrees Celsius as stored in the MSB register.
    #[must_use]
    pub fn degrees(&self) -> i8 {
        self.degrees
    }

    /// Quarter degrees (0-3) to add to [`Temperature::degrees`].
    #[must_use]
    pub fn quarters(&self) -> u8 {
        self.quarters
    }

    /// Fractional part in hundredths of a degree (0, 25, 50 or 75).
    #[must_use]
    pub fn fraction_centi(&self) -> u8 {
        self.quarters * 25
    }

    /// The full reading in hundredths of a degree Celsius.
    #[must_use]
    pub fn centi_degrees(&self) -> i16 {
        i16::from(self.degrees) * 100 + i16::from(self.fraction_centi())
    }

    /// The full reading in degrees Celsius.
    #[cfg(feature = "temperature_f32")]
    #[must_use]
    pub fn as_f32(&self) -> f32 {
        f32::from(self.degrees) + f32::from(self.quarters) * 0.25
    }
}

impl From<[u8; 2]> for Temperature {
    fn from(data: [u8; 2]) -> Self {
        let msb = TemperatureMsb(data[0]);
        let lsb = TemperatureLsb(data[1]);
        Temperature {
            degrees: msb.degrees(),
            quarters: lsb.quarters(),
        }
    }
}
