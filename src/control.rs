//! Control and status register operations.
//!
//! These are the pure halves of the driver's read-modify-write operations:
//! each takes the current register value and changes only the bits it owns.

use crate::{Control, InterruptControl, Oscillator, SquareWaveFrequency, Status};

/// Device configuration applied by `configure`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub square_wave_frequency: SquareWaveFrequency,
    pub interrupt_control: InterruptControl,
    pub battery_backed_square_wave: bool,
    pub oscillator_enable: Oscillator,
}

impl Config {
    pub(crate) fn apply(&self, control: &mut Control) {
        control.set_oscillator_enable(self.oscillator_enable);
        control.set_battery_backed_square_wave(self.battery_backed_square_wave);
        control.set_square_wave_frequency(self.square_wave_frequency);
        control.set_interrupt_control(self.interrupt_control);
    }
}

/// What the INT/SQW pin outputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWavePinMode {
    /// Pin idle: interrupt mode with both alarm interrupts disabled
    None,
    /// Square wave, kept running on battery power
    BatteryBackup,
    /// Square wave while on main power
    Clock,
    /// Interrupt on alarm 1
    AlarmOne,
    /// Interrupt on alarm 2
    AlarmTwo,
    /// Interrupt on either alarm
    AlarmBoth,
}

impl SquareWavePinMode {
    /// Rewrites the INTCN, BBSQW, A1IE and A2IE bits of `control` for this mode.
    pub fn apply(self, control: &mut Control) {
        control.set_alarm1_interrupt_enable(false);
        control.set_alarm2_interrupt_enable(false);
        control.set_battery_backed_square_wave(false);
        control.set_interrupt_control(InterruptControl::Interrupt);

        match self {
            SquareWavePinMode::None => {}
            SquareWavePinMode::BatteryBackup => {
                control.set_battery_backed_square_wave(true);
                control.set_interrupt_control(InterruptControl::SquareWave);
            }
            SquareWavePinMode::Clock => {
                control.set_interrupt_control(InterruptControl::SquareWave);
            }
            SquareWavePinMode::AlarmOne => control.set_alarm1_interrupt_enable(true),
            SquareWavePinMode::AlarmTwo => control.set_alarm2_interrupt_enable(true),
            SquareWavePinMode::AlarmBoth => {
                control.set_alarm1_interrupt_enable(true);
                control.set_alarm2_interrupt_enable(true);
            }
        }
    }
}

/// Alarm-triggered flags captured by `latch_alarms_triggered_flags`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmFlags {
    pub alarm1: bool,
    pub alarm2: bool,
}

impl AlarmFlags {
    /// Takes A1F and A2F out of `status`, leaving them cleared.
    pub(crate) fn latch(status: &mut Status) -> Self {
        let flags = AlarmFlags {
            alarm1: status.alarm1_flag(),
            alarm2: status.alarm2_flag(),
        };
        status.set_alarm1_flag(false);
        status.set_alarm2_flag(false);
        flags
    }

    /// True when either alarm fired.
    #[must_use]
    pub fn any(&self) -> bool {
        self.alarm1 || self.alarm2
    }
}
