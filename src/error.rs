//! Error types for RainWatch
//!
//! Sensor and queue errors are recoverable and only logged by the task that
//! sees them. Peripheral initialisation errors are fatal and stop the firmware
//! before any consumer starts.

use crate::types::{Axis, Consumer};

/// Peripherals that must come up before the task graph starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Display,
    Buzzer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Sampled value outside the 12-bit range
    SensorFault { axis: Axis, raw: u16 },
    /// The ADC reported a conversion error
    AdcConversion { axis: Axis },
    /// A consumer queue was full and the newest reading was dropped
    QueueOverflow { consumer: Consumer },
    /// Startup failure, fatal
    PeripheralInit(Peripheral),
    /// The OLED rejected a command or frame
    Display,
    /// The executor had no room for a task
    Spawn,
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(feature = "rp2040")]
impl From<embassy_executor::SpawnError> for Error {
    fn from(_: embassy_executor::SpawnError) -> Self {
        Error::Spawn
    }
}
