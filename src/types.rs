//! Common types and data structures used across the RainWatch application
//!
//! This module contains the sensor reading record and the identifiers shared
//! by the producer, the consumers and the supervisor.

use crate::config::ADC_MAX;
use crate::error::{Error, Result};

/// The two analog axes of the sensor board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Axis A: rain intensity (joystick X, ADC1)
    Rain,
    /// Axis B: water level (joystick Y, ADC0)
    Level,
}

/// One sampled pair of analog values
///
/// Readings are produced once per sampling period and copied by value into
/// every consumer queue. Both values are guaranteed to be within the 12-bit
/// converter range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    rain: u16,
    level: u16,
}

impl Reading {
    /// Build a reading, rejecting values above the converter full scale
    pub fn new(rain: u16, level: u16) -> Result<Self> {
        if rain > ADC_MAX {
            return Err(Error::SensorFault { axis: Axis::Rain, raw: rain });
        }
        if level > ADC_MAX {
            return Err(Error::SensorFault { axis: Axis::Level, raw: level });
        }
        Ok(Self { rain, level })
    }

    /// Raw rain value (axis A)
    pub const fn rain(&self) -> u16 {
        self.rain
    }

    /// Raw water level value (axis B)
    pub const fn level(&self) -> u16 {
        self.level
    }

    pub const fn axis(&self, axis: Axis) -> u16 {
        match axis {
            Axis::Rain => self.rain,
            Axis::Level => self.level,
        }
    }
}

/// Consumer tasks fed by the reading bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Consumer {
    /// OLED status screen
    Display,
    /// Bicolor indicator, or the rain LED in the split variant
    Indicator,
    /// Water level LED (split variant only)
    AuxIndicator,
    /// 5x5 pictogram matrix
    Matrix,
    /// Piezo alarm
    Buzzer,
}

impl Consumer {
    pub const ALL: [Consumer; 5] = [
        Consumer::Display,
        Consumer::Indicator,
        Consumer::AuxIndicator,
        Consumer::Matrix,
        Consumer::Buzzer,
    ];

    /// Slot of this consumer in link tables
    pub const fn index(self) -> usize {
        match self {
            Consumer::Display => 0,
            Consumer::Indicator => 1,
            Consumer::AuxIndicator => 2,
            Consumer::Matrix => 3,
            Consumer::Buzzer => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Consumer::Display => "display",
            Consumer::Indicator => "indicator",
            Consumer::AuxIndicator => "aux-indicator",
            Consumer::Matrix => "matrix",
            Consumer::Buzzer => "buzzer",
        }
    }
}

/// Application version information
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl AppVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }
}

/// Current application version
pub const APP_VERSION: AppVersion = AppVersion::new(0, 1, 0);
