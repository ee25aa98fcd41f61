//! Alarm policy shared by every consumer
//!
//! All outputs classify readings through this module so they can never
//! disagree about a boundary value.

use crate::config::{ADC_MAX, LEVEL_ALARM_THRESHOLD, RAIN_ALARM_THRESHOLD};
use crate::types::{Axis, Reading};

/// Inclusive per-axis alarm thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmPolicy {
    pub rain_threshold: u16,
    pub level_threshold: u16,
}

impl AlarmPolicy {
    /// Thresholds compiled into the firmware
    pub const DEFAULT: AlarmPolicy = AlarmPolicy {
        rain_threshold: RAIN_ALARM_THRESHOLD,
        level_threshold: LEVEL_ALARM_THRESHOLD,
    };

    pub const fn threshold(&self, axis: Axis) -> u16 {
        match axis {
            Axis::Rain => self.rain_threshold,
            Axis::Level => self.level_threshold,
        }
    }

    /// Alarm decision for a single axis
    pub const fn axis_alarm(&self, reading: &Reading, axis: Axis) -> bool {
        reading.axis(axis) >= self.threshold(axis)
    }

    /// Alarm if either axis reaches its threshold
    pub const fn evaluate(&self, reading: &Reading) -> bool {
        self.axis_alarm(reading, Axis::Rain) || self.axis_alarm(reading, Axis::Level)
    }
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Alarm decision with the firmware thresholds
pub const fn evaluate_alarm(reading: &Reading) -> bool {
    AlarmPolicy::DEFAULT.evaluate(reading)
}

/// Scale a raw 12-bit value to a truncated 0..=100 percentage
pub const fn percent(raw: u16) -> u8 {
    let raw = if raw > ADC_MAX { ADC_MAX } else { raw };
    (raw as u32 * 100 / ADC_MAX as u32) as u8
}
