//! Program variants
//!
//! Both firmware images share the sampler, display, matrix and buzzer. They
//! differ only in how the red and green LEDs are driven.

use crate::types::Consumer;

/// Compile-time program selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// One indicator task: red on alarm, green otherwise
    Bicolor,
    /// Red LED follows rain, green LED follows water level
    SplitLeds,
}

/// How the indicator LEDs are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorMode {
    /// Mutually exclusive red/green
    Bicolor,
    /// Independent per-axis LEDs
    PerAxis,
}

const BICOLOR_CONSUMERS: [Consumer; 4] = [
    Consumer::Display,
    Consumer::Indicator,
    Consumer::Matrix,
    Consumer::Buzzer,
];

const SPLIT_CONSUMERS: [Consumer; 5] = Consumer::ALL;

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Bicolor => "Bicolor indicator",
            Variant::SplitLeds => "Split rain/level LEDs",
        }
    }

    /// Consumers fed by the reading bus, in spawn order
    pub fn consumers(&self) -> &'static [Consumer] {
        match self {
            Variant::Bicolor => &BICOLOR_CONSUMERS,
            Variant::SplitLeds => &SPLIT_CONSUMERS,
        }
    }

    pub fn indicator_mode(&self) -> IndicatorMode {
        match self {
            Variant::Bicolor => IndicatorMode::Bicolor,
            Variant::SplitLeds => IndicatorMode::PerAxis,
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers().len()
    }

    pub fn has_consumer(&self, consumer: Consumer) -> bool {
        self.consumers().contains(&consumer)
    }
}
