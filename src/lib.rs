//! RainWatch - Rain and Water-Level Monitor for RP2040
//!
//! This library provides the sensing and alarm firmware for a BitDogLab style
//! RP2040 board using the Embassy async framework.
//!
//! ## Outputs
//! - SSD1306 OLED status screen (128x64, I2C)
//! - Red/green indicator LEDs (single bicolor task or one task per LED)
//! - 5x5 WS2812 matrix pictogram (alert / check)
//! - Piezo buzzer alarm (PWM)
//!
//! ## Architecture
//! - **Producer**: one sampler task reading two ADC channels every 100 ms
//! - **Fan-out**: every consumer owns a bounded queue fed by the [`channels::ReadingBus`]
//! - **Shared policy**: all consumers decide alarms through [`alarm::evaluate_alarm`]
//! - **Recovery**: the button edge wakes a task that blanks outputs and enters USB boot
//! - **Variants**: compile-time program selection through [`variant::Variant`]

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod buzzer;
pub mod channels;
pub mod config;
pub mod display;
pub mod error;
pub mod indicator;
pub mod matrix;
pub mod recovery;
pub mod sampler;
pub mod supervisor;
pub mod types;
pub mod variant;

#[cfg(feature = "rp2040")]
pub mod hardware;

pub use error::{Error, Result};

#[cfg(feature = "rp2040")]
use embassy_rp::{bind_interrupts, peripherals};

// Interrupt bindings - shared by all binaries
#[cfg(feature = "rp2040")]
bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => embassy_rp::adc::InterruptHandler;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<peripherals::PIO0>;
});
