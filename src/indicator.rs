//! Indicator LED consumers
//!
//! Two wirings are supported: a single task driving the red and green LEDs in
//! mutual exclusion, or one task per LED where each LED follows one axis.

use embedded_hal::digital::{OutputPin, PinState};

use crate::alarm::AlarmPolicy;
use crate::channels::{ConsumerLink, Event};
use crate::recovery::park;
use crate::types::{Axis, Reading};

/// Lit colour of the bicolor indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorColor {
    Red,
    Green,
}

fn set_line<P: OutputPin>(pin: &mut P, on: bool) {
    // GPIO writes on the RP2040 are infallible
    let _ = pin.set_state(PinState::from(on));
}

// ===================================================================
// Bicolor Indicator
// ===================================================================

/// Red on alarm, green otherwise; never both
pub struct BicolorIndicator<R, G> {
    red: R,
    green: G,
    policy: AlarmPolicy,
}

impl<R: OutputPin, G: OutputPin> BicolorIndicator<R, G> {
    pub fn new(red: R, green: G, policy: AlarmPolicy) -> Self {
        Self { red, green, policy }
    }

    pub fn show(&mut self, alarm: bool) -> IndicatorColor {
        // Switch the lit LED off first so both are never on together
        if alarm {
            set_line(&mut self.green, false);
            set_line(&mut self.red, true);
            IndicatorColor::Red
        } else {
            set_line(&mut self.red, false);
            set_line(&mut self.green, true);
            IndicatorColor::Green
        }
    }

    pub fn handle(&mut self, reading: &Reading) -> IndicatorColor {
        info!("Reading: rain={} level={}", reading.rain(), reading.level());
        self.show(self.policy.evaluate(reading))
    }

    pub fn off(&mut self) {
        set_line(&mut self.red, false);
        set_line(&mut self.green, false);
    }

    pub async fn run(mut self, link: &ConsumerLink) -> ! {
        info!("Indicator task started (bicolor)");

        loop {
            match link.next_event().await {
                Event::Reading(reading) => {
                    self.handle(&reading);
                }
                Event::Stale => warn!("Indicator: no reading received"),
                Event::Halt => {
                    self.off();
                    link.acknowledge_halt();
                    park().await
                }
            }
        }
    }

    pub fn release(self) -> (R, G) {
        (self.red, self.green)
    }
}

// ===================================================================
// Single-Axis Indicator
// ===================================================================

/// One LED lit while its axis is at or above threshold
pub struct AxisIndicator<P> {
    led: P,
    axis: Axis,
    policy: AlarmPolicy,
}

impl<P: OutputPin> AxisIndicator<P> {
    pub fn new(led: P, axis: Axis, policy: AlarmPolicy) -> Self {
        Self { led, axis, policy }
    }

    pub fn handle(&mut self, reading: &Reading) -> bool {
        let on = self.policy.axis_alarm(reading, self.axis);
        debug!("{:?} LED: raw={} on={}", self.axis, reading.axis(self.axis), on);
        set_line(&mut self.led, on);
        on
    }

    pub async fn run(mut self, link: &ConsumerLink) -> ! {
        info!("Indicator task started ({:?} axis)", self.axis);

        loop {
            match link.next_event().await {
                Event::Reading(reading) => {
                    self.handle(&reading);
                }
                Event::Stale => warn!("{:?} indicator: no reading received", self.axis),
                Event::Halt => {
                    set_line(&mut self.led, false);
                    link.acknowledge_halt();
                    park().await
                }
            }
        }
    }

    pub fn release(self) -> P {
        self.led
    }
}
