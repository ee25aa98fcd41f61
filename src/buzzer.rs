//! Piezo buzzer alarm
//!
//! An alarm reading produces one fixed tone pulse followed by a settle
//! period; every reading then ends with a short idle. The buzzer therefore
//! cannot re-trigger faster than settle + idle, even under a continuous
//! alarm.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

use crate::alarm::AlarmPolicy;
use crate::channels::{ConsumerLink, Event};
use crate::config::{
    BUZZER_FREQUENCY_HZ, BUZZER_IDLE, BUZZER_PULSE, BUZZER_SETTLE_STEP, BUZZER_SETTLE_STEPS,
};
use crate::error::{Error, Peripheral, Result};
use crate::recovery::park;
use crate::types::Reading;

/// Audible output
#[allow(async_fn_in_trait)]
pub trait Tone {
    /// Sound `frequency_hz` for `duration`, then go quiet
    async fn pulse(&mut self, frequency_hz: u32, duration: Duration) -> Result<()>;
    /// Stop any tone immediately
    fn silence(&mut self);
}

impl<T: Tone> Tone for &mut T {
    async fn pulse(&mut self, frequency_hz: u32, duration: Duration) -> Result<()> {
        T::pulse(self, frequency_hz, duration).await
    }

    fn silence(&mut self) {
        T::silence(self)
    }
}

// ===================================================================
// PWM Tone Calculation
// ===================================================================

/// Integer clock divider and counter wrap for a square wave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmSetting {
    pub divider: u8,
    pub top: u16,
}

impl PwmSetting {
    /// 50% duty compare level
    pub const fn half_duty(&self) -> u16 {
        self.top / 2
    }
}

/// Smallest integer divider whose wrap value fits the 16-bit counter
pub fn pwm_setting(sys_clk_hz: u32, frequency_hz: u32) -> Option<PwmSetting> {
    if frequency_hz == 0 {
        return None;
    }

    (1..=u8::MAX).find_map(|divider| {
        let ticks = sys_clk_hz / (divider as u32 * frequency_hz);
        if ticks == 0 {
            return None;
        }
        u16::try_from(ticks - 1)
            .ok()
            .map(|top| PwmSetting { divider, top })
    })
}

/// PWM setting for the alarm tone, checked once at startup
pub fn alarm_tone_setting(sys_clk_hz: u32) -> Result<PwmSetting> {
    pwm_setting(sys_clk_hz, BUZZER_FREQUENCY_HZ).ok_or(Error::PeripheralInit(Peripheral::Buzzer))
}

// ===================================================================
// Buzzer Consumer
// ===================================================================

pub struct Siren<T> {
    tone: T,
    policy: AlarmPolicy,
    pulses: u32,
}

impl<T: Tone> Siren<T> {
    pub fn new(tone: T, policy: AlarmPolicy) -> Self {
        Self {
            tone,
            policy,
            pulses: 0,
        }
    }

    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    /// Full cycle for one reading: optional pulse + settle, then idle
    pub async fn handle(&mut self, reading: &Reading) -> Result<bool> {
        let alarm = self.policy.evaluate(reading);

        if alarm {
            self.tone.pulse(BUZZER_FREQUENCY_HZ, BUZZER_PULSE).await?;
            self.pulses = self.pulses.wrapping_add(1);
            for _ in 0..BUZZER_SETTLE_STEPS {
                Timer::after(BUZZER_SETTLE_STEP).await;
            }
        }

        Timer::after(BUZZER_IDLE).await;
        Ok(alarm)
    }

    /// Readings that queue up during a cycle are skipped; each new cycle
    /// acts on the newest one.
    pub async fn run(mut self, link: &ConsumerLink) -> ! {
        info!("Buzzer task started: {} Hz alarm", BUZZER_FREQUENCY_HZ);

        'events: loop {
            let mut reading = match link.next_event().await {
                Event::Reading(reading) => reading,
                Event::Stale => {
                    warn!("Buzzer: no reading received");
                    continue;
                }
                Event::Halt => break,
            };

            loop {
                match select(self.handle(&reading), link.halted()).await {
                    Either::First(Ok(_)) => {}
                    Either::First(Err(e)) => error!("Buzzer pulse failed: {:?}", e),
                    Either::Second(()) => break 'events,
                }
                match link.latest() {
                    Some(newest) => reading = newest,
                    None => break,
                }
            }
        }

        self.tone.silence();
        link.acknowledge_halt();
        park().await
    }
}
