//! Sensor sampling task
//!
//! Reads both analog axes every sample period, assembles a [`Reading`] and
//! fans it out through the [`ReadingBus`]. Publishing never waits: consumers
//! that fall behind lose the newest readings, the sampler keeps its period.

use embassy_time::{Duration, Ticker};

use crate::channels::{Delivery, ReadingBus};
use crate::config::SAMPLE_PERIOD_MS;
use crate::error::Result;
use crate::types::{Axis, Reading};

/// Two-channel analog input polled on demand
#[allow(async_fn_in_trait)]
pub trait AnalogSource {
    /// Raw 12-bit conversion for one axis
    async fn read(&mut self, axis: Axis) -> Result<u16>;
}

pub struct Sampler<S> {
    source: S,
    samples: u32,
    faults: u32,
}

impl<S: AnalogSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            samples: 0,
            faults: 0,
        }
    }

    /// Read both axes into one reading
    pub async fn sample(&mut self) -> Result<Reading> {
        let level = self.source.read(Axis::Level).await?;
        let rain = self.source.read(Axis::Rain).await?;
        Reading::new(rain, level)
    }

    /// One sampling period: sample and publish, skipping faulty samples
    pub async fn step(&mut self, bus: &ReadingBus<'_>) -> Option<Delivery> {
        match self.sample().await {
            Ok(reading) => {
                self.samples = self.samples.wrapping_add(1);
                trace!("Sample rain={} level={}", reading.rain(), reading.level());
                Some(bus.publish(reading))
            }
            Err(e) => {
                self.faults = self.faults.wrapping_add(1);
                warn!("Sensor fault: {:?} ({} total)", e, self.faults);
                None
            }
        }
    }

    /// Sample forever at the configured period
    pub async fn run(mut self, bus: ReadingBus<'_>) -> ! {
        info!(
            "Sampler started: {} ms period, {} consumers",
            SAMPLE_PERIOD_MS,
            bus.links().len()
        );

        let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_PERIOD_MS));
        loop {
            self.step(&bus).await;
            ticker.next().await;
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn faults(&self) -> u32 {
        self.faults
    }
}
