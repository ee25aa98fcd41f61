//! Application supervisor and monitoring
//!
//! Prints the startup banner and periodically reports uptime and
//! per-consumer queue health.

use embassy_time::{Duration, Timer};

use crate::channels::link;
use crate::config::{self, SUPERVISOR_REPORT_SECS, SUPERVISOR_TICK_SECS};
use crate::types::{Consumer, APP_VERSION};
use crate::variant::Variant;

/// Delivery counters for one consumer at report time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerHealth {
    pub consumer: Consumer,
    pub delivered: u32,
    pub dropped: u32,
    pub pending: usize,
}

impl ConsumerHealth {
    pub fn collect(consumer: Consumer) -> Self {
        let link = link(consumer);
        Self {
            consumer,
            delivered: link.delivered(),
            dropped: link.dropped(),
            pending: link.pending(),
        }
    }
}

/// Application supervisor responsible for monitoring and lifecycle management
pub struct AppSupervisor {
    variant: Variant,
    uptime_seconds: u32,
    last_heartbeat: u32,
}

impl AppSupervisor {
    pub fn new_for_variant(variant: Variant) -> Self {
        Self {
            variant,
            uptime_seconds: 0,
            last_heartbeat: 0,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Print application startup banner with variant information
    pub fn print_startup_banner(&self) {
        info!("========================================");
        info!(
            "RainWatch v{}.{}.{}",
            APP_VERSION.major, APP_VERSION.minor, APP_VERSION.patch
        );
        info!("Rain and water-level monitor");
        info!("========================================");
        info!("Hardware: RP2040 (BitDogLab)");
        info!("Variant: {}", self.variant.name());
        info!(
            "Sampling: every {} ms, {} consumers",
            config::SAMPLE_PERIOD_MS,
            self.variant.consumer_count()
        );
        info!(
            "Alarm: rain >= {} or level >= {}",
            config::RAIN_ALARM_THRESHOLD,
            config::LEVEL_ALARM_THRESHOLD
        );
        info!("========================================");
    }

    pub fn print_init_success(&self) {
        info!("RainWatch initialized successfully");
        info!("Press the recovery button to enter USB boot");
    }

    /// Run the main supervisor loop
    pub async fn run(&mut self) -> ! {
        info!("Application supervisor started");

        loop {
            Timer::after(Duration::from_secs(SUPERVISOR_TICK_SECS)).await;
            self.tick(SUPERVISOR_TICK_SECS as u32);
        }
    }

    /// Advance uptime; returns true when a status report was printed
    pub fn tick(&mut self, elapsed_seconds: u32) -> bool {
        self.uptime_seconds = self.uptime_seconds.saturating_add(elapsed_seconds);

        if self.uptime_seconds - self.last_heartbeat >= SUPERVISOR_REPORT_SECS {
            self.print_status();
            self.last_heartbeat = self.uptime_seconds;
            true
        } else {
            false
        }
    }

    fn print_status(&self) {
        let minutes = self.uptime_seconds / 60;
        let hours = minutes / 60;
        let remaining_minutes = minutes % 60;

        if hours > 0 {
            info!("Status: Uptime {}h{}m", hours, remaining_minutes);
        } else {
            info!("Status: Uptime {}m", minutes);
        }

        for health in self.health() {
            if health.dropped > 0 {
                warn!(
                    "  {}: delivered={} dropped={} pending={}",
                    health.consumer.name(),
                    health.delivered,
                    health.dropped,
                    health.pending
                );
            } else {
                info!(
                    "  {}: delivered={} pending={}",
                    health.consumer.name(),
                    health.delivered,
                    health.pending
                );
            }
        }
    }

    /// Counters for every consumer of the running variant
    pub fn health(&self) -> impl Iterator<Item = ConsumerHealth> + '_ {
        self.variant
            .consumers()
            .iter()
            .map(|consumer| ConsumerHealth::collect(*consumer))
    }

    /// Get current uptime in seconds
    pub fn uptime(&self) -> u32 {
        self.uptime_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_minute() {
        let mut supervisor = AppSupervisor::new_for_variant(Variant::Bicolor);
        let reports: usize = (0..12).filter(|_| supervisor.tick(10)).count();
        assert_eq!(reports, 2);
        assert_eq!(supervisor.uptime(), 120);
    }

    #[test]
    fn health_covers_variant_consumers() {
        let supervisor = AppSupervisor::new_for_variant(Variant::SplitLeds);
        let consumers: std::vec::Vec<Consumer> = supervisor.health().map(|h| h.consumer).collect();
        assert_eq!(consumers, Consumer::ALL);
    }
}
