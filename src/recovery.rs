//! Recovery trigger: blank the outputs and reboot into USB boot mode
//!
//! The button edge only wakes the recovery task; the GPIO interrupt itself
//! does no work. The task asks every consumer to halt, gives the consumers a
//! bounded time to blank their outputs (each consumer owns its peripheral),
//! then hands control to the boot ROM. Nothing resumes afterwards.

use embassy_time::{with_timeout, Duration, Instant};
use embedded_hal_async::digital::Wait;
use heapless::Vec;

use crate::channels::ConsumerLink;
use crate::config::MAX_CONSUMERS;

/// Suspend the calling task forever
pub async fn park() -> ! {
    loop {
        core::future::pending::<()>().await;
    }
}

/// Irreversible transfer to the boot loader
pub trait BootHandoff {
    fn enter_boot_mode(&mut self) -> !;
}

/// Outcome of the halt handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HaltReport {
    /// Consumers asked to halt
    pub requested: usize,
    /// Consumers that confirmed their output is blank
    pub parked: usize,
}

impl HaltReport {
    pub fn complete(&self) -> bool {
        self.parked == self.requested
    }
}

pub struct RecoveryTrigger<'a> {
    links: Vec<&'a ConsumerLink, MAX_CONSUMERS>,
}

impl<'a> RecoveryTrigger<'a> {
    pub fn new(links: &[&'a ConsumerLink]) -> Self {
        let mut trigger = Self { links: Vec::new() };
        for link in links {
            if trigger.links.push(*link).is_err() {
                warn!("Recovery: link table full, ignoring {:?}", link.consumer());
            }
        }
        trigger
    }

    /// Halt every consumer and wait up to `timeout` for all of them to park
    pub async fn halt_outputs(&self, timeout: Duration) -> HaltReport {
        for link in &self.links {
            link.request_halt();
        }

        let deadline = Instant::now() + timeout;
        let mut parked = 0;
        for link in &self.links {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match with_timeout(remaining, link.wait_parked()).await {
                Ok(()) => parked += 1,
                Err(_) => warn!("Recovery: {:?} did not park in time", link.consumer()),
            }
        }

        HaltReport {
            requested: self.links.len(),
            parked,
        }
    }

    /// Blank the outputs and enter boot mode
    pub async fn fire<B: BootHandoff>(&self, handoff: &mut B, timeout: Duration) -> ! {
        let report = self.halt_outputs(timeout).await;
        info!(
            "Recovery: {}/{} outputs blanked, entering USB boot",
            report.parked, report.requested
        );
        handoff.enter_boot_mode()
    }

    /// Wait for the button's falling edge, then fire
    pub async fn watch<W, B>(&self, mut button: W, mut handoff: B, timeout: Duration) -> !
    where
        W: Wait,
        B: BootHandoff,
    {
        info!("Recovery trigger armed");

        loop {
            match button.wait_for_falling_edge().await {
                Ok(()) => break,
                Err(_) => warn!("Recovery button wait failed, re-arming"),
            }
        }

        info!("Recovery button pressed");
        self.fire(&mut handoff, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Event;
    use crate::types::Consumer;
    use embassy_futures::block_on;
    use embassy_futures::join::join3;

    async fn cooperative_consumer(link: &ConsumerLink) {
        assert_eq!(link.next_event().await, Event::Halt);
        link.acknowledge_halt();
    }

    #[test]
    fn halt_waits_for_every_consumer() {
        let display = ConsumerLink::new(Consumer::Display);
        let matrix = ConsumerLink::new(Consumer::Matrix);
        let trigger = RecoveryTrigger::new(&[&display, &matrix]);

        let (report, _, _) = block_on(join3(
            trigger.halt_outputs(Duration::from_millis(250)),
            cooperative_consumer(&display),
            cooperative_consumer(&matrix),
        ));

        assert_eq!(report, HaltReport { requested: 2, parked: 2 });
        assert!(report.complete());
        assert!(display.is_halted() && matrix.is_halted());
    }

    #[test]
    fn unresponsive_consumer_is_bounded_by_timeout() {
        let display = ConsumerLink::new(Consumer::Display);
        let stuck = ConsumerLink::new(Consumer::Buzzer);
        let trigger = RecoveryTrigger::new(&[&display, &stuck]);

        let start = Instant::now();
        let (report, _, _) = block_on(join3(
            trigger.halt_outputs(Duration::from_millis(50)),
            cooperative_consumer(&display),
            async {},
        ));

        assert_eq!(report, HaltReport { requested: 2, parked: 1 });
        assert!(!report.complete());
        assert!(Instant::now() - start >= Duration::from_millis(50));
    }

    #[test]
    fn links_beyond_capacity_are_not_halted() {
        let links: std::vec::Vec<ConsumerLink> = (0..MAX_CONSUMERS + 1)
            .map(|_| ConsumerLink::new(Consumer::Display))
            .collect();
        let refs: std::vec::Vec<&ConsumerLink> = links.iter().collect();
        let trigger = RecoveryTrigger::new(&refs);

        let report = block_on(trigger.halt_outputs(Duration::from_millis(10)));
        assert_eq!(report.requested, MAX_CONSUMERS);
        assert!(!links[MAX_CONSUMERS].is_halted());
    }
}
