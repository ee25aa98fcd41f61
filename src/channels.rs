//! Inter-task communication channels
//!
//! The sampler fans every reading out to one bounded queue per consumer, so
//! each output sees readings in order. A full queue drops the newest
//! reading for that consumer only; the sampler never waits. Consumers whose
//! cycle spans several sampling periods skip ahead with
//! [`ConsumerLink::latest`].
//!
//! Each link also carries the halt handshake used by the recovery task.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;
use embassy_time::with_timeout;
use heapless::Vec;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{MAX_CONSUMERS, READING_QUEUE_CAPACITY, STALE_READING_TIMEOUT};
use crate::error::{Error, Result};
use crate::types::{Consumer, Reading};

/// Bounded FIFO of readings for a single consumer
pub type ReadingQueue = Channel<CriticalSectionRawMutex, Reading, READING_QUEUE_CAPACITY>;

/// What a consumer wakes up for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Next reading in FIFO order
    Reading(Reading),
    /// Nothing arrived within the stale timeout
    Stale,
    /// Recovery requested; blank outputs and park
    Halt,
}

// ===================================================================
// Consumer Link
// ===================================================================

/// Queue plus halt handshake owned by one consumer task
pub struct ConsumerLink {
    consumer: Consumer,
    queue: ReadingQueue,
    halted: AtomicBool,
    halt: Signal<CriticalSectionRawMutex, ()>,
    parked: Signal<CriticalSectionRawMutex, ()>,
    delivered: AtomicU32,
    dropped: AtomicU32,
}

impl ConsumerLink {
    pub const fn new(consumer: Consumer) -> Self {
        Self {
            consumer,
            queue: Channel::new(),
            halted: AtomicBool::new(false),
            halt: Signal::new(),
            parked: Signal::new(),
            delivered: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    pub fn consumer(&self) -> Consumer {
        self.consumer
    }

    /// Enqueue without waiting; a full queue keeps its contents
    pub fn offer(&self, reading: Reading) -> Result<()> {
        match self.queue.try_send(reading) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(Error::QueueOverflow { consumer: self.consumer })
            }
        }
    }

    /// Wait for the next reading, a stale timeout or a halt request
    pub async fn next_event(&self) -> Event {
        if self.is_halted() {
            return Event::Halt;
        }

        match select(
            self.halt.wait(),
            with_timeout(STALE_READING_TIMEOUT, self.queue.receive()),
        )
        .await
        {
            Either::First(()) => Event::Halt,
            Either::Second(Ok(reading)) => Event::Reading(reading),
            Either::Second(Err(_)) => Event::Stale,
        }
    }

    /// Drain the queue and return its newest reading, if any
    pub fn latest(&self) -> Option<Reading> {
        let mut newest = None;
        let mut skipped = 0u32;
        while let Ok(reading) = self.queue.try_receive() {
            if newest.replace(reading).is_some() {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("{:?}: skipped {} queued readings", self.consumer, skipped);
        }
        newest
    }

    /// Ask the consumer to blank its output and stop
    pub fn request_halt(&self) {
        self.halted.store(true, Ordering::Release);
        self.halt.signal(());
    }

    /// Resolve once a halt has been requested
    pub async fn halted(&self) {
        if !self.is_halted() {
            self.halt.wait().await;
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Called by the consumer once its output is blank
    pub fn acknowledge_halt(&self) {
        self.parked.signal(());
    }

    pub async fn wait_parked(&self) {
        self.parked.wait().await
    }

    /// Readings currently waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// One link per consumer slot, indexed by [`Consumer::index`]
pub static LINKS: [ConsumerLink; MAX_CONSUMERS] = [
    ConsumerLink::new(Consumer::Display),
    ConsumerLink::new(Consumer::Indicator),
    ConsumerLink::new(Consumer::AuxIndicator),
    ConsumerLink::new(Consumer::Matrix),
    ConsumerLink::new(Consumer::Buzzer),
];

pub fn link(consumer: Consumer) -> &'static ConsumerLink {
    &LINKS[consumer.index()]
}

// ===================================================================
// Reading Bus
// ===================================================================

/// Result of fanning one reading out to every attached consumer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

/// Fan-out from the sampler to the consumer links of one variant
pub struct ReadingBus<'a> {
    links: Vec<&'a ConsumerLink, MAX_CONSUMERS>,
}

impl<'a> ReadingBus<'a> {
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    /// Build a bus over the given links; extra links beyond the capacity are ignored
    pub fn with_links(links: &[&'a ConsumerLink]) -> Self {
        let mut bus = Self::new();
        for link in links {
            if bus.links.push(*link).is_err() {
                warn!("Reading bus full, ignoring {:?}", link.consumer());
            }
        }
        bus
    }

    pub fn links(&self) -> &[&'a ConsumerLink] {
        &self.links
    }

    /// Offer a reading to every link without blocking
    pub fn publish(&self, reading: Reading) -> Delivery {
        let mut delivery = Delivery::default();
        for link in &self.links {
            match link.offer(reading) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    debug!("Dropped reading: {:?}", e);
                    delivery.dropped += 1;
                }
            }
        }
        delivery
    }
}

impl Default for ReadingBus<'_> {
    fn default() -> Self {
        Self::new()
    }
}
