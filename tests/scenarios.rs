//! End-to-end behaviour of the consumers on host fakes

use core::convert::Infallible;

use embassy_futures::block_on;
use embassy_futures::join::{join, join4, join5};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use embedded_hal::digital::{ErrorType, OutputPin};
use smart_leds::RGB8;

use rainwatch::alarm::{evaluate_alarm, AlarmPolicy};
use rainwatch::buzzer::{Siren, Tone};
use rainwatch::channels::{ConsumerLink, Event, ReadingBus};
use rainwatch::display::{Layout, StatusScreen, TextSurface};
use rainwatch::indicator::{AxisIndicator, BicolorIndicator, IndicatorColor};
use rainwatch::matrix::{Glyph, MatrixState, Pictogram, PixelGrid};
use rainwatch::recovery::RecoveryTrigger;
use rainwatch::sampler::{AnalogSource, Sampler};
use rainwatch::types::{Axis, Consumer, Reading};
use rainwatch::Result;

#[derive(Default)]
struct Surface {
    texts: Vec<String>,
    presents: usize,
    blank: bool,
}

impl TextSurface for Surface {
    fn clear(&mut self) {
        self.texts.clear();
        self.blank = true;
    }

    fn draw_text(&mut self, text: &str, _x: i32, _y: i32) -> Result<()> {
        self.texts.push(text.to_string());
        self.blank = false;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.presents += 1;
        Ok(())
    }
}

struct Grid {
    pixels: [RGB8; 25],
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            pixels: [RGB8::default(); 25],
        }
    }
}

impl Grid {
    fn lit(&self) -> usize {
        self.pixels.iter().filter(|p| **p != RGB8::default()).count()
    }
}

impl PixelGrid for Grid {
    fn set_pixel(&mut self, index: usize, color: RGB8) {
        if let Some(slot) = self.pixels.get_mut(index) {
            *slot = color;
        }
    }

    async fn show(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Piezo {
    pulses: usize,
    silenced: bool,
}

impl Tone for Piezo {
    async fn pulse(&mut self, _frequency_hz: u32, _duration: Duration) -> Result<()> {
        self.pulses += 1;
        Ok(())
    }

    fn silence(&mut self) {
        self.silenced = true;
    }
}

#[derive(Default)]
struct Led {
    high: bool,
    writes: usize,
}

impl ErrorType for Led {
    type Error = Infallible;
}

impl OutputPin for Led {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

struct Fixed(u16, u16);

impl AnalogSource for Fixed {
    async fn read(&mut self, axis: Axis) -> Result<u16> {
        Ok(match axis {
            Axis::Rain => self.0,
            Axis::Level => self.1,
        })
    }
}

fn reading(rain: u16, level: u16) -> Reading {
    Reading::new(rain, level).unwrap()
}

#[test]
fn heavy_rain_raises_every_alarm_output() {
    let policy = AlarmPolicy::DEFAULT;
    let r = reading(4095, 0);
    assert!(evaluate_alarm(&r));

    let mut screen = StatusScreen::new(Surface::default(), policy);
    assert_eq!(screen.show(&r).unwrap(), Layout::Alert);
    assert_eq!(screen.surface().texts[0], "ALERT!");

    let mut indicator = BicolorIndicator::new(Led::default(), Led::default(), policy);
    assert_eq!(indicator.handle(&r), IndicatorColor::Red);

    let mut matrix = Pictogram::new(Grid::default(), policy);
    assert_eq!(block_on(matrix.handle(&r)).unwrap(), MatrixState::AlertDisplayed);
    assert_eq!(matrix.grid().pixels, Glyph::Alert.frame());

    let mut siren = Siren::new(Piezo::default(), policy);
    assert!(block_on(siren.handle(&r)).unwrap());
    assert_eq!(siren.tone().pulses, 1);
}

#[test]
fn dry_reading_shows_normal_state_and_stays_silent() {
    let policy = AlarmPolicy::DEFAULT;
    let r = reading(0, 0);
    assert!(!evaluate_alarm(&r));

    let mut screen = StatusScreen::new(Surface::default(), policy);
    assert_eq!(screen.show(&r).unwrap(), Layout::Normal);
    assert_eq!(screen.surface().texts[0], "Levels normal");

    let mut indicator = BicolorIndicator::new(Led::default(), Led::default(), policy);
    assert_eq!(indicator.handle(&r), IndicatorColor::Green);

    let mut matrix = Pictogram::new(Grid::default(), policy);
    assert_eq!(block_on(matrix.handle(&r)).unwrap(), MatrixState::OkDisplayed);
    assert_eq!(matrix.grid().pixels, Glyph::Check.frame());

    let mut siren = Siren::new(Piezo::default(), policy);
    assert!(!block_on(siren.handle(&r)).unwrap());
    assert_eq!(siren.tone().pulses, 0);
}

#[test]
fn consumers_agree_on_alarm_state() {
    let policy = AlarmPolicy::DEFAULT;
    let mut screen = StatusScreen::new(Surface::default(), policy);
    let mut indicator = BicolorIndicator::new(Led::default(), Led::default(), policy);
    let mut rain_led = AxisIndicator::new(Led::default(), Axis::Rain, policy);
    let mut level_led = AxisIndicator::new(Led::default(), Axis::Level, policy);
    let mut matrix = Pictogram::new(Grid::default(), policy);

    for rain in [0, 1000, 3479, 3480, 4095] {
        for level in [0, 2000, 3070, 3071, 4095] {
            let r = reading(rain, level);
            let alarm = evaluate_alarm(&r);

            assert_eq!(screen.show(&r).unwrap() == Layout::Alert, alarm);
            assert_eq!(indicator.handle(&r) == IndicatorColor::Red, alarm);
            assert_eq!(
                block_on(matrix.handle(&r)).unwrap() == MatrixState::AlertDisplayed,
                alarm
            );
            let split = rain_led.handle(&r) | level_led.handle(&r);
            assert_eq!(split, alarm, "rain={} level={}", rain, level);
        }
    }
}

#[test]
fn sampled_reading_reaches_the_display() {
    let link = ConsumerLink::new(Consumer::Display);
    let bus = ReadingBus::with_links(&[&link]);
    let mut sampler = Sampler::new(Fixed(4095, 100));
    block_on(sampler.step(&bus)).unwrap();

    let mut screen = StatusScreen::new(Surface::default(), AlarmPolicy::DEFAULT);
    match block_on(link.next_event()) {
        Event::Reading(r) => assert_eq!(screen.show(&r).unwrap(), Layout::Alert),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(screen.surface().texts.contains(&"100".to_string()));
    assert!(screen.surface().texts.contains(&"2".to_string()));
}

#[test]
fn recovery_blanks_outputs_and_nothing_resumes() {
    let policy = AlarmPolicy::DEFAULT;
    let display = ConsumerLink::new(Consumer::Display);
    let indicator = ConsumerLink::new(Consumer::Indicator);
    let matrix = ConsumerLink::new(Consumer::Matrix);
    let buzzer = ConsumerLink::new(Consumer::Buzzer);
    let links = [&display, &indicator, &matrix, &buzzer];
    let bus = ReadingBus::with_links(&links);
    let trigger = RecoveryTrigger::new(&links);

    let mut surface = Surface::default();
    let mut red = Led::default();
    let mut green = Led::default();
    let mut grid = Grid::default();
    let mut piezo = Piezo::default();

    let report = block_on(async {
        let consumers = join4(
            StatusScreen::new(&mut surface, policy).run(&display),
            BicolorIndicator::new(&mut red, &mut green, policy).run(&indicator),
            Pictogram::new(&mut grid, policy).run(&matrix),
            Siren::new(&mut piezo, policy).run(&buzzer),
        );
        let script = async {
            bus.publish(reading(4095, 4095));
            Timer::after(Duration::from_millis(20)).await;
            let report = trigger.halt_outputs(Duration::from_millis(250)).await;

            bus.publish(reading(4095, 4095));
            Timer::after(Duration::from_millis(50)).await;
            report
        };

        match select(consumers, script).await {
            Either::First(_) => unreachable!(),
            Either::Second(report) => report,
        }
    });

    assert!(report.complete());
    assert_eq!(report.requested, 4);

    // Alarm was shown before the halt
    assert_eq!(piezo.pulses, 1);
    assert!(surface.presents >= 2);

    // Outputs are blank
    assert!(surface.blank);
    assert_eq!(grid.lit(), 0);
    assert!(!red.high && !green.high);
    assert!(piezo.silenced);

    // The reading published after the halt was never consumed
    for link in links {
        assert!(link.is_halted());
        assert_eq!(link.pending(), 1);
    }
}

#[test]
fn split_leds_recovery_darkens_both_axis_leds() {
    let policy = AlarmPolicy::DEFAULT;
    let display = ConsumerLink::new(Consumer::Display);
    let rain = ConsumerLink::new(Consumer::Indicator);
    let level = ConsumerLink::new(Consumer::AuxIndicator);
    let matrix = ConsumerLink::new(Consumer::Matrix);
    let buzzer = ConsumerLink::new(Consumer::Buzzer);
    let links = [&display, &rain, &level, &matrix, &buzzer];
    let bus = ReadingBus::with_links(&links);
    let trigger = RecoveryTrigger::new(&links);

    let mut surface = Surface::default();
    let mut rain_led = Led::default();
    let mut level_led = Led::default();
    let mut grid = Grid::default();
    let mut piezo = Piezo::default();

    let report = block_on(async {
        let consumers = join5(
            StatusScreen::new(&mut surface, policy).run(&display),
            AxisIndicator::new(&mut rain_led, Axis::Rain, policy).run(&rain),
            AxisIndicator::new(&mut level_led, Axis::Level, policy).run(&level),
            Pictogram::new(&mut grid, policy).run(&matrix),
            Siren::new(&mut piezo, policy).run(&buzzer),
        );
        let script = async {
            bus.publish(reading(4095, 4095));
            Timer::after(Duration::from_millis(20)).await;
            let report = trigger.halt_outputs(Duration::from_millis(250)).await;

            bus.publish(reading(4095, 4095));
            Timer::after(Duration::from_millis(50)).await;
            report
        };

        match select(consumers, script).await {
            Either::First(_) => unreachable!(),
            Either::Second(report) => report,
        }
    });

    assert!(report.complete());
    assert_eq!(report.requested, 5);

    // Both LEDs were lit by the alarm, then switched off
    assert_eq!(rain_led.writes, 2);
    assert_eq!(level_led.writes, 2);
    assert!(!rain_led.high && !level_led.high);

    assert!(surface.blank);
    assert_eq!(grid.lit(), 0);
    assert!(piezo.silenced);

    for link in links {
        assert!(link.is_halted());
        assert_eq!(link.pending(), 1);
    }
}

#[test]
fn stale_wait_keeps_outputs_and_resumes_on_next_reading() {
    let policy = AlarmPolicy::DEFAULT;
    let display = ConsumerLink::new(Consumer::Display);
    let rain = ConsumerLink::new(Consumer::Indicator);
    let bus = ReadingBus::with_links(&[&display, &rain]);

    let mut surface = Surface::default();
    let mut rain_led = Led::default();

    block_on(async {
        let consumers = join(
            StatusScreen::new(&mut surface, policy).run(&display),
            AxisIndicator::new(&mut rain_led, Axis::Rain, policy).run(&rain),
        );
        let script = async {
            // Two stale timeouts pass with nothing published
            Timer::after(Duration::from_millis(700)).await;
            bus.publish(reading(4095, 0));
            Timer::after(Duration::from_millis(20)).await;
        };

        match select(consumers, script).await {
            Either::First(_) => unreachable!(),
            Either::Second(()) => {}
        }
    });

    // Only the late reading touched the outputs
    assert_eq!(surface.presents, 1);
    assert_eq!(surface.texts[0], "ALERT!");
    assert_eq!(rain_led.writes, 1);
    assert!(rain_led.high);
    assert_eq!(display.pending(), 0);
    assert_eq!(rain.pending(), 0);
}
