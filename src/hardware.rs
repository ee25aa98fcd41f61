//! Hardware abstraction and initialization
//!
//! This module binds the board peripherals to the output traits used by the
//! consumers, then spawns the sampler, the consumers of the selected variant
//! and the recovery watcher.

use embassy_executor::Spawner;
use embassy_rp::adc::{self, Adc};
use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C1, PIO0};
use embassy_rp::pio::{Common, Pio};
use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::Peripherals;
use embassy_time::{Duration, Timer};
use fixed::types::extra::U4;
use fixed::FixedU16;
use heapless::Vec;
use smart_leds::RGB8;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};
use static_cell::StaticCell;

use crate::alarm::AlarmPolicy;
use crate::buzzer::{alarm_tone_setting, PwmSetting, Siren, Tone};
use crate::channels::{link, ConsumerLink, ReadingBus};
use crate::config;
use crate::display::{draw_label, StatusScreen, TextSurface};
use crate::error::{Error, Peripheral, Result};
use crate::indicator::{AxisIndicator, BicolorIndicator};
use crate::matrix::{Pictogram, PixelGrid};
use crate::recovery::{BootHandoff, RecoveryTrigger};
use crate::sampler::{AnalogSource, Sampler};
use crate::types::{Axis, Consumer};
use crate::variant::{IndicatorMode, Variant};

/// Pin assignments for one variant
pub struct HardwareConfig {
    pub variant: Variant,
    pub sensor_pins: SensorPins,
    pub display_pins: DisplayPins,
    pub led_pins: LedPins,
    pub buzzer_pin: u8,
    pub matrix_pin: u8,
    pub recovery_pin: u8,
}

pub struct SensorPins {
    pub level: u8,
    pub rain: u8,
}

pub struct DisplayPins {
    pub sda: u8,
    pub scl: u8,
    pub address: u8,
}

pub struct LedPins {
    pub red: u8,
    pub green: u8,
}

impl HardwareConfig {
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            sensor_pins: SensorPins {
                level: config::LEVEL_ADC_PIN,
                rain: config::RAIN_ADC_PIN,
            },
            display_pins: DisplayPins {
                sda: config::I2C_SDA_PIN,
                scl: config::I2C_SCL_PIN,
                address: config::OLED_I2C_ADDRESS,
            },
            led_pins: LedPins {
                red: config::LED_RED_PIN,
                green: config::LED_GREEN_PIN,
            },
            buzzer_pin: config::BUZZER_PIN,
            matrix_pin: config::MATRIX_PIN,
            recovery_pin: config::RECOVERY_BUTTON_PIN,
        }
    }

    fn log(&self) {
        info!("Initializing hardware for {}", self.variant.name());
        info!(
            "Sensors: level GPIO{} rain GPIO{}",
            self.sensor_pins.level, self.sensor_pins.rain
        );
        info!(
            "OLED: I2C1 SDA GPIO{} SCL GPIO{} addr 0x{:02X}",
            self.display_pins.sda, self.display_pins.scl, self.display_pins.address
        );
        info!(
            "LEDs: red GPIO{} green GPIO{}",
            self.led_pins.red, self.led_pins.green
        );
        info!(
            "Buzzer GPIO{}, matrix GPIO{}, recovery button GPIO{}",
            self.buzzer_pin, self.matrix_pin, self.recovery_pin
        );
    }
}

// ===================================================================
// Peripheral Adapters
// ===================================================================

/// Both sensor channels on the RP2040 ADC
pub struct AdcSource {
    adc: Adc<'static, adc::Async>,
    level: adc::Channel<'static>,
    rain: adc::Channel<'static>,
}

impl AnalogSource for AdcSource {
    async fn read(&mut self, axis: Axis) -> Result<u16> {
        let channel = match axis {
            Axis::Level => &mut self.level,
            Axis::Rain => &mut self.rain,
        };
        self.adc
            .read(channel)
            .await
            .map_err(|_| Error::AdcConversion { axis })
    }
}

pub type OledDisplay = Ssd1306<
    I2CInterface<I2c<'static, I2C1, i2c::Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SSD1306 in buffered graphics mode
pub struct OledSurface {
    display: OledDisplay,
}

impl TextSurface for OledSurface {
    fn clear(&mut self) {
        self.display.clear_buffer();
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()> {
        draw_label(&mut self.display, text, x, y)
    }

    fn present(&mut self) -> Result<()> {
        self.display.flush().map_err(|_| Error::Display)
    }
}

/// WS2812 chain driven by PIO0 state machine 0
pub struct Ws2812Grid {
    driver: PioWs2812<'static, PIO0, 0, { config::MATRIX_PIXELS }>,
    frame: [RGB8; config::MATRIX_PIXELS],
}

impl PixelGrid for Ws2812Grid {
    fn set_pixel(&mut self, index: usize, color: RGB8) {
        if let Some(slot) = self.frame.get_mut(index) {
            *slot = color;
        }
    }

    async fn show(&mut self) -> Result<()> {
        self.driver.write(&self.frame).await;
        Ok(())
    }
}

/// Square wave on a PWM channel A output
///
/// The divider and wrap are fixed at init for the alarm tone; a pulse only
/// toggles the duty cycle.
pub struct PwmTone {
    pwm: Pwm<'static>,
    config: pwm::Config,
    setting: PwmSetting,
}

impl PwmTone {
    fn new(pwm: Pwm<'static>, mut config: pwm::Config, setting: PwmSetting) -> Self {
        config.divider = FixedU16::<U4>::from_num(setting.divider);
        config.top = setting.top;
        Self {
            pwm,
            config,
            setting,
        }
    }
}

impl Tone for PwmTone {
    async fn pulse(&mut self, frequency_hz: u32, duration: Duration) -> Result<()> {
        if frequency_hz != config::BUZZER_FREQUENCY_HZ {
            warn!("Buzzer tuned for {} Hz, got {} Hz", config::BUZZER_FREQUENCY_HZ, frequency_hz);
        }

        self.config.compare_a = self.setting.half_duty();
        self.pwm.set_config(&self.config);

        Timer::after(duration).await;
        self.silence();
        Ok(())
    }

    fn silence(&mut self) {
        self.config.compare_a = 0;
        self.pwm.set_config(&self.config);
    }
}

/// Reboot into the ROM USB mass-storage boot loader
pub struct UsbBootHandoff;

impl BootHandoff for UsbBootHandoff {
    fn enter_boot_mode(&mut self) -> ! {
        #[allow(unused_unsafe)]
        unsafe {
            embassy_rp::rom_data::reset_to_usb_boot(0, 0);
        }
        loop {
            cortex_m::asm::wfi();
        }
    }
}

// ===================================================================
// Task Initialization
// ===================================================================

static PIO0_COMMON: StaticCell<Common<'static, PIO0>> = StaticCell::new();

/// Initialize peripherals and spawn every task of a variant
pub async fn init_tasks_for_variant(
    spawner: &Spawner,
    p: Peripherals,
    variant: Variant,
) -> Result<()> {
    let hw_config = HardwareConfig::for_variant(variant);
    hw_config.log();

    let policy = AlarmPolicy::DEFAULT;
    let mut links: Vec<&'static ConsumerLink, { config::MAX_CONSUMERS }> = Vec::new();
    for consumer in variant.consumers() {
        if links.push(link(*consumer)).is_err() {
            warn!("Link table full, ignoring {:?}", consumer);
        }
    }

    // Sensors
    let adc = Adc::new(p.ADC, crate::Irqs, adc::Config::default());
    let source = AdcSource {
        adc,
        level: adc::Channel::new_pin(p.PIN_26, Pull::None),
        rain: adc::Channel::new_pin(p.PIN_27, Pull::None),
    };

    // OLED
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = config::I2C_FREQUENCY_HZ;
    let i2c = I2c::new_blocking(p.I2C1, p.PIN_15, p.PIN_14, i2c_config);
    let interface = I2CDisplayInterface::new_custom_address(i2c, config::OLED_I2C_ADDRESS);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    if display.init().is_err() {
        error!("OLED init failed");
        return Err(Error::PeripheralInit(Peripheral::Display));
    }
    let screen = StatusScreen::new(OledSurface { display }, policy);

    // LED matrix
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, crate::Irqs);
    let program = PioWs2812Program::new(&mut common);
    let driver = PioWs2812::new(&mut common, sm0, p.DMA_CH0, p.PIN_7, &program);
    PIO0_COMMON.init(common);
    let matrix = Pictogram::new(
        Ws2812Grid {
            driver,
            frame: [RGB8::default(); config::MATRIX_PIXELS],
        },
        policy,
    );

    // Buzzer
    let setting = alarm_tone_setting(clk_sys_freq()).inspect_err(|_| {
        error!("No PWM setting for {} Hz", config::BUZZER_FREQUENCY_HZ);
    })?;
    let pwm_config = pwm::Config::default();
    let pwm = Pwm::new_output_a(p.PWM_SLICE5, p.PIN_10, pwm_config.clone());
    let siren = Siren::new(PwmTone::new(pwm, pwm_config, setting), policy);

    // Indicators
    let red = Output::new(p.PIN_13, Level::Low);
    let green = Output::new(p.PIN_11, Level::Low);

    spawner.spawn(sampler_task(
        Sampler::new(source),
        ReadingBus::with_links(&links),
    ))?;
    spawner.spawn(display_task(screen, link(Consumer::Display)))?;

    match variant.indicator_mode() {
        IndicatorMode::Bicolor => {
            let indicator = BicolorIndicator::new(red, green, policy);
            spawner.spawn(bicolor_task(indicator, link(Consumer::Indicator)))?;
        }
        IndicatorMode::PerAxis => {
            let rain = AxisIndicator::new(red, Axis::Rain, policy);
            let level = AxisIndicator::new(green, Axis::Level, policy);
            spawner.spawn(axis_indicator_task(rain, link(Consumer::Indicator)))?;
            spawner.spawn(axis_indicator_task(level, link(Consumer::AuxIndicator)))?;
        }
    }

    spawner.spawn(matrix_task(matrix, link(Consumer::Matrix)))?;
    spawner.spawn(buzzer_task(siren, link(Consumer::Buzzer)))?;

    let button = Input::new(p.PIN_6, Pull::Up);
    spawner.spawn(recovery_task(button, links))?;

    info!("{} tasks spawned", variant.consumer_count() + 2);
    Ok(())
}

// ===================================================================
// Tasks
// ===================================================================

#[embassy_executor::task]
async fn sampler_task(sampler: Sampler<AdcSource>, bus: ReadingBus<'static>) {
    sampler.run(bus).await
}

#[embassy_executor::task]
async fn display_task(screen: StatusScreen<OledSurface>, link: &'static ConsumerLink) {
    screen.run(link).await
}

#[embassy_executor::task]
async fn bicolor_task(
    indicator: BicolorIndicator<Output<'static>, Output<'static>>,
    link: &'static ConsumerLink,
) {
    indicator.run(link).await
}

#[embassy_executor::task(pool_size = 2)]
async fn axis_indicator_task(indicator: AxisIndicator<Output<'static>>, link: &'static ConsumerLink) {
    indicator.run(link).await
}

#[embassy_executor::task]
async fn matrix_task(matrix: Pictogram<Ws2812Grid>, link: &'static ConsumerLink) {
    matrix.run(link).await
}

#[embassy_executor::task]
async fn buzzer_task(siren: Siren<PwmTone>, link: &'static ConsumerLink) {
    siren.run(link).await
}

#[embassy_executor::task]
async fn recovery_task(
    button: Input<'static>,
    links: Vec<&'static ConsumerLink, { config::MAX_CONSUMERS }>,
) {
    let trigger = RecoveryTrigger::new(&links);
    trigger
        .watch(button, UsbBootHandoff, config::RECOVERY_BLANK_TIMEOUT)
        .await
}
