//! Hardware and timing configuration for RainWatch
//! RP2040 (BitDogLab) rain and water-level monitor

use embassy_time::Duration;

// ===================================================================
// Sensor Configuration
// ===================================================================

pub const ADC_MAX: u16 = 4095; // 12-bit converter full scale
pub const SAMPLE_PERIOD_MS: u64 = 100; // 10 Hz sampling

pub const RAIN_ALARM_THRESHOLD: u16 = 3480; // Axis A (rain), inclusive
pub const LEVEL_ALARM_THRESHOLD: u16 = 3071; // Axis B (water level), inclusive

// ===================================================================
// Queue Configuration
// ===================================================================

pub const READING_QUEUE_CAPACITY: usize = 5; // Readings buffered per consumer
pub const MAX_CONSUMERS: usize = 5; // Largest variant (split LEDs)

/// Consumers report a stale sensor when nothing arrives for this long
pub const STALE_READING_TIMEOUT: Duration = Duration::from_millis(3 * SAMPLE_PERIOD_MS);

// ===================================================================
// GPIO Pin Assignments - BitDogLab
// ===================================================================

pub const LEVEL_ADC_PIN: u8 = 26; // ADC0
pub const RAIN_ADC_PIN: u8 = 27; // ADC1

pub const I2C_SDA_PIN: u8 = 14; // I2C1 SDA
pub const I2C_SCL_PIN: u8 = 15; // I2C1 SCL
pub const I2C_FREQUENCY_HZ: u32 = 400_000;
pub const OLED_I2C_ADDRESS: u8 = 0x3C;

pub const LED_RED_PIN: u8 = 13;
pub const LED_GREEN_PIN: u8 = 11;
pub const BUZZER_PIN: u8 = 10; // PWM slice 5, channel A
pub const MATRIX_PIN: u8 = 7; // WS2812 data (PIO0 SM0)
pub const RECOVERY_BUTTON_PIN: u8 = 6; // Button B, active low

// ===================================================================
// Display Configuration
// ===================================================================

pub const DISPLAY_WIDTH: u32 = 128;
pub const DISPLAY_HEIGHT: u32 = 64;

// ===================================================================
// LED Matrix Configuration
// ===================================================================

pub const MATRIX_SIDE: usize = 5;
pub const MATRIX_PIXELS: usize = MATRIX_SIDE * MATRIX_SIDE; // 25 LEDs
pub const MATRIX_BRIGHTNESS_SHIFT: u8 = 3; // Scale colours to 1/8

// ===================================================================
// Buzzer Configuration
// ===================================================================

pub const BUZZER_FREQUENCY_HZ: u32 = 600;
pub const BUZZER_PULSE: Duration = Duration::from_millis(500);
pub const BUZZER_SETTLE_STEPS: u32 = 10; // Settle = steps x step
pub const BUZZER_SETTLE_STEP: Duration = Duration::from_millis(10);
pub const BUZZER_IDLE: Duration = Duration::from_millis(50);

// ===================================================================
// Recovery Configuration
// ===================================================================

/// Upper bound on waiting for outputs to blank before entering USB boot
pub const RECOVERY_BLANK_TIMEOUT: Duration = Duration::from_millis(250);

// ===================================================================
// Supervisor Configuration
// ===================================================================

pub const SUPERVISOR_TICK_SECS: u64 = 10;
pub const SUPERVISOR_REPORT_SECS: u32 = 60;
