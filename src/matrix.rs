//! 5x5 LED matrix pictograms
//!
//! Shows a red exclamation mark while the alarm is active and a green tick
//! otherwise. Every reading redraws the grid; there is no hysteresis.

use smart_leds::RGB8;

use crate::alarm::AlarmPolicy;
use crate::channels::{ConsumerLink, Event};
use crate::config::{MATRIX_BRIGHTNESS_SHIFT, MATRIX_PIXELS, MATRIX_SIDE};
use crate::error::Result;
use crate::recovery::park;
use crate::types::Reading;

/// Addressable pixel grid, 25 pixels in wiring order
#[allow(async_fn_in_trait)]
pub trait PixelGrid {
    /// Stage a colour; indices outside 0..25 are ignored
    fn set_pixel(&mut self, index: usize, color: RGB8);
    /// Latch the staged colours onto the LEDs
    async fn show(&mut self) -> Result<()>;
}

impl<G: PixelGrid> PixelGrid for &mut G {
    fn set_pixel(&mut self, index: usize, color: RGB8) {
        G::set_pixel(self, index, color)
    }

    async fn show(&mut self) -> Result<()> {
        G::show(self).await
    }
}

// ===================================================================
// Glyphs
// ===================================================================

/// Fixed pictograms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Glyph {
    Alert,
    Check,
    Blank,
}

// Rows top to bottom, bit 4 is the leftmost column
const ALERT_ROWS: [u8; MATRIX_SIDE] = [0b00100, 0b00100, 0b00100, 0b00000, 0b00100];
const CHECK_ROWS: [u8; MATRIX_SIDE] = [0b00000, 0b00001, 0b00010, 0b10100, 0b01000];

const ALERT_COLOR: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
const CHECK_COLOR: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

impl Glyph {
    fn rows(self) -> [u8; MATRIX_SIDE] {
        match self {
            Glyph::Alert => ALERT_ROWS,
            Glyph::Check => CHECK_ROWS,
            Glyph::Blank => [0; MATRIX_SIDE],
        }
    }

    fn color(self) -> RGB8 {
        match self {
            Glyph::Alert => dim(ALERT_COLOR),
            Glyph::Check => dim(CHECK_COLOR),
            Glyph::Blank => OFF,
        }
    }

    pub fn is_lit(self, row: usize, col: usize) -> bool {
        row < MATRIX_SIDE && col < MATRIX_SIDE && self.rows()[row] & (1 << (MATRIX_SIDE - 1 - col)) != 0
    }

    /// Colours in physical wiring order
    pub fn frame(self) -> [RGB8; MATRIX_PIXELS] {
        let mut frame = [OFF; MATRIX_PIXELS];
        let color = self.color();
        for row in 0..MATRIX_SIDE {
            for col in 0..MATRIX_SIDE {
                if self.is_lit(row, col) {
                    frame[pixel_index(row, col)] = color;
                }
            }
        }
        frame
    }
}

fn dim(color: RGB8) -> RGB8 {
    RGB8 {
        r: color.r >> MATRIX_BRIGHTNESS_SHIFT,
        g: color.g >> MATRIX_BRIGHTNESS_SHIFT,
        b: color.b >> MATRIX_BRIGHTNESS_SHIFT,
    }
}

/// Physical LED index for a (row, col) position, row 0 at the top
///
/// The panel is a serpentine chain starting at the bottom-right corner.
pub const fn pixel_index(row: usize, col: usize) -> usize {
    let from_bottom = MATRIX_SIDE - 1 - row;
    let base = from_bottom * MATRIX_SIDE;
    if from_bottom % 2 == 0 {
        base + (MATRIX_SIDE - 1 - col)
    } else {
        base + col
    }
}

// ===================================================================
// Matrix Consumer
// ===================================================================

/// Which pictogram is on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MatrixState {
    AlertDisplayed,
    OkDisplayed,
    Cleared,
}

pub struct Pictogram<G> {
    grid: G,
    policy: AlarmPolicy,
    state: MatrixState,
}

impl<G: PixelGrid> Pictogram<G> {
    pub fn new(grid: G, policy: AlarmPolicy) -> Self {
        Self {
            grid,
            policy,
            state: MatrixState::Cleared,
        }
    }

    pub fn state(&self) -> MatrixState {
        self.state
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub async fn draw(&mut self, glyph: Glyph) -> Result<()> {
        for (index, color) in glyph.frame().iter().enumerate() {
            self.grid.set_pixel(index, *color);
        }
        self.grid.show().await
    }

    /// Draw the pictogram for one reading
    pub async fn handle(&mut self, reading: &Reading) -> Result<MatrixState> {
        let (glyph, next) = if self.policy.evaluate(reading) {
            (Glyph::Alert, MatrixState::AlertDisplayed)
        } else {
            (Glyph::Check, MatrixState::OkDisplayed)
        };

        self.draw(glyph).await?;
        if next != self.state {
            debug!("Matrix: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        Ok(next)
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.draw(Glyph::Blank).await?;
        self.state = MatrixState::Cleared;
        Ok(())
    }

    pub async fn run(mut self, link: &ConsumerLink) -> ! {
        info!("Matrix task started");

        loop {
            match link.next_event().await {
                Event::Reading(reading) => {
                    if let Err(e) = self.handle(&reading).await {
                        error!("Matrix update failed: {:?}", e);
                    }
                }
                Event::Stale => warn!("Matrix: no reading received"),
                Event::Halt => {
                    if let Err(e) = self.clear().await {
                        error!("Matrix clear failed: {:?}", e);
                    }
                    link.acknowledge_halt();
                    info!("Matrix cleared for recovery");
                    park().await
                }
            }
        }
    }
}
