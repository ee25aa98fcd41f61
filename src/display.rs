//! OLED status screen
//!
//! This module composes the 128x64 status frame from a reading and drives the
//! display consumer task. The display handle is owned by the task; nothing
//! else draws on it.

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::{String, Vec};

use crate::alarm::{percent, AlarmPolicy};
use crate::channels::{ConsumerLink, Event};
use crate::config::DISPLAY_WIDTH;
use crate::error::{Error, Result};
use crate::recovery::park;
use crate::types::Reading;

// ===================================================================
// Output Surface
// ===================================================================

/// Frame-buffered text output
///
/// Nothing reaches the panel until [`TextSurface::present`].
pub trait TextSurface {
    /// Blank the frame buffer
    fn clear(&mut self);
    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()>;
    /// Push the frame buffer to the panel
    fn present(&mut self) -> Result<()>;
}

impl<S: TextSurface + ?Sized> TextSurface for &mut S {
    fn clear(&mut self) {
        S::clear(self)
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()> {
        S::draw_text(self, text, x, y)
    }

    fn present(&mut self) -> Result<()> {
        S::present(self)
    }
}

/// Draw `text` with the status font, top-left anchored at (x, y)
pub fn draw_label<D>(target: &mut D, text: &str, x: i32, y: i32) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
        .draw(target)
        .map(|_| ())
        .map_err(|_| Error::Display)
}

// ===================================================================
// Frame Composition
// ===================================================================

const MAX_LABEL: usize = 16;
const MAX_ITEMS: usize = 8;

/// Which headline the frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layout {
    /// Two-line headline: "ALERT!" + detail
    Alert,
    /// One-line "Levels normal"
    Normal,
}

/// A label placed on the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String<MAX_LABEL>,
    pub x: i32,
    pub y: i32,
}

/// Everything drawn for one reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    pub layout: Layout,
    pub rain_percent: u8,
    pub level_percent: u8,
    items: Vec<TextItem, MAX_ITEMS>,
}

impl StatusFrame {
    /// Build the frame for a reading
    pub fn compose(reading: &Reading, policy: &AlarmPolicy) -> Self {
        let layout = if policy.evaluate(reading) {
            Layout::Alert
        } else {
            Layout::Normal
        };

        let mut frame = Self {
            layout,
            rain_percent: percent(reading.rain()),
            level_percent: percent(reading.level()),
            items: Vec::new(),
        };

        match layout {
            Layout::Alert => {
                frame.push_centered("ALERT!", 5);
                frame.push_centered("ABNORMAL LEVELS", 15);
            }
            Layout::Normal => {
                frame.push_centered("Levels normal", 15);
            }
        }

        frame.push_row("Rain:", frame.rain_percent, 35);
        frame.push_row("Water:", frame.level_percent, 45);
        frame
    }

    pub fn items(&self) -> &[TextItem] {
        &self.items
    }

    /// Clear, draw every label and present
    pub fn render<S: TextSurface>(&self, surface: &mut S) -> Result<()> {
        surface.clear();
        for item in &self.items {
            surface.draw_text(&item.text, item.x, item.y)?;
        }
        surface.present()
    }

    fn push(&mut self, text: &str, x: i32, y: i32) {
        let mut label = String::new();
        // Labels are compile-time constants shorter than MAX_LABEL
        let _ = label.push_str(text);
        let _ = self.items.push(TextItem { text: label, x, y });
    }

    fn push_centered(&mut self, text: &str, y: i32) {
        self.push(text, centered_x(text), y);
    }

    fn push_row(&mut self, label: &str, value: u8, y: i32) {
        let mut digits: String<MAX_LABEL> = String::new();
        let _ = write!(digits, "{}", value);
        self.push(label, 10, y);
        self.push(&digits, 90, y);
        self.push("%", 110, y);
    }
}

/// Left edge that centres `text` on the panel
fn centered_x(text: &str) -> i32 {
    let width = FONT_6X10.character_size.width * text.len() as u32;
    (DISPLAY_WIDTH.saturating_sub(width) / 2) as i32
}

// ===================================================================
// Display Consumer
// ===================================================================

pub struct StatusScreen<S> {
    surface: S,
    policy: AlarmPolicy,
    last_layout: Option<Layout>,
}

impl<S: TextSurface> StatusScreen<S> {
    pub fn new(surface: S, policy: AlarmPolicy) -> Self {
        Self {
            surface,
            policy,
            last_layout: None,
        }
    }

    /// Render one reading
    pub fn show(&mut self, reading: &Reading) -> Result<Layout> {
        let frame = StatusFrame::compose(reading, &self.policy);
        frame.render(&mut self.surface)?;

        if self.last_layout != Some(frame.layout) {
            info!(
                "Display: {:?} (rain {}%, water {}%)",
                frame.layout, frame.rain_percent, frame.level_percent
            );
            self.last_layout = Some(frame.layout);
        }
        Ok(frame.layout)
    }

    /// Present an empty frame
    pub fn blank(&mut self) -> Result<()> {
        self.surface.clear();
        self.surface.present()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Consume readings until recovery halts the task
    pub async fn run(mut self, link: &ConsumerLink) -> ! {
        info!("Display task started");

        loop {
            match link.next_event().await {
                Event::Reading(reading) => {
                    if let Err(e) = self.show(&reading) {
                        error!("Display update failed: {:?}", e);
                    }
                }
                Event::Stale => warn!("Display: no reading received"),
                Event::Halt => {
                    if let Err(e) = self.blank() {
                        error!("Display blank failed: {:?}", e);
                    }
                    link.acknowledge_halt();
                    info!("Display blanked for recovery");
                    park().await
                }
            }
        }
    }
}
