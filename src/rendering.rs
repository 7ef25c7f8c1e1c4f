use embedded_graphics::{
    image::{Image, ImageRaw},
    mono_font::{ascii::FONT_6X10, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::clock::ClockTime;
use crate::sensors::{Histogram, RING_CAPACITY};

pub const CHAR_WIDTH: i32 = 6;
pub const CHAR_HEIGHT: i32 = 10;
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;

pub const TITLE_POS: (u8, u8) = (0, 0);
pub const TIME_POS: (u8, u8) = (8, 2);
pub const ALARM_POS: (u8, u8) = (8, 4);

pub const FACE_SIZE: u32 = 32;
pub const FACE_ORIGIN: Point = Point::new(4, 16);
pub const FACE_CENTER: Point = Point::new(4 + 16, 16 + 16);
pub const HOUR_HAND: i32 = 9;
pub const MINUTE_HAND: i32 = 13;

pub const PLOT_TOP: i32 = 12;
pub const PLOT_HEIGHT: u32 = SCREEN_HEIGHT - PLOT_TOP as u32;

pub const CLOCK_TITLE: &str = "Clock Mode";
pub const SET_ALARM_TITLE: &str = "Setting Alarm";
pub const GRAPH_TITLE: &str = "Sensor Graph";

const FACE_BYTES: usize = (FACE_SIZE * FACE_SIZE / 8) as usize;

/// Clock face: a ring with a tick at 12, 3, 6 and 9.
pub static CLOCK_FACE: [u8; FACE_BYTES] = clock_face();

const fn clock_face() -> [u8; FACE_BYTES] {
    let mut data = [0u8; FACE_BYTES];
    let mut y = 0;
    while y < FACE_SIZE as i32 {
        let mut x = 0;
        while x < FACE_SIZE as i32 {
            // Doubled coordinates relative to the middle of the bitmap.
            let dx = 2 * x - 31;
            let dy = 2 * y - 31;
            let d2 = dx * dx + dy * dy;
            let ring = d2 >= 28 * 28 && d2 <= 31 * 31;
            let vertical_tick = (x == 15 || x == 16) && ((y >= 3 && y <= 5) || (y >= 26 && y <= 28));
            let horizontal_tick = (y == 15 || y == 16) && ((x >= 3 && x <= 5) || (x >= 26 && x <= 28));
            if ring || vertical_tick || horizontal_tick {
                data[(y * 4 + x / 8) as usize] |= 0x80 >> (x % 8);
            }
            x += 1;
        }
        y += 1;
    }
    data
}

/// Drawing surface of the node's display.
///
/// Text goes to a character cell grid; everything else is in pixels.
pub trait Lcd {
    fn clear(&mut self);

    fn clear_area(&mut self, top_left: Point, width: u32, height: u32);

    fn set_cursor(&mut self, col: u8, row: u8);

    /// Draws at the cursor and moves it past the text.
    fn draw_text(&mut self, text: &str);

    fn draw_line(&mut self, from: Point, to: Point, on: bool);

    fn draw_pixel(&mut self, at: Point, on: bool);

    /// 1 bit per pixel, rows padded to whole bytes, MSB first.
    fn draw_bitmap(&mut self, top_left: Point, width: u32, data: &[u8]);
}

/// [`Lcd`] on top of any monochrome `embedded-graphics` target.
/// Draw errors are ignored; the display is write-only.
pub struct GraphicsLcd<D> {
    target: D,
    cursor: Point,
}

impl<D> GraphicsLcd<D> {
    /// param target: display driver to draw on
    pub fn new(target: D) -> Self {
        Self {
            target,
            cursor: Point::zero(),
        }
    }

    /// returns the display driver, e.g. to flush a buffered frame
    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn into_inner(self) -> D {
        self.target
    }
}

fn color(on: bool) -> BinaryColor {
    if on {
        BinaryColor::On
    } else {
        BinaryColor::Off
    }
}

impl<D> Lcd for GraphicsLcd<D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    fn clear(&mut self) {
        let _ = self.target.clear(BinaryColor::Off);
        self.cursor = Point::zero();
    }

    fn clear_area(&mut self, top_left: Point, width: u32, height: u32) {
        let _ = Rectangle::new(top_left, Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(&mut self.target);
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.cursor = Point::new(i32::from(col) * CHAR_WIDTH, i32::from(row) * CHAR_HEIGHT);
    }

    fn draw_text(&mut self, text: &str) {
        let style: MonoTextStyle<'_, BinaryColor> = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .background_color(BinaryColor::Off)
            .build();
        let _ = Text::with_baseline(text, self.cursor, style, Baseline::Top).draw(&mut self.target);
        self.cursor.x += text.len() as i32 * CHAR_WIDTH;
    }

    fn draw_line(&mut self, from: Point, to: Point, on: bool) {
        let _ = Line::new(from, to)
            .into_styled(PrimitiveStyle::with_stroke(color(on), 1))
            .draw(&mut self.target);
    }

    fn draw_pixel(&mut self, at: Point, on: bool) {
        let _ = Pixel(at, color(on)).draw(&mut self.target);
    }

    fn draw_bitmap(&mut self, top_left: Point, width: u32, data: &[u8]) {
        let raw: ImageRaw<'_, BinaryColor> = ImageRaw::new(data, width);
        let _ = Image::new(&raw, top_left).draw(&mut self.target);
    }
}

/// Basic function for rendering text at a character cell.
/// param lcd: LCD instance
/// param (col, row): character cell of the first letter
/// param text: text to render
pub fn render_text(lcd: &mut impl Lcd, (col, row): (u8, u8), text: &str) {
    lcd.set_cursor(col, row);
    lcd.draw_text(text);
}

/// Clears the screen and writes the mode title on the top line.
/// param lcd: LCD instance
/// param title: name of the mode being entered
pub fn render_title(lcd: &mut impl Lcd, title: &str) {
    lcd.clear();
    render_text(lcd, TITLE_POS, title);
}

/// Writes the digital time line, `hh:mm:ssam`.
/// param lcd: LCD instance
/// param time: clock value to show
pub fn render_time(lcd: &mut impl Lcd, time: &ClockTime) {
    render_text(lcd, TIME_POS, &time.format_digital());
}

/// Writes the alarm status line. Both texts have the same width so one
/// overwrites the other.
/// param lcd: LCD instance
/// param armed: if the alarm is armed
pub fn render_alarm_status(lcd: &mut impl Lcd, armed: bool) {
    let status = if armed { "ALARM ON " } else { "ALARM OFF" };
    render_text(lcd, ALARM_POS, status);
}

/// End point of a clock hand. `fraction` is the share of a full turn,
/// starting at 12 o'clock and running clockwise.
/// param center: pivot of the hands
/// param length: hand length in pixels
/// param fraction: share of a full turn, 0.0..1.0
/// returns the pixel the hand points at
pub fn hand_end(center: Point, length: i32, fraction: f32) -> Point {
    let angle = -(360.0 * fraction + 90.0) * core::f32::consts::PI / 180.0;
    let x = center.x as f32 - angle.cos() * length as f32;
    let y = center.y as f32 + angle.sin() * length as f32;
    Point::new(x.round() as i32, y.round() as i32)
}

/// Redraws the face, which also erases the old hands, then both hands.
/// param lcd: LCD instance
/// param time: clock value the hands show
pub fn render_hands(lcd: &mut impl Lcd, time: &ClockTime) {
    lcd.draw_bitmap(FACE_ORIGIN, FACE_SIZE, &CLOCK_FACE);
    let hour = hand_end(FACE_CENTER, HOUR_HAND, f32::from(time.hours % 12) / 12.0);
    let minute = hand_end(FACE_CENTER, MINUTE_HAND, f32::from(time.minutes) / 60.0);
    lcd.draw_line(FACE_CENTER, minute, true);
    lcd.draw_line(FACE_CENTER, hour, true);
}

/// Plots one vertical bar per populated bucket across the plot region.
/// param lcd: LCD instance
/// param histogram: counts of the current sample ring
pub fn render_histogram(lcd: &mut impl Lcd, histogram: &Histogram) {
    lcd.clear_area(Point::new(0, PLOT_TOP), SCREEN_WIDTH, PLOT_HEIGHT);
    let Some((low, high)) = histogram.bounds() else {
        return;
    };
    let span = i32::from(high - low).max(1);
    let bottom = SCREEN_HEIGHT as i32 - 1;
    let unit = PLOT_HEIGHT as i32 / RING_CAPACITY as i32;
    for (value, count) in histogram.bars() {
        let x = i32::from(value - low) * (SCREEN_WIDTH as i32 - 1) / span;
        let height = i32::from(count) * unit;
        lcd.draw_line(Point::new(x, bottom), Point::new(x, bottom - height + 1), true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Meridiem;
    use crate::testing::{Draw, RecordingLcd};
    use core::convert::Infallible;

    struct Frame {
        pixels: [[bool; SCREEN_WIDTH as usize]; SCREEN_HEIGHT as usize],
    }

    impl Frame {
        fn new() -> Self {
            Self {
                pixels: [[false; SCREEN_WIDTH as usize]; SCREEN_HEIGHT as usize],
            }
        }

        fn lit(&self) -> usize {
            self.pixels.iter().flatten().filter(|&&p| p).count()
        }
    }

    impl OriginDimensions for Frame {
        fn size(&self) -> Size {
            Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
        }
    }

    impl DrawTarget for Frame {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if self.bounding_box().contains(point) {
                    self.pixels[point.y as usize][point.x as usize] = color.is_on();
                }
            }
            Ok(())
        }
    }

    fn near(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() <= 1 && (a.y - b.y).abs() <= 1
    }

    #[test]
    fn hands_point_the_right_way() {
        let c = Point::new(20, 32);
        assert!(near(hand_end(c, 10, 0.0), Point::new(20, 22)));
        assert!(near(hand_end(c, 10, 0.25), Point::new(30, 32)));
        assert!(near(hand_end(c, 10, 0.5), Point::new(20, 42)));
        assert!(near(hand_end(c, 10, 0.75), Point::new(10, 32)));
    }

    #[test]
    fn face_is_symmetric_ring() {
        let bit = |x: usize, y: usize| CLOCK_FACE[y * 4 + x / 8] & (0x80 >> (x % 8)) != 0;
        assert!(bit(16, 0) || bit(16, 1));
        assert!(!bit(16, 16));
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(bit(x, y), bit(31 - x, y));
                assert_eq!(bit(x, y), bit(x, 31 - y));
            }
        }
    }

    #[test]
    fn graphics_lcd_draws_and_clears() {
        let mut lcd = GraphicsLcd::new(Frame::new());
        render_text(&mut lcd, TIME_POS, "12:00:00am");
        assert!(lcd.inner_mut().lit() > 0);

        lcd.clear();
        assert_eq!(lcd.inner_mut().lit(), 0);

        lcd.draw_line(Point::new(0, 0), Point::new(9, 0), true);
        lcd.draw_pixel(Point::new(0, 5), true);
        assert_eq!(lcd.inner_mut().lit(), 11);

        lcd.clear_area(Point::new(0, 0), 5, 1);
        assert_eq!(lcd.inner_mut().lit(), 6);
    }

    #[test]
    fn bitmap_lands_at_origin() {
        let mut lcd = GraphicsLcd::new(Frame::new());
        lcd.draw_bitmap(Point::new(3, 2), 8, &[0b1000_0001]);
        let frame = lcd.into_inner();
        assert!(frame.pixels[2][3]);
        assert!(frame.pixels[2][10]);
        assert_eq!(frame.lit(), 2);
    }

    #[test]
    fn time_is_drawn_at_time_position() {
        let mut lcd = RecordingLcd::default();
        render_time(&mut lcd, &ClockTime::new(9, 5, 0, Meridiem::Pm));
        assert_eq!(
            lcd.calls,
            [Draw::Text(TIME_POS.0, TIME_POS.1, "09:05:00pm".into())]
        );
    }

    #[test]
    fn alarm_status_overwrites_in_place() {
        let mut lcd = RecordingLcd::default();
        render_alarm_status(&mut lcd, true);
        render_alarm_status(&mut lcd, false);
        let [Draw::Text(c0, r0, on), Draw::Text(c1, r1, off)] = &lcd.calls[..] else {
            panic!("unexpected calls {:?}", lcd.calls);
        };
        assert_eq!((*c0, *r0), ALARM_POS);
        assert_eq!((*c1, *r1), ALARM_POS);
        assert_eq!(on.len(), off.len());
    }

    #[test]
    fn histogram_bars_span_plot() {
        let mut lcd = RecordingLcd::default();
        let histogram = Histogram::from_samples(&[100, 100, 150]);
        render_histogram(&mut lcd, &histogram);

        let bottom = SCREEN_HEIGHT as i32 - 1;
        assert_eq!(lcd.calls[0], Draw::ClearArea);
        // bounds 50..=150: value 100 halfway, 150 at the right edge
        assert_eq!(lcd.calls[1], Draw::Line(Point::new(63, bottom), Point::new(63, bottom - 3)));
        assert_eq!(lcd.calls[2], Draw::Line(Point::new(127, bottom), Point::new(127, bottom - 1)));
        assert_eq!(lcd.calls.len(), 3);
    }
}
