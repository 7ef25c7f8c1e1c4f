//! Test doubles for the board, the modem link and the display.

use std::string::{String, ToString};
use std::vec::Vec;

use embedded_graphics::prelude::Point;

use crate::actuator::{Actuator, ActuatorSet};
use crate::board::{Board, PwmChannel};
use crate::error::Result;
use crate::protocol::{Line, Link};
use crate::rendering::Lcd;
use crate::sensors::SensorChannel;

#[derive(Default)]
pub struct MockBoard {
    pub grow_light: u16,
    pub heater: u16,
    pub buzzer: u16,
    pub buzzer_writes: usize,
    pub led: bool,
    pub actuators: ActuatorSet,
    pub readings: [u16; 4],
}

impl Board for MockBoard {
    fn set_duty(&mut self, channel: PwmChannel, duty: u16) {
        match channel {
            PwmChannel::GrowLight => self.grow_light = duty,
            PwmChannel::Heater => self.heater = duty,
            PwmChannel::Buzzer => {
                self.buzzer = duty;
                self.buzzer_writes += 1;
            }
        }
    }

    fn set_led(&mut self, on: bool) {
        self.led = on;
    }

    fn set_actuator(&mut self, actuator: Actuator, on: bool) {
        self.actuators.set(actuator, on);
    }

    fn read_channel(&mut self, channel: SensorChannel) -> u16 {
        self.readings[usize::from(channel.index())]
    }
}

#[derive(Default)]
pub struct MockLink {
    pub inbound: Vec<Result<Line>>,
    pub sent: Vec<String>,
    /// Refuse every outbound line
    pub busy: bool,
}

impl MockLink {
    pub fn queue(&mut self, text: &str) {
        self.inbound
            .push(Ok(Line::from_slice(text.as_bytes()).unwrap()));
    }
}

impl Link for MockLink {
    fn try_send_line(&mut self, line: &str) -> bool {
        if self.busy {
            return false;
        }
        self.sent.push(line.to_string());
        true
    }

    fn try_receive_line(&mut self) -> Option<Result<Line>> {
        if self.inbound.is_empty() {
            None
        } else {
            Some(self.inbound.remove(0))
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Draw {
    Clear,
    ClearArea,
    Text(u8, u8, String),
    Line(Point, Point),
    Pixel(Point),
    Bitmap(Point),
}

/// Records draw calls; text is tagged with the cursor it was drawn at.
#[derive(Default)]
pub struct RecordingLcd {
    pub calls: Vec<Draw>,
    cursor: (u8, u8),
}

impl RecordingLcd {
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Draw::Text(_, _, text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Draw) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
}

impl Lcd for RecordingLcd {
    fn clear(&mut self) {
        self.calls.push(Draw::Clear);
    }

    fn clear_area(&mut self, _top_left: Point, _width: u32, _height: u32) {
        self.calls.push(Draw::ClearArea);
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.cursor = (col, row);
    }

    fn draw_text(&mut self, text: &str) {
        self.calls
            .push(Draw::Text(self.cursor.0, self.cursor.1, text.to_string()));
    }

    fn draw_line(&mut self, from: Point, to: Point, _on: bool) {
        self.calls.push(Draw::Line(from, to));
    }

    fn draw_pixel(&mut self, at: Point, _on: bool) {
        self.calls.push(Draw::Pixel(at));
    }

    fn draw_bitmap(&mut self, top_left: Point, _width: u32, _data: &[u8]) {
        self.calls.push(Draw::Bitmap(top_left));
    }
}
