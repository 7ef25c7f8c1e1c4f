//! Virtual pin CSV protocol spoken with the Wi-Fi modem.
//!
//! Inbound lines look like `<pin>,<integer>,<float>\n`, outbound ones like
//! `<pin>,<integer>,0.0\n`. The modem forwards outbound pins 70..=99 to the
//! app; anything else would be treated as a command and is refused here.

use core::ops::RangeInclusive;
use heapless::{Deque, String, Vec};
use ufmt::uwrite;

use crate::error::{Error, Result};

pub const LINE_CAPACITY: usize = 64;
/// Outbound bytes buffered ahead of the UART; one telemetry period is at
/// most seven lines.
pub const TX_CAPACITY: usize = 256;
pub const TELEMETRY_PINS: RangeInclusive<u8> = 70..=99;

pub type Line = Vec<u8, LINE_CAPACITY>;
/// Longest outbound line: `99,4294967295,0.0\n`.
pub type OutLine = String<24>;

/// Serial link to the modem. Both directions are non-blocking.
pub trait Link {
    /// Queues a complete line.
    /// param line: encoded line including its newline
    /// returns false if there was no room and nothing was queued
    fn try_send_line(&mut self, line: &str) -> bool;

    /// Returns the next complete line, if one has arrived, or the reason
    /// the last one was discarded.
    fn try_receive_line(&mut self) -> Option<Result<Line>>;
}

/// One decoded inbound message. Borrows from the received line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualPinMessage<'a> {
    pub pin: i32,
    pub value: i32,
    /// Accepted for format compatibility, never interpreted.
    pub float: &'a str,
}

impl<'a> VirtualPinMessage<'a> {
    /// Splits a line into its three fields. Extra fields are ignored,
    /// missing ones drop the whole message.
    pub fn parse(line: &'a [u8]) -> Result<Self> {
        let text = core::str::from_utf8(line).map_err(|_| Error::MalformedLine)?;
        let text = text.trim_end_matches(['\r', '\n']);
        let mut fields = text.split(',');
        let (Some(pin), Some(value), Some(float)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::MalformedLine);
        };
        Ok(Self {
            pin: atoi(pin),
            value: atoi(value),
            float,
        })
    }
}

/// Decimal parse with C `atoi` leniency: leading blanks, an optional sign,
/// then digits up to the first non-digit. No digits yields 0; overflow
/// saturates.
pub fn atoi(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let mut magnitude: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        magnitude = (magnitude * 10 + i64::from(digit - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let signed = if negative { -magnitude } else { magnitude };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Formats one outbound line. Pins outside 70..=99 are refused.
pub fn encode(pin: u8, value: u32) -> Result<OutLine> {
    if !TELEMETRY_PINS.contains(&pin) {
        return Err(Error::TelemetryPin(pin));
    }
    let mut line = OutLine::new();
    // Fits: two pin digits, ten value digits and seven fixed characters.
    let _ = uwrite!(line, "{},{},0.0\n", pin, value);
    Ok(line)
}

/// Encodes and queues one telemetry value.
/// param pin: outbound virtual pin, 70..=99
/// param value: value sent in the integer field
/// returns `LinkBusy` if the link had no room for the line
pub fn send(link: &mut impl Link, pin: u8, value: u32) -> Result<()> {
    let line = encode(pin, value)?;
    if link.try_send_line(&line) {
        Ok(())
    } else {
        Err(Error::LinkBusy)
    }
}

/// Byte queue in front of a transmitter that only takes what fits.
///
/// Lines are queued whole or not at all, so the modem never sees half a
/// line.
pub struct TxQueue<const N: usize> {
    bytes: Deque<u8, N>,
}

impl<const N: usize> TxQueue<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Queues all of `line`, or nothing if it does not fit.
    pub fn enqueue(&mut self, line: &str) -> bool {
        if N - self.bytes.len() < line.len() {
            return false;
        }
        for &byte in line.as_bytes() {
            // Room was checked above.
            let _ = self.bytes.push_back(byte);
        }
        true
    }

    /// Hands queued bytes to `write` until it stops taking them.
    /// param write: takes a slice and returns how many bytes it accepted
    /// returns the number of bytes drained
    pub fn drain(&mut self, mut write: impl FnMut(&[u8]) -> usize) -> usize {
        let mut drained = 0;
        loop {
            let (front, _) = self.bytes.as_slices();
            if front.is_empty() {
                return drained;
            }
            let taken = write(front).min(front.len());
            if taken == 0 {
                return drained;
            }
            for _ in 0..taken {
                self.bytes.pop_front();
            }
            drained += taken;
        }
    }
}

impl<const N: usize> Default for TxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles modem bytes into lines.
///
/// A line longer than [`LINE_CAPACITY`] is discarded up to its newline.
pub struct LineReader {
    buf: Line,
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feeds one byte. Returns a line when `byte` completes one.
    pub fn push(&mut self, byte: u8) -> Option<Result<Line>> {
        match byte {
            b'\n' => {
                let line = core::mem::take(&mut self.buf);
                if core::mem::take(&mut self.overflowed) {
                    Some(Err(Error::LineOverflow))
                } else {
                    Some(Ok(line))
                }
            }
            b'\r' => None,
            _ => {
                if self.buf.push(byte).is_err() {
                    self.overflowed = true;
                    self.buf.clear();
                }
                None
            }
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
