#![cfg_attr(not(test), no_std)]

//! # garden-telemetry
//! ## A garden monitoring node in Rust
//!
//! Features:
//! - 12-hour clock with analog and digital face
//! - Armable alarm with adjustable buzzer volume
//! - Live histogram of the selected sensor
//! - Virtual-pin bridge to a phone app over a serial modem
//! - Threshold monitoring that switches heater, water and grow light
//!
//! Everything here is hardware independent and runs on the host in tests;
//! the firmware binary supplies the board, link and display.

pub mod actuator;
pub mod alarm;
pub mod app;
pub mod board;
pub mod bridge;
pub mod clock;
pub mod error;
pub mod mode;
pub mod preferences;
pub mod protocol;
pub mod rendering;
pub mod sensors;
pub mod shared;
pub mod state;
pub mod timer;

#[cfg(test)]
mod testing;
