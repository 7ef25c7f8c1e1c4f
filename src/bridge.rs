//! Maps virtual pin messages onto device state and back.

use crate::actuator::{ActuatorCommand, ActuatorSet};
use crate::board::{Board, PwmChannel};
use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::preferences::Preferences;
use crate::protocol::{self, Link, VirtualPinMessage};
use crate::sensors::SensorChannel;
use crate::state::DeviceState;

/// Inbound virtual pins, app to device.
pub mod pins {
    pub const GROW_LIGHT: i32 = 0;
    pub const LED: i32 = 1;
    pub const CLOCK_MODE: i32 = 2;
    pub const SET_ALARM_MODE: i32 = 3;
    pub const GRAPH_MODE: i32 = 4;
    pub const MERIDIEM: i32 = 5;
    pub const HOUR: i32 = 6;
    pub const MINUTE: i32 = 7;
    pub const EDIT_TIME: i32 = 8;
    pub const ALARM_ARM: i32 = 9;
    pub const ALARM_DISMISS: i32 = 10;
    pub const ALARM_VOLUME: i32 = 11;
    pub const SECOND: i32 = 12;
    pub const SENSOR: i32 = 13;
    pub const HEATER: i32 = 14;
    pub const ACTUATOR: i32 = 15;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Command {
    /// Slider value, scaled to a duty on dispatch
    GrowLight(i32),
    Led(bool),
    SelectMode(Mode),
    ToggleMeridiem,
    SetHour(u8),
    SetMinute(u8),
    SetSecond(u8),
    EditTime(bool),
    ArmAlarm(bool),
    DismissAlarm,
    AlarmVolume(u8),
    SelectSensor(SensorChannel),
    /// Slider value, scaled to a duty on dispatch
    Heater(i32),
    Actuate(ActuatorCommand),
}

fn in_range(value: i32, low: u8, high: u8) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|v| (low..=high).contains(v))
        .ok_or(Error::OutOfRange(value))
}

fn mode_button(value: i32, mode: Mode) -> Result<Command> {
    if value == 1 {
        Ok(Command::SelectMode(mode))
    } else {
        Err(Error::ModeUnchanged)
    }
}

impl Command {
    pub fn decode(msg: &VirtualPinMessage<'_>) -> Result<Command> {
        let value = msg.value;
        Ok(match msg.pin {
            pins::GROW_LIGHT => Command::GrowLight(value),
            pins::LED => Command::Led(value != 0),
            pins::CLOCK_MODE => mode_button(value, Mode::Clock)?,
            pins::SET_ALARM_MODE => mode_button(value, Mode::SetAlarm)?,
            pins::GRAPH_MODE => mode_button(value, Mode::GraphSensors)?,
            pins::MERIDIEM => Command::ToggleMeridiem,
            pins::HOUR => Command::SetHour(in_range(value, 1, 12)?),
            pins::MINUTE => Command::SetMinute(in_range(value, 0, 59)?),
            pins::SECOND => Command::SetSecond(in_range(value, 0, 59)?),
            pins::EDIT_TIME => Command::EditTime(value == 1),
            pins::ALARM_ARM => Command::ArmAlarm(value != 0),
            pins::ALARM_DISMISS if value == 1 => Command::DismissAlarm,
            pins::ALARM_DISMISS => return Err(Error::OutOfRange(value)),
            pins::ALARM_VOLUME => Command::AlarmVolume(in_range(value, 0, 100)?),
            pins::SENSOR => {
                Command::SelectSensor(SensorChannel::try_from(value).map_err(Error::OutOfRange)?)
            }
            pins::HEATER => Command::Heater(value),
            pins::ACTUATOR => {
                Command::Actuate(ActuatorCommand::decode(value).ok_or(Error::OutOfRange(value))?)
            }
            other => return Err(Error::UnknownPin(other)),
        })
    }

    fn edits_time(self) -> bool {
        matches!(
            self,
            Command::ToggleMeridiem | Command::SetHour(_) | Command::SetMinute(_) | Command::SetSecond(_)
        )
    }
}

/// Applies one command. Runs inside the critical section that owns `state`.
pub fn dispatch(state: &mut DeviceState, board: &mut impl Board, command: Command) -> Result<Command> {
    if command.edits_time() && !state.editing {
        return Err(Error::NotEditing);
    }
    match command {
        Command::GrowLight(value) => {
            let duty = state.prefs.duty(value);
            state.outputs.grow_light = duty;
            board.set_duty(PwmChannel::GrowLight, duty);
        }
        Command::Heater(value) => {
            let duty = state.prefs.duty(value);
            state.outputs.heater = duty;
            board.set_duty(PwmChannel::Heater, duty);
        }
        Command::Led(on) => {
            state.outputs.led = on;
            board.set_led(on);
        }
        Command::SelectMode(mode) => {
            if !state.mode.set_mode(mode) {
                return Err(Error::ModeUnchanged);
            }
        }
        Command::ToggleMeridiem => state.time.toggle_meridiem(),
        Command::SetHour(hours) => state.time.set_hour(hours),
        Command::SetMinute(minutes) => state.time.set_minute(minutes),
        Command::SetSecond(seconds) => state.time.set_second(seconds),
        Command::EditTime(editing) => state.editing = editing,
        Command::ArmAlarm(armed) => {
            state.alarm.arm(armed);
            if !armed {
                board.set_duty(PwmChannel::Buzzer, 0);
            }
        }
        Command::DismissAlarm => {
            if state.mode.current() == Mode::Clock && state.alarm.dismiss() {
                board.set_duty(PwmChannel::Buzzer, 0);
            }
        }
        Command::AlarmVolume(volume) => {
            state.alarm.volume = volume;
            if state.alarm.is_ringing() {
                board.set_duty(PwmChannel::Buzzer, Preferences::tone_duty(volume));
            }
        }
        Command::SelectSensor(channel) => {
            state.sensor = channel;
            state.ring.reset();
        }
        Command::Actuate(ActuatorCommand { actuator, on }) => {
            state.outputs.actuators.set(actuator, on);
            board.set_actuator(actuator, on);
        }
    }
    Ok(command)
}

/// Parses, decodes and applies one received line.
pub fn handle_line(state: &mut DeviceState, board: &mut impl Board, line: &[u8]) -> Result<Command> {
    let msg = VirtualPinMessage::parse(line)?;
    let command = Command::decode(&msg)?;
    dispatch(state, board, command)
}

/// Link poll task: handles at most one line. `None` if nothing arrived.
pub fn poll_link(
    state: &mut DeviceState,
    board: &mut impl Board,
    link: &mut impl Link,
) -> Option<Result<Command>> {
    let line = link.try_receive_line()?;
    Some(line.and_then(|line| handle_line(state, board, &line)))
}

/// What one telemetry period sent and switched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct TelemetryReport {
    pub reading: u16,
    /// Actuator states requested by the monitors
    pub requested: ActuatorSet,
}

/// Telemetry task: forwards the selected sensor reading, then checks every
/// monitored sensor against its limit. Each monitor switches its actuator
/// locally before asking the app to do the same, so the node keeps working
/// when the link drops lines or a telemetry pin is misconfigured.
/// param state: device state, locked by the caller
/// param board: sensors and actuators
/// param link: modem link
/// returns the report, or the first send error once every monitor ran
pub fn send_telemetry(
    state: &mut DeviceState,
    board: &mut impl Board,
    link: &mut impl Link,
) -> Result<TelemetryReport> {
    let reading = match state.last_reading {
        Some(reading) => reading,
        None => board.read_channel(state.sensor),
    };
    let mut failed = protocol::send(link, state.prefs.reading_pin, u32::from(reading)).err();

    let mut requested = ActuatorSet::default();
    for monitor in state.prefs.monitors {
        let low = board.read_channel(monitor.channel) < monitor.limit;
        requested.set(monitor.actuator, low);
        state.outputs.actuators.set(monitor.actuator, low);
        board.set_actuator(monitor.actuator, low);

        if low {
            let sent = protocol::send(link, state.prefs.notify_pin, u32::from(monitor.channel.index()));
            failed = failed.or(sent.err());
        }
        let command = ActuatorCommand {
            actuator: monitor.actuator,
            on: low,
        };
        let sent = protocol::send(link, state.prefs.command_pin, command.opcode());
        failed = failed.or(sent.err());
    }

    match failed {
        Some(err) => Err(err),
        None => Ok(TelemetryReport { reading, requested }),
    }
}
