use crate::actuator::ActuatorSet;
use crate::alarm::AlarmState;
use crate::board::Board;
use crate::bridge::{self, Command, TelemetryReport};
use crate::clock::TimeModel;
use crate::error::Error;
use crate::mode::{Mode, ModeContext, ModeState};
use crate::preferences::Preferences;
use crate::protocol::Link;
use crate::sensors::{SampleRing, SensorChannel};
use crate::timer::{Channel, Task, TimerService};

/// Last values written to the outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputState {
    pub led: bool,
    pub grow_light: u16,
    pub heater: u16,
    pub actuators: ActuatorSet,
}

/// Mode change performed by [`DeviceState::enter_mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Entry {
    pub mode: Mode,
    pub from: Mode,
}

/// Result of one timer task, for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Outcome {
    Ticked,
    Idle,
    Command(Command),
    Dropped(Error),
    Telemetry(TelemetryReport),
    Sampled(u16),
}

/// Everything shared between the main loop and the timer interrupts.
pub struct DeviceState {
    pub prefs: Preferences,
    pub timers: TimerService,
    pub time: TimeModel,
    pub alarm: AlarmState,
    pub mode: ModeState,
    pub context: ModeContext,
    pub ring: SampleRing,
    pub sensor: SensorChannel,
    pub last_reading: Option<u16>,
    pub editing: bool,
    pub outputs: OutputState,
}

impl DeviceState {
    pub fn new(prefs: Preferences) -> Self {
        let mut timers = TimerService::new();
        timers.init(Channel::Timer0, Task::AdvanceClock, prefs.clock_period_us);
        timers.init(Channel::Timer1, Task::PollLink, prefs.link_poll_period_us);
        timers.init(Channel::Timer2, Task::SendTelemetry, prefs.telemetry_period_us);
        timers.init(Channel::Timer3, Task::SampleSensor, prefs.sample_period_us);

        Self {
            timers,
            time: TimeModel::new(prefs.start_time),
            alarm: AlarmState::new(prefs.alarm, prefs.alarm_volume),
            mode: ModeState::new(Mode::Clock),
            context: ModeContext::new(),
            ring: SampleRing::new(),
            sensor: SensorChannel::Soil,
            last_reading: None,
            editing: false,
            outputs: OutputState::default(),
            prefs,
        }
    }

    /// Performs the state side of a pending mode entry.
    ///
    /// Clock and graph commit a pending alarm edit, swap the clock back in
    /// and let it run. Alarm setting parks the clock, stops it and shows the
    /// alarm target in its place.
    pub fn enter_mode(&mut self) -> Option<Entry> {
        let from = self.mode.take_entry()?;
        let mode = self.mode.current();
        match mode {
            Mode::Clock | Mode::GraphSensors => {
                self.context.restore(&mut self.time, &mut self.alarm);
                self.timers.set_task_enabled(Task::AdvanceClock, true);
            }
            Mode::SetAlarm => {
                self.timers.set_task_enabled(Task::AdvanceClock, false);
                self.context.save(&mut self.time, &self.alarm);
            }
        }
        if mode == Mode::GraphSensors {
            self.ring.reset();
        }
        self.time.force_redraw();
        Some(Entry { mode, from })
    }

    /// Sampler task. The reading is always kept for telemetry; it is only
    /// collected for the histogram while the graph is shown.
    pub fn sample(&mut self, board: &mut impl Board) -> u16 {
        let reading = board.read_channel(self.sensor);
        self.last_reading = Some(reading);
        if self.mode.current() == Mode::GraphSensors {
            self.ring.push(reading);
        }
        reading
    }

    /// Runs a timer task. Called from the timer interrupt with the state
    /// and peripherals locked.
    pub fn run_task(&mut self, task: Task, board: &mut impl Board, link: &mut impl Link) -> Outcome {
        match task {
            Task::AdvanceClock => {
                self.time.advance_second();
                Outcome::Ticked
            }
            Task::PollLink => match bridge::poll_link(self, board, link) {
                None => Outcome::Idle,
                Some(Ok(command)) => Outcome::Command(command),
                Some(Err(err)) => Outcome::Dropped(err),
            },
            Task::SendTelemetry => match bridge::send_telemetry(self, board, link) {
                Ok(report) => Outcome::Telemetry(report),
                Err(err) => Outcome::Dropped(err),
            },
            Task::SampleSensor => Outcome::Sampled(self.sample(board)),
        }
    }

    /// Software time base for boards without per-channel alarms.
    pub fn advance_timers(
        &mut self,
        elapsed_us: u32,
        board: &mut impl Board,
        link: &mut impl Link,
        mut report: impl FnMut(Task, Outcome),
    ) {
        for task in self.timers.advance(elapsed_us) {
            let outcome = self.run_task(task, board, link);
            report(task, outcome);
        }
    }
}
