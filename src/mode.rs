use crate::alarm::AlarmState;
use crate::clock::{ClockTime, TimeModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Mode {
    Clock,
    SetAlarm,
    GraphSensors,
}

/// Which screen is active and whether it still needs its one-time setup.
pub struct ModeState {
    current: Mode,
    previous: Mode,
    entering: bool,
}

impl ModeState {
    pub const fn new(initial: Mode) -> Self {
        Self {
            current: initial,
            previous: initial,
            entering: true,
        }
    }

    pub fn current(&self) -> Mode {
        self.current
    }

    pub fn previous(&self) -> Mode {
        self.previous
    }

    pub fn is_entering(&self) -> bool {
        self.entering
    }

    /// Requests a transition. Requesting the active mode changes nothing.
    /// Returns true if the mode changed.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if mode == self.current {
            return false;
        }
        self.previous = self.current;
        self.current = mode;
        self.entering = true;
        true
    }

    /// Consumes the setup request. Returns the mode being left, or `None`
    /// when no setup is pending.
    pub fn take_entry(&mut self) -> Option<Mode> {
        core::mem::take(&mut self.entering).then_some(self.previous)
    }
}

/// Clock value parked while the live fields show the alarm target.
///
/// Entering alarm editing saves the clock and loads the alarm target into
/// the live time; leaving commits the edited value back to the alarm and
/// restores the clock.
#[derive(Default)]
pub struct ModeContext {
    saved_clock: Option<ClockTime>,
}

impl ModeContext {
    pub const fn new() -> Self {
        Self { saved_clock: None }
    }

    pub fn is_editing_alarm(&self) -> bool {
        self.saved_clock.is_some()
    }

    /// Swaps the alarm target in. A second save while already editing is
    /// ignored so the parked clock is never overwritten.
    pub fn save(&mut self, time: &mut TimeModel, alarm: &AlarmState) {
        if self.saved_clock.is_none() {
            self.saved_clock = Some(time.replace(alarm.target));
        }
    }

    /// Commits the edited target and swaps the clock back in.
    /// Returns false if nothing was saved.
    pub fn restore(&mut self, time: &mut TimeModel, alarm: &mut AlarmState) -> bool {
        match self.saved_clock.take() {
            Some(clock) => {
                alarm.target = time.replace(clock);
                true
            }
            None => false,
        }
    }
}
