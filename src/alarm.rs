use crate::clock::ClockTime;

/// Alarm target plus arm and ringing flags.
///
/// The alarm rings once when the live clock equals the target while armed.
/// It keeps ringing until dismissed or disarmed by an explicit command.
pub struct AlarmState {
    pub target: ClockTime,
    pub volume: u8,
    armed: bool,
    ringing: bool,
    status_changed: bool,
}

impl AlarmState {
    pub fn new(target: ClockTime, volume: u8) -> Self {
        Self {
            target,
            volume,
            armed: false,
            ringing: false,
            status_changed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing
    }

    /// Arms or disarms. Disarming also silences a ringing alarm.
    /// Returns true if the alarm was ringing and the tone must stop.
    pub fn arm(&mut self, armed: bool) -> bool {
        self.armed = armed;
        self.status_changed = true;
        if armed {
            false
        } else {
            core::mem::take(&mut self.ringing)
        }
    }

    /// Silences a ringing alarm and leaves it armed.
    pub fn dismiss(&mut self) -> bool {
        core::mem::take(&mut self.ringing)
    }

    /// Compares against the live clock. Returns true exactly when the alarm
    /// starts ringing.
    pub fn check(&mut self, now: &ClockTime) -> bool {
        if self.armed && !self.ringing && *now == self.target {
            self.ringing = true;
            true
        } else {
            false
        }
    }

    /// Returns the arm state if it changed since the last call, so the
    /// status line is redrawn once per change.
    pub fn take_status_change(&mut self) -> Option<bool> {
        core::mem::take(&mut self.status_changed).then_some(self.armed)
    }
}
