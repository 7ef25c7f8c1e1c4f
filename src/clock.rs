use heapless::String;
use ufmt::uwrite;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn toggled(self) -> Self {
        match self {
            Meridiem::Am => Meridiem::Pm,
            Meridiem::Pm => Meridiem::Am,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Meridiem::Am => "am",
            Meridiem::Pm => "pm",
        }
    }
}

/// 12 hour wall clock value: hours 1..=12, minutes and seconds 0..=59.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct ClockTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub meridiem: Meridiem,
}

impl ClockTime {
    pub const fn new(hours: u8, minutes: u8, seconds: u8, meridiem: Meridiem) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            meridiem,
        }
    }

    /// Increments by 1 second.
    /// Returns true if the minute rolled over.
    ///
    /// The meridiem flips when the hour wraps from 12 back to 1.
    pub fn advance_second(&mut self) -> bool {
        self.seconds += 1;
        if self.seconds < 60 {
            return false;
        }
        self.seconds = 0;

        self.minutes += 1;
        if self.minutes >= 60 {
            self.minutes = 0;
            self.hours += 1;
            if self.hours >= 13 {
                self.hours = 1;
                self.meridiem = self.meridiem.toggled();
            }
        }
        true
    }

    /// Formats as `hh:mm:ssam`, zero padded.
    pub fn format_digital(&self) -> String<10> {
        let mut out: String<10> = String::new();
        // Ten characters always fit.
        let _ = uwrite!(
            out,
            "{}{}:{}{}:{}{}",
            self.hours / 10,
            self.hours % 10,
            self.minutes / 10,
            self.minutes % 10,
            self.seconds / 10,
            self.seconds % 10
        );
        let _ = out.push_str(self.meridiem.as_str());
        out
    }
}

/// Redraw requests consumed by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    pub time: bool,
    pub minute: bool,
}

/// The live clock plus the dirty flags that tell the renderer what is stale.
///
/// Mutated from the 1 Hz interrupt and from the protocol bridge, read by the
/// main loop. All access goes through [`crate::shared::Shared`].
pub struct TimeModel {
    now: ClockTime,
    time_changed: bool,
    minute_changed: bool,
}

impl TimeModel {
    pub const fn new(now: ClockTime) -> Self {
        Self {
            now,
            time_changed: true,
            minute_changed: true,
        }
    }

    pub fn now(&self) -> ClockTime {
        self.now
    }

    /// Replaces the whole value, e.g. when swapping in the alarm target for
    /// editing. Both redraw flags are raised.
    pub fn replace(&mut self, time: ClockTime) -> ClockTime {
        self.time_changed = true;
        self.minute_changed = true;
        core::mem::replace(&mut self.now, time)
    }

    /// Makes the next poll redraw everything.
    pub fn force_redraw(&mut self) {
        self.time_changed = true;
        self.minute_changed = true;
    }

    pub fn advance_second(&mut self) {
        if self.now.advance_second() {
            self.minute_changed = true;
        }
        self.time_changed = true;
    }

    pub fn set_hour(&mut self, hours: u8) {
        self.now.hours = hours;
        self.time_changed = true;
    }

    pub fn set_minute(&mut self, minutes: u8) {
        self.now.minutes = minutes;
        self.time_changed = true;
    }

    pub fn set_second(&mut self, seconds: u8) {
        self.now.seconds = seconds;
        self.time_changed = true;
    }

    pub fn toggle_meridiem(&mut self) {
        self.now.meridiem = self.now.meridiem.toggled();
        self.time_changed = true;
    }

    /// Reads and clears both flags in one go.
    pub fn take_changes(&mut self) -> Changes {
        let changes = Changes {
            time: self.time_changed,
            minute: self.minute_changed,
        };
        self.time_changed = false;
        self.minute_changed = false;
        changes
    }
}
