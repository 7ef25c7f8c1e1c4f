use core::fmt;

/// Reasons an inbound message or outbound request was dropped.
/// None of these are fatal; the caller logs them and carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Error {
    /// Fewer than three comma separated fields
    MalformedLine,
    /// Line did not fit the receive buffer before its newline
    LineOverflow,
    /// Virtual pin has no handler
    UnknownPin(i32),
    /// Time edit requested while edit mode is off
    NotEditing,
    /// Value outside the range accepted by the target field
    OutOfRange(i32),
    /// Outbound virtual pin outside 70..=99
    TelemetryPin(u8),
    /// No room on the link for an outbound line
    LinkBusy,
    /// Mode button released, or mode already active
    ModeUnchanged,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedLine => write!(f, "malformed line"),
            Error::LineOverflow => write!(f, "line overflow"),
            Error::UnknownPin(pin) => write!(f, "unknown virtual pin {}", pin),
            Error::NotEditing => write!(f, "edit mode is off"),
            Error::OutOfRange(value) => write!(f, "value {} out of range", value),
            Error::TelemetryPin(pin) => write!(f, "telemetry pin {} not in 70..=99", pin),
            Error::LinkBusy => write!(f, "link busy"),
            Error::ModeUnchanged => write!(f, "mode unchanged"),
        }
    }
}
