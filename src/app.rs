//! Main loop side of the node: one `poll` per pass copies whatever the
//! interrupts changed out of the shared state and redraws the stale parts
//! of the current screen.

use crate::board::{Board, PwmChannel};
use crate::clock::{Changes, ClockTime};
use crate::mode::Mode;
use crate::preferences::Preferences;
use crate::rendering::{
    self, render_alarm_status, render_hands, render_histogram, render_time, render_title, Lcd,
};
use crate::sensors::{Histogram, RING_CAPACITY};
use crate::shared::Shared;
use crate::state::{DeviceState, Entry};

/// What one pass did, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Pass {
    pub entry: Option<Entry>,
    pub alarm_started: bool,
    pub graphed: bool,
    /// Something was drawn and the display needs flushing.
    pub redrawn: bool,
}

/// Snapshot taken inside the critical section.
struct Frame {
    entry: Option<Entry>,
    mode: Mode,
    changes: Changes,
    now: ClockTime,
    armed: bool,
    status: Option<bool>,
    alarm_started: bool,
    samples: Option<[u16; RING_CAPACITY]>,
}

pub fn title(mode: Mode) -> &'static str {
    match mode {
        Mode::Clock => rendering::CLOCK_TITLE,
        Mode::SetAlarm => rendering::SET_ALARM_TITLE,
        Mode::GraphSensors => rendering::GRAPH_TITLE,
    }
}

/// Runs one main loop pass. Returns `None` until both slots are initialized.
pub fn poll<B: Board>(
    state: &Shared<DeviceState>,
    board: &Shared<B>,
    lcd: &mut impl Lcd,
) -> Option<Pass> {
    let frame = critical_section::with(|cs| {
        state.lock_in(cs, |s| {
            let entry = s.enter_mode();
            let mode = s.mode.current();
            let changes = s.time.take_changes();
            let now = s.time.now();

            let alarm_started = mode == Mode::Clock && changes.time && s.alarm.check(&now);
            if alarm_started {
                let duty = Preferences::tone_duty(s.alarm.volume);
                board.lock_in(cs, |b| b.set_duty(PwmChannel::Buzzer, duty));
            }

            Frame {
                entry,
                mode,
                changes,
                now,
                armed: s.alarm.is_armed(),
                status: s.alarm.take_status_change(),
                alarm_started,
                samples: match mode {
                    Mode::GraphSensors => s.ring.take_full(),
                    _ => None,
                },
            }
        })
    })?;

    let mut pass = Pass {
        entry: frame.entry,
        alarm_started: frame.alarm_started,
        ..Pass::default()
    };

    if let Some(entry) = frame.entry {
        render_title(lcd, title(entry.mode));
        if entry.mode != Mode::GraphSensors {
            render_alarm_status(lcd, frame.armed);
        }
        // The alarm editor shows the target's hands once; edits are numeric only.
        if entry.mode == Mode::SetAlarm {
            render_hands(lcd, &frame.now);
        }
        pass.redrawn = true;
    }

    match frame.mode {
        Mode::Clock | Mode::SetAlarm => {
            if frame.changes.time {
                render_time(lcd, &frame.now);
                pass.redrawn = true;
            }
            if frame.mode == Mode::Clock && frame.changes.minute {
                render_hands(lcd, &frame.now);
                pass.redrawn = true;
            }
            if let (Some(armed), None) = (frame.status, frame.entry) {
                render_alarm_status(lcd, armed);
                pass.redrawn = true;
            }
        }
        Mode::GraphSensors => {
            if let Some(samples) = frame.samples {
                let histogram = Histogram::from_samples(&samples);
                render_histogram(lcd, &histogram);
                pass.graphed = true;
                pass.redrawn = true;
            }
        }
    }

    Some(pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Meridiem;
    use crate::preferences::PWM_TOP;
    use crate::testing::{Draw, MockBoard, RecordingLcd};

    fn setup(prefs: Preferences) -> (Shared<DeviceState>, Shared<MockBoard>) {
        let state = Shared::new();
        state.init(DeviceState::new(prefs));
        let board = Shared::new();
        board.init(MockBoard::default());
        (state, board)
    }

    fn is_bitmap(call: &Draw) -> bool {
        matches!(call, Draw::Bitmap(_))
    }

    fn is_clear_area(call: &Draw) -> bool {
        matches!(call, Draw::ClearArea)
    }

    #[test]
    fn nothing_to_do_before_init() {
        let state: Shared<DeviceState> = Shared::new();
        let board: Shared<MockBoard> = Shared::new();
        assert_eq!(poll(&state, &board, &mut RecordingLcd::default()), None);
    }

    #[test]
    fn first_pass_draws_clock_screen() {
        let (state, board) = setup(Preferences::default());
        let mut lcd = RecordingLcd::default();

        let pass = poll(&state, &board, &mut lcd).unwrap();
        assert_eq!(pass.entry, Some(Entry { mode: Mode::Clock, from: Mode::Clock }));
        assert!(pass.redrawn);
        assert_eq!(lcd.calls[0], Draw::Clear);
        assert_eq!(lcd.texts(), ["Clock Mode", "ALARM OFF", "11:59:40am"]);
        assert_eq!(lcd.count(is_bitmap), 1);
        assert_eq!(lcd.count(|call| matches!(call, Draw::Line(..))), 2);

        let mut lcd = RecordingLcd::default();
        let pass = poll(&state, &board, &mut lcd).unwrap();
        assert!(!pass.redrawn);
        assert!(lcd.calls.is_empty());
    }

    #[test]
    fn seconds_redraw_time_and_minutes_redraw_hands() {
        let (state, board) = setup(Preferences::default());
        poll(&state, &board, &mut RecordingLcd::default());

        state.lock(|s| s.time.advance_second());
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        assert_eq!(lcd.texts(), ["11:59:41am"]);
        assert_eq!(lcd.count(is_bitmap), 0);

        state.lock(|s| (0..19).for_each(|_| s.time.advance_second()));
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        // The meridiem flips on the 12 to 1 wrap, not on 11 to 12.
        assert_eq!(lcd.texts(), ["12:00:00am"]);
        assert_eq!(lcd.count(is_bitmap), 1);
    }

    #[test]
    fn armed_alarm_starts_tone_at_target() {
        let mut prefs = Preferences::default();
        prefs.start_time = ClockTime::new(6, 59, 59, Meridiem::Am);
        prefs.alarm = ClockTime::new(7, 0, 0, Meridiem::Am);
        let (state, board) = setup(prefs);
        poll(&state, &board, &mut RecordingLcd::default());

        state.lock(|s| s.alarm.arm(true));
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        assert_eq!(lcd.texts(), ["ALARM ON "]);

        state.lock(|s| s.time.advance_second());
        let pass = poll(&state, &board, &mut RecordingLcd::default()).unwrap();
        assert!(pass.alarm_started);
        assert_eq!(board.lock(|b| b.buzzer), Some(PWM_TOP / 4 * 3));

        state.lock(|s| s.time.advance_second());
        let pass = poll(&state, &board, &mut RecordingLcd::default()).unwrap();
        assert!(!pass.alarm_started);
        assert_eq!(board.lock(|b| b.buzzer_writes), Some(1));
    }

    #[test]
    fn disarmed_alarm_stays_silent() {
        let mut prefs = Preferences::default();
        prefs.start_time = ClockTime::new(6, 59, 59, Meridiem::Am);
        prefs.alarm = ClockTime::new(7, 0, 0, Meridiem::Am);
        let (state, board) = setup(prefs);
        state.lock(|s| s.time.advance_second());

        let pass = poll(&state, &board, &mut RecordingLcd::default()).unwrap();
        assert!(!pass.alarm_started);
        assert_eq!(board.lock(|b| b.buzzer_writes), Some(0));
    }

    #[test]
    fn set_alarm_screen_edits_target_without_hands() {
        let (state, board) = setup(Preferences::default());
        poll(&state, &board, &mut RecordingLcd::default());

        state.lock(|s| s.mode.set_mode(Mode::SetAlarm));
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        assert_eq!(lcd.texts(), ["Setting Alarm", "ALARM OFF", "12:00:00am"]);
        assert_eq!(lcd.count(is_bitmap), 1);

        state.lock(|s| {
            s.time.set_hour(6);
            s.time.set_minute(30);
        });
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        assert_eq!(lcd.texts(), ["06:30:00am"]);
        assert_eq!(lcd.count(is_bitmap), 0);

        state.lock(|s| s.mode.set_mode(Mode::Clock));
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        assert_eq!(lcd.texts(), ["Clock Mode", "ALARM OFF", "11:59:40am"]);
        assert_eq!(
            state.lock(|s| s.alarm.target),
            Some(ClockTime::new(6, 30, 0, Meridiem::Am))
        );
    }

    #[test]
    fn graph_renders_once_per_full_ring() {
        let (state, board) = setup(Preferences::default());
        let mut sensors = MockBoard::default();
        sensors.readings = [700, 0, 0, 0];

        state.lock(|s| s.mode.set_mode(Mode::GraphSensors));
        let mut lcd = RecordingLcd::default();
        poll(&state, &board, &mut lcd);
        assert_eq!(lcd.texts(), ["Sensor Graph"]);

        state.lock(|s| (0..19).for_each(|_| {
            s.sample(&mut sensors);
        }));
        let mut lcd = RecordingLcd::default();
        let pass = poll(&state, &board, &mut lcd).unwrap();
        assert!(!pass.graphed);
        assert_eq!(lcd.count(is_clear_area), 0);

        state.lock(|s| s.sample(&mut sensors));
        let mut lcd = RecordingLcd::default();
        let pass = poll(&state, &board, &mut lcd).unwrap();
        assert!(pass.graphed);
        assert_eq!(lcd.count(is_clear_area), 1);
        assert_eq!(state.lock(|s| s.ring.len()), Some(0));

        let mut lcd = RecordingLcd::default();
        assert!(!poll(&state, &board, &mut lcd).unwrap().graphed);
    }
}
