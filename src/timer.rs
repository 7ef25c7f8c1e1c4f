use heapless::Vec;

pub const CLOCK_PERIOD_US: u32 = 1_000_000;
pub const LINK_POLL_PERIOD_US: u32 = 10_000; // modem lines arrive at most every few ms
pub const TELEMETRY_PERIOD_US: u32 = 500_000;
pub const SAMPLE_PERIOD_US: u32 = 50_000;

pub const CHANNEL_COUNT: usize = 4;

/// One of the four hardware timer alarms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Channel {
    Timer0,
    Timer1,
    Timer2,
    Timer3,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] =
        [Channel::Timer0, Channel::Timer1, Channel::Timer2, Channel::Timer3];

    pub fn index(self) -> usize {
        match self {
            Channel::Timer0 => 0,
            Channel::Timer1 => 1,
            Channel::Timer2 => 2,
            Channel::Timer3 => 3,
        }
    }
}

/// The work a channel performs each time it expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Task {
    AdvanceClock,
    PollLink,
    SendTelemetry,
    SampleSensor,
}

/// Reloading countdown in microseconds.
pub struct CountDownTimer {
    period_us: u32,
    remaining_us: u32,
}

impl CountDownTimer {
    pub fn new(period_us: u32) -> CountDownTimer {
        Self {
            period_us,
            remaining_us: period_us,
        }
    }

    /// Counts down by `elapsed_us`. Returns true when the period ran out;
    /// the countdown then starts over from the full period.
    pub fn tick(&mut self, elapsed_us: u32) -> bool {
        self.remaining_us = self.remaining_us.saturating_sub(elapsed_us);
        if self.is_finished() {
            self.remaining_us = self.period_us;
            true
        } else {
            false
        }
    }

    pub fn set_period(&mut self, period_us: u32) {
        self.period_us = period_us;
        self.remaining_us = period_us;
    }

    pub fn period(&self) -> u32 {
        self.period_us
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_us == 0
    }
}

/// Shortest lead time when programming a hardware alarm.
pub const MIN_LEAD_US: u64 = 10;

/// Absolute schedule of one hardware alarm.
///
/// Each deadline is the previous deadline plus one period, so the time it
/// takes to service an interrupt never adds up across periods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at_us: u64,
}

impl Deadline {
    /// First deadline, one period after `now_us`.
    pub const fn start(now_us: u64, period_us: u32) -> Self {
        Self {
            at_us: now_us + period_us as u64,
        }
    }

    pub fn at_us(&self) -> u64 {
        self.at_us
    }

    /// Moves on by one period.
    /// param period_us: current period of the channel
    /// param now_us: counter value when the interrupt is serviced
    /// returns the instant to program; a deadline already missed fires as
    /// soon as possible while the schedule stays on its grid
    pub fn advance(&mut self, period_us: u32, now_us: u64) -> u64 {
        self.at_us += u64::from(period_us);
        self.at_us.max(now_us + MIN_LEAD_US)
    }
}

struct PeriodicTimer {
    task: Task,
    countdown: CountDownTimer,
    enabled: bool,
}

/// Four independent periodic channels, one task each.
///
/// The task is bound once by [`TimerService::init`]; only the period and the
/// interrupt mask change afterwards. A masked channel keeps counting but its
/// task is not handed out.
pub struct TimerService {
    slots: [Option<PeriodicTimer>; CHANNEL_COUNT],
}

impl TimerService {
    pub const fn new() -> Self {
        Self {
            slots: [None, None, None, None],
        }
    }

    pub fn init(&mut self, channel: Channel, task: Task, period_us: u32) {
        self.slots[channel.index()] = Some(PeriodicTimer {
            task,
            countdown: CountDownTimer::new(period_us),
            enabled: true,
        });
    }

    pub fn set_period(&mut self, channel: Channel, period_us: u32) {
        if let Some(slot) = self.slots[channel.index()].as_mut() {
            slot.countdown.set_period(period_us);
        }
    }

    pub fn period(&self, channel: Channel) -> Option<u32> {
        self.slots[channel.index()]
            .as_ref()
            .map(|slot| slot.countdown.period())
    }

    pub fn task(&self, channel: Channel) -> Option<Task> {
        self.slots[channel.index()].as_ref().map(|slot| slot.task)
    }

    /// Finds the channel a task is bound to.
    pub fn channel_of(&self, task: Task) -> Option<Channel> {
        Channel::ALL
            .into_iter()
            .find(|&channel| self.task(channel) == Some(task))
    }

    pub fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        if let Some(slot) = self.slots[channel.index()].as_mut() {
            slot.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.slots[channel.index()]
            .as_ref()
            .is_some_and(|slot| slot.enabled)
    }

    /// Masks or unmasks whichever channel runs `task`.
    pub fn set_task_enabled(&mut self, task: Task, enabled: bool) {
        if let Some(channel) = self.channel_of(task) {
            self.set_enabled(channel, enabled);
        }
    }

    /// Called from the hardware alarm interrupt of `channel`.
    /// Returns the task to run, or `None` while the channel is masked.
    pub fn fire(&self, channel: Channel) -> Option<Task> {
        self.slots[channel.index()]
            .as_ref()
            .filter(|slot| slot.enabled)
            .map(|slot| slot.task)
    }

    /// Software time base: advances every channel and returns the tasks that
    /// came due, in channel order.
    pub fn advance(&mut self, elapsed_us: u32) -> Vec<Task, CHANNEL_COUNT> {
        let mut due = Vec::new();
        for slot in self.slots.iter_mut().flatten() {
            if slot.countdown.tick(elapsed_us) && slot.enabled {
                // Capacity equals the channel count.
                let _ = due.push(slot.task);
            }
        }
        due
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_reloads() {
        let mut timer = CountDownTimer::new(3);
        assert!(!timer.tick(1));
        assert!(!timer.tick(1));
        assert!(timer.tick(1));
        assert!(!timer.is_finished());
        assert!(!timer.tick(2));
        assert!(timer.tick(5));
    }

    #[test]
    fn channels_fire_at_their_own_period() {
        let mut service = TimerService::new();
        service.init(Channel::Timer0, Task::AdvanceClock, 1000);
        service.init(Channel::Timer1, Task::PollLink, 250);

        let mut clock = 0;
        let mut poll = 0;
        for _ in 0..8 {
            for task in service.advance(250) {
                match task {
                    Task::AdvanceClock => clock += 1,
                    Task::PollLink => poll += 1,
                    _ => unreachable!(),
                }
            }
        }
        assert_eq!(clock, 2);
        assert_eq!(poll, 8);
    }

    #[test]
    fn masked_channel_is_not_dispatched() {
        let mut service = TimerService::new();
        service.init(Channel::Timer2, Task::AdvanceClock, 100);
        service.set_task_enabled(Task::AdvanceClock, false);
        assert!(service.advance(100).is_empty());
        assert_eq!(service.fire(Channel::Timer2), None);

        service.set_task_enabled(Task::AdvanceClock, true);
        assert_eq!(service.fire(Channel::Timer2), Some(Task::AdvanceClock));
        assert!(service.is_enabled(Channel::Timer2));
    }

    #[test]
    fn set_period_restarts_countdown() {
        let mut service = TimerService::new();
        service.init(Channel::Timer3, Task::SampleSensor, 100);
        assert!(service.advance(60).is_empty());
        service.set_period(Channel::Timer3, 50);
        assert_eq!(service.period(Channel::Timer3), Some(50));
        assert_eq!(service.advance(50).as_slice(), &[Task::SampleSensor]);
    }

    #[test]
    fn late_interrupts_do_not_drift_the_schedule() {
        let mut deadline = Deadline::start(0, 1_000_000);
        assert_eq!(deadline.at_us(), 1_000_000);
        // serviced 3 ms late every time
        assert_eq!(deadline.advance(1_000_000, 1_003_000), 2_000_000);
        assert_eq!(deadline.advance(1_000_000, 2_003_000), 3_000_000);
        assert_eq!(deadline.at_us(), 3_000_000);
    }

    #[test]
    fn missed_deadline_fires_soon_and_keeps_grid() {
        let mut deadline = Deadline::start(0, 1_000);
        assert_eq!(deadline.advance(1_000, 2_500), 2_500 + MIN_LEAD_US);
        assert_eq!(deadline.at_us(), 2_000);
        assert_eq!(deadline.advance(1_000, 2_600), 3_000);
    }

    #[test]
    fn unbound_channel_reports_nothing() {
        let service = TimerService::new();
        assert_eq!(service.fire(Channel::Timer1), None);
        assert_eq!(service.period(Channel::Timer1), None);
        assert_eq!(service.channel_of(Task::PollLink), None);
    }
}
