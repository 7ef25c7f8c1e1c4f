//! Entry point, shared slots and timer interrupt handlers.

use bsp::entry;
use defmt::*;
use defmt_rtt as _;
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::pac::interrupt;
use garden_telemetry::app;
use garden_telemetry::preferences::Preferences;
use garden_telemetry::rendering::GraphicsLcd;
use garden_telemetry::shared::Shared;
use garden_telemetry::state::{DeviceState, Outcome};
use garden_telemetry::timer::{Channel, Task};

use crate::hardware::{self, Alarms, PicoBoard, UartLink};

static STATE: Shared<DeviceState> = Shared::new();
static BOARD: Shared<PicoBoard> = Shared::new();
static LINK: Shared<UartLink> = Shared::new();
static ALARMS: Shared<Alarms> = Shared::new();

#[entry]
fn main() -> ! {
    info!("Garden node starting");

    let prefs = Preferences::default();
    let hw = hardware::init(&prefs);

    STATE.init(DeviceState::new(prefs));
    BOARD.init(hw.board);
    LINK.init(hw.link);
    ALARMS.init(hw.alarms);
    hardware::start_timers();

    let mut lcd = GraphicsLcd::new(hw.display);

    info!("Garden node ready");

    loop {
        LINK.lock(|link| link.pump());
        let Some(pass) = app::poll(&STATE, &BOARD, &mut lcd) else {
            continue;
        };
        if let Some(entry) = pass.entry {
            info!("mode {} -> {}", entry.from, entry.mode);
        }
        if pass.alarm_started {
            info!("alarm ringing");
        }
        if pass.graphed {
            debug!("histogram drawn");
        }
        if pass.redrawn && lcd.inner_mut().flush().is_err() {
            warn!("display flush failed");
        }
    }
}

/// Shared body of the four timer interrupts: acknowledge and re-arm the
/// alarm, then run the channel's task unless it is masked.
fn on_timer(channel: Channel) {
    let fired = critical_section::with(|cs| {
        STATE
            .lock_in(cs, |state| {
                let period = state.timers.period(channel)?;
                ALARMS.lock_in(cs, |alarms| alarms.rearm(channel, period));
                let task = state.timers.fire(channel)?;
                let outcome = BOARD
                    .lock_in(cs, |board| {
                        LINK.lock_in(cs, |link| state.run_task(task, board, link))
                    })
                    .flatten()?;
                Some((task, outcome))
            })
            .flatten()
    });
    if let Some((task, outcome)) = fired {
        report(task, outcome);
    }
}

fn report(task: Task, outcome: Outcome) {
    match outcome {
        Outcome::Ticked | Outcome::Idle => {}
        Outcome::Command(command) => info!("command {}", command),
        Outcome::Dropped(err) => warn!("{}: dropped, {}", task, err),
        Outcome::Telemetry(report) => debug!("telemetry {}", report),
        Outcome::Sampled(reading) => trace!("sample {}", reading),
    }
}

#[interrupt]
fn TIMER_IRQ_0() {
    on_timer(Channel::Timer0);
}

#[interrupt]
fn TIMER_IRQ_1() {
    on_timer(Channel::Timer1);
}

#[interrupt]
fn TIMER_IRQ_2() {
    on_timer(Channel::Timer2);
}

#[interrupt]
fn TIMER_IRQ_3() {
    on_timer(Channel::Timer3);
}
