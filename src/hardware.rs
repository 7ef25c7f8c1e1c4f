//! Pico bring-up and the concrete board, link and display behind the
//! hardware independent library.

use defmt::unwrap;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_0_2::adc::OneShot;
use rp_pico as bsp;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use bsp::hal::{
    self,
    adc::{Adc, AdcPin, TempSense},
    clocks::{init_clocks_and_plls, Clock},
    fugit::{ExtU32, RateExtU32},
    gpio::{
        bank0::{Gpio0, Gpio1, Gpio13, Gpio14, Gpio15, Gpio25, Gpio26, Gpio27, Gpio28, Gpio8, Gpio9},
        FunctionI2C, FunctionSioInput, FunctionSioOutput, FunctionUart, Pin, PullDown, PullNone,
        PullUp,
    },
    pac,
    pwm::{self, FreeRunning, Pwm1, Pwm2, Pwm3, Slice},
    timer::{Alarm, Alarm0, Alarm1, Alarm2, Alarm3, Instant},
    uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral},
    watchdog::Watchdog,
};

use garden_telemetry::actuator::{Actuator, Actuators};
use garden_telemetry::board::{Board, PwmChannel};
use garden_telemetry::preferences::{Preferences, PWM_TOP};
use garden_telemetry::error::Result;
use garden_telemetry::protocol::{Line, LineReader, Link, TxQueue, TX_CAPACITY};
use garden_telemetry::sensors::SensorChannel;
use garden_telemetry::timer::{Channel, Deadline, CHANNEL_COUNT};

const BAUD_RATE: u32 = 115_200;

type Output<I> = Pin<I, FunctionSioOutput, PullDown>;
type Analog<I> = AdcPin<Pin<I, FunctionSioInput, PullNone>>;
type PwmOut<S> = pwm::Channel<Slice<S, FreeRunning>, pwm::A>;

type ModemUart = UartPeripheral<
    Enabled,
    pac::UART0,
    (
        Pin<Gpio0, FunctionUart, PullDown>,
        Pin<Gpio1, FunctionUart, PullDown>,
    ),
>;

type DisplayI2c = hal::I2C<
    pac::I2C0,
    (
        Pin<Gpio8, FunctionI2C, PullUp>,
        Pin<Gpio9, FunctionI2C, PullUp>,
    ),
>;

pub type Display = Ssd1306<
    I2CInterface<DisplayI2c>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// Everything `main` hands over to the shared slots and the main loop.
pub struct Hardware {
    pub board: PicoBoard,
    pub link: UartLink,
    pub alarms: Alarms,
    pub display: Display,
}

pub struct PicoBoard {
    adc: Adc,
    soil: Analog<Gpio26>,
    light: Analog<Gpio27>,
    ambient: Analog<Gpio28>,
    temperature: TempSense,
    grow_light: PwmOut<Pwm1>,
    heater: PwmOut<Pwm2>,
    buzzer: PwmOut<Pwm3>,
    led: Output<Gpio25>,
    actuators: Actuators<Output<Gpio13>, Output<Gpio14>, Output<Gpio15>>,
}

fn convert<P>(adc: &mut Adc, pin: &mut P) -> u16
where
    Adc: OneShot<Adc, u16, P>,
{
    adc.read(pin).unwrap_or(0)
}

impl Board for PicoBoard {
    fn set_duty(&mut self, channel: PwmChannel, duty: u16) {
        let duty = duty.min(PWM_TOP);
        let _ = match channel {
            PwmChannel::GrowLight => self.grow_light.set_duty_cycle(duty),
            PwmChannel::Heater => self.heater.set_duty_cycle(duty),
            PwmChannel::Buzzer => self.buzzer.set_duty_cycle(duty),
        };
    }

    fn set_led(&mut self, on: bool) {
        let _ = if on { self.led.set_high() } else { self.led.set_low() };
    }

    fn set_actuator(&mut self, actuator: Actuator, on: bool) {
        self.actuators.set(actuator, on);
    }

    fn read_channel(&mut self, channel: SensorChannel) -> u16 {
        match channel {
            SensorChannel::Soil => convert(&mut self.adc, &mut self.soil),
            SensorChannel::Light => convert(&mut self.adc, &mut self.light),
            SensorChannel::Ambient => convert(&mut self.adc, &mut self.ambient),
            SensorChannel::Temperature => convert(&mut self.adc, &mut self.temperature),
        }
    }
}

/// Serial link to the Wi-Fi modem. Received bytes are assembled into
/// lines; an overlong line is discarded up to its newline and reported.
/// Outbound lines wait in a queue that is fed to the UART FIFO without
/// blocking.
pub struct UartLink {
    uart: ModemUart,
    reader: LineReader,
    tx: TxQueue<TX_CAPACITY>,
}

impl UartLink {
    /// Moves queued bytes into the transmit FIFO until it is full.
    pub fn pump(&mut self) {
        let uart = &self.uart;
        self.tx.drain(|bytes| match uart.write_raw(bytes) {
            Ok(rest) => bytes.len() - rest.len(),
            Err(_) => 0,
        });
    }
}

impl Link for UartLink {
    fn try_send_line(&mut self, line: &str) -> bool {
        let queued = self.tx.enqueue(line);
        self.pump();
        queued
    }

    fn try_receive_line(&mut self) -> Option<Result<Line>> {
        self.pump();
        let mut byte = [0u8; 1];
        while let Ok(1) = self.uart.read_raw(&mut byte) {
            if let Some(line) = self.reader.push(byte[0]) {
                return Some(line);
            }
        }
        None
    }
}

/// One hardware alarm per timer channel, each on its own absolute
/// schedule so servicing time does not drift the periods.
pub struct Alarms {
    timer: hal::Timer,
    deadlines: [Deadline; CHANNEL_COUNT],
    alarm0: Alarm0,
    alarm1: Alarm1,
    alarm2: Alarm2,
    alarm3: Alarm3,
}

fn schedule(alarm: &mut impl Alarm, at_us: u64, period_us: u32) {
    alarm.clear_interrupt();
    if alarm.schedule_at(Instant::from_ticks(at_us)).is_err() {
        // Deadline already behind the counter, fall back to relative.
        let _ = alarm.schedule(period_us.micros());
    }
}

impl Alarms {
    fn now_us(&self) -> u64 {
        self.timer.get_counter().ticks()
    }

    fn program(&mut self, channel: Channel, at_us: u64, period_us: u32) {
        match channel {
            Channel::Timer0 => schedule(&mut self.alarm0, at_us, period_us),
            Channel::Timer1 => schedule(&mut self.alarm1, at_us, period_us),
            Channel::Timer2 => schedule(&mut self.alarm2, at_us, period_us),
            Channel::Timer3 => schedule(&mut self.alarm3, at_us, period_us),
        }
    }

    /// Starts the channel's schedule one period from now.
    pub fn start(&mut self, channel: Channel, period_us: u32) {
        let deadline = Deadline::start(self.now_us(), period_us);
        self.deadlines[channel.index()] = deadline;
        self.program(channel, deadline.at_us(), period_us);
    }

    /// Acknowledges the channel's interrupt and schedules the next one,
    /// one period after the previous deadline.
    pub fn rearm(&mut self, channel: Channel, period_us: u32) {
        let now_us = self.now_us();
        let at_us = self.deadlines[channel.index()].advance(period_us, now_us);
        self.program(channel, at_us, period_us);
    }
}

pub fn timer_interrupt(channel: Channel) -> pac::Interrupt {
    match channel {
        Channel::Timer0 => pac::Interrupt::TIMER_IRQ_0,
        Channel::Timer1 => pac::Interrupt::TIMER_IRQ_1,
        Channel::Timer2 => pac::Interrupt::TIMER_IRQ_2,
        Channel::Timer3 => pac::Interrupt::TIMER_IRQ_3,
    }
}

/// Unmasks the timer interrupts. Call once every shared slot is filled.
pub fn start_timers() {
    for channel in Channel::ALL {
        // SAFETY: the handlers only touch state behind critical sections.
        unsafe { pac::NVIC::unmask(timer_interrupt(channel)) };
    }
}

fn pwm_output<S: pwm::SliceId>(mut slice: Slice<S, FreeRunning>) -> PwmOut<S> {
    slice.set_top(PWM_TOP);
    slice.enable();
    slice.channel_a
}

/// Brings up clocks, pins and peripherals. The alarms are scheduled with
/// the configured periods but stay masked until [`start_timers`].
pub fn init(prefs: &Preferences) -> Hardware {
    let mut pac = unwrap!(pac::Peripherals::take());
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    let clocks = unwrap!(init_clocks_and_plls(
        bsp::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok());

    let sio = hal::Sio::new(pac.SIO);
    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Modem
    let uart_pins = (pins.gpio0.into_function(), pins.gpio1.into_function());
    let uart = unwrap!(UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(BAUD_RATE.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .ok());
    let link = UartLink {
        uart,
        reader: LineReader::new(),
        tx: TxQueue::new(),
    };

    // Sensors
    let mut adc = Adc::new(pac.ADC, &mut pac.RESETS);
    let temperature = unwrap!(adc.take_temp_sensor());
    let soil = unwrap!(AdcPin::new(pins.gpio26.into_floating_input()).ok());
    let light = unwrap!(AdcPin::new(pins.gpio27.into_floating_input()).ok());
    let ambient = unwrap!(AdcPin::new(pins.gpio28.into_floating_input()).ok());

    // PWM outputs
    let slices = pwm::Slices::new(pac.PWM, &mut pac.RESETS);
    let mut grow_light = pwm_output(slices.pwm1);
    grow_light.output_to(pins.gpio2);
    let mut heater = pwm_output(slices.pwm2);
    heater.output_to(pins.gpio4);
    let mut buzzer = pwm_output(slices.pwm3);
    buzzer.output_to(pins.gpio6);
    let _ = grow_light.set_duty_cycle(0);
    let _ = heater.set_duty_cycle(0);
    let _ = buzzer.set_duty_cycle(0);

    let board = PicoBoard {
        adc,
        soil,
        light,
        ambient,
        temperature,
        grow_light,
        heater,
        buzzer,
        led: pins.led.into_push_pull_output(),
        actuators: Actuators::new(
            pins.gpio13.into_push_pull_output(),
            pins.gpio14.into_push_pull_output(),
            pins.gpio15.into_push_pull_output(),
        ),
    };

    // Display
    let sda: Pin<Gpio8, FunctionI2C, PullUp> = pins.gpio8.reconfigure();
    let scl: Pin<Gpio9, FunctionI2C, PullUp> = pins.gpio9.reconfigure();
    let i2c = hal::I2C::i2c0(
        pac.I2C0,
        sda,
        scl,
        400.kHz(),
        &mut pac.RESETS,
        &clocks.system_clock,
    );
    let mut display = Ssd1306::new(
        I2CDisplayInterface::new(i2c),
        DisplaySize128x64,
        DisplayRotation::Rotate0,
    )
    .into_buffered_graphics_mode();
    unwrap!(display.init().ok());

    // Timers
    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let mut alarms = Alarms {
        timer,
        deadlines: [Deadline::start(0, 0); CHANNEL_COUNT],
        alarm0: unwrap!(timer.alarm_0()),
        alarm1: unwrap!(timer.alarm_1()),
        alarm2: unwrap!(timer.alarm_2()),
        alarm3: unwrap!(timer.alarm_3()),
    };
    let periods = [
        prefs.clock_period_us,
        prefs.link_poll_period_us,
        prefs.telemetry_period_us,
        prefs.sample_period_us,
    ];
    for (channel, period) in Channel::ALL.into_iter().zip(periods) {
        alarms.start(channel, period);
    }
    alarms.alarm0.enable_interrupt();
    alarms.alarm1.enable_interrupt();
    alarms.alarm2.enable_interrupt();
    alarms.alarm3.enable_interrupt();

    Hardware {
        board,
        link,
        alarms,
        display,
    }
}
