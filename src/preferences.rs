use crate::actuator::Actuator;
use crate::clock::{ClockTime, Meridiem};
use crate::sensors::SensorChannel;
use crate::timer::{CLOCK_PERIOD_US, LINK_POLL_PERIOD_US, SAMPLE_PERIOD_US, TELEMETRY_PERIOD_US};

/// PWM counter top shared by every PWM output; duty values are clamped to it.
pub const PWM_TOP: u16 = 40_000;

/// One sensor watched by the telemetry task.
/// channel: ADC channel that is read
/// actuator: Output switched on while the reading is below `limit`
/// limit: Raw ADC threshold (0..=4095)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Monitor {
    pub channel: SensorChannel,
    pub actuator: Actuator,
    pub limit: u16,
}

/// Preferences defines the consumer-selected settings of the node.
/// periods: Timer periods in microseconds
/// pwm_scale: Duty counts per app slider step for grow light and heater.
///            The app slider runs 0..=10, so 4000 spans the full PWM_TOP.
/// telemetry pins: Virtual pins used towards the app, must be within 70..=99
/// monitors: Sensors compared against their limit every telemetry period
/// start_time: Clock value at power up
/// alarm: Alarm target and volume (percent) at power up
pub struct Preferences {
    pub clock_period_us: u32,
    pub link_poll_period_us: u32,
    pub telemetry_period_us: u32,
    pub sample_period_us: u32,
    pub pwm_scale: u32,
    pub reading_pin: u8,
    pub notify_pin: u8,
    pub command_pin: u8,
    pub monitors: [Monitor; 3],
    pub start_time: ClockTime,
    pub alarm: ClockTime,
    pub alarm_volume: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            clock_period_us: CLOCK_PERIOD_US,
            link_poll_period_us: LINK_POLL_PERIOD_US,
            telemetry_period_us: TELEMETRY_PERIOD_US,
            sample_period_us: SAMPLE_PERIOD_US,
            pwm_scale: 4000,
            reading_pin: 74,
            notify_pin: 75,
            command_pin: 76,
            monitors: [
                Monitor {
                    channel: SensorChannel::Soil,
                    actuator: Actuator::Water,
                    limit: 1500,
                },
                Monitor {
                    channel: SensorChannel::Light,
                    actuator: Actuator::Light,
                    limit: 1000,
                },
                Monitor {
                    channel: SensorChannel::Ambient,
                    actuator: Actuator::Heater,
                    limit: 1800,
                },
            ],
            start_time: ClockTime::new(11, 59, 40, Meridiem::Am),
            alarm: ClockTime::new(12, 0, 0, Meridiem::Am),
            alarm_volume: 75,
        }
    }
}

impl Preferences {
    /// Converts an app slider value into a PWM duty.
    /// Negative values turn the output off, large ones saturate at PWM_TOP.
    /// param value: slider value received from the app
    /// returns: PWM duty for the grow light or heater
    pub fn duty(&self, value: i32) -> u16 {
        let Ok(steps) = u32::try_from(value) else {
            return 0;
        };
        steps
            .saturating_mul(self.pwm_scale)
            .min(u32::from(PWM_TOP)) as u16
    }

    /// Buzzer duty for an alarm volume in percent.
    /// param volume: alarm volume, values above 100 count as 100
    /// returns: PWM duty for the buzzer
    pub fn tone_duty(volume: u8) -> u16 {
        (u32::from(PWM_TOP) * u32::from(volume.min(100)) / 100) as u16
    }
}
