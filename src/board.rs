use crate::actuator::Actuator;
use crate::sensors::SensorChannel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum PwmChannel {
    GrowLight,
    Heater,
    Buzzer,
}

/// Peripherals the control logic drives. Every call is short and never
/// blocks, so it may run from interrupt context.
pub trait Board {
    /// Duty in counts of [`crate::preferences::PWM_TOP`].
    fn set_duty(&mut self, channel: PwmChannel, duty: u16);

    fn set_led(&mut self, on: bool);

    fn set_actuator(&mut self, actuator: Actuator, on: bool);

    /// One conversion, 0..=4095.
    fn read_channel(&mut self, channel: SensorChannel) -> u16;
}
