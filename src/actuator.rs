use embedded_hal::digital::OutputPin;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Actuator {
    Heater,
    Water,
    Light,
}

/// Sub-opcode carried by the actuator command pin in both directions:
/// `2 * actuator + on`, so 0/1 heater, 2/3 water, 4/5 light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct ActuatorCommand {
    pub actuator: Actuator,
    pub on: bool,
}

impl ActuatorCommand {
    pub fn decode(opcode: i32) -> Option<Self> {
        let actuator = match opcode {
            0 | 1 => Actuator::Heater,
            2 | 3 => Actuator::Water,
            4 | 5 => Actuator::Light,
            _ => return None,
        };
        Some(Self {
            actuator,
            on: opcode % 2 == 1,
        })
    }

    pub fn opcode(self) -> u32 {
        let base = match self.actuator {
            Actuator::Heater => 0,
            Actuator::Water => 2,
            Actuator::Light => 4,
        };
        base + u32::from(self.on)
    }
}

/// Last commanded state of every actuator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct ActuatorSet {
    pub heater: bool,
    pub water: bool,
    pub light: bool,
}

impl ActuatorSet {
    pub fn set(&mut self, actuator: Actuator, on: bool) {
        match actuator {
            Actuator::Heater => self.heater = on,
            Actuator::Water => self.water = on,
            Actuator::Light => self.light = on,
        }
    }

    pub fn get(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Heater => self.heater,
            Actuator::Water => self.water,
            Actuator::Light => self.light,
        }
    }
}

/// One dedicated output per actuator. Commands are applied one at a time;
/// each clears its output first and then sets it if requested.
pub struct Actuators<H, W, L> {
    heater: H,
    water: W,
    light: L,
    state: ActuatorSet,
}

impl<H, W, L> Actuators<H, W, L>
where
    H: OutputPin,
    W: OutputPin,
    L: OutputPin,
{
    pub fn new(mut heater: H, mut water: W, mut light: L) -> Self {
        // GPIO writes on this board cannot fail; the error types are Infallible.
        let _ = heater.set_low();
        let _ = water.set_low();
        let _ = light.set_low();
        Self {
            heater,
            water,
            light,
            state: ActuatorSet::default(),
        }
    }

    pub fn set_heater(&mut self, on: bool) {
        Self::drive(&mut self.heater, on);
        self.state.heater = on;
    }

    pub fn set_water(&mut self, on: bool) {
        Self::drive(&mut self.water, on);
        self.state.water = on;
    }

    pub fn set_light(&mut self, on: bool) {
        Self::drive(&mut self.light, on);
        self.state.light = on;
    }

    pub fn set(&mut self, actuator: Actuator, on: bool) {
        match actuator {
            Actuator::Heater => self.set_heater(on),
            Actuator::Water => self.set_water(on),
            Actuator::Light => self.set_light(on),
        }
    }

    pub fn state(&self) -> ActuatorSet {
        self.state
    }

    fn drive<P: OutputPin>(pin: &mut P, on: bool) {
        let _ = pin.set_low();
        if on {
            let _ = pin.set_high();
        }
    }
}
