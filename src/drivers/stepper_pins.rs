// SPDX-License-Identifier: GPL-3.0-or-later

//! STEP/DIR/ENABLE GPIO wrapper.
//!
//! Generic over `embedded_hal::digital::v2::OutputPin` rather than
//! hard-coded to specific `embassy_stm32` pins, since this core only
//! specifies pin *roles* and the concrete pin assignment is a
//! host-firmware concern.

use embedded_hal::digital::v2::OutputPin;

use crate::els::step_generator::PinCommand;

pub struct StepperPins<StepPin, DirPin, EnablePin> {
    step: StepPin,
    dir: DirPin,
    enable: EnablePin,
    invert_enable: bool,
}

impl<StepPin, DirPin, EnablePin, E> StepperPins<StepPin, DirPin, EnablePin>
where
    StepPin: OutputPin<Error = E>,
    DirPin: OutputPin<Error = E>,
    EnablePin: OutputPin<Error = E>,
{
    pub fn new(step: StepPin, dir: DirPin, enable: EnablePin, invert_enable: bool) -> Self {
        Self {
            step,
            dir,
            enable,
            invert_enable,
        }
    }

    pub fn set_enabled(&mut self, on: bool) -> Result<(), E> {
        let asserted = on ^ self.invert_enable;
        if asserted {
            self.enable.set_high()
        } else {
            self.enable.set_low()
        }
    }

    /// Drives STEP/DIR/ENABLE per the Step ISR's output for this tick.
    /// Called from the highest-priority ISR; must stay allocation-free.
    /// `cmd.enable_level`, when present, is how `StepGenerator::enable()`/
    /// `disable()`/`emergency_stop()` reach the physical ENABLE line —
    /// `StepGenerator` has no pin access of its own, so this is the one
    /// place that transition is actually applied.
    #[inline]
    pub fn apply(&mut self, cmd: PinCommand) -> Result<(), E> {
        if let Some(on) = cmd.enable_level {
            self.set_enabled(on)?;
        }
        if let Some(dir) = cmd.dir_change {
            if dir {
                self.dir.set_high()?;
            } else {
                self.dir.set_low()?;
            }
        }
        if cmd.step_high {
            self.step.set_high()
        } else {
            self.step.set_low()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct MockPin {
        high: bool,
    }

    impl OutputPin for MockPin {
        type Error = Infallible;
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }
    }

    fn pins(invert_enable: bool) -> StepperPins<MockPin, MockPin, MockPin> {
        StepperPins::new(MockPin::default(), MockPin::default(), MockPin::default(), invert_enable)
    }

    #[test]
    fn set_enabled_respects_invert_enable() {
        let mut p = pins(false);
        p.set_enabled(true).unwrap();
        assert!(p.enable.high);
        p.set_enabled(false).unwrap();
        assert!(!p.enable.high);

        let mut inverted = pins(true);
        inverted.set_enabled(true).unwrap();
        assert!(!inverted.enable.high);
    }

    #[test]
    fn apply_drives_enable_from_pin_command() {
        let mut p = pins(false);
        let cmd = PinCommand {
            step_high: false,
            dir_change: None,
            enable_level: Some(true),
        };
        p.apply(cmd).unwrap();
        assert!(p.enable.high);

        let cmd = PinCommand {
            step_high: true,
            dir_change: None,
            enable_level: None,
        };
        p.apply(cmd).unwrap();
        assert!(p.enable.high); // untouched when enable_level is None.
        assert!(p.step.high);
    }
}
