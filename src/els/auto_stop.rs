// SPDX-License-Identifier: GPL-3.0-or-later

//! AutoStop: halts carriage motion at a specific absolute Z position.
//!
//! Polled from the main loop, never from an ISR: a non-realtime
//! supervisory check run outside interrupt context, as opposed to the
//! ISR-critical `StepGenerator`/`Synchronizer` pair.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovingDirection {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    None,
    Halt,
}

pub struct AutoStop {
    target: i32,
    armed: bool,
    reached: bool,
}

impl AutoStop {
    pub fn new() -> Self {
        Self {
            target: 0,
            armed: false,
            reached: false,
        }
    }

    pub fn arm(&mut self, target_abs_steps: i32) {
        self.target = target_abs_steps;
        self.armed = true;
        self.reached = false;
    }

    pub fn clear(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Called periodically by MotionCoordinator, never from an ISR.
    /// Returns `Halt` exactly once, the first tick the target is crossed
    /// or reached in the direction of travel. Overshoot by up to
    /// one Synchronizer tick is expected and accepted.
    pub fn poll(&mut self, current_pos: i32, moving_direction: MovingDirection) -> TriggerAction {
        if !self.armed {
            return TriggerAction::None;
        }

        let crossed = match moving_direction {
            MovingDirection::Forward => current_pos >= self.target,
            MovingDirection::Reverse => current_pos <= self.target,
        };

        if crossed {
            self.reached = true;
            self.armed = false;
            TriggerAction::Halt
        } else {
            TriggerAction::None
        }
    }

    /// Atomically reads-and-clears `reached`, exposed to the UI boundary.
    pub fn consume_reached(&mut self) -> bool {
        let r = self.reached;
        self.reached = false;
        r
    }
}

impl Default for AutoStop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Halts exactly once at/after the target, never re-fires until re-armed.
    #[test]
    fn scenario_s5_halts_exactly_once_moving_forward() {
        let mut auto = AutoStop::new();
        auto.arm(1000);

        assert_eq!(auto.poll(900, MovingDirection::Forward), TriggerAction::None);
        assert_eq!(auto.poll(1000, MovingDirection::Forward), TriggerAction::Halt);
        assert!(!auto.is_armed());
        // Does not re-fire even though current_pos stays >= target.
        assert_eq!(auto.poll(1001, MovingDirection::Forward), TriggerAction::None);
    }

    #[test]
    fn halts_on_reverse_travel_crossing_target() {
        let mut auto = AutoStop::new();
        auto.arm(-500);
        assert_eq!(auto.poll(-400, MovingDirection::Reverse), TriggerAction::None);
        assert_eq!(auto.poll(-500, MovingDirection::Reverse), TriggerAction::Halt);
    }

    #[test]
    fn overshoot_still_triggers_halt_once() {
        let mut auto = AutoStop::new();
        auto.arm(100);
        // One synchronizer tick jumped straight past the target.
        assert_eq!(auto.poll(140, MovingDirection::Forward), TriggerAction::Halt);
    }

    #[test]
    fn clear_disarms_without_setting_reached() {
        let mut auto = AutoStop::new();
        auto.arm(100);
        auto.clear();
        assert!(!auto.is_armed());
        assert_eq!(auto.poll(200, MovingDirection::Forward), TriggerAction::None);
        assert!(!auto.consume_reached());
    }

    #[test]
    fn consume_reached_is_read_and_clear() {
        let mut auto = AutoStop::new();
        auto.arm(10);
        auto.poll(10, MovingDirection::Forward);
        assert!(auto.consume_reached());
        assert!(!auto.consume_reached());
    }

    #[test]
    fn not_armed_never_triggers() {
        let mut auto = AutoStop::new();
        assert_eq!(auto.poll(999_999, MovingDirection::Forward), TriggerAction::None);
    }
}
