// SPDX-License-Identifier: GPL-3.0-or-later

//! Step-pulse hardware timer glue: a fixed-frequency basic timer driving
//! `StepGenerator::tick` from the highest-priority ISR, at a fixed period
//! rather than a per-pulse variable one, since the tick rate is constant.

use embassy_stm32::peripherals as p;
use embassy_stm32::rcc::low_level::RccPeripheral;
use embassy_stm32::timer::low_level::{Basic16bitInstance, GeneralPurpose16bitInstance};

type PulseTimerInstance = p::TIM7;

pub struct PulseTimer {
    timer: PulseTimerInstance,
    freq_hz: u32,
}

impl PulseTimer {
    /// Programs the timer to raise an update interrupt every
    /// `1/freq_hz` seconds; `freq_hz` must not exceed
    /// `consts::stepper::PULSE_TIMER_MAX_FREQ_HZ`.
    pub fn new(mut timer: PulseTimerInstance, freq_hz: u32) -> Self {
        debug_assert!(freq_hz <= crate::consts::stepper::PULSE_TIMER_MAX_FREQ_HZ);

        PulseTimerInstance::enable();
        timer.start();

        let timer_hz = PulseTimerInstance::frequency().0;
        let psc = (timer_hz / freq_hz).saturating_sub(1);
        unsafe {
            let regs = PulseTimerInstance::regs_gp16();
            regs.psc().write(|w| w.set_psc(psc.min(u16::MAX as u32) as u16));
            regs.arr().write(|w| w.set_arr(0));
            regs.dier().modify(|w| w.set_uie(true));
            regs.cr1().modify(|w| w.set_cen(true));
        }

        Self { timer, freq_hz }
    }

    pub fn freq_hz(&self) -> u32 {
        self.freq_hz
    }

    /// Called from the Step ISR entry point; clears the interrupt flag so
    /// the next tick is armed. The caller is expected to immediately call
    /// `StepGenerator::tick` (via `MotionCoordinator::step_tick`) and
    /// drive the STEP/DIR pins with the returned `PinCommand`.
    #[inline]
    pub fn clear_interrupt(&mut self) {
        self.timer.clear_update_interrupt();
    }
}
