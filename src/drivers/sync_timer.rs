// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync ISR hardware timer glue: a fixed-frequency basic timer driving
//! `Synchronizer::tick`, at mid priority between the Step ISR and the
//! main loop. Structurally identical to `pulse_timer.rs` — the same
//! constant-rate timer interrupt shape, just at a different,
//! reconfigurable rate.

use embassy_stm32::peripherals as p;
use embassy_stm32::rcc::low_level::RccPeripheral;
use embassy_stm32::timer::low_level::{Basic16bitInstance, GeneralPurpose16bitInstance};

type SyncTimerInstance = p::TIM6;

pub struct SyncTimer {
    timer: SyncTimerInstance,
    freq_hz: u32,
}

impl SyncTimer {
    pub fn new(mut timer: SyncTimerInstance, freq_hz: u32) -> Self {
        SyncTimerInstance::enable();
        timer.start();
        let timer_hz = SyncTimerInstance::frequency().0;
        let psc = (timer_hz / freq_hz).saturating_sub(1);
        unsafe {
            let regs = SyncTimerInstance::regs_gp16();
            regs.psc().write(|w| w.set_psc(psc.min(u16::MAX as u32) as u16));
            regs.arr().write(|w| w.set_arr(0));
            regs.dier().modify(|w| w.set_uie(true));
        }
        Self { timer, freq_hz }
    }

    /// Retimes the hardware timer to a new `update_freq_hz` without
    /// touching `Synchronizer`'s own state; the caller is responsible for
    /// bracketing this with `Synchronizer::enable(false)` /
    /// `enable(true)` so no tick lands mid-reconfiguration.
    pub fn set_freq_hz(&mut self, freq_hz: u32) {
        let timer_hz = SyncTimerInstance::frequency().0;
        let psc = (timer_hz / freq_hz).saturating_sub(1);
        unsafe {
            SyncTimerInstance::regs_gp16()
                .psc()
                .write(|w| w.set_psc(psc.min(u16::MAX as u32) as u16));
        }
        self.freq_hz = freq_hz;
    }

    pub fn freq_hz(&self) -> u32 {
        self.freq_hz
    }

    pub fn start(&mut self) {
        unsafe { SyncTimerInstance::regs_gp16().cr1().modify(|w| w.set_cen(true)) }
    }

    pub fn stop(&mut self) {
        unsafe { SyncTimerInstance::regs_gp16().cr1().modify(|w| w.set_cen(false)) }
    }

    #[inline]
    pub fn clear_interrupt(&mut self) {
        self.timer.clear_update_interrupt();
    }
}
