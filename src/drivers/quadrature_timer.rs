// SPDX-License-Identifier: GPL-3.0-or-later

//! Hardware quadrature decoder glue: a general-purpose `embassy_stm32`
//! timer configured in encoder mode 3 (x4 decode on both A/B edges),
//! driven through the low-level register API (`regs_gp16()`) rather than
//! a higher-level peripheral wrapper, since encoder mode isn't exposed by
//! the high-level timer driver.

use embassy_stm32::peripherals as p;
use embassy_stm32::rcc::low_level::RccPeripheral;
use embassy_stm32::timer::low_level::GeneralPurpose16bitInstance;
use embassy_time::Instant;

use crate::els::encoder_capture::QuadratureTimer;
use crate::fault::Fault;

/// Any 16-bit general-purpose timer with two input-capture channels can
/// serve as the quadrature decoder (TIM2/TIM3/TIM4/TIM8 on the reference
/// board). Swap this alias if the host firmware wires the encoder to a
/// different timer.
type EncoderTimerInstance = p::TIM3;

pub struct Stm32QuadratureTimer {
    timer: EncoderTimerInstance,
}

impl Stm32QuadratureTimer {
    pub fn new(timer: EncoderTimerInstance) -> Self {
        Self { timer }
    }
}

impl QuadratureTimer for Stm32QuadratureTimer {
    fn start(&mut self, filter_level: u8) -> Result<(), Fault> {
        EncoderTimerInstance::enable();

        // SMS=011: encoder mode 3, counting on both TI1 and TI2 edges (x4).
        // CC1S/CC2S=01: map CC1/CC2 to their own timer input.
        // ICxF = filter_level (0..=15): input capture digital filter.
        unsafe {
            let regs = EncoderTimerInstance::regs_gp16();
            regs.ccmr_input(0).modify(|w| {
                w.set_ccs(0, embassy_stm32::pac::timer::vals::CcmrInputCcs::TI4);
                w.set_ccs(1, embassy_stm32::pac::timer::vals::CcmrInputCcs::TI4);
                w.set_icf(0, filter_level);
                w.set_icf(1, filter_level);
            });
            regs.smcr().modify(|w| w.set_sms(3));
            regs.arr().write(|w| w.set_arr(u16::MAX));
            regs.cr1().modify(|w| w.set_cen(true));
        }

        Ok(())
    }

    fn raw_count(&self) -> u32 {
        unsafe { EncoderTimerInstance::regs_gp16().cnt().read().cnt() as u32 }
    }

    fn counting_down(&self) -> bool {
        unsafe { EncoderTimerInstance::regs_gp16().cr1().read().dir() }
    }

    fn set_filter(&mut self, filter_level: u8) {
        unsafe {
            EncoderTimerInstance::regs_gp16().ccmr_input(0).modify(|w| {
                w.set_icf(0, filter_level);
                w.set_icf(1, filter_level);
            });
        }
    }

    fn zero(&mut self) {
        unsafe { EncoderTimerInstance::regs_gp16().cnt().write(|w| w.set_cnt(0)) }
    }

    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
