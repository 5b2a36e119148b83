// SPDX-License-Identifier: GPL-3.0-or-later

//! EncoderCapture: x4 quadrature decoding of the spindle encoder.
//!
//! A single timer peripheral driven through `embassy_stm32`'s low-level
//! register traits, configured as a quadrature encoder interface rather
//! than a basic up-counter.
//!
//! The RPM estimator is kept as a small, hardware-free struct
//! (`RpmEstimator`) so it can be unit tested on the host, the same way
//! `StepGenerator`'s pulse-timing math is hardware-free.

use crate::consts::encoder::MIN_RPM_WINDOW_MS;
use crate::fault::Fault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Immutable snapshot of encoder state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderSample {
    pub count: i32,
    pub timestamp_ms: u32,
    pub rpm: i16,
    pub direction: Direction,
    pub valid: bool,
}

/// Wrap-safe delta between two raw hardware counts, valid as long as the
/// true travel between samples fits in i32 (true for any realistic spindle
/// speed at the sync-tick cadence this is called at).
#[inline]
pub fn wrapping_delta(new: u32, old: u32) -> i32 {
    (new as i32).wrapping_sub(old as i32)
}

/// Leaky-window RPM estimator. Hardware-free and unit-testable.
pub struct RpmEstimator {
    ppr: u32,
    invert_direction: bool,
    last_count: i32,
    last_time_ms: u32,
    last_rpm: i16,
}

impl RpmEstimator {
    pub fn new(ppr: u32, invert_direction: bool) -> Self {
        Self {
            ppr,
            invert_direction,
            last_count: 0,
            last_time_ms: 0,
            last_rpm: 0,
        }
    }

    pub fn set_ppr(&mut self, ppr: u32) {
        self.ppr = ppr;
    }

    pub fn set_invert_direction(&mut self, invert: bool) {
        self.invert_direction = invert;
    }

    pub fn reset(&mut self, now_ms: u32) {
        self.last_count = 0;
        self.last_time_ms = now_ms;
        self.last_rpm = 0;
    }

    /// Feeds a new (count, timestamp) pair and returns the current RPM
    /// estimate. Below `MIN_RPM_WINDOW_MS` the previously reported RPM is
    /// returned unchanged, to avoid a noisy estimate from a too-short window.
    pub fn update(&mut self, count: i32, now_ms: u32) -> i16 {
        let dt_ms = now_ms.wrapping_sub(self.last_time_ms);

        if dt_ms < MIN_RPM_WINDOW_MS {
            return self.last_rpm;
        }

        let dcount = wrapping_delta(count as u32, self.last_count as u32) as i64;
        let pe = (self.ppr as i64) * 4;

        // rpm = (dcount * 60_000) / (ppr * 4 * dt_ms)
        let numerator = dcount * 60_000;
        let denominator = pe * (dt_ms as i64);

        let mut rpm = if denominator == 0 {
            0
        } else {
            // Round to nearest rather than truncating.
            let half = denominator / 2;
            if numerator >= 0 {
                (numerator + half) / denominator
            } else {
                (numerator - half) / denominator
            }
        };

        if self.invert_direction {
            rpm = -rpm;
        }

        let rpm = rpm.clamp(i16::MIN as i64, i16::MAX as i64) as i16;

        self.last_count = count;
        self.last_time_ms = now_ms;
        self.last_rpm = rpm;
        rpm
    }
}

/// Hardware-facing quadrature capture. The concrete timer peripheral is
/// injected by the host firmware's bring-up code; this type only specifies
/// the pin roles (ENC_A, ENC_B) and the decode mode.
pub struct EncoderCapture<T: QuadratureTimer> {
    timer: T,
    rpm: RpmEstimator,
    invert_direction: bool,
    initialized: bool,
}

/// Minimal surface a concrete hardware quadrature timer must provide.
/// A real host firmware implements this over `embassy_stm32`'s encoder-mode
/// general-purpose timer (TIM2/TIM3/TIM4/TIM8 on STM32, configured with
/// both channels in input-capture, SMS = encoder mode 3, matching the
/// reference firmware's `EncoderTimer::initTimer`).
pub trait QuadratureTimer {
    /// Programs the timer for x4 quadrature decode with the given input
    /// filter level (0..=15) and starts counting. Idempotent.
    fn start(&mut self, filter_level: u8) -> Result<(), Fault>;
    /// Direct, single-instruction read of the hardware up/down counter.
    fn raw_count(&self) -> u32;
    /// True if the timer's direction flag reports "counting down". May
    /// momentarily lag the true direction by one quadrature edge;
    /// only used for display, never for `count()` correctness.
    fn counting_down(&self) -> bool;
    fn set_filter(&mut self, filter_level: u8);
    /// Atomically zeroes the hardware counter.
    fn zero(&mut self);
    fn now_ms(&self) -> u32;
}

impl<T: QuadratureTimer> EncoderCapture<T> {
    pub fn new(timer: T, ppr: u32, invert_direction: bool) -> Self {
        Self {
            timer,
            rpm: RpmEstimator::new(ppr, invert_direction),
            invert_direction,
            initialized: false,
        }
    }

    /// Configures input pins and the hardware decoder. Idempotent.
    pub fn begin(&mut self, filter_level: u8) -> Result<(), Fault> {
        if self.initialized {
            return Ok(());
        }
        self.timer
            .start(filter_level.min(crate::consts::encoder::FILTER_LEVEL_MAX))
            .map_err(|_| Fault::encoder_init("quadrature timer peripheral unavailable"))?;
        self.initialized = true;
        Ok(())
    }

    /// ISR-safe: a single 32-bit atomic load.
    #[inline]
    pub fn count(&self) -> i32 {
        self.timer.raw_count() as i32
    }

    pub fn sample(&mut self) -> EncoderSample {
        let count = self.count();
        let now_ms = self.timer.now_ms();
        let rpm = self.rpm.update(count, now_ms);
        let direction = if self.timer.counting_down() ^ self.invert_direction {
            Direction::Reverse
        } else {
            Direction::Forward
        };

        EncoderSample {
            count,
            timestamp_ms: now_ms,
            rpm,
            direction,
            valid: self.initialized,
        }
    }

    /// Atomically zeroes the counter. The next `sample()` reports rpm=0
    /// until the next RPM window elapses.
    pub fn reset(&mut self) {
        self.timer.zero();
        let now = self.timer.now_ms();
        self.rpm.reset(now);
    }

    pub fn set_filter(&mut self, level: u8) {
        self.timer
            .set_filter(level.min(crate::consts::encoder::FILTER_LEVEL_MAX));
    }

    pub fn set_ppr(&mut self, ppr: u32) {
        self.rpm.set_ppr(ppr);
    }

    pub fn set_invert_direction(&mut self, invert: bool) {
        self.invert_direction = invert;
        self.rpm.set_invert_direction(invert);
    }

    /// Escape hatch onto the underlying timer, for host-side simulation in
    /// tests that need to drive a mock quadrature source.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_safety_s4() {
        // S4: start near u32 wrap boundary, advance by 10 positive ticks.
        let start: u32 = (1u32 << 31) - 5;
        let end: u32 = start.wrapping_add(10);
        assert_eq!(wrapping_delta(end, start), 10);
    }

    #[test]
    fn wrap_safety_negative_travel() {
        let start: u32 = 5;
        let end: u32 = start.wrapping_sub(10);
        assert_eq!(wrapping_delta(end, start), -10);
    }

    #[test]
    fn rpm_holds_previous_value_below_window() {
        let mut est = RpmEstimator::new(1024, false);
        est.reset(0);
        let first = est.update(100, 5); // dt=5ms < MIN_RPM_WINDOW_MS
        assert_eq!(first, 0);
    }

    #[test]
    fn rpm_one_revolution_per_second() {
        let ppr = 1024u32;
        let pe = ppr * 4;
        let mut est = RpmEstimator::new(ppr, false);
        est.reset(0);
        // One full revolution (pe ticks) in 1000ms => 60 RPM.
        let rpm = est.update(pe as i32, 1000);
        assert_eq!(rpm, 60);
    }

    #[test]
    fn rpm_respects_direction_inversion() {
        let ppr = 1024u32;
        let pe = (ppr * 4) as i32;
        let mut est = RpmEstimator::new(ppr, true);
        est.reset(0);
        let rpm = est.update(pe, 1000);
        assert_eq!(rpm, -60);
    }

    #[test]
    fn rpm_resets_to_zero() {
        let mut est = RpmEstimator::new(1024, false);
        est.reset(0);
        est.update(4096, 1000);
        est.reset(1000);
        // Immediately after reset, a call inside the minimum window holds 0.
        let rpm = est.update(0, 1005);
        assert_eq!(rpm, 0);
    }
}
