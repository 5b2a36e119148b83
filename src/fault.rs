// SPDX-License-Identifier: GPL-3.0-or-later

//! The one error/fault surface for the motion core.
//!
//! ISRs never return `Result`; they can only latch a `Fault` that the main
//! loop observes through `MotionCoordinator::status()`. Main-loop APIs that
//! detect an invalid configuration return `Err(Fault)` synchronously and
//! change no state.

/// A latching fault condition. All variants except `ConfigInvalid` persist
/// until explicitly cleared by `MotionCoordinator::clear_fault()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    EncoderInit,
    StepperInit,
    SyncInit,
    EStop,
    ConfigInvalid,
    SpindleOverspeed,
}

/// A fault with a short, static, human-readable message (carried through to
/// the status snapshot, matching the reference firmware's
/// `Status::error_message`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: &'static str,
}

impl Fault {
    pub const fn new(kind: FaultKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    pub const fn encoder_init(message: &'static str) -> Self {
        Self::new(FaultKind::EncoderInit, message)
    }

    pub const fn stepper_init(message: &'static str) -> Self {
        Self::new(FaultKind::StepperInit, message)
    }

    pub const fn sync_init(message: &'static str) -> Self {
        Self::new(FaultKind::SyncInit, message)
    }

    pub const fn estop(message: &'static str) -> Self {
        Self::new(FaultKind::EStop, message)
    }

    pub const fn config_invalid(message: &'static str) -> Self {
        Self::new(FaultKind::ConfigInvalid, message)
    }

    pub const fn spindle_overspeed(message: &'static str) -> Self {
        Self::new(FaultKind::SpindleOverspeed, message)
    }
}
