// SPDX-License-Identifier: GPL-3.0-or-later

//! Real-time motion core for an electronic lead screw (ELS) lathe
//! controller: an encoder-synchronized stepper Z-axis supporting
//! threading, power-feed turning, and manual jogging.
//!
//! This crate is the core only (`MotionCoordinator` and the components it
//! owns) — it defines no GPIO/timer bindings, no persistence format, and
//! no UI. A host firmware composes this with concrete `embassy_stm32`
//! peripherals in `drivers/` and drives `MotionCoordinator::step_tick` /
//! `sync_tick` from hardware timer interrupts.

#![cfg_attr(not(test), no_std)]

pub mod consts;
pub mod drivers;
pub mod els;
pub mod fault;
pub mod logging;
pub mod params;
pub mod util;

pub use els::{Mode, MotionCoordinator, MotionStatus};
pub use fault::{Fault, FaultKind};
pub use params::ParamRegistry;
