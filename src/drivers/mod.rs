// SPDX-License-Identifier: GPL-3.0-or-later

//! Hardware-facing glue for the motion core. Each module here is the
//! concrete `embassy_stm32` backend for one of the hardware-abstracting
//! traits/structs in `els`, feeding the three-ISR-plus-main-loop
//! scheduling model.

pub mod pulse_timer;
pub mod quadrature_timer;
pub mod stepper_pins;
pub mod sync_timer;
