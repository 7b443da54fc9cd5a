#![cfg_attr(not(any(test, doctest)), no_std)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

//! Baseband Operation Descriptor scheduler for Nordic nRF SoCs.
//!
//! Multiple radio protocols share a single radio by describing each piece of radio work as a
//! Baseband Operation Descriptor ([`Bod`](bod::Bod)) and handing it to the [`Scheduler`]. The
//! scheduler keeps the pending BODs ordered by their due times, resolves conflicts between
//! overlapping BODs with their reschedule policies and passes each BOD to its protocol shortly
//! before it is due.
//!
//! Currently only nRF52840 is supported, but the hardware is accessed only through the
//! [`BbDriver`](hw::BbDriver) trait.

#[cfg(not(any(feature = "mocked_platform", feature = "nrf52840")))]
compile_error!("One platform must be enabled as a build feature");

#[cfg(all(feature = "mocked_platform", feature = "nrf52840"))]
compile_error!("Cannot enable multiple platforms simultaneously (mocked and nrf52840)");

#[cfg(all(test, not(feature = "mocked_platform")))]
compile_error!("For tests \"mocked_platform\" feature shall be selected");

#[macro_use]
mod log;

pub mod bb;
pub mod bod;
pub mod clock;
pub mod config;
pub mod crit_sect;
pub mod hw;
pub mod mutex;
pub mod sch;

/// Defines errors reported by this crate
pub mod error;

#[cfg(test)]
mod testing;

pub use sch::Scheduler;
