//! Core foundation: types, rotation math and axis-convention remapping.
//!
//! No dependencies on other modules of this crate.

pub mod convention;
pub mod math;
pub mod types;
