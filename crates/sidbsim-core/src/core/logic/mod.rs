//! # Logic Module
//!
//! Binary-dot logic (BDL) abstractions used to read a gate's function off its
//! charge configurations.
//!
//! - [`truth_table`] - Single-output truth tables and the [`truth_table::LogicError`] taxonomy
//! - [`bdl`] - BDL pair and wire detection, port directions, bit encodings and the
//!   enumeration of input patterns

pub mod bdl;
pub mod truth_table;
