//! Infrastructure implementations.
//!
//! Contains the outbound port, its in-memory adapter and compiler settings.

pub mod ports;
pub mod rule_set;
pub mod settings;
