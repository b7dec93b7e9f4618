//! SlotWatch library
//!
//! Exposes the CLI modules for integration testing

pub mod cli;
