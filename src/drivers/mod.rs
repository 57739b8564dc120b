//! Hardware drivers: one-shot peripheral bring-up and the AC power modulator.

pub mod hw_init;
pub mod power;
