//! Unified error types for the oven firmware.
//!
//! A small, `Copy` taxonomy: sensor faults are per-tick markers the control
//! loop recovers from locally; initialization errors are fatal and abort
//! startup before the control loop ever runs.

use core::fmt;

// ---------------------------------------------------------------------------
// Sensor faults (non-fatal, per tick)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// SPI transaction failed or timed out.
    BusReadFailed,
    /// The converter reports the thermocouple as electrically disconnected.
    OpenCircuit,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusReadFailed => write!(f, "SPI read failed"),
            Self::OpenCircuit => write!(f, "thermocouple open circuit"),
        }
    }
}

// ---------------------------------------------------------------------------
// Initialization errors (fatal)
// ---------------------------------------------------------------------------

/// Errors during one-shot peripheral/service bring-up.  The oven cannot run
/// safely with partial sensing or actuation, so these halt startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    GpioConfigFailed(i32),
    SpiBusInitFailed(i32),
    SpiDeviceAddFailed(i32),
    IsrInstallFailed(i32),
    SpiffsMountFailed(i32),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::SpiBusInitFailed(rc) => write!(f, "SPI bus init failed (rc={})", rc),
            Self::SpiDeviceAddFailed(rc) => write!(f, "SPI device add failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::SpiffsMountFailed(rc) => write!(f, "SPIFFS mount failed (rc={})", rc),
        }
    }
}
