//! System configuration parameters
//!
//! All tunable parameters for the oven controller.  Defaults are the
//! build-time constants; PID gains can additionally be retuned at runtime
//! through the console (`pid <kp> <ki> <kd>`).

use serde::{Deserialize, Serialize};

/// PID gain set for the temperature regulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// Core oven configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvenConfig {
    // --- Timing ---
    /// Control loop period (milliseconds).
    pub control_period_ms: u32,
    /// AC cycles per power-modulation period.  This is the duty resolution:
    /// the heaters switch in whole mains cycles, never mid-waveform.
    pub ac_cycles_per_period: u32,

    // --- Sensing ---
    /// Number of thermocouple converters to read and average.
    pub thermocouple_count: usize,

    // --- Temperatures ---
    /// Ambient / resting target (Celsius).
    pub ambient_temp_c: f32,
    /// Hard over-temperature cutoff (Celsius); exceeding it stops the run.
    pub max_temp_c: f32,

    // --- Regulation ---
    /// Default PID gains.
    pub pid: PidGains,
}

impl Default for OvenConfig {
    fn default() -> Self {
        Self {
            // Timing: 2 Hz control loop over a 25-cycle modulation window
            // (half a second of 50 Hz mains — the two line up on purpose).
            control_period_ms: 500,
            ac_cycles_per_period: 25,

            thermocouple_count: 2,

            ambient_temp_c: 25.0,
            max_temp_c: 280.0,

            pid: PidGains {
                kp: 0.05,
                ki: 0.001,
                kd: 0.2,
            },
        }
    }
}
