//! MAX6675 K-type thermocouple converters on the shared SPI bus.
//!
//! Each converter returns a 16-bit frame: temperature in bits D14..D3 as an
//! unsigned 12-bit value in 0.25 °C steps, and bit D2 set when the
//! thermocouple input is open.  [`ThermocoupleBank::read`] samples every
//! configured converter and returns the arithmetic mean.
//!
//! ## Fault policy: propagate, never mask
//!
//! An open thermocouple or failed bus transaction poisons the whole reading
//! with NaN for that sample.  A faulted sensor is *not* dropped from the
//! average — an oven quietly regulating on half its sensors is the failure
//! mode this policy exists to prevent.  Faults are per-sample; the next
//! read starts clean.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: one SPI transaction per converter via `hw_init::spi_read16`.
//! On host/test: frames come from static `AtomicU16`s for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

use log::warn;

use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

/// Upper bound on converters a bank can address (sim register count; the
/// board itself is limited by `pins::TC_CS_GPIOS`).
pub const MAX_SENSORS: usize = 4;

/// Frame bit D2: thermocouple input open.
const OPEN_CIRCUIT_BIT: u16 = 0x0004;

// Sim registers default to 25.0 °C so host builds read sensibly before any
// injection.
#[cfg(not(target_os = "espidf"))]
static SIM_TC_RAW: [AtomicU16; MAX_SENSORS] =
    [const { AtomicU16::new(100 << 3) }; MAX_SENSORS];

/// Inject a raw converter frame for host-side tests.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_raw(sensor: usize, raw: u16) {
    SIM_TC_RAW[sensor].store(raw, Ordering::Relaxed);
}

/// Inject a temperature in Celsius (encoded as the converter would).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temp(sensor: usize, temp_c: f32) {
    let counts = (temp_c / 0.25).round().clamp(0.0, 4095.0) as u16;
    sim_set_raw(sensor, counts << 3);
}

/// Inject an open-circuit fault.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_open(sensor: usize) {
    sim_set_raw(sensor, OPEN_CIRCUIT_BIT);
}

/// Bank of thermocouple converters read as one averaged sensor.
pub struct ThermocoupleBank {
    count: usize,
}

impl ThermocoupleBank {
    pub fn new(count: usize) -> Self {
        Self {
            count: count.clamp(1, MAX_SENSORS),
        }
    }

    /// Read every converter and return the mean temperature in Celsius,
    /// or NaN if any converter faulted this sample.
    pub fn read(&self) -> f32 {
        let mut sum = 0.0;
        for sensor in 0..self.count {
            match self.read_one(sensor) {
                Ok(temp_c) => sum += temp_c,
                Err(e) => {
                    warn!("thermocouple {}: {}", sensor, e);
                    return f32::NAN;
                }
            }
        }
        sum / self.count as f32
    }

    fn read_one(&self, sensor: usize) -> Result<f32, SensorError> {
        decode(self.read_raw(sensor)?)
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&self, sensor: usize) -> Result<u16, SensorError> {
        hw_init::spi_read16(sensor)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&self, sensor: usize) -> Result<u16, SensorError> {
        Ok(SIM_TC_RAW[sensor].load(Ordering::Relaxed))
    }
}

fn decode(raw: u16) -> Result<f32, SensorError> {
    if raw & OPEN_CIRCUIT_BIT != 0 {
        return Err(SensorError::OpenCircuit);
    }
    Ok(((raw >> 3) & 0x0fff) as f32 * 0.25)
}
