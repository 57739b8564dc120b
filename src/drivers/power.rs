//! Phase-locked AC power modulator for the heater elements.
//!
//! Resistive heaters on mains AC are switched in whole cycles, counted off
//! the zero-cross detector, rather than with a free-running PWM: the SSRs
//! only commutate at zero volts and sub-cycle switching would add nothing
//! but interference.  A modulation period is `N` AC cycles; the heaters are
//! on for the first `threshold` cycles of each period and off for the rest.
//!
//! ## Execution contexts
//!
//! [`zero_cross_isr_handler`] runs in interrupt context once per AC cycle.
//! It owns `CYCLE_COUNTER` and `ACTIVE_THRESHOLD` exclusively.  The control
//! loop writes a requested threshold into `PENDING_THRESHOLD` via
//! [`set_duty`]; the ISR latches it into `ACTIVE_THRESHOLD` exactly at a
//! period boundary, never mid-period, so a duty change cannot produce a
//! partial burst or flicker.  The handoff is a single-word atomic — the ISR
//! never blocks, allocates, or takes a lock.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::pins;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

/// Modulation period in AC cycles.  Written once by [`configure`] before the
/// zero-cross interrupt is registered.
static PERIOD_CYCLES: AtomicU32 = AtomicU32::new(25);

/// Position within the current modulation period.  ISR-owned.
static CYCLE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Threshold in effect for the current period.  ISR-owned.
static ACTIVE_THRESHOLD: AtomicU32 = AtomicU32::new(0);

/// Threshold requested by the control loop, picked up at the next period
/// boundary.  Single writer (control loop), single reader (ISR).
static PENDING_THRESHOLD: AtomicU32 = AtomicU32::new(0);

/// Last level driven onto the heater outputs.  Kept for status readers; the
/// outputs themselves are written only by the ISR.
static HEATERS_ON: AtomicBool = AtomicBool::new(false);

/// Set the modulation period.  Must be called before the zero-cross
/// interrupt is registered; the period never changes afterwards.
pub fn configure(cycles_per_period: u32) {
    PERIOD_CYCLES.store(cycles_per_period.max(1), Ordering::Relaxed);
    PENDING_THRESHOLD.store(0, Ordering::Relaxed);
}

/// Zero-cross edge handler.  Interrupt context: atomics and GPIO level
/// writes only, completes in well under a half-cycle.
pub fn zero_cross_isr_handler() {
    let period = PERIOD_CYCLES.load(Ordering::Relaxed);
    let mut cycle = CYCLE_COUNTER.load(Ordering::Relaxed) + 1;
    if cycle >= period {
        // Period boundary: this is the only point where a new duty value
        // takes effect.
        cycle = 0;
        ACTIVE_THRESHOLD.store(PENDING_THRESHOLD.load(Ordering::Acquire), Ordering::Relaxed);
    }
    CYCLE_COUNTER.store(cycle, Ordering::Relaxed);

    drive_heaters(cycle < ACTIVE_THRESHOLD.load(Ordering::Relaxed));
}

/// Request a new duty fraction in `[0, 1]`.  Called by the control loop;
/// takes effect at the next period boundary.
pub fn set_duty(fraction: f32) {
    let period = PERIOD_CYCLES.load(Ordering::Relaxed);
    let clamped = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let threshold = (clamped * period as f32).round() as u32;
    PENDING_THRESHOLD.store(threshold, Ordering::Release);
}

/// Whether the heater outputs are currently driven on.
pub fn is_heating() -> bool {
    HEATERS_ON.load(Ordering::Relaxed)
}

/// Threshold currently latched for this modulation period (cycles on).
pub fn active_threshold() -> u32 {
    ACTIVE_THRESHOLD.load(Ordering::Relaxed)
}

/// Threshold the control loop has requested for the next period.
pub fn pending_threshold() -> u32 {
    PENDING_THRESHOLD.load(Ordering::Relaxed)
}

/// Modulation period in cycles, as configured.
pub fn period_cycles() -> u32 {
    PERIOD_CYCLES.load(Ordering::Relaxed)
}

fn drive_heaters(on: bool) {
    HEATERS_ON.store(on, Ordering::Relaxed);
    #[cfg(target_os = "espidf")]
    for &pin in &pins::HEATER_GPIOS {
        hw_init::gpio_write(pin, on);
    }
    #[cfg(not(target_os = "espidf"))]
    let _ = pins::HEATER_GPIOS;
}

/// Reset all modulator state.  Host-side tests only.
#[cfg(not(target_os = "espidf"))]
pub fn sim_reset(cycles_per_period: u32) {
    PERIOD_CYCLES.store(cycles_per_period.max(1), Ordering::Relaxed);
    CYCLE_COUNTER.store(0, Ordering::Relaxed);
    ACTIVE_THRESHOLD.store(0, Ordering::Relaxed);
    PENDING_THRESHOLD.store(0, Ordering::Relaxed);
    HEATERS_ON.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    // The modulator state is module-static (the ISR cannot capture a
    // closure), so tests that drive it must not run concurrently.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        TEST_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn duty_scales_to_threshold() {
        let _g = lock();
        sim_reset(20);
        set_duty(0.5);
        assert_eq!(pending_threshold(), 10);
        set_duty(1.0);
        assert_eq!(pending_threshold(), 20);
        set_duty(0.0);
        assert_eq!(pending_threshold(), 0);
    }

    #[test]
    fn out_of_range_duty_is_clamped() {
        let _g = lock();
        sim_reset(20);
        set_duty(4.2);
        assert_eq!(pending_threshold(), 20);
        set_duty(-1.0);
        assert_eq!(pending_threshold(), 0);
        set_duty(f32::NAN);
        assert_eq!(pending_threshold(), 0);
    }

    #[test]
    fn threshold_latches_only_at_period_boundary() {
        let _g = lock();
        sim_reset(10);
        set_duty(1.0);

        // Mid-period duty changes must not reach ACTIVE_THRESHOLD before
        // the counter wraps.
        for _ in 0..5 {
            zero_cross_isr_handler();
            assert_eq!(active_threshold(), 0);
            assert!(!is_heating());
        }

        // Finish the period: wrap latches the pending value and the very
        // first cycle of the new period is already on.
        for _ in 0..5 {
            zero_cross_isr_handler();
        }
        assert_eq!(active_threshold(), 10);
        assert!(is_heating());
    }

    #[test]
    fn half_duty_produces_leading_burst() {
        let _g = lock();
        sim_reset(4);
        set_duty(0.5);
        // Run out the first period so the threshold latches.
        for _ in 0..4 {
            zero_cross_isr_handler();
        }
        // cycle 0, 1 on; cycle 2, 3 off.
        let mut pattern = Vec::new();
        for _ in 0..4 {
            pattern.push(is_heating());
            zero_cross_isr_handler();
        }
        assert_eq!(pattern, vec![true, true, false, false]);
    }

    #[test]
    fn zero_duty_never_heats() {
        let _g = lock();
        sim_reset(8);
        set_duty(0.0);
        for _ in 0..24 {
            zero_cross_isr_handler();
            assert!(!is_heating());
        }
    }
}
