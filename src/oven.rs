//! Oven controller: the periodic control loop and its shared status.
//!
//! One control task owns the loop: read temperature → evaluate the active
//! profile → run the PID regulator → hand the duty to the power modulator.
//! Everything other contexts may touch — status, run intent, gains — lives
//! behind a single mutex held only across those few statements, never
//! across I/O.  [`OvenHandle`] is the cloneable face given to the HTTP
//! handlers and the console; a `start()` racing the control loop resolves
//! to either the full pre-start or the full post-start state, never a mix.
//!
//! The one boundary that is *not* under this mutex is the duty handoff to
//! the zero-cross ISR, which is the modulator's single-word atomic (see
//! `drivers::power`).

use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use serde::Serialize;

use crate::config::{OvenConfig, PidGains};
use crate::control::pid::PidRegulator;
use crate::drivers::{hw_init, power};
use crate::pins;
use crate::profile::{self, MANUAL_PROFILE};
use crate::sensors::thermocouple::ThermocoupleBank;

/// Shared status record.  Field names are the wire names of the status
/// endpoint: `{"current": .., "target": .., "running": ..}` (non-finite
/// temperatures serialize as `null`).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OvenStatus {
    /// Most recent chamber reading (°C); NaN while a thermocouple faults.
    pub current: f32,
    /// Instantaneous target (°C).
    pub target: f32,
    /// Whether a run is in progress.
    pub running: bool,
}

/// Run intent recorded by `start()` and consumed by the control loop.
#[derive(Debug, Clone, Copy)]
struct RunState {
    active_profile: usize,
    started_at: Instant,
    manual_target_c: f32,
}

struct Shared {
    status: OvenStatus,
    run: RunState,
    /// Bumped by every `start()`; the control task resets the regulator
    /// when it sees a new run, so no run inherits integral history even if
    /// no tick happened between a stop and the next start.
    run_id: u64,
    gains: PidGains,
    ambient_temp_c: f32,
}

/// Cloneable handle for external callers (HTTP, console).
#[derive(Clone)]
pub struct OvenHandle {
    shared: Arc<Mutex<Shared>>,
}

impl OvenHandle {
    /// Begin a run.  For the manual profile, `temp_c` becomes the setpoint;
    /// timed profiles ignore it.  Returns `false` (with no state change at
    /// all) for an out-of-range profile id.
    pub fn start(&self, profile_id: usize, temp_c: f32) -> bool {
        if profile_id >= profile::count() {
            warn!("oven: start rejected, unknown profile {}", profile_id);
            return false;
        }

        let target = {
            let mut s = self.shared.lock().unwrap();
            if profile_id == MANUAL_PROFILE {
                s.run.manual_target_c = temp_c;
            }
            s.run.active_profile = profile_id;
            s.run.started_at = Instant::now();
            s.run_id += 1;
            // Publish the t=0 target together with `running` so no status
            // reader can pair the new run with a stale target.
            let t0 = profile::evaluate(profile_id, 0.0, s.run.manual_target_c);
            s.status.target = t0.temp_c;
            s.status.running = true;
            t0.temp_c
        };

        info!(
            "oven: started profile {} ({}) at target {:.1} C",
            profile_id,
            profile::name(profile_id).unwrap_or("?"),
            target
        );
        true
    }

    /// Request a stop.  Advisory: the control loop observes it on its next
    /// tick and drops the duty to zero; poll [`status`](Self::status) to
    /// confirm.
    pub fn stop(&self) {
        {
            let mut s = self.shared.lock().unwrap();
            s.status.target = s.ambient_temp_c;
            s.status.running = false;
        }
        info!("oven: stopped");
    }

    /// Consistent snapshot of the status record.
    pub fn status(&self) -> OvenStatus {
        self.shared.lock().unwrap().status
    }

    /// Retune the regulator.  Takes effect on the next control tick without
    /// resetting regulator state.
    pub fn set_pid_gains(&self, kp: f32, ki: f32, kd: f32) {
        {
            let mut s = self.shared.lock().unwrap();
            s.gains = PidGains { kp, ki, kd };
        }
        info!("oven: PID gains set to kp={} ki={} kd={}", kp, ki, kd);
    }

    /// Current gains (console read-back).
    pub fn pid_gains(&self) -> PidGains {
        self.shared.lock().unwrap().gains
    }
}

/// The control-loop owner.  Construct with [`OvenController::new`], then
/// either [`spawn`](Self::spawn) the periodic task or drive
/// [`tick`](Self::tick) directly (tests).
pub struct OvenController {
    shared: Arc<Mutex<Shared>>,
    bank: ThermocoupleBank,
    pid: PidRegulator,
    period: Duration,
    max_temp_c: f32,
    seen_run_id: u64,
    led_on: bool,
}

impl OvenController {
    pub fn new(config: &OvenConfig) -> (Self, OvenHandle) {
        power::configure(config.ac_cycles_per_period);

        let shared = Arc::new(Mutex::new(Shared {
            status: OvenStatus {
                current: config.ambient_temp_c,
                target: config.ambient_temp_c,
                running: false,
            },
            run: RunState {
                active_profile: MANUAL_PROFILE,
                started_at: Instant::now(),
                manual_target_c: config.ambient_temp_c,
            },
            run_id: 0,
            gains: config.pid,
            ambient_temp_c: config.ambient_temp_c,
        }));

        let handle = OvenHandle {
            shared: Arc::clone(&shared),
        };
        let controller = Self {
            shared,
            bank: ThermocoupleBank::new(config.thermocouple_count),
            pid: PidRegulator::new(config.pid),
            period: Duration::from_millis(u64::from(config.control_period_ms)),
            max_temp_c: config.max_temp_c,
            seen_run_id: 0,
            led_on: false,
        };
        (controller, handle)
    }

    /// One control cycle.  `now` is injected so tests can step through a
    /// run without waiting it out in real time.
    pub fn tick(&mut self, now: Instant) {
        let reading = self.bank.read();

        let mut completed = false;
        let mut overtemp = false;

        let (target, running, gains, run_id) = {
            let mut s = self.shared.lock().unwrap();
            s.status.current = reading;

            if s.status.running {
                if reading.is_finite() && reading > self.max_temp_c {
                    overtemp = true;
                    s.status.target = s.ambient_temp_c;
                    s.status.running = false;
                } else {
                    let elapsed = now.saturating_duration_since(s.run.started_at).as_secs_f32();
                    let t = profile::evaluate(s.run.active_profile, elapsed, s.run.manual_target_c);
                    s.status.target = t.temp_c;
                    s.status.running = !t.done;
                    completed = t.done;
                }
            }

            (s.status.target, s.status.running, s.gains, s.run_id)
        };

        if overtemp {
            error!(
                "oven: over temperature ({:.1} C > {:.1} C limit), run aborted",
                reading, self.max_temp_c
            );
        }
        if completed {
            info!("oven: profile complete");
        }

        // A new run starts from scratch, whatever the previous one left.
        if run_id != self.seen_run_id {
            self.seen_run_id = run_id;
            self.pid.reset();
        }

        self.pid.set_gains(gains);

        if !running {
            // Idle, finished or aborted: no leftover integral action may
            // re-heat a cold oven on the next run.
            self.pid.reset();
            power::set_duty(0.0);
        } else if !reading.is_finite() {
            // Fault tick: a NaN must never reach the regulator.  Heaters
            // off for this cycle, integral history kept for the recovery.
            warn!("oven: thermocouple fault, heaters off this cycle");
            power::set_duty(0.0);
        } else {
            let dt = self.period.as_secs_f32();
            let duty = self.pid.step(target, reading, dt);
            power::set_duty(duty.clamp(0.0, 1.0));
        }

        self.led_on = !self.led_on;
        hw_init::gpio_write(pins::STATUS_LED_GPIO, self.led_on);
    }

    /// Regulator state (diagnostics/tests).
    pub fn regulator(&self) -> &PidRegulator {
        &self.pid
    }

    /// Start the periodic control task.  Deadlines are absolute — each tick
    /// is scheduled at `start + n * period`, so jitter in one cycle does
    /// not accumulate into drift.
    pub fn spawn(mut self) -> io::Result<thread::JoinHandle<()>> {
        let period = self.period;
        thread::Builder::new()
            .name("oven-ctrl".into())
            .stack_size(16 * 1024)
            .spawn(move || {
                info!("oven: control loop running ({} ms period)", period.as_millis());
                let mut deadline = Instant::now() + period;
                loop {
                    self.tick(Instant::now());

                    let now = Instant::now();
                    if let Some(wait) = deadline.checked_duration_since(now) {
                        thread::sleep(wait);
                    } else {
                        warn!("oven: control tick overran its period");
                        deadline = now;
                    }
                    deadline += period;
                }
            })
    }
}
