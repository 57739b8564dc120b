//! Reflow profiles and the target evaluator.
//!
//! A timed profile is an ordered set of control points; the instantaneous
//! target is the piecewise-linear interpolation between them.  Profile 0 is
//! the reserved manual profile: its target is whatever the caller last set
//! and it never completes on its own.
//!
//! [`evaluate`] is pure — all run state (elapsed time, manual setpoint)
//! comes in as arguments, which is what makes the controller testable
//! tick by tick.

/// Ambient reference temperature (°C): the resting target and the fallback
/// for unknown profile ids.
pub const ROOM_TEMP_C: f32 = 25.0;

/// Index of the reserved manual profile.
pub const MANUAL_PROFILE: usize = 0;

/// One control point of a timed profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfilePoint {
    /// Seconds from run start; strictly increasing within a profile.
    pub time_s: f32,
    /// Target temperature at that instant (°C).
    pub temp_c: f32,
}

const fn pt(time_s: f32, temp_c: f32) -> ProfilePoint {
    ProfilePoint { time_s, temp_c }
}

/// How a profile produces its target.
#[derive(Debug, Clone, Copy)]
pub enum ProfileKind {
    /// Caller-set target; never self-terminates.
    Manual,
    /// Time-driven piecewise-linear curve.
    Timed(&'static [ProfilePoint]),
}

pub struct Profile {
    pub name: &'static str,
    pub kind: ProfileKind,
}

// SAC305: https://aimsolder.com/sites/default/files/ws483_sac305_solder_paste_tds.pdf
static SAC305_POINTS: [ProfilePoint; 5] = [
    pt(0.0, ROOM_TEMP_C),
    pt(90.0, 150.0),
    pt(165.0, 175.0),
    pt(225.0, 245.0),
    pt(270.0, ROOM_TEMP_C),
];

// Sn63/Pb37: https://www.kester.com/Portals/0/Documents/Knowledge%20Base/Standard_Profile.pdf
static SN63PB37_POINTS: [ProfilePoint; 5] = [
    pt(0.0, ROOM_TEMP_C),
    pt(90.0, 150.0),
    pt(180.0, 180.0),
    pt(225.0, 230.0),
    pt(270.0, ROOM_TEMP_C),
];

/// Build-time profile table.  Index 0 is always the manual profile.
pub static PROFILES: &[Profile] = &[
    Profile {
        name: "Manual",
        kind: ProfileKind::Manual,
    },
    Profile {
        name: "SAC305",
        kind: ProfileKind::Timed(&SAC305_POINTS),
    },
    Profile {
        name: "Sn63/Pb37",
        kind: ProfileKind::Timed(&SN63PB37_POINTS),
    },
];

/// Result of a target evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileTarget {
    pub temp_c: f32,
    pub done: bool,
}

/// Number of defined profiles.
pub fn count() -> usize {
    PROFILES.len()
}

/// Display name for a profile id, if it exists.
pub fn name(profile_id: usize) -> Option<&'static str> {
    PROFILES.get(profile_id).map(|p| p.name)
}

/// Evaluate the instantaneous target for `profile_id` at `elapsed_s`
/// seconds into the run.  `manual_target_c` is only consulted by the
/// manual profile.
///
/// Unknown ids fall back to (ambient, done) — a caller that validates its
/// ids never hits this path, but the control loop must stay safe if one
/// slips through.
pub fn evaluate(profile_id: usize, elapsed_s: f32, manual_target_c: f32) -> ProfileTarget {
    let Some(profile) = PROFILES.get(profile_id) else {
        return ProfileTarget {
            temp_c: ROOM_TEMP_C,
            done: true,
        };
    };

    match profile.kind {
        ProfileKind::Manual => ProfileTarget {
            temp_c: manual_target_c,
            done: false,
        },
        ProfileKind::Timed(points) => evaluate_timed(points, elapsed_s),
    }
}

fn evaluate_timed(points: &[ProfilePoint], elapsed_s: f32) -> ProfileTarget {
    for i in 1..points.len() {
        if elapsed_s < points[i].time_s {
            let (a, b) = (points[i - 1], points[i]);
            let slope = (b.temp_c - a.temp_c) / (b.time_s - a.time_s);
            return ProfileTarget {
                temp_c: a.temp_c + slope * (elapsed_s - a.time_s),
                done: false,
            };
        }
    }
    // At or beyond the last point: hold its temperature, run complete.
    ProfileTarget {
        temp_c: points.last().map_or(ROOM_TEMP_C, |p| p.temp_c),
        done: true,
    }
}
