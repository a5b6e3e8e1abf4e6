//! Tumble Lab - A 2D physics sandbox
//!
//! Core modules:
//! - `sim`: Object lifecycle on top of the physics engine (factory, registry,
//!   seesaws, undo/redo, clock, scoring)
//! - `persistence`: Versioned save/load of designs
//! - `settings`: Tunable sandbox configuration
//! - `platform`: Browser bindings (wasm32 only)

pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use settings::Settings;
pub use sim::{EntityKind, Sandbox, SandboxError};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Sandbox configuration constants
///
/// Geometry thresholds live next to the dimensions they are derived from.
/// `sim::factory` builds bodies with these sizes and `sim::registry` recovers
/// the entity kind from them, so both sides must read the same values.
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta accepted by `Sandbox::advance`
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Ball
    pub const BALL_RADIUS: f32 = 0.3;
    /// Box (heavy crate)
    pub const BOX_SIZE: f32 = 0.6;
    /// Domino (tall, brittle)
    pub const DOMINO_WIDTH: f32 = 0.2;
    pub const DOMINO_HEIGHT: f32 = 1.0;
    /// Angled ramp
    pub const RAMP_WIDTH: f32 = 2.0;
    pub const RAMP_DEFAULT_ANGLE: f32 = -0.35;
    /// Flat platform
    pub const PLATFORM_WIDTH: f32 = 3.0;
    /// Trampoline pad
    pub const TRAMPOLINE_WIDTH: f32 = 1.5;
    /// Thickness shared by every static surface
    pub const SURFACE_THICKNESS: f32 = 0.2;
    /// TNT crate
    pub const TNT_SIZE: f32 = 0.5;

    /// Seesaw pivot (static anchor)
    pub const PIVOT_RADIUS: f32 = 0.25;
    /// Seesaw plank (dynamic arm)
    pub const PLANK_WIDTH: f32 = 3.0;
    pub const PLANK_THICKNESS: f32 = 0.15;
    /// Seesaw joint: zero rest length, stiff but not rigid
    pub const SEESAW_STIFFNESS: f32 = 4000.0;
    pub const SEESAW_DAMPING: f32 = 40.0;

    /// Static bodies wider than this are platforms, narrower ones ramps
    pub const FLAT_SURFACE_MIN_WIDTH: f32 = (RAMP_WIDTH + PLATFORM_WIDTH) / 2.0;
    /// Dynamic boxes taller than this are dominoes
    pub const TALL_BODY_MIN_HEIGHT: f32 = (BOX_SIZE + DOMINO_HEIGHT) / 2.0;
    /// Static bodies bouncier than this are trampolines
    pub const LAUNCHER_RESTITUTION: f32 = 1.0;

    /// Target body
    pub const TARGET_RADIUS: f32 = 0.4;

    /// Blast radius of a detonating TNT crate
    pub const BLAST_RADIUS: f32 = 4.0;
    /// Impulse applied at the blast center, falling off linearly to zero
    pub const BLAST_IMPULSE: f32 = 12.0;

    /// Maximum length of a saved design name
    pub const MAX_NAME_LEN: usize = 40;
}

/// Position and orientation of a body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    /// Radians, counter-clockwise
    pub angle: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, angle: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            angle,
        }
    }
}

/// Normalized angle to [-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

/// Current time as Unix epoch milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_millis() -> f64 {
    js_sys::Date::now()
}

/// Current time as Unix epoch milliseconds
#[cfg(not(target_arch = "wasm32"))]
pub fn now_millis() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consts::*;

    #[test]
    fn test_normalize_angle() {
        use std::f32::consts::PI;
        assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < 0.001);
        assert!((normalize_angle(-2.5 * PI) + 0.5 * PI).abs() < 0.001);
        assert!((normalize_angle(0.5) - 0.5).abs() < 0.001);
        let wrapped = normalize_angle(3.0 * PI);
        assert!((-PI..=PI).contains(&wrapped));
        assert!((wrapped.abs() - PI).abs() < 0.001);
    }

    #[test]
    fn test_normalize_huge_angle_terminates() {
        use std::f32::consts::PI;
        for angle in [1.0e30, -1.0e30, f32::MAX, f32::MIN] {
            let wrapped = normalize_angle(angle);
            assert!((-PI..=PI).contains(&wrapped), "{} -> {}", angle, wrapped);
        }
    }

    #[test]
    fn test_thresholds_separate_dimensions() {
        assert!(RAMP_WIDTH < FLAT_SURFACE_MIN_WIDTH);
        assert!(TRAMPOLINE_WIDTH < FLAT_SURFACE_MIN_WIDTH);
        assert!(PLATFORM_WIDTH > FLAT_SURFACE_MIN_WIDTH);
        assert!(BOX_SIZE < TALL_BODY_MIN_HEIGHT);
        assert!(TNT_SIZE < TALL_BODY_MIN_HEIGHT);
        assert!(DOMINO_HEIGHT > TALL_BODY_MIN_HEIGHT);
    }
}
