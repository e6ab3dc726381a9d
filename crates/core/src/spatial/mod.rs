//! Spatial effects: rotation modes, modulation gates and the trajectories
//! followed by the positional "8D" and "16D" animations.

mod animation;
mod panner;

use std::{
    f32::consts::{PI, TAU},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::SpatialAudioError;

pub use animation::RotationAnimator;
pub use panner::{Lfo, Spatializer};

pub const TWO_PI: f32 = TAU;

/// Orbit radius reached at full intensity.
const RADIUS_PER_INTENSITY: f32 = 2.0;
/// Gate B drives the 16D effect twice as hard as gate A drives 8D.
pub const ROTATE_16D_MULTIPLIER: f32 = 2.0;

const HARMONIC_AMPLITUDE: f32 = 0.3;
const ELEVATION_AMPLITUDE: f32 = 0.5;
/// Rate of the vertical oscillation relative to the rotation phase.
pub(crate) const ELEVATION_RATE: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "8d")]
    Rotate8D,
    #[serde(rename = "16d")]
    Rotate16D,
}

impl RotationMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Rotate8D => "8d",
            Self::Rotate16D => "16d",
        })
    }
}

impl FromStr for RotationMode {
    type Err = SpatialAudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "8d" => Ok(Self::Rotate8D),
            "16d" => Ok(Self::Rotate16D),
            other => Err(SpatialAudioError::msg(format!(
                "unknown rotation mode `{other}` (expected none, 8d or 16d)"
            ))),
        }
    }
}

/// Snapshot of the rotation effect as seen by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialEffectState {
    pub mode: RotationMode,
    /// Nominal intensity in [0, 1].
    pub intensity: f32,
    /// Radians per second.
    pub rotation_speed: f32,
    /// Radians in [0, 2π), advanced only by the animation driver.
    pub phase_angle: f32,
}

impl SpatialEffectState {
    pub fn new(rotation_speed: f32) -> Self {
        Self {
            mode: RotationMode::None,
            intensity: 0.0,
            rotation_speed,
            phase_angle: 0.0,
        }
    }

    pub fn radius(&self) -> f32 {
        self.intensity * RADIUS_PER_INTENSITY
    }
}

/// Apparent source position relative to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        Position::new(self.x - other.x, self.y - other.y, self.z - other.z).distance()
    }

    pub fn is_origin(&self) -> bool {
        *self == Self::ORIGIN
    }
}

/// Gain stage between a rotation oscillator and the spatializer's pan input.
///
/// `level` is the nominal value last written by the caller; `depth` is what
/// actually reaches the pan control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationGate {
    level: f32,
    multiplier: f32,
}

impl ModulationGate {
    pub fn new(multiplier: f32) -> Self {
        Self {
            level: 0.0,
            multiplier,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = level;
    }

    pub fn close(&mut self) {
        self.level = 0.0;
    }

    pub fn depth(&self) -> f32 {
        self.level * self.multiplier
    }
}

/// Position on the orbit for the given mode and phases.
///
/// `elevation_phase` only matters for 16D, whose vertical motion runs at
/// 1.5× the rotation rate and is wrapped independently of `phase`.
pub fn orbit_position(mode: RotationMode, radius: f32, phase: f32, elevation_phase: f32) -> Position {
    match mode {
        RotationMode::None => Position::ORIGIN,
        RotationMode::Rotate8D => Position::new(radius * phase.cos(), 0.0, radius * phase.sin()),
        RotationMode::Rotate16D => {
            let harmonic = radius * HARMONIC_AMPLITUDE;
            Position::new(
                radius * phase.cos() + harmonic * (2.0 * phase).cos(),
                radius * ELEVATION_AMPLITUDE * elevation_phase.sin(),
                radius * phase.sin() + harmonic * (3.0 * phase).sin(),
            )
        }
    }
}

/// Seconds needed for one full turn at `rotation_speed` rad/s.
pub fn rotation_period(rotation_speed: f32) -> Option<f32> {
    (rotation_speed > 0.0).then(|| 2.0 * PI / rotation_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes() {
        assert_eq!("8D".parse::<RotationMode>().unwrap(), RotationMode::Rotate8D);
        assert_eq!("16d".parse::<RotationMode>().unwrap(), RotationMode::Rotate16D);
        assert_eq!("none".parse::<RotationMode>().unwrap(), RotationMode::None);
        assert!("32d".parse::<RotationMode>().is_err());
    }

    #[test]
    fn gate_depth_scales_by_multiplier() {
        let mut gate = ModulationGate::new(ROTATE_16D_MULTIPLIER);
        gate.set_level(0.4);
        assert_eq!(gate.level(), 0.4);
        assert!((gate.depth() - 0.8).abs() < f32::EPSILON);
        gate.close();
        assert_eq!(gate.depth(), 0.0);
    }

    #[test]
    fn eight_d_orbit_is_planar_circle() {
        for step in 0..32 {
            let phase = step as f32 * TWO_PI / 32.0;
            let p = orbit_position(RotationMode::Rotate8D, 1.5, phase, 0.0);
            assert_eq!(p.y, 0.0);
            assert!((p.distance() - 1.5).abs() < 1e-5);
        }
    }

    #[test]
    fn sixteen_d_orbit_leaves_the_plane() {
        let p = orbit_position(RotationMode::Rotate16D, 1.0, 0.0, PI / 2.0);
        assert!((p.y - 0.5).abs() < 1e-6);
        assert!((p.x - 1.3).abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn no_mode_means_origin() {
        assert!(orbit_position(RotationMode::None, 3.0, 1.0, 1.0).is_origin());
    }
}
