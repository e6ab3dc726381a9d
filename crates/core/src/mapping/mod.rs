use serde::{Deserialize, Serialize};

use crate::{spatial::RotationMode, AudioEngine};

/// Frame rate the percentage speed control was calibrated against.
pub const REFERENCE_FRAME_RATE: f32 = 60.0;

/// Radians per reference frame for each percent of the speed control.
const RADIANS_PER_FRAME_PER_PERCENT: f32 = 1.0 / 1000.0;

/// Master gain for a volume slider position.
pub fn volume_gain(volume_percent: f32, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        percent(volume_percent) / 100.0
    }
}

/// Nominal effect intensity in [0, 1].
pub fn intensity_from_percent(intensity_percent: f32) -> f32 {
    percent(intensity_percent) / 100.0
}

/// Rotation speed in rad/s. 50% turns the orbit by 0.05 rad per frame at
/// 60 Hz, i.e. 3 rad/s.
pub fn rotation_speed_from_percent(speed_percent: f32) -> f32 {
    percent(speed_percent) * RADIANS_PER_FRAME_PER_PERCENT * REFERENCE_FRAME_RATE
}

fn percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// The player's control surface, in the units its sliders and switches use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlSurface {
    pub volume_percent: f32,
    pub muted: bool,
    pub effect_8d: bool,
    pub effect_16d: bool,
    pub intensity_percent: f32,
    pub speed_percent: f32,
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self {
            volume_percent: 70.0,
            muted: false,
            effect_8d: false,
            effect_16d: false,
            intensity_percent: 50.0,
            speed_percent: 50.0,
        }
    }
}

impl ControlSurface {
    /// Turning one effect switch on turns the other off.
    pub fn toggle_8d(&mut self, enabled: bool) {
        self.effect_8d = enabled;
        if enabled {
            self.effect_16d = false;
        }
    }

    pub fn toggle_16d(&mut self, enabled: bool) {
        self.effect_16d = enabled;
        if enabled {
            self.effect_8d = false;
        }
    }

    /// Selected mode. 8D wins if a deserialized surface has both switches on.
    pub fn mode(&self) -> RotationMode {
        if self.effect_8d {
            RotationMode::Rotate8D
        } else if self.effect_16d {
            RotationMode::Rotate16D
        } else {
            RotationMode::None
        }
    }

    pub fn gain(&self) -> f32 {
        volume_gain(self.volume_percent, self.muted)
    }

    pub fn intensity(&self) -> f32 {
        intensity_from_percent(self.intensity_percent)
    }

    pub fn rotation_speed(&self) -> f32 {
        rotation_speed_from_percent(self.speed_percent)
    }

    /// Pushes every control value into `engine`.
    pub fn apply(&self, engine: &mut AudioEngine) {
        engine.set_volume(self.gain());
        engine.set_rotation_speed(self.rotation_speed());
        engine.set_rotation_effect(self.mode(), self.intensity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, MediaElement};

    #[test]
    fn muting_silences_regardless_of_slider() {
        assert_eq!(volume_gain(70.0, true), 0.0);
        assert!((volume_gain(70.0, false) - 0.7).abs() < 1e-6);
        assert_eq!(volume_gain(250.0, false), 1.0);
    }

    #[test]
    fn speed_matches_per_frame_calibration() {
        assert!((rotation_speed_from_percent(50.0) - 3.0).abs() < 1e-6);
        assert_eq!(rotation_speed_from_percent(-10.0), 0.0);
        assert_eq!(rotation_speed_from_percent(f32::NAN), 0.0);
    }

    #[test]
    fn effect_switches_are_exclusive() {
        let mut controls = ControlSurface::default();
        controls.toggle_8d(true);
        controls.toggle_16d(true);
        assert!(!controls.effect_8d);
        assert_eq!(controls.mode(), RotationMode::Rotate16D);

        controls.toggle_16d(false);
        assert_eq!(controls.mode(), RotationMode::None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let controls: ControlSurface = serde_json::from_str(r#"{"effect16d":true}"#).unwrap();
        assert_eq!(controls.mode(), RotationMode::Rotate16D);
        assert_eq!(controls.volume_percent, 70.0);
    }

    #[test]
    fn apply_drives_the_engine() {
        let mut engine = AudioEngine::new(EngineConfig::default());
        engine
            .initialize(MediaElement::silence(0.1, 48_000).unwrap())
            .unwrap();

        let mut controls = ControlSurface {
            intensity_percent: 80.0,
            ..ControlSurface::default()
        };
        controls.toggle_8d(true);
        controls.apply(&mut engine);

        assert_eq!(engine.volume(), Some(0.7));
        assert!((engine.gate_level(RotationMode::Rotate8D) - 0.8).abs() < 1e-6);
        assert!((engine.spatial_state().rotation_speed - 3.0).abs() < 1e-6);
    }
}
