use tracing::debug;

use super::{orbit_position, Position, RotationMode, SpatialEffectState, ELEVATION_RATE, TWO_PI};
use crate::timeline::Ticker;

/// Drives the positional rotation while an effect is enabled.
///
/// Each delivered frame advances the phase and requests the next one; turning
/// the effect off cancels the pending frame so nothing keeps running.
#[derive(Debug, Clone)]
pub struct RotationAnimator {
    state: SpatialEffectState,
    elevation_phase: f32,
    position: Position,
    ticker: Ticker,
}

impl RotationAnimator {
    pub fn new(rotation_speed: f32) -> Self {
        Self {
            state: SpatialEffectState::new(rotation_speed),
            elevation_phase: 0.0,
            position: Position::ORIGIN,
            ticker: Ticker::new(),
        }
    }

    pub fn state(&self) -> SpatialEffectState {
        self.state
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Whether a frame is scheduled.
    pub fn is_running(&self) -> bool {
        self.ticker.is_pending()
    }

    pub fn frames(&self) -> u64 {
        self.ticker.fired()
    }

    /// Applies a new mode and intensity and returns the position the
    /// spatializer should take right away.
    pub fn set_effect(&mut self, mode: RotationMode, intensity: f32) -> Position {
        if !mode.is_active() {
            self.stop();
            return self.position;
        }

        if mode != self.state.mode {
            self.state.phase_angle = 0.0;
            self.elevation_phase = 0.0;
        }
        self.state.mode = mode;
        self.state.intensity = intensity;
        self.position = self.current_orbit_position();
        self.ticker.request();
        debug!(%mode, intensity, "rotation animation scheduled");
        self.position
    }

    pub fn set_rotation_speed(&mut self, rotation_speed: f32) {
        self.state.rotation_speed = rotation_speed;
    }

    /// Delivers one animation frame. Returns the new position, or `None` if
    /// no frame was pending.
    pub fn frame(&mut self, dt_seconds: f32) -> Option<Position> {
        if !self.ticker.fire() {
            return None;
        }
        if !self.state.mode.is_active() {
            return None;
        }

        let step = self.state.rotation_speed * dt_seconds.max(0.0);
        self.state.phase_angle = (self.state.phase_angle + step).rem_euclid(TWO_PI);
        self.elevation_phase = (self.elevation_phase + step * ELEVATION_RATE).rem_euclid(TWO_PI);
        self.position = self.current_orbit_position();

        self.ticker.request();
        Some(self.position)
    }

    /// Cancels the pending frame and returns to the origin with phase zero.
    pub fn stop(&mut self) {
        self.ticker.cancel();
        self.state.mode = RotationMode::None;
        self.state.intensity = 0.0;
        self.state.phase_angle = 0.0;
        self.elevation_phase = 0.0;
        self.position = Position::ORIGIN;
    }

    fn current_orbit_position(&self) -> Position {
        orbit_position(
            self.state.mode,
            self.state.radius(),
            self.state.phase_angle,
            self.elevation_phase,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_animator_does_nothing() {
        let mut animator = RotationAnimator::new(3.0);
        assert!(!animator.is_running());
        assert_eq!(animator.frame(0.016), None);
        assert!(animator.position().is_origin());
    }

    #[test]
    fn frames_advance_phase_and_reschedule() {
        let mut animator = RotationAnimator::new(2.0);
        let start = animator.set_effect(RotationMode::Rotate8D, 0.5);
        assert!((start.x - 1.0).abs() < 1e-6);

        let next = animator.frame(0.25).unwrap();
        assert!((animator.state().phase_angle - 0.5).abs() < 1e-6);
        assert!((next.x - 0.5_f32.cos()).abs() < 1e-6);
        assert!(animator.is_running());
        assert_eq!(animator.frames(), 1);
    }

    #[test]
    fn phase_wraps_into_one_turn() {
        let mut animator = RotationAnimator::new(TWO_PI);
        animator.set_effect(RotationMode::Rotate16D, 1.0);
        animator.frame(1.25);
        let phase = animator.state().phase_angle;
        assert!((0.0..TWO_PI).contains(&phase));
        assert!((phase - TWO_PI * 0.25).abs() < 1e-4);
    }

    #[test]
    fn turning_off_cancels_and_recentres() {
        let mut animator = RotationAnimator::new(3.0);
        animator.set_effect(RotationMode::Rotate8D, 1.0);
        animator.frame(0.1);
        animator.set_effect(RotationMode::None, 1.0);

        assert!(!animator.is_running());
        assert!(animator.position().is_origin());
        assert_eq!(animator.state().phase_angle, 0.0);
        assert_eq!(animator.frame(0.1), None);
        assert_eq!(animator.frames(), 1);
    }

    #[test]
    fn mode_switch_restarts_phase() {
        let mut animator = RotationAnimator::new(3.0);
        animator.set_effect(RotationMode::Rotate8D, 1.0);
        animator.frame(0.2);
        animator.set_effect(RotationMode::Rotate16D, 1.0);
        assert_eq!(animator.state().phase_angle, 0.0);

        animator.frame(0.2);
        let phase = animator.state().phase_angle;
        animator.set_effect(RotationMode::Rotate16D, 0.5);
        assert_eq!(animator.state().phase_angle, phase);
    }
}
