use std::f32::consts::FRAC_PI_2;

use super::{ModulationGate, Position, RotationMode, ROTATE_16D_MULTIPLIER, TWO_PI};

/// Sine low-frequency oscillator driven by a phase accumulator in [0, 1).
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    phase_increment: f32,
    frequency: f32,
    sample_rate: f32,
    running: bool,
}

impl Lfo {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_increment: frequency / sample_rate,
            frequency,
            sample_rate,
            running: false,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// A stopped oscillator outputs silence and keeps its phase.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.running {
            return 0.0;
        }

        let sample = (self.phase * TWO_PI).sin();
        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

/// Stereo/3D panner sitting between the equalizer and the master gain.
///
/// The pan control sums the horizontal direction of the animated position
/// with the two gated oscillators; the distance of the position attenuates
/// the signal with an inverse model (reference distance 1, rolloff 1).
#[derive(Debug, Clone)]
pub struct Spatializer {
    lfo_a: Lfo,
    lfo_b: Lfo,
    gate_a: ModulationGate,
    gate_b: ModulationGate,
    position: Position,
    position_pan: f32,
    distance_gain: f32,
    last_pan: f32,
}

impl Spatializer {
    pub fn new(rotation_a_hz: f32, rotation_b_hz: f32, sample_rate: f32) -> Self {
        Self {
            lfo_a: Lfo::new(rotation_a_hz, sample_rate),
            lfo_b: Lfo::new(rotation_b_hz, sample_rate),
            gate_a: ModulationGate::new(1.0),
            gate_b: ModulationGate::new(ROTATE_16D_MULTIPLIER),
            position: Position::ORIGIN,
            position_pan: 0.0,
            distance_gain: 1.0,
            last_pan: 0.0,
        }
    }

    pub fn start_oscillators(&mut self) {
        self.lfo_a.start();
        self.lfo_b.start();
    }

    pub fn stop_oscillators(&mut self) {
        self.lfo_a.stop();
        self.lfo_b.stop();
    }

    pub fn oscillators_running(&self) -> bool {
        self.lfo_a.is_running() || self.lfo_b.is_running()
    }

    /// Opens the gate belonging to `mode` at `intensity` and closes the other.
    /// The closing write always happens first.
    pub fn set_rotation_gates(&mut self, mode: RotationMode, intensity: f32) {
        match mode {
            RotationMode::None => {
                self.gate_a.close();
                self.gate_b.close();
            }
            RotationMode::Rotate8D => {
                self.gate_b.close();
                self.gate_a.set_level(intensity);
            }
            RotationMode::Rotate16D => {
                self.gate_a.close();
                self.gate_b.set_level(intensity);
            }
        }
    }

    pub fn gate(&self, mode: RotationMode) -> Option<&ModulationGate> {
        match mode {
            RotationMode::None => None,
            RotationMode::Rotate8D => Some(&self.gate_a),
            RotationMode::Rotate16D => Some(&self.gate_b),
        }
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;

        let horizontal = (position.x * position.x + position.z * position.z).sqrt();
        self.position_pan = if horizontal > f32::EPSILON {
            position.x / horizontal
        } else {
            0.0
        };
        self.distance_gain = 1.0 / position.distance().max(1.0);
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn distance_gain(&self) -> f32 {
        self.distance_gain
    }

    /// Pan value applied to the most recent frame.
    pub fn last_pan(&self) -> f32 {
        self.last_pan
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let modulation = self.lfo_a.next_sample() * self.gate_a.depth()
            + self.lfo_b.next_sample() * self.gate_b.depth();
        let pan = (self.position_pan + modulation).clamp(-1.0, 1.0);
        self.last_pan = pan;

        let (out_l, out_r) = if pan <= 0.0 {
            let x = (pan + 1.0) * FRAC_PI_2;
            (left + right * x.cos(), right * x.sin())
        } else {
            let x = pan * FRAC_PI_2;
            (left * x.cos(), right + left * x.sin())
        };

        (out_l * self.distance_gain, out_r * self.distance_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    #[test]
    fn lfo_completes_one_cycle_per_period() {
        let mut lfo = Lfo::new(1.0, SAMPLE_RATE);
        lfo.start();
        let samples: Vec<f32> = (0..1000).map(|_| lfo.next_sample()).collect();
        assert!(samples[0].abs() < 1e-6);
        assert!((samples[250] - 1.0).abs() < 1e-3);
        assert!((samples[750] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn stopped_lfo_is_silent() {
        let mut lfo = Lfo::new(5.0, SAMPLE_RATE);
        assert_eq!(lfo.next_sample(), 0.0);
        lfo.start();
        lfo.next_sample();
        lfo.stop();
        assert!((0..10).all(|_| lfo.next_sample() == 0.0));
    }

    #[test]
    fn centred_source_passes_through() {
        let mut spatializer = Spatializer::new(0.2, 0.4, SAMPLE_RATE);
        spatializer.start_oscillators();
        let (l, r) = spatializer.process(0.5, 0.25);
        assert!((l - 0.5).abs() < 1e-6);
        assert!((r - 0.25).abs() < 1e-6);
    }

    #[test]
    fn hard_right_position_moves_energy_right() {
        let mut spatializer = Spatializer::new(0.2, 0.4, SAMPLE_RATE);
        spatializer.set_position(Position::new(1.0, 0.0, 0.0));
        let (l, r) = spatializer.process(0.5, 0.5);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
        assert_eq!(spatializer.last_pan(), 1.0);
    }

    #[test]
    fn distance_attenuates_beyond_reference() {
        let mut spatializer = Spatializer::new(0.2, 0.4, SAMPLE_RATE);
        spatializer.set_position(Position::new(0.0, 0.0, 0.5));
        assert_eq!(spatializer.distance_gain(), 1.0);
        spatializer.set_position(Position::new(0.0, 0.0, 4.0));
        assert!((spatializer.distance_gain() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn switching_gates_never_leaves_both_open() {
        let mut spatializer = Spatializer::new(0.2, 0.4, SAMPLE_RATE);
        spatializer.set_rotation_gates(RotationMode::Rotate8D, 1.0);
        spatializer.set_rotation_gates(RotationMode::Rotate16D, 0.7);
        let a = spatializer.gate(RotationMode::Rotate8D).unwrap();
        let b = spatializer.gate(RotationMode::Rotate16D).unwrap();
        assert_eq!(a.level(), 0.0);
        assert_eq!(b.level(), 0.7);
    }

    #[test]
    fn open_gate_modulates_pan() {
        let mut spatializer = Spatializer::new(1.0, 2.0, SAMPLE_RATE);
        spatializer.start_oscillators();
        spatializer.set_rotation_gates(RotationMode::Rotate8D, 0.5);
        let mut peak: f32 = 0.0;
        for _ in 0..1000 {
            spatializer.process(0.1, 0.1);
            peak = peak.max(spatializer.last_pan());
        }
        assert!((peak - 0.5).abs() < 1e-3);
    }
}
