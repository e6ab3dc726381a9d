//! Property-based checks of the engine's control surface and the bar mapping.

use jamwave_core::{
    render::decimate, AnalyzerSnapshot, AudioEngine, EngineConfig, MediaElement, RotationMode,
    BAND_COUNT,
};
use proptest::prelude::*;

fn initialized_engine() -> AudioEngine {
    let mut engine = AudioEngine::new(EngineConfig::default());
    engine
        .initialize(MediaElement::silence(0.05, 48_000).unwrap())
        .unwrap();
    engine
}

proptest! {
    /// Writing one band never disturbs the others.
    #[test]
    fn band_writes_are_isolated(
        before in prop::array::uniform10(-12.0f32..12.0),
        index in 0usize..BAND_COUNT,
        gain in -12.0f32..12.0,
    ) {
        let mut engine = initialized_engine();
        engine.apply_preset(&before);
        engine.set_equalizer_band(index, gain);

        let after = engine.band_gains().unwrap();
        for band in 0..BAND_COUNT {
            if band == index {
                prop_assert_eq!(after[band], gain);
            } else {
                prop_assert_eq!(after[band], before[band]);
            }
        }
    }

    /// Indices past the table leave every band as it was.
    #[test]
    fn out_of_range_band_is_ignored(
        before in prop::array::uniform10(-12.0f32..12.0),
        index in BAND_COUNT..64usize,
        gain in -12.0f32..12.0,
    ) {
        let mut engine = initialized_engine();
        engine.apply_preset(&before);
        engine.set_equalizer_band(index, gain);
        prop_assert_eq!(engine.band_gains().unwrap(), before);
    }

    /// The 16D gate's modulation depth is twice the 8D one at equal intensity,
    /// and the two gates are never open together.
    #[test]
    fn rotation_gates_are_exclusive_and_scaled(intensity in 0.0f32..=1.0) {
        let mut engine = initialized_engine();

        engine.set_rotation_effect(RotationMode::Rotate8D, intensity);
        let eight = engine.modulation_depth(RotationMode::Rotate8D);
        prop_assert_eq!(engine.gate_level(RotationMode::Rotate16D), 0.0);

        engine.set_rotation_effect(RotationMode::Rotate16D, intensity);
        let sixteen = engine.modulation_depth(RotationMode::Rotate16D);
        prop_assert_eq!(engine.gate_level(RotationMode::Rotate8D), 0.0);
        prop_assert_eq!(engine.gate_level(RotationMode::Rotate16D), intensity);
        prop_assert!((sixteen - 2.0 * eight).abs() <= 1e-6);
    }

    /// 128 bins over 64 bars read every second bin exactly.
    #[test]
    fn decimation_reads_every_other_bin(bins in prop::collection::vec(any::<u8>(), 128)) {
        let snapshot = AnalyzerSnapshot::new(bins);
        let bars = decimate(&snapshot, 64);
        prop_assert_eq!(bars.len(), 64);
        for (k, value) in bars.iter().enumerate() {
            prop_assert_eq!(*value, snapshot[k * 2]);
        }
    }

    /// The graph output stays finite whatever the gains and effect.
    #[test]
    fn rendered_audio_stays_finite(
        gains in prop::array::uniform10(-40.0f32..40.0),
        intensity in 0.0f32..=1.0,
        sixteen in any::<bool>(),
        samples in prop::collection::vec(-1.0f32..1.0, 256..1024),
    ) {
        let media = MediaElement::from_samples("noise", samples, 1, 48_000).unwrap();
        let mut engine = AudioEngine::new(EngineConfig::default());
        engine.initialize(media.clone()).unwrap();
        engine.apply_preset(&gains);
        let mode = if sixteen { RotationMode::Rotate16D } else { RotationMode::Rotate8D };
        engine.set_rotation_effect(mode, intensity);

        media.play();
        let mut block = vec![0.0f32; 512];
        while !media.ended() {
            engine.advance(0.016);
            engine.render(&mut block);
            prop_assert!(block.iter().all(|s| s.is_finite()));
        }
    }
}
