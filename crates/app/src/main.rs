use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use jamwave_core::{
    write_stereo_wav, AppConfig, AudioEngine, EqPreset, FilterShape, MediaElement, RotationMode,
    TextCanvas, Visualizer, BAND_FREQUENCIES,
};
use tracing_subscriber::EnvFilter;

const SPECTRUM_ROWS: usize = 16;

fn main() -> jamwave_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            input,
            output,
            effects,
            spectrum,
        } => run_render(&input, &output, &effects, spectrum),
        Commands::Play {
            input,
            effects,
            seconds,
        } => run_play(&input, &effects, seconds),
        Commands::Bands => {
            print_bands();
            Ok(())
        }
        Commands::Presets => {
            print_presets();
            Ok(())
        }
    }
}

fn run_render(
    input: &Path,
    output: &Path,
    effects: &EffectArgs,
    spectrum: bool,
) -> jamwave_core::Result<()> {
    let config = load_config(effects.config.as_deref())?;
    let media = MediaElement::from_wav(input)?;
    let sample_rate = media.sample_rate();
    tracing::info!(?input, ?output, sample_rate, "rendering offline");

    // Offline rendering runs at the file's own rate.
    let mut engine_config = config.engine.clone();
    engine_config.sample_rate = sample_rate;
    let block_size = engine_config.block_size;

    let mut engine = AudioEngine::new(engine_config);
    engine.initialize(media.clone())?;
    effects.apply(&mut engine);

    let total_frames = (media.duration() * sample_rate as f32).round() as usize;
    let dt = block_size as f32 / sample_rate as f32;
    let mut block = vec![0.0_f32; block_size * 2];
    let mut rendered = Vec::with_capacity(total_frames * 2);

    media.play();
    while !media.ended() {
        engine.advance(dt);
        let frames = engine.render(&mut block);
        rendered.extend_from_slice(&block[..frames * 2]);
    }
    rendered.truncate(total_frames * 2);

    write_stereo_wav(output, &rendered, sample_rate)?;
    tracing::info!(frames = total_frames, "render finished");

    if spectrum {
        print_spectrum(&engine, &config);
    }

    engine.destroy();
    Ok(())
}

#[cfg(feature = "device")]
fn run_play(input: &Path, effects: &EffectArgs, seconds: Option<f32>) -> jamwave_core::Result<()> {
    use std::time::{Duration, Instant};

    use jamwave_core::{DeviceBackend, FrameClock};

    const FRAME_INTERVAL: Duration = Duration::from_millis(16);

    let config = load_config(effects.config.as_deref())?;
    let media = MediaElement::from_wav(input)?;

    let mut engine = AudioEngine::with_backend(config.engine.clone(), Box::new(DeviceBackend));
    engine.initialize(media.clone())?;
    if engine.sample_rate() != Some(media.sample_rate()) {
        tracing::warn!(
            media = media.sample_rate(),
            device = ?engine.sample_rate(),
            "sample rates differ; playback speed will be off"
        );
    }
    effects.apply(&mut engine);

    media.play();
    let started = Instant::now();
    let mut clock = FrameClock::new();
    while !media.ended() {
        let elapsed = started.elapsed().as_secs_f64();
        if seconds.is_some_and(|limit| elapsed >= f64::from(limit)) {
            break;
        }
        engine.advance(clock.frame(elapsed));
        std::thread::sleep(FRAME_INTERVAL);
    }

    media.pause();
    engine.destroy();
    Ok(())
}

#[cfg(not(feature = "device"))]
fn run_play(input: &Path, _effects: &EffectArgs, _seconds: Option<f32>) -> jamwave_core::Result<()> {
    tracing::warn!(?input, "live playback requested without device support");
    Err(jamwave_core::SpatialAudioError::Unavailable(
        "jamwave was built without the `device` feature".into(),
    ))
}

fn print_spectrum(engine: &AudioEngine, config: &AppConfig) {
    let bar_count = config.visualizer.bar_count;
    let mut canvas = TextCanvas::new(bar_count * 2, SPECTRUM_ROWS);
    let visualizer = Visualizer::new(&config.visualizer);

    match visualizer.draw(engine, &mut canvas) {
        Ok(()) => print!("{canvas}"),
        Err(err) => tracing::warn!(%err, "could not draw spectrum"),
    }
}

fn print_bands() {
    for (index, frequency) in BAND_FREQUENCIES.iter().enumerate() {
        println!("{index:>2}  {frequency:>7} Hz  {:?}", FilterShape::for_band(index));
    }
}

fn print_presets() {
    for preset in EqPreset::ALL {
        let gains: Vec<String> = preset.gains().iter().map(|gain| format!("{gain:+}")).collect();
        println!("{:<12} {:<14} [{}]", preset.key(), preset.name(), gains.join(", "));
    }
}

fn load_config(path: Option<&Path>) -> jamwave_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Spatial audio player with 8D/16D rotation effects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a WAV file through the full graph and write the result.
    Render {
        /// Input WAV file.
        input: PathBuf,
        /// Output path for the processed 32-bit float stereo WAV.
        output: PathBuf,
        #[command(flatten)]
        effects: EffectArgs,
        /// Print the final analyzer snapshot as text bars.
        #[arg(long)]
        spectrum: bool,
    },
    /// Play a WAV file through the default output device.
    Play {
        input: PathBuf,
        #[command(flatten)]
        effects: EffectArgs,
        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<f32>,
    },
    /// List the equalizer band table.
    Bands,
    /// List the built-in equalizer presets.
    Presets,
}

#[derive(Args, Debug)]
struct EffectArgs {
    /// Equalizer preset (flat, bass, treble, vocal, rock, pop, electronic, jazz, classical).
    #[arg(long)]
    preset: Option<EqPreset>,
    /// Rotation effect: none, 8d or 16d.
    #[arg(long, default_value = "none")]
    effect: RotationMode,
    /// Effect intensity in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    intensity: f32,
    /// Rotation speed in rad/s. Defaults to the configured speed.
    #[arg(long)]
    speed: Option<f32>,
    /// Master gain in [0, 1].
    #[arg(long, default_value_t = 1.0)]
    volume: f32,
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl EffectArgs {
    fn apply(&self, engine: &mut AudioEngine) {
        if let Some(preset) = self.preset {
            tracing::info!(%preset, "applying equalizer preset");
            engine.apply_preset(&preset.gains());
        }
        if let Some(speed) = self.speed {
            engine.set_rotation_speed(speed);
        }
        engine.set_volume(self.volume);
        engine.set_rotation_effect(self.effect, self.intensity);
    }
}
