use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{mapping::volume_gain, AudioEngine, MediaElement, Result, Track};

/// Transport state owned by the player and read by the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Gain in [0, 1] after muting.
    pub volume: f32,
    pub is_playing: bool,
    pub current_time_sec: f32,
    pub duration_sec: f32,
}

/// Owns the media element and the engine it feeds.
///
/// The engine is initialized lazily with the first loaded track; later loads
/// swap the source node instead of building another graph.
#[derive(Debug)]
pub struct Player {
    engine: AudioEngine,
    media: Option<MediaElement>,
    track: Option<Track>,
    volume_percent: f32,
    muted: bool,
}

impl Player {
    /// Wraps `engine` with nothing loaded, at 70% volume and unmuted.
    pub fn new(engine: AudioEngine) -> Self {
        Self {
            engine,
            media: None,
            track: None,
            volume_percent: 70.0,
            muted: false,
        }
    }

    /// Engine fed by the loaded element.
    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    /// Last successfully loaded track.
    pub fn current_track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Element of the current track.
    pub fn media(&self) -> Option<&MediaElement> {
        self.media.as_ref()
    }

    /// Validates `track` and connects `media` to the engine in place of the
    /// previous element, which is paused once the new one is connected.
    ///
    /// On error the player keeps its previous track and media untouched.
    pub fn load_track(&mut self, track: Track, media: MediaElement) -> Result<()> {
        track.validate()?;

        if self.engine.is_initialized() {
            self.engine.replace_source(media.clone());
        } else {
            self.engine.initialize(media.clone())?;
        }
        self.engine.set_volume(self.gain());

        if let Some(previous) = self.media.replace(media) {
            if !self.media.as_ref().is_some_and(|current| current.same_as(&previous)) {
                previous.pause();
            }
        }

        info!(id = %track.id, title = %track.title, "track loaded");
        self.track = Some(track);
        Ok(())
    }

    /// Starts the loaded element; warns when nothing is loaded.
    pub fn play(&mut self) {
        match &self.media {
            Some(media) => media.play(),
            None => warn!("play requested with no track loaded"),
        }
    }

    pub fn pause(&mut self) {
        if let Some(media) = &self.media {
            media.pause();
        }
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Moves the playhead of the loaded element, in seconds.
    pub fn seek(&mut self, seconds: f32) {
        if let Some(media) = &self.media {
            media.seek(seconds);
        }
    }

    /// True while the loaded element is advancing.
    pub fn is_playing(&self) -> bool {
        self.media.as_ref().is_some_and(MediaElement::is_playing)
    }

    /// Volume slider position in percent.
    pub fn set_volume(&mut self, volume_percent: f32) {
        self.volume_percent = volume_percent;
        self.engine.set_volume(self.gain());
    }

    /// Mute keeps the slider position and drives the master gain to 0.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.engine.set_volume(self.gain());
    }

    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.muted);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Snapshot of the transport for the view. Times read 0 with no track.
    pub fn state(&self) -> PlaybackState {
        let (current_time_sec, duration_sec) = self
            .media
            .as_ref()
            .map(|media| (media.current_time(), media.duration()))
            .unwrap_or((0.0, 0.0));

        PlaybackState {
            volume: self.gain(),
            is_playing: self.is_playing(),
            current_time_sec,
            duration_sec,
        }
    }

    /// Stops playback and releases the engine's audio resources.
    pub fn shutdown(&mut self) {
        self.pause();
        self.engine.destroy();
    }

    fn gain(&self) -> f32 {
        volume_gain(self.volume_percent, self.muted)
    }
}
