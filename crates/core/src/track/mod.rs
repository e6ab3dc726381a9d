use serde::{Deserialize, Serialize};

use crate::{Result, SpatialAudioError};

/// Normalized track record.
///
/// Library uploads and external playlists describe tracks with slightly
/// different field names; the aliases fold both shapes into this one record,
/// and [`Track::validate`] runs wherever data enters from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(rename = "duration", default)]
    pub duration_sec: f32,
    #[serde(alias = "previewUrl")]
    pub url: String,
    #[serde(alias = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            album: None,
            duration_sec: 0.0,
            url: url.into(),
            cover_url: None,
            added_by: None,
        }
    }

    /// Parses and validates a single record.
    pub fn from_json(json: &str) -> Result<Self> {
        let track: Track = serde_json::from_str(json)
            .map_err(|err| SpatialAudioError::InvalidTrack(err.to_string()))?;
        track.validate()?;
        Ok(track)
    }

    /// Parses a list of records, rejecting the whole list on the first
    /// invalid entry.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        let tracks: Vec<Track> = serde_json::from_str(json)
            .map_err(|err| SpatialAudioError::InvalidTrack(err.to_string()))?;
        for track in &tracks {
            track.validate()?;
        }
        Ok(tracks)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SpatialAudioError::InvalidTrack("id is empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(SpatialAudioError::InvalidTrack(format!(
                "track {} has no title",
                self.id
            )));
        }
        if self.url.trim().is_empty() {
            return Err(SpatialAudioError::InvalidTrack(format!(
                "track {} has no playable url",
                self.id
            )));
        }
        if !self.duration_sec.is_finite() || self.duration_sec < 0.0 {
            return Err(SpatialAudioError::InvalidTrack(format!(
                "track {} has invalid duration {}",
                self.id, self.duration_sec
            )));
        }
        Ok(())
    }
}
