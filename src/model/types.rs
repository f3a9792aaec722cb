use serde::{Deserialize, Serialize};

/// Playlist handed to the processor: the source URL plus its tracks.
/// Matches the JSON shape emitted by playlist scrapers (`trackName` etc).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub tracks: Vec<TrackDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub track_name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Register the processed playlist in the model.
    pub update: bool,
    /// Compute artist recommendations (related playlists are always computed).
    #[serde(default = "default_recommend")]
    pub recommend: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            update: true,
            recommend: true,
        }
    }
}

fn default_recommend() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendations {
    pub artists: Vec<ScoredArtist>,
    pub playlists: Vec<ScoredPlaylist>,
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.playlists.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredArtist {
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPlaylist {
    pub id: String,
    pub score: f32,
}

/// Fit input: play counts as (artist index, playlist index, count) triplets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSet {
    pub artists: Vec<String>,
    pub playlists: Vec<String>,
    pub plays: Vec<(usize, usize, f32)>,
}

#[cfg(test)]
impl PlaylistDescriptor {
    pub fn mock(track: &str, artist: &str) -> Self {
        Self {
            id: None,
            url: "https://tidal.com/blah".to_string(),
            tracks: vec![TrackDescriptor {
                track_name: track.to_string(),
                artists: vec![artist.to_string()],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_uses_camel_case() {
        let json = r#"{"tracks":[{"trackName":"Creep","artists":["Radiohead"]}],"url":"https://tidal.com/blah"}"#;
        let descriptor: PlaylistDescriptor = serde_json::from_str(json).unwrap();

        assert!(descriptor.id.is_none());
        assert_eq!(descriptor.tracks.len(), 1);
        assert_eq!(descriptor.tracks[0].track_name, "Creep");
        assert_eq!(descriptor.tracks[0].artists, vec!["Radiohead".to_string()]);
    }

    #[test]
    fn recommend_option_defaults_to_true() {
        let options: ProcessOptions = serde_json::from_str(r#"{"update":false}"#).unwrap();
        assert!(!options.update);
        assert!(options.recommend);
    }
}
