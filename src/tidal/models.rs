use serde::{Deserialize, Serialize};

use crate::model::{PlaylistDescriptor, TrackDescriptor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidalTrack {
    pub id: u64,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidalPlaylist {
    pub uuid: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub tracks: Vec<TidalTrack>,
}

impl TidalPlaylist {
    /// Bridge into the model layer: the playlist uuid becomes the id.
    pub fn to_descriptor(&self) -> PlaylistDescriptor {
        PlaylistDescriptor {
            id: Some(self.uuid.clone()),
            url: self.url.clone(),
            tracks: self
                .tracks
                .iter()
                .map(|track| TrackDescriptor {
                    track_name: track.title.clone(),
                    artists: track.artists.clone(),
                })
                .collect(),
        }
    }
}
