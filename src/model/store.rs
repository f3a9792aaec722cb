use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

pub const ARTISTS_FILE: &str = "artists.json";
pub const PLAYLISTS_FILE: &str = "playlists.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistShard {
    pub factors: usize,
    pub names: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistShard {
    pub factors: usize,
    pub ids: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

/// The dirty parts of a model, ready to be written. A `None` shard means
/// that side has no unsaved changes.
#[derive(Debug, Clone, Default)]
pub struct ModelSnapshot {
    pub artists: Option<ArtistShard>,
    pub playlists: Option<PlaylistShard>,
}

impl ModelSnapshot {
    pub fn is_empty(&self) -> bool {
        self.artists.is_none() && self.playlists.is_none()
    }
}

pub fn write_snapshot(folder: &Path, snapshot: &ModelSnapshot) -> Result<()> {
    if snapshot.is_empty() {
        return Ok(());
    }

    fs::create_dir_all(folder)?;

    if let Some(artists) = &snapshot.artists {
        let path = folder.join(ARTISTS_FILE);
        fs::write(&path, serde_json::to_string(artists)?)?;
        debug!("Wrote {} artists to {}", artists.names.len(), path.display());
    }

    if let Some(playlists) = &snapshot.playlists {
        let path = folder.join(PLAYLISTS_FILE);
        fs::write(&path, serde_json::to_string(playlists)?)?;
        debug!(
            "Wrote {} playlists to {}",
            playlists.ids.len(),
            path.display()
        );
    }

    Ok(())
}

pub fn read_artists(folder: &Path) -> Result<Option<ArtistShard>> {
    let path = folder.join(ARTISTS_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let shard: ArtistShard = serde_json::from_str(&fs::read_to_string(&path)?)?;
    validate_shard(shard.names.len(), &shard.vectors, shard.factors, &path)?;
    Ok(Some(shard))
}

pub fn read_playlists(folder: &Path) -> Result<Option<PlaylistShard>> {
    let path = folder.join(PLAYLISTS_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let shard: PlaylistShard = serde_json::from_str(&fs::read_to_string(&path)?)?;
    validate_shard(shard.ids.len(), &shard.vectors, shard.factors, &path)?;
    Ok(Some(shard))
}

fn validate_shard(labels: usize, vectors: &[Vec<f32>], factors: usize, path: &Path) -> Result<()> {
    if vectors.len() != labels {
        return Err(AppError::Model(format!(
            "{}: {} labels but {} vectors",
            path.display(),
            labels,
            vectors.len()
        )));
    }
    if let Some(row) = vectors.iter().find(|row| row.len() != factors) {
        return Err(AppError::Model(format!(
            "{}: vector of length {} does not match factor dimension {}",
            path.display(),
            row.len(),
            factors
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artist_shard() -> ArtistShard {
        ArtistShard {
            factors: 2,
            names: vec!["dEUS".to_string(), "Anvil".to_string()],
            vectors: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let snapshot = ModelSnapshot {
            artists: Some(artist_shard()),
            playlists: Some(PlaylistShard {
                factors: 2,
                ids: vec!["mix-1".to_string()],
                vectors: vec![vec![0.5, 0.6]],
            }),
        };

        write_snapshot(tmp.path(), &snapshot).unwrap();

        let artists = read_artists(tmp.path()).unwrap().unwrap();
        assert_eq!(artists.names, vec!["dEUS", "Anvil"]);
        assert_eq!(artists.vectors[1], vec![0.3, 0.4]);

        let playlists = read_playlists(tmp.path()).unwrap().unwrap();
        assert_eq!(playlists.ids, vec!["mix-1"]);
    }

    #[test]
    fn missing_files_read_as_none() {
        let tmp = TempDir::new().unwrap();
        assert!(read_artists(tmp.path()).unwrap().is_none());
        assert!(read_playlists(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn empty_snapshot_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        write_snapshot(tmp.path(), &ModelSnapshot::default()).unwrap();
        assert!(!tmp.path().join(ARTISTS_FILE).exists());
        assert!(!tmp.path().join(PLAYLISTS_FILE).exists());
    }

    #[test]
    fn partial_snapshot_writes_one_shard() {
        let tmp = TempDir::new().unwrap();
        let snapshot = ModelSnapshot {
            artists: Some(artist_shard()),
            playlists: None,
        };

        write_snapshot(tmp.path(), &snapshot).unwrap();
        assert!(tmp.path().join(ARTISTS_FILE).exists());
        assert!(!tmp.path().join(PLAYLISTS_FILE).exists());
    }

    #[test]
    fn mismatched_shard_is_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(ARTISTS_FILE),
            r#"{"factors":2,"names":["a","b"],"vectors":[[0.1,0.2]]}"#,
        )
        .unwrap();

        assert!(matches!(
            read_artists(tmp.path()),
            Err(AppError::Model(_))
        ));
    }
}
