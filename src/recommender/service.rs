use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tokio::task;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::model::{Model, PlaylistDescriptor, ProcessOptions, Recommendations, store};
use crate::resolver;
use crate::tidal;

/// Async facade over the recommender [`Model`]: processes playlists and
/// persists accumulated state to the model directory.
pub struct PlaylistRecommender {
    model: RwLock<Model>,
    model_dir: PathBuf,
}

impl PlaylistRecommender {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: RwLock::new(Model::new()),
            model_dir: model_dir.into(),
        }
    }

    /// Wrap an already-built model (training, tests, embedding).
    pub fn from_model(model: Model, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: RwLock::new(model),
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub async fn load(&self) -> Result<()> {
        let mut model = self.model.write().await;
        model.load(&self.model_dir)?;
        info!(
            "Loaded model from {}: {} artists, {} playlists",
            self.model_dir.display(),
            model.artist_count(),
            model.playlist_count()
        );
        Ok(())
    }

    /// Process a playlist descriptor into recommendations. When the
    /// descriptor carries no id, one is derived from its URL if that URL
    /// is a Tidal playlist link; otherwise processing is id-less and the
    /// playlist is not registered.
    pub async fn process_playlist(
        &self,
        input: &PlaylistDescriptor,
        options: &ProcessOptions,
    ) -> Result<Recommendations> {
        let names: Vec<String> = input
            .tracks
            .iter()
            .flat_map(|track| track.artists.iter().cloned())
            .collect();

        let id = input
            .id
            .clone()
            .or_else(|| tidal::parse_playlist_url(&input.url).ok());
        if input.id.is_none() {
            match &id {
                Some(derived) => debug!("Derived playlist id {} from {}", derived, input.url),
                None => debug!("No playlist id derivable from {}", input.url),
            }
        }

        self.process_artists(&names, id.as_deref(), options).await
    }

    /// Process a bare list of artist names (no descriptor).
    pub async fn process_artists(
        &self,
        names: &[String],
        id: Option<&str>,
        options: &ProcessOptions,
    ) -> Result<Recommendations> {
        let mut model = self.model.write().await;
        let resolved = resolver::resolve_all(names, model.artist_names());
        let result = model.process_artists(&resolved, id, options);

        info!(
            "Processed {} artist names: {} recommended artists, {} related playlists",
            names.len(),
            result.artists.len(),
            result.playlists.len()
        );
        Ok(result)
    }

    /// Persist the dirty parts of the model. The write happens on the
    /// blocking pool; the model is marked clean only after it succeeds.
    pub async fn save_model(&self) -> Result<()> {
        let mut model = self.model.write().await;
        if !model.is_dirty() {
            debug!("Model is clean, skipping save");
            return Ok(());
        }

        let snapshot = model.snapshot();
        let folder = self.model_dir.clone();
        task::spawn_blocking(move || store::write_snapshot(&folder, &snapshot))
            .await
            .map_err(|e| AppError::Model(format!("Save task failed: {}", e)))??;

        model.mark_clean();
        info!("Saved model to {}", self.model_dir.display());
        Ok(())
    }

    /// Drop all registered playlists, keeping the artist catalog.
    pub async fn reset(&self) {
        self.model.write().await.reset();
    }

    pub async fn artist_names(&self) -> Vec<String> {
        self.model.read().await.artist_names().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayMatrix, store};
    use tempfile::TempDir;

    const FACTORS: usize = 16;

    fn fitted_model() -> Model {
        let mut artists: Vec<String> = (0..30).map(|i| format!("Artist {}", i)).collect();
        artists[0] = "Radiohead".to_string();
        let playlists: Vec<String> = (0..11).map(|i| format!("playlist-{}", i)).collect();

        let mut triplets = Vec::new();
        for artist in 0..artists.len() {
            for playlist in 0..playlists.len() {
                if (artist + playlist) % 3 == 0 {
                    triplets.push((artist, playlist, ((artist * 5 + playlist) % 7 + 1) as f32));
                }
            }
        }
        let plays = PlayMatrix::from_triplets(artists.len(), playlists.len(), &triplets);

        let mut model = Model::with_factors(FACTORS);
        model.fit(&plays, playlists, artists).unwrap();
        model.mark_clean();
        model
    }

    #[tokio::test]
    async fn process_playlist_yields_artists_and_playlists() {
        let tmp = TempDir::new().unwrap();
        let recommender = PlaylistRecommender::from_model(fitted_model(), tmp.path());

        let input = PlaylistDescriptor::mock("Creep", "Radiohead");
        let options = ProcessOptions {
            update: false,
            recommend: true,
        };

        let result = recommender.process_playlist(&input, &options).await.unwrap();
        assert!(!result.artists.is_empty());
        assert!(!result.playlists.is_empty());
    }

    #[tokio::test]
    async fn misspelled_artist_names_still_resolve() {
        let tmp = TempDir::new().unwrap();
        let recommender = PlaylistRecommender::from_model(fitted_model(), tmp.path());

        let input = PlaylistDescriptor::mock("Creep", "Radiohaed");
        let result = recommender
            .process_playlist(&input, &ProcessOptions::default())
            .await
            .unwrap();
        assert!(!result.artists.is_empty());
        assert!(!result.playlists.is_empty());
    }

    #[tokio::test]
    async fn save_model_writes_dirty_state() {
        let tmp = TempDir::new().unwrap();
        let recommender = PlaylistRecommender::from_model(fitted_model(), tmp.path());

        let names = vec!["Radiohead".to_string()];
        let options = ProcessOptions::default();
        recommender
            .process_artists(&names, Some("test-mix"), &options)
            .await
            .unwrap();

        recommender.save_model().await.unwrap();
        assert!(tmp.path().join(store::PLAYLISTS_FILE).exists());
        assert!(!tmp.path().join(store::ARTISTS_FILE).exists());
    }

    #[tokio::test]
    async fn save_clean_model_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let recommender = PlaylistRecommender::from_model(fitted_model(), tmp.path());

        recommender.save_model().await.unwrap();
        assert!(!tmp.path().join(store::PLAYLISTS_FILE).exists());
        assert!(!tmp.path().join(store::ARTISTS_FILE).exists());
    }

    #[tokio::test]
    async fn reset_then_save_clears_playlists() {
        let tmp = TempDir::new().unwrap();
        let recommender = PlaylistRecommender::from_model(fitted_model(), tmp.path());

        recommender.reset().await;
        recommender.save_model().await.unwrap();

        let shard = store::read_playlists(tmp.path()).unwrap().unwrap();
        assert!(shard.ids.is_empty());
        assert!(!tmp.path().join(store::ARTISTS_FILE).exists());
    }
}
