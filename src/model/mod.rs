pub mod factors;
pub mod store;
pub mod types;

pub use factors::{DEFAULT_FACTORS, FactorizedModel, PlayMatrix};
pub use types::{
    PlaylistDescriptor, ProcessOptions, Recommendations, ScoredArtist, ScoredPlaylist,
    TrackDescriptor, TrainingSet,
};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::resolver;
use store::{ArtistShard, ModelSnapshot, PlaylistShard};

const TOP_N: usize = 10;

/// The recommender core: factor matrices plus the artist/playlist catalogs,
/// with per-side dirty tracking so saves only touch what changed.
#[derive(Debug, Default)]
pub struct Model {
    factorized: FactorizedModel,
    artist_names: Vec<String>,
    artist_by_name: HashMap<String, usize>,
    playlist_ids: Vec<String>,
    playlist_by_id: HashMap<String, usize>,
    dirty_artists: bool,
    dirty_playlists: bool,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factors(factors: usize) -> Self {
        Self {
            factorized: FactorizedModel::new(factors),
            ..Self::default()
        }
    }

    pub fn artist_names(&self) -> &[String] {
        &self.artist_names
    }

    pub fn playlist_ids(&self) -> &[String] {
        &self.playlist_ids
    }

    pub fn artist_count(&self) -> usize {
        self.artist_names.len()
    }

    pub fn playlist_count(&self) -> usize {
        self.playlist_ids.len()
    }

    pub fn dirty_artists(&self) -> bool {
        self.dirty_artists
    }

    pub fn dirty_playlists(&self) -> bool {
        self.dirty_playlists
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_artists || self.dirty_playlists
    }

    /// Append artists with precomputed factor rows.
    pub fn add_artists(&mut self, rows: Vec<Vec<f32>>, names: Vec<String>) -> Result<()> {
        if rows.len() != names.len() {
            return Err(AppError::Model(format!(
                "{} factor rows for {} artist names",
                rows.len(),
                names.len()
            )));
        }

        let base = self.artist_names.len();
        for (offset, name) in names.iter().enumerate() {
            self.artist_by_name
                .entry(resolver::normalize(name))
                .or_insert(base + offset);
        }
        self.factorized.add_artists(rows);
        self.artist_names.extend(names);
        self.dirty_artists = true;
        Ok(())
    }

    /// Register a playlist vector under an id, returning its index.
    pub fn add_playlist(&mut self, factors: Vec<f32>, id: &str) -> usize {
        let index = self.factorized.add_playlist(factors);
        self.playlist_ids.push(id.to_string());
        self.playlist_by_id.insert(resolver::normalize(id), index);
        self.dirty_playlists = true;
        debug!("Registered playlist {} at index {}", id, index);
        index
    }

    /// Train from scratch on a play matrix; replaces both catalogs.
    pub fn fit(
        &mut self,
        plays: &PlayMatrix,
        playlist_ids: Vec<String>,
        artist_names: Vec<String>,
    ) -> Result<()> {
        if plays.artists() != artist_names.len() || plays.playlists() != playlist_ids.len() {
            return Err(AppError::Model(format!(
                "play matrix is {}x{} but {} artists and {} playlists were given",
                plays.artists(),
                plays.playlists(),
                artist_names.len(),
                playlist_ids.len()
            )));
        }

        info!(
            "Fitting model: {} artists, {} playlists",
            artist_names.len(),
            playlist_ids.len()
        );
        self.factorized.fit(plays);
        self.artist_by_name = index_by_normalized(&artist_names);
        self.artist_names = artist_names;
        self.playlist_by_id = index_by_normalized(&playlist_ids);
        self.playlist_ids = playlist_ids;
        self.dirty_artists = true;
        self.dirty_playlists = true;
        Ok(())
    }

    /// Process a playlist's tracks: flatten their artists (with
    /// multiplicity) and delegate to [`Model::process_artists`].
    pub fn process_playlist(
        &mut self,
        tracks: &[TrackDescriptor],
        id: Option<&str>,
        options: &ProcessOptions,
    ) -> Recommendations {
        let names: Vec<String> = tracks
            .iter()
            .flat_map(|track| track.artists.iter().cloned())
            .collect();
        self.process_artists(&names, id, options)
    }

    /// The core processing step. Unknown artist names are dropped; if none
    /// remain the result is empty and the model is left untouched. Known
    /// playlist ids (matched case-insensitively) are never re-registered
    /// and are filtered out of the related-playlist results.
    pub fn process_artists(
        &mut self,
        names: &[String],
        id: Option<&str>,
        options: &ProcessOptions,
    ) -> Recommendations {
        let mut plays: HashMap<usize, f32> = HashMap::new();
        for name in names {
            match self.artist_by_name.get(&resolver::normalize(name)) {
                Some(&index) => *plays.entry(index).or_insert(0.0) += 1.0,
                None => debug!("Unknown artist: {}", name),
            }
        }
        if plays.is_empty() {
            debug!("No known artists among {} names, nothing to process", names.len());
            return Recommendations::default();
        }

        let history: Vec<(usize, f32)> = plays.iter().map(|(&index, &count)| (index, count)).collect();
        let vector = self.factorized.recalculate_playlist(&history);

        let existing = id
            .map(resolver::normalize)
            .and_then(|key| self.playlist_by_id.get(&key).copied());

        let mut result = Recommendations::default();
        if options.recommend {
            let played: HashSet<usize> = plays.keys().copied().collect();
            result.artists = self
                .factorized
                .recommend(&vector, &played, TOP_N, true)
                .into_iter()
                .map(|(index, score)| ScoredArtist {
                    name: self.artist_names[index].clone(),
                    score,
                })
                .collect();
        }
        result.playlists = self
            .factorized
            .similar_playlists(&vector, TOP_N + 1)
            .into_iter()
            .filter(|(index, _)| Some(*index) != existing)
            .take(TOP_N)
            .map(|(index, score)| ScoredPlaylist {
                id: self.playlist_ids[index].clone(),
                score,
            })
            .collect();

        if options.update
            && existing.is_none()
            && let Some(id) = id
        {
            self.add_playlist(vector, id);
        }

        result
    }

    /// Drop all registered playlists; the artist side is untouched.
    pub fn reset(&mut self) {
        self.factorized.clear_playlists();
        self.playlist_ids.clear();
        self.playlist_by_id.clear();
        self.dirty_playlists = true;
        info!("Cleared playlist side of the model");
    }

    /// Snapshot the dirty sides for persistence.
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            artists: self.dirty_artists.then(|| ArtistShard {
                factors: self.factorized.factors(),
                names: self.artist_names.clone(),
                vectors: self.factorized.artist_rows().to_vec(),
            }),
            playlists: self.dirty_playlists.then(|| PlaylistShard {
                factors: self.factorized.factors(),
                ids: self.playlist_ids.clone(),
                vectors: self.factorized.playlist_rows().to_vec(),
            }),
        }
    }

    pub fn mark_clean(&mut self) {
        self.dirty_artists = false;
        self.dirty_playlists = false;
    }

    /// Write the dirty sides to `folder` and mark the model clean.
    pub fn save(&mut self, folder: &Path) -> Result<()> {
        store::write_snapshot(folder, &self.snapshot())?;
        self.mark_clean();
        Ok(())
    }

    /// Load whatever shards exist in `folder`; an empty folder loads an
    /// empty model. Leaves the model clean.
    pub fn load(&mut self, folder: &Path) -> Result<()> {
        let artists = store::read_artists(folder)?;
        let playlists = store::read_playlists(folder)?;

        if let (Some(artist_shard), Some(playlist_shard)) = (&artists, &playlists)
            && artist_shard.factors != playlist_shard.factors
        {
            return Err(AppError::Model(format!(
                "factor dimension mismatch between shards: {} vs {}",
                artist_shard.factors, playlist_shard.factors
            )));
        }

        let dimensions = artists
            .as_ref()
            .map(|shard| shard.factors)
            .or_else(|| playlists.as_ref().map(|shard| shard.factors))
            .unwrap_or(self.factorized.factors());
        let mut factorized = FactorizedModel::new(dimensions);

        self.artist_names.clear();
        self.artist_by_name.clear();
        self.playlist_ids.clear();
        self.playlist_by_id.clear();

        if let Some(shard) = artists {
            factorized.set_artist_factors(shard.vectors);
            self.artist_by_name = index_by_normalized(&shard.names);
            self.artist_names = shard.names;
            info!("Loaded {} artists", self.artist_names.len());
        }
        if let Some(shard) = playlists {
            factorized.set_playlist_factors(shard.vectors);
            self.playlist_by_id = index_by_normalized(&shard.ids);
            self.playlist_ids = shard.ids;
            info!("Loaded {} playlists", self.playlist_ids.len());
        }

        self.factorized = factorized;
        self.dirty_artists = false;
        self.dirty_playlists = false;
        Ok(())
    }
}

fn index_by_normalized(labels: &[String]) -> HashMap<String, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(index, label)| (resolver::normalize(label), index))
        .collect()
}
