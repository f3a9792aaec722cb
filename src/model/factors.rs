use std::collections::HashSet;

use tracing::debug;

pub const DEFAULT_FACTORS: usize = 32;

const DEFAULT_REGULARIZATION: f32 = 0.01;
const DEFAULT_ALPHA: f32 = 40.0;
const DEFAULT_ITERATIONS: usize = 15;

/// Sparse artist-by-playlist play counts, indexed from both sides.
#[derive(Debug, Clone, Default)]
pub struct PlayMatrix {
    by_playlist: Vec<Vec<(usize, f32)>>,
    by_artist: Vec<Vec<(usize, f32)>>,
}

impl PlayMatrix {
    /// Build from (artist, playlist, count) triplets. Out-of-range indices
    /// and non-positive counts are dropped.
    pub fn from_triplets(
        artists: usize,
        playlists: usize,
        triplets: &[(usize, usize, f32)],
    ) -> Self {
        let mut by_playlist = vec![Vec::new(); playlists];
        let mut by_artist = vec![Vec::new(); artists];

        for &(artist, playlist, count) in triplets {
            if artist >= artists || playlist >= playlists || count <= 0.0 {
                continue;
            }
            by_playlist[playlist].push((artist, count));
            by_artist[artist].push((playlist, count));
        }

        Self {
            by_playlist,
            by_artist,
        }
    }

    pub fn artists(&self) -> usize {
        self.by_artist.len()
    }

    pub fn playlists(&self) -> usize {
        self.by_playlist.len()
    }
}

/// Latent-factor model over artists (items) and playlists (users), trained
/// with implicit-feedback alternating least squares. Retrieval is exact:
/// cosine similarity for lookalikes, inner product for recommendations.
#[derive(Debug, Clone)]
pub struct FactorizedModel {
    factors: usize,
    regularization: f32,
    alpha: f32,
    iterations: usize,
    artist_factors: Vec<Vec<f32>>,
    playlist_factors: Vec<Vec<f32>>,
}

impl Default for FactorizedModel {
    fn default() -> Self {
        Self::new(DEFAULT_FACTORS)
    }
}

impl FactorizedModel {
    pub fn new(factors: usize) -> Self {
        Self {
            factors,
            regularization: DEFAULT_REGULARIZATION,
            alpha: DEFAULT_ALPHA,
            iterations: DEFAULT_ITERATIONS,
            artist_factors: Vec::new(),
            playlist_factors: Vec::new(),
        }
    }

    pub fn factors(&self) -> usize {
        self.factors
    }

    pub fn artist_count(&self) -> usize {
        self.artist_factors.len()
    }

    pub fn playlist_count(&self) -> usize {
        self.playlist_factors.len()
    }

    pub fn artist_factor(&self, index: usize) -> &[f32] {
        &self.artist_factors[index]
    }

    pub fn artist_rows(&self) -> &[Vec<f32>] {
        &self.artist_factors
    }

    pub fn playlist_rows(&self) -> &[Vec<f32>] {
        &self.playlist_factors
    }

    pub fn set_artist_factors(&mut self, rows: Vec<Vec<f32>>) {
        self.artist_factors = rows;
    }

    pub fn set_playlist_factors(&mut self, rows: Vec<Vec<f32>>) {
        self.playlist_factors = rows;
    }

    /// Append artist rows, returning the new artist count.
    pub fn add_artists(&mut self, rows: Vec<Vec<f32>>) -> usize {
        self.artist_factors.extend(rows);
        self.artist_factors.len()
    }

    /// Append one playlist row, returning its index.
    pub fn add_playlist(&mut self, row: Vec<f32>) -> usize {
        self.playlist_factors.push(row);
        self.playlist_factors.len() - 1
    }

    pub fn clear_playlists(&mut self) {
        self.playlist_factors.clear();
    }

    /// Train both factor matrices from scratch. Confidence is
    /// `1 + alpha * count` per observed play (Hu/Koren/Volinsky).
    pub fn fit(&mut self, plays: &PlayMatrix) {
        self.artist_factors = random_factors(plays.artists(), self.factors);
        self.playlist_factors = random_factors(plays.playlists(), self.factors);

        for iteration in 0..self.iterations {
            let gram = gramian(&self.artist_factors, self.factors);
            self.playlist_factors = plays
                .by_playlist
                .iter()
                .map(|row| {
                    least_squares(
                        &gram,
                        &self.artist_factors,
                        row,
                        self.factors,
                        self.regularization,
                        self.alpha,
                    )
                })
                .collect();

            let gram = gramian(&self.playlist_factors, self.factors);
            self.artist_factors = plays
                .by_artist
                .iter()
                .map(|row| {
                    least_squares(
                        &gram,
                        &self.playlist_factors,
                        row,
                        self.factors,
                        self.regularization,
                        self.alpha,
                    )
                })
                .collect();

            debug!("ALS iteration {}/{} complete", iteration + 1, self.iterations);
        }
    }

    /// Solve for a single playlist vector given its artist play counts,
    /// against the current artist factors.
    pub fn recalculate_playlist(&self, plays: &[(usize, f32)]) -> Vec<f32> {
        let gram = gramian(&self.artist_factors, self.factors);
        least_squares(
            &gram,
            &self.artist_factors,
            plays,
            self.factors,
            self.regularization,
            self.alpha,
        )
    }

    pub fn similar_artists(&self, query: &[f32], n: usize) -> Vec<(usize, f32)> {
        let scored = self
            .artist_factors
            .iter()
            .enumerate()
            .map(|(index, row)| (index, cosine(query, row)))
            .collect();
        top_n(scored, n)
    }

    pub fn similar_playlists(&self, query: &[f32], n: usize) -> Vec<(usize, f32)> {
        let scored = self
            .playlist_factors
            .iter()
            .enumerate()
            .map(|(index, row)| (index, cosine(query, row)))
            .collect();
        top_n(scored, n)
    }

    /// Score artists against a playlist vector by inner product, optionally
    /// skipping artists the playlist already contains.
    pub fn recommend(
        &self,
        playlist: &[f32],
        played: &HashSet<usize>,
        n: usize,
        filter_played: bool,
    ) -> Vec<(usize, f32)> {
        let scored = self
            .artist_factors
            .iter()
            .enumerate()
            .filter(|(index, _)| !(filter_played && played.contains(index)))
            .map(|(index, row)| (index, dot(playlist, row)))
            .collect();
        top_n(scored, n)
    }
}

fn random_factors(rows: usize, factors: usize) -> Vec<Vec<f32>> {
    (0..rows)
        .map(|_| {
            (0..factors)
                .map(|_| (rand::random::<f32>() - 0.5) * 0.1)
                .collect()
        })
        .collect()
}

/// Sum of outer products Y^T Y over all rows.
fn gramian(rows: &[Vec<f32>], factors: usize) -> Vec<Vec<f32>> {
    let mut gram = vec![vec![0.0f32; factors]; factors];
    for row in rows {
        for i in 0..factors {
            let value = row[i];
            if value == 0.0 {
                continue;
            }
            for j in 0..factors {
                gram[i][j] += value * row[j];
            }
        }
    }
    gram
}

/// One regularized least-squares solve of the implicit ALS normal equations:
/// (Y^T Y + alpha * sum(c_i y_i y_i^T) + reg * I) x = sum((1 + alpha c_i) y_i)
fn least_squares(
    gram: &[Vec<f32>],
    rows: &[Vec<f32>],
    plays: &[(usize, f32)],
    factors: usize,
    regularization: f32,
    alpha: f32,
) -> Vec<f32> {
    if plays.is_empty() || rows.is_empty() {
        return vec![0.0; factors];
    }

    let mut a: Vec<Vec<f32>> = gram.to_vec();
    for i in 0..factors {
        a[i][i] += regularization;
    }
    let mut b = vec![0.0f32; factors];

    for &(index, count) in plays {
        let Some(row) = rows.get(index) else {
            continue;
        };
        let confidence = alpha * count;
        for i in 0..factors {
            b[i] += (1.0 + confidence) * row[i];
            let scaled = confidence * row[i];
            if scaled == 0.0 {
                continue;
            }
            for j in 0..factors {
                a[i][j] += scaled * row[j];
            }
        }
    }

    solve(a, b)
}

/// Gaussian elimination with partial pivoting. The system is small
/// (factors x factors) and positive definite after regularization.
fn solve(mut a: Vec<Vec<f32>>, mut b: Vec<f32>) -> Vec<f32> {
    let n = b.len();

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let diag = a[col][col];
        if diag.abs() < f32::EPSILON {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / diag;
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f32; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for c in col + 1..n {
            sum -= a[col][c] * x[c];
        }
        x[col] = if a[col][col].abs() < f32::EPSILON {
            0.0
        } else {
            sum / a[col][col]
        };
    }
    x
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

fn top_n(mut scored: Vec<(usize, f32)>, n: usize) -> Vec<(usize, f32)> {
    scored.retain(|(_, score)| score.is_finite());
    scored.sort_by(|left, right| right.1.total_cmp(&left.1));
    scored.truncate(n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTISTS: usize = 40;
    const PLAYLISTS: usize = 12;
    const FACTORS: usize = 16;

    fn toy_plays() -> PlayMatrix {
        let mut triplets = Vec::new();
        for artist in 0..ARTISTS {
            for playlist in 0..PLAYLISTS {
                if (artist + playlist) % 3 == 0 {
                    triplets.push((artist, playlist, ((artist * 7 + playlist) % 5 + 1) as f32));
                }
            }
        }
        PlayMatrix::from_triplets(ARTISTS, PLAYLISTS, &triplets)
    }

    fn fitted() -> FactorizedModel {
        let mut model = FactorizedModel::new(FACTORS);
        model.fit(&toy_plays());
        model
    }

    #[test]
    fn new_model_is_empty() {
        let model = FactorizedModel::new(FACTORS);
        assert_eq!(model.artist_count(), 0);
        assert_eq!(model.playlist_count(), 0);
        assert!(model.similar_artists(&vec![1.0; FACTORS], 5).is_empty());
        assert!(model.similar_playlists(&vec![1.0; FACTORS], 5).is_empty());
    }

    #[test]
    fn fit_populates_both_sides() {
        let model = fitted();
        assert_eq!(model.artist_count(), ARTISTS);
        assert_eq!(model.playlist_count(), PLAYLISTS);
        for row in model.artist_rows().iter().chain(model.playlist_rows()) {
            assert_eq!(row.len(), FACTORS);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn similar_artists_ranks_self_first() {
        let model = fitted();
        let query = model.artist_factor(0).to_vec();

        let similar = model.similar_artists(&query, 5);
        assert_eq!(similar.len(), 5);
        assert_eq!(similar[0].0, 0);
        for pair in similar.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn recommend_filters_played_artists() {
        let model = fitted();
        let played: HashSet<usize> = [0, 1].into_iter().collect();
        let vector = model.recalculate_playlist(&[(0, 3.0), (1, 2.0)]);

        let recommended = model.recommend(&vector, &played, 10, true);
        assert!(!recommended.is_empty());
        assert!(recommended.iter().all(|(index, _)| !played.contains(index)));

        let unfiltered = model.recommend(&vector, &played, ARTISTS, false);
        assert_eq!(unfiltered.len(), ARTISTS);
    }

    #[test]
    fn recalculate_produces_finite_vector() {
        let model = fitted();
        let vector = model.recalculate_playlist(&[(3, 1.0), (6, 4.0)]);
        assert_eq!(vector.len(), FACTORS);
        assert!(vector.iter().all(|v| v.is_finite()));
        assert!(vector.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn recalculate_with_empty_history_is_zero() {
        let model = fitted();
        let vector = model.recalculate_playlist(&[]);
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn add_artists_extends_count() {
        let mut model = fitted();
        let count = model.add_artists(vec![vec![0.1; FACTORS], vec![0.2; FACTORS]]);
        assert_eq!(count, ARTISTS + 2);
        assert_eq!(model.artist_count(), ARTISTS + 2);
    }

    #[test]
    fn add_playlist_returns_sequential_indices() {
        let mut model = FactorizedModel::new(FACTORS);
        assert_eq!(model.add_playlist(vec![0.1; FACTORS]), 0);
        assert_eq!(model.add_playlist(vec![0.2; FACTORS]), 1);
        assert_eq!(model.playlist_count(), 2);
    }

    #[test]
    fn cleared_playlists_yield_no_similars() {
        let mut model = fitted();
        let query = model.recalculate_playlist(&[(0, 1.0)]);
        assert!(!model.similar_playlists(&query, 5).is_empty());

        model.clear_playlists();
        assert!(model.similar_playlists(&query, 5).is_empty());
    }
}
