use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::model::Recommendations;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub playlist_id: Option<String>,
    pub source_url: String,
    pub track_count: usize,
    pub recommended_artists: usize,
    pub related_playlists: usize,
    pub recommendations: Recommendations,
}

impl RecommendationReport {
    pub fn new(
        playlist_id: Option<String>,
        source_url: String,
        track_count: usize,
        recommendations: Recommendations,
    ) -> Self {
        let recommended_artists = recommendations.artists.len();
        let related_playlists = recommendations.playlists.len();
        Self {
            playlist_id,
            source_url,
            track_count,
            recommended_artists,
            related_playlists,
            recommendations,
        }
    }

    /// Write the report as a timestamped JSON file under `results_dir`.
    pub fn save(&self, results_dir: &Path) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        fs::create_dir_all(results_dir)?;

        let filename = results_dir.join(format!("recommendations_{}.json", timestamp));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&filename, json)?;

        info!("Recommendation report saved to: {}", filename.display());

        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScoredArtist, ScoredPlaylist};
    use tempfile::TempDir;

    #[test]
    fn report_counts_derive_from_recommendations() {
        let recommendations = Recommendations {
            artists: vec![ScoredArtist {
                name: "Portishead".to_string(),
                score: 0.9,
            }],
            playlists: vec![
                ScoredPlaylist {
                    id: "mix-1".to_string(),
                    score: 0.8,
                },
                ScoredPlaylist {
                    id: "mix-2".to_string(),
                    score: 0.7,
                },
            ],
        };

        let report = RecommendationReport::new(
            Some("my-mix".to_string()),
            "https://tidal.com/playlist/abc".to_string(),
            12,
            recommendations,
        );
        assert_eq!(report.recommended_artists, 1);
        assert_eq!(report.related_playlists, 2);
    }

    #[test]
    fn report_saves_to_results_dir() {
        let tmp = TempDir::new().unwrap();
        let report = RecommendationReport::new(
            None,
            "https://tidal.com/blah".to_string(),
            1,
            Recommendations::default(),
        );

        let path = report.save(tmp.path()).unwrap();
        assert!(path.exists());

        let contents = std::fs::read_to_string(path).unwrap();
        let parsed: RecommendationReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.track_count, 1);
    }
}
