pub mod config;
pub mod error;
pub mod model;
pub mod recommender;
pub mod resolver;
pub mod tidal;

pub use config::Config;
pub use error::{AppError, Result};
pub use model::{
    Model, PlaylistDescriptor, ProcessOptions, Recommendations, TrackDescriptor, TrainingSet,
};
pub use recommender::{PlaylistRecommender, RecommendationReport};
pub use tidal::{TidalClient, TidalPlaylist, TidalTrack};
