pub mod report;
pub mod service;

pub use report::RecommendationReport;
pub use service::PlaylistRecommender;
