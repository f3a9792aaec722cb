pub mod client;
pub mod models;

pub use client::{TidalClient, parse_playlist_url};
pub use models::{TidalPlaylist, TidalTrack};
