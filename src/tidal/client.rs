use reqwest::Client;
use serde::Deserialize;
use std::io::{self, Write};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::tidal::models::{TidalPlaylist, TidalTrack};

const TIDAL_API_BASE: &str = "https://api.tidal.com/v1";
const TIDAL_AUTH_URL: &str = "https://auth.tidal.com/v1/oauth2";
const PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
struct DeviceAuthResponse {
    #[serde(rename = "deviceCode")]
    device_code: String,
    #[serde(rename = "userCode")]
    user_code: String,
    #[serde(rename = "verificationUri")]
    verification_uri: String,
    #[serde(rename = "verificationUriComplete")]
    verification_uri_complete: Option<String>,
    #[serde(rename = "expiresIn")]
    expires_in: u64,
    interval: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResponse {
    uuid: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    total_number_of_items: u64,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    item: Option<ItemTrack>,
}

#[derive(Debug, Deserialize)]
struct ItemTrack {
    id: u64,
    title: String,
    #[serde(default)]
    artists: Vec<ItemArtist>,
    #[serde(default)]
    duration: u64,
}

#[derive(Debug, Deserialize)]
struct ItemArtist {
    name: String,
}

/// Extract the playlist uuid from a Tidal playlist reference.
/// Supports formats:
/// - https://tidal.com/playlist/{uuid}
/// - https://listen.tidal.com/playlist/{uuid}?u=...
/// - tidal:playlist:{uuid}
pub fn parse_playlist_url(url_str: &str) -> Result<String> {
    if let Some(uuid) = url_str.strip_prefix("tidal:playlist:") {
        if uuid.is_empty() {
            return Err(AppError::Config("Empty playlist uuid in Tidal URI".into()));
        }
        return Ok(uuid.to_string());
    }

    let url = Url::parse(url_str).map_err(|e| AppError::Config(format!("Invalid URL: {}", e)))?;

    let segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(|| AppError::Config("Invalid Tidal URL".into()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    // Accept /playlist/{uuid} anywhere in the path (covers /browse/playlist/..)
    if let Some(position) = segments.iter().position(|segment| *segment == "playlist")
        && let Some(uuid) = segments.get(position + 1)
    {
        return Ok((*uuid).to_string());
    }

    Err(AppError::Config(
        "URL does not appear to be a Tidal playlist URL".into(),
    ))
}

pub struct TidalClient {
    http_client: Client,
    access_token: String,
}

impl TidalClient {
    pub async fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        let http_client = Client::new();

        let device_auth = Self::device_authorization(&http_client, client_id).await?;

        println!("\nTidal Authentication Required");
        println!("==============================");
        if let Some(uri) = &device_auth.verification_uri_complete {
            println!("Visit this URL: {}", uri);
        } else {
            println!("Visit: {}", device_auth.verification_uri);
            println!("Enter code: {}", device_auth.user_code);
        }
        println!("\nWaiting for authentication...");

        let token = Self::poll_for_token(
            &http_client,
            client_id,
            client_secret,
            &device_auth.device_code,
            device_auth.interval,
            device_auth.expires_in,
        )
        .await?;

        info!("Successfully authenticated with Tidal");

        Ok(Self {
            http_client,
            access_token: token.access_token,
        })
    }

    async fn device_authorization(client: &Client, client_id: &str) -> Result<DeviceAuthResponse> {
        let response = client
            .post(format!("{}/device_authorization", TIDAL_AUTH_URL))
            .form(&[("client_id", client_id), ("scope", "playlists.read")])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Device authorization failed: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse device auth response: {}", e)))
    }

    async fn poll_for_token(
        client: &Client,
        client_id: &str,
        client_secret: &str,
        device_code: &str,
        interval: u64,
        expires_in: u64,
    ) -> Result<TokenResponse> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_secs(expires_in);

        loop {
            if start.elapsed() > timeout {
                return Err(AppError::Auth("Device authorization timed out".into()));
            }

            tokio::time::sleep(std::time::Duration::from_secs(interval)).await;

            let response = client
                .post(format!("{}/token", TIDAL_AUTH_URL))
                .basic_auth(client_id, Some(client_secret))
                .form(&[
                    ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                    ("device_code", device_code),
                ])
                .send()
                .await?;

            if response.status().is_success() {
                return response
                    .json()
                    .await
                    .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)));
            }

            // Still pending is the only retryable state
            let error_text = response.text().await.unwrap_or_default();
            if !error_text.contains("authorization_pending") {
                return Err(AppError::Auth(format!(
                    "Token request failed: {}",
                    error_text
                )));
            }

            print!(".");
            io::stdout().flush().ok();
        }
    }

    /// Fetch a playlist (metadata plus all tracks) from a Tidal URL.
    pub async fn get_playlist(&self, url: &str) -> Result<TidalPlaylist> {
        let uuid = parse_playlist_url(url)?;

        let request_url = format!(
            "{}/playlists/{}",
            TIDAL_API_BASE,
            urlencoding::encode(&uuid)
        );
        let response = self
            .http_client
            .get(&request_url)
            .bearer_auth(&self.access_token)
            .query(&[("countryCode", "US")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(uuid));
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::TidalApi(format!(
                "Failed to fetch playlist ({}): {}",
                status, error_text
            )));
        }

        let meta: PlaylistResponse = response.json().await?;
        let tracks = self.get_playlist_items(&uuid).await?;

        info!(
            "Fetched playlist {} ({} tracks)",
            meta.title,
            tracks.len()
        );

        Ok(TidalPlaylist {
            uuid: meta.uuid,
            title: meta.title,
            description: meta.description.unwrap_or_default(),
            url: meta.url.unwrap_or_else(|| url.to_string()),
            tracks,
        })
    }

    async fn get_playlist_items(&self, uuid: &str) -> Result<Vec<TidalTrack>> {
        let mut tracks = Vec::new();
        let mut offset: u64 = 0;
        let request_url = format!(
            "{}/playlists/{}/items",
            TIDAL_API_BASE,
            urlencoding::encode(uuid)
        );

        loop {
            let limit = PAGE_SIZE.to_string();
            let offset_param = offset.to_string();
            let response = self
                .http_client
                .get(&request_url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("countryCode", "US"),
                    ("limit", limit.as_str()),
                    ("offset", offset_param.as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                warn!("Tidal playlist items fetch failed ({}): {}", status, error_text);
                return Err(AppError::TidalApi(format!(
                    "Failed to fetch playlist items: {}",
                    error_text
                )));
            }

            let page: PlaylistItemsResponse = response.json().await?;
            let fetched = page.items.len() as u64;

            for item in page.items {
                // Items without a track payload (e.g. videos) are skipped
                let Some(track) = item.item else {
                    debug!("Skipping non-track playlist item");
                    continue;
                };
                tracks.push(TidalTrack {
                    id: track.id,
                    title: track.title,
                    artists: track.artists.into_iter().map(|artist| artist.name).collect(),
                    duration_secs: track.duration,
                });
            }

            offset += fetched;
            if fetched == 0 || offset >= page.total_number_of_items {
                break;
            }
        }

        debug!("Fetched {} tracks for playlist {}", tracks.len(), uuid);
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_url() {
        let uuid = parse_playlist_url("https://tidal.com/playlist/7ab5d2b6-93fb-4181-a008-a1d18e2cebfa")
            .unwrap();
        assert_eq!(uuid, "7ab5d2b6-93fb-4181-a008-a1d18e2cebfa");
    }

    #[test]
    fn test_parse_listen_url_with_query() {
        let uuid =
            parse_playlist_url("https://listen.tidal.com/playlist/7ab5d2b6-93fb-4181-a008-a1d18e2cebfa?u=abc")
                .unwrap();
        assert_eq!(uuid, "7ab5d2b6-93fb-4181-a008-a1d18e2cebfa");
    }

    #[test]
    fn test_parse_browse_url() {
        let uuid = parse_playlist_url("https://tidal.com/browse/playlist/some-uuid").unwrap();
        assert_eq!(uuid, "some-uuid");
    }

    #[test]
    fn test_parse_tidal_uri() {
        let uuid = parse_playlist_url("tidal:playlist:some-uuid").unwrap();
        assert_eq!(uuid, "some-uuid");
        assert!(parse_playlist_url("tidal:playlist:").is_err());
    }

    #[test]
    fn test_parse_rejects_non_playlist_urls() {
        assert!(parse_playlist_url("https://tidal.com/blah").is_err());
        assert!(parse_playlist_url("not a url").is_err());
    }
}
