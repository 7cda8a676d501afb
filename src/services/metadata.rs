use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Thumbnail, VideoMetadata};

const PLACEHOLDER_TITLE: &str = "Unknown Title";
const THUMBNAIL_HOST: &str = "https://i.ytimg.com/vi";

/// Looks up display metadata for a video id.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, video_id: &str) -> Result<VideoMetadata>;
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    thumbnail_url: Option<String>,
    thumbnail_width: Option<u32>,
}

/// Resolver backed by YouTube's oEmbed endpoint.
pub struct YoutubeResolver {
    client: Client,
    endpoint: Url,
}

impl YoutubeResolver {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| AppError::Config(format!("Invalid oEmbed endpoint {}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent("muzily/1.0")
            .build()?;
        Ok(Self { client, endpoint })
    }

    async fn fetch(&self, video_id: &str) -> anyhow::Result<OEmbedResponse> {
        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("oEmbed lookup failed: HTTP {}", response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataResolver for YoutubeResolver {
    async fn resolve(&self, video_id: &str) -> Result<VideoMetadata> {
        let oembed = self
            .fetch(video_id)
            .await
            .map_err(|e| AppError::Resolver(e.to_string()))?;
        metadata_from_oembed(video_id, oembed)
    }
}

/// Resolver that never goes to the network.
pub struct PlaceholderResolver;

#[async_trait]
impl MetadataResolver for PlaceholderResolver {
    async fn resolve(&self, video_id: &str) -> Result<VideoMetadata> {
        Ok(placeholder(video_id))
    }
}

fn metadata_from_oembed(video_id: &str, oembed: OEmbedResponse) -> Result<VideoMetadata> {
    let title = oembed
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Resolver(format!("No title for {}", video_id)))?;

    let mut thumbnails = standard_thumbnails(video_id);
    if let Some(url) = oembed.thumbnail_url {
        if !thumbnails.iter().any(|t| t.url == url) {
            thumbnails.push(Thumbnail {
                url,
                width: oembed.thumbnail_width.unwrap_or(0),
            });
        }
    }

    VideoMetadata::from_thumbnails(title, thumbnails)
        .ok_or_else(|| AppError::Resolver(format!("No thumbnails for {}", video_id)))
}

fn standard_thumbnails(video_id: &str) -> Vec<Thumbnail> {
    vec![
        Thumbnail {
            url: format!("{}/{}/mqdefault.jpg", THUMBNAIL_HOST, video_id),
            width: 320,
        },
        Thumbnail {
            url: format!("{}/{}/hqdefault.jpg", THUMBNAIL_HOST, video_id),
            width: 480,
        },
    ]
}

/// Metadata synthesized from the video id alone.
pub fn placeholder(video_id: &str) -> VideoMetadata {
    let mut thumbnails = standard_thumbnails(video_id);
    let big = thumbnails.pop().map(|t| t.url).unwrap_or_default();
    let small = thumbnails.pop().map(|t| t.url).unwrap_or_else(|| big.clone());
    VideoMetadata {
        title: PLACEHOLDER_TITLE.to_string(),
        small_img: small,
        big_img: big,
    }
}

/// Resolve once; on any failure fall back to placeholder metadata.
pub async fn resolve_or_placeholder(
    resolver: &dyn MetadataResolver,
    video_id: &str,
) -> VideoMetadata {
    match resolver.resolve(video_id).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!("Using placeholder metadata for {}: {}", video_id, e);
            placeholder(video_id)
        }
    }
}
