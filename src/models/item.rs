use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, Tally};

/// One queued video in a creator's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    /// Collection (stream) the item belongs to: the creator's user id.
    pub owner_id: String,
    pub url: String,
    pub extracted_id: String,
    pub kind: String,
    pub title: String,
    pub small_img: String,
    pub big_img: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn tally(&self) -> Tally {
        Tally {
            upvotes: self.upvotes,
            downvotes: self.downvotes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub owner_id: String,
    pub url: String,
    pub extracted_id: String,
    pub metadata: VideoMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub small_img: String,
    pub big_img: String,
}

impl VideoMetadata {
    /// Widest thumbnail becomes the big image, the next widest the small one.
    pub fn from_thumbnails(title: String, mut thumbnails: Vec<Thumbnail>) -> Option<Self> {
        thumbnails.sort_by_key(|t| t.width);
        let big = thumbnails.pop()?;
        let small = thumbnails.pop().unwrap_or_else(|| big.clone());
        Some(Self {
            title,
            small_img: small.url,
            big_img: big.url,
        })
    }
}

/// A ranked queue row as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub item: Item,
    pub viewer_direction: Option<Direction>,
}
