//! Request and response bodies for the stream endpoints

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, Item, VoteOutcome, VoteResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    "google".to_string()
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub creator_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub stream_id: String,
    /// "up" or "down"
    #[serde(rename = "type")]
    pub direction: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVoteRequest {
    pub stream_id: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub message: &'static str,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl From<VoteResult> for VoteResponse {
    fn from(result: VoteResult) -> Self {
        let message = match result.outcome {
            VoteOutcome::Created | VoteOutcome::Switched => "Vote recorded successfully",
            VoteOutcome::Unchanged => "Vote already recorded",
            VoteOutcome::Removed => "Vote removed",
            VoteOutcome::NotFound => "No vote to remove",
        };
        Self {
            message,
            upvotes: result.tally.upvotes,
            downvotes: result.tally.downvotes,
        }
    }
}

/// One queue row on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub extracted_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub small_img: String,
    pub big_img: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Item> for StreamResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            user_id: item.owner_id,
            url: item.url,
            extracted_id: item.extracted_id,
            kind: item.kind,
            title: item.title,
            small_img: item.small_img,
            big_img: item.big_img,
            upvotes: item.upvotes,
            downvotes: item.downvotes,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NowPlayingResponse {
    pub stream: Option<StreamResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    /// Ranked, head of the queue first.
    pub streams: Vec<StreamResponse>,
    /// The caller's own votes only.
    pub user_votes: HashMap<String, Direction>,
    #[serde(rename = "poll_interval_secs")]
    pub poll_interval_secs: u64,
}
