use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AppError, Result};

static YOUTUBE_URL: OnceLock<Regex> = OnceLock::new();

fn youtube_url() -> &'static Regex {
    YOUTUBE_URL.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:(?:https?:)?//)?(?:www\.)?(?:m\.)?",
            r"(?:youtu(?:be)?\.com/(?:v/|embed/|watch(?:/|\?v=))|youtu\.be/)",
            r"([A-Za-z0-9_-]{11})(?:\S+)?$",
        ))
        .expect("YouTube URL pattern is valid")
    })
}

/// Pull the 11-character video id out of a YouTube link.
pub fn extract_video_id(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("URL is required".to_string()));
    }

    youtube_url()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::Validation("Invalid YouTube URL".to_string()))
}
