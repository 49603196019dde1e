pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod session;
pub mod timespec;
pub mod ytdlp;

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::timespec::TimeRange;
use crate::ytdlp::Browser;

static URL_PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();

/// The accepted YouTube URL shapes, each capturing the video id token
fn url_patterns() -> &'static [Regex] {
    URL_PATTERNS.get_or_init(|| {
        [
            // youtube.com/watch?v=ID
            Regex::new(r"^https?://(?:www\.)?youtube\.com/watch\?v=([\w-]+)").unwrap(),
            // youtu.be/ID
            Regex::new(r"^https?://youtu\.be/([\w-]+)").unwrap(),
            // youtube.com/embed/ID
            Regex::new(r"^https?://(?:www\.)?youtube\.com/embed/([\w-]+)").unwrap(),
            // youtube.com/shorts/ID
            Regex::new(r"^https?://(?:www\.)?youtube\.com/shorts/([\w-]+)").unwrap(),
        ]
    })
}

/// Extract the video id from any accepted YouTube URL shape
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    url_patterns()
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}

/// Shape check only: says nothing about whether the video exists
pub fn is_accepted_url(input: &str) -> bool {
    extract_video_id(input).is_some()
}

/// A validated download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub range: TimeRange,
    pub browser: Option<Browser>,
}

impl DownloadRequest {
    pub fn new(url: &str, range: TimeRange, browser: Option<Browser>) -> Result<Self> {
        let url = url.trim();
        if !is_accepted_url(url) {
            return Err(Error::InvalidUrlShape(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            range,
            browser,
        })
    }

    /// Validate raw user input: a URL plus separate start and end times
    pub fn from_input(url: &str, start: &str, end: &str, browser: Option<Browser>) -> Result<Self> {
        Self::new(url, TimeRange::from_parts(start, end)?, browser)
    }

    pub fn video_id(&self) -> Option<String> {
        extract_video_id(&self.url)
    }
}
