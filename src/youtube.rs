//! YouTube URL recognition

use std::fmt;

use url::Url;

static YOUTUBE_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "youtu.be",
    "www.youtu.be",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Why an entered URL cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlRejection {
    InvalidUrl,
    NotYoutube,
    NotAVideo,
}

impl fmt::Display for UrlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlRejection::InvalidUrl => write!(f, "Invalid URL."),
            UrlRejection::NotYoutube => write!(f, "Currently only youtube supported"),
            UrlRejection::NotAVideo => write!(f, "Enter a valid youtube VIDEO URL."),
        }
    }
}

/// A recognised video URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTarget {
    pub video_id: String,
    pub playlist_id: Option<String>,
}

impl VideoTarget {
    /// Canonical watch URL
    pub fn video_url(&self) -> String {
        video_url(&self.video_id)
    }

    pub fn playlist_url(&self) -> Option<String> {
        self.playlist_id.as_deref().map(playlist_url)
    }
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", playlist_id)
}

pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_youtube_host(url: &Url) -> bool {
    url.host_str().map(|host| YOUTUBE_HOSTS.contains(&host)).unwrap_or(false)
}

/// Video id from watch, short-link, embed and shorts URLs
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let path = url.path();

    let candidate = if host == "youtu.be" || host == "www.youtu.be" {
        path.trim_start_matches('/').split('/').next().map(str::to_string)
    } else if path == "/watch" || path == "/watch/" {
        url.query_pairs().find(|(k, _)| k.eq_ignore_ascii_case("v")).map(|(_, v)| v.into_owned())
    } else if let Some(rest) = path.strip_prefix("/embed/").or_else(|| path.strip_prefix("/shorts/")) {
        rest.split('/').next().map(str::to_string)
    } else {
        None
    };
    candidate.filter(|id| is_valid_video_id(id))
}

pub fn playlist_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "list")
        .map(|(_, v)| v.into_owned())
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
}

/// Check an entered URL, returning why it was rejected
pub fn validate(input: &str) -> Result<VideoTarget, UrlRejection> {
    let url = Url::parse(input.trim()).map_err(|_| UrlRejection::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlRejection::InvalidUrl);
    }
    if !is_youtube_host(&url) {
        return Err(UrlRejection::NotYoutube);
    }
    let video_id = video_id(&url).ok_or(UrlRejection::NotAVideo)?;
    Ok(VideoTarget { video_id, playlist_id: playlist_id(&url) })
}
