//! Per-video metadata cache
//!
//! The downloader's info document for each video is kept under
//! `<downloads-data>/<video_id>/<video_id>.info.json` together with the
//! thumbnail and description. Cached documents are reused until the expiry
//! embedded in their signed manifest URL has passed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::arguments::{Format, MediaKind};
use crate::config::{FILENAME_FORBIDDEN_CHARS, SANITIZED_FILENAME_MAX_LEN};
use crate::error::{AppError, AppResult};
use crate::history::UrlHistoryEntry;

/// Replace characters that are unsafe in file names with `_` and cap the length.
///
/// The cap counts Unicode scalar values, so a title with emoji or other
/// astral characters keeps more visible text than a UTF-16 based cut would.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| if FILENAME_FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .take(SANITIZED_FILENAME_MAX_LEN)
        .collect()
}

/// One entry of the info document's `formats` array
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FormatRecord {
    pub format_id: String,
    #[serde(default)]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormatRecord {
    pub fn is_storyboard(&self) -> bool {
        self.format_note.as_deref() == Some("storyboard")
    }

    pub fn is_audio(&self) -> bool {
        self.format.contains("audio")
    }

    fn field(&self, key: &str) -> String {
        match self.extra.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "N/A".to_string(),
        }
    }

    /// One-line summary shown under each format choice
    pub fn details(&self) -> String {
        format!(
            "Language : {} | Resolution : {} | Video Ext : {} | Audio Ext : {} | Vcodec : {} | Acodec : {} | VBR : {} | ABR : {}",
            self.field("language"),
            self.field("resolution"),
            self.field("video_ext"),
            self.field("audio_ext"),
            self.field("vcodec"),
            self.field("acodec"),
            self.field("vbr"),
            self.field("abr"),
        )
    }

    /// The choice this record stands for
    pub fn to_format(&self) -> Format {
        let media = if self.is_audio() { MediaKind::Audio } else { MediaKind::Video };
        let note = self.format_note.clone().filter(|n| !n.is_empty());
        let label = match media {
            MediaKind::Audio => format!("audio-{}", note.unwrap_or_else(|| self.format_id.clone())),
            MediaKind::Video => note
                .or_else(|| self.extra.get("resolution").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| self.format_id.clone()),
        };
        Format::Explicit { id: self.format_id.clone(), label, media }
    }
}

/// Formats offered to the user, grouped the way the picker shows them
#[derive(Debug, Default)]
pub struct FormatGroups<'a> {
    pub all: Vec<&'a FormatRecord>,
    pub audio: Vec<&'a FormatRecord>,
    pub video: Vec<&'a FormatRecord>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// The downloader's info document plus the injected expiry fields
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default)]
    pub fulltitle: String,
    #[serde(default)]
    pub webpage_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatRecord>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub expire_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_locale_string: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoInfo {
    pub fn format_groups(&self) -> FormatGroups<'_> {
        let all: Vec<&FormatRecord> = self.formats.iter().filter(|f| !f.is_storyboard()).collect();
        let audio = all.iter().copied().filter(|f| f.is_audio()).collect();
        let video = all.iter().copied().filter(|f| !f.is_audio()).collect();
        FormatGroups { all, audio, video }
    }

    /// Expiry of the first format carrying a signed manifest URL
    pub fn derive_expiry(&self) -> Option<i64> {
        self.formats
            .iter()
            .find_map(|f| f.manifest_url.as_deref())
            .and_then(expire_from_manifest_url)
    }

    /// Stale once the expiry has passed; documents without one are always stale
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.expire_timestamp {
            Some(expire) => now.timestamp() > expire,
            None => true,
        }
    }

    pub fn history_entry(&self, paths: &VideoCachePaths) -> UrlHistoryEntry {
        UrlHistoryEntry {
            url: self.webpage_url.clone(),
            title: self.fulltitle.clone(),
            thumbnail_remote_uri: self.thumbnail.clone().unwrap_or_default(),
            thumbnail_local_uri: file_uri(&paths.thumbnail(&self.fulltitle)),
        }
    }
}

/// Read the `expire` value from a signed manifest URL.
///
/// Manifest URLs carry it as a path pair (`.../expire/<ts>/...`); a query
/// parameter is accepted as well.
pub fn expire_from_manifest_url(manifest_url: &str) -> Option<i64> {
    let parsed = Url::parse(manifest_url).ok()?;
    if let Some((_, value)) = parsed.query_pairs().find(|(k, _)| k == "expire") {
        return value.parse().ok();
    }
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "expire")
        .and_then(|pair| pair[1].parse().ok())
}

fn locale_string(timestamp: i64) -> Option<String> {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.to_string_lossy().replace('\\', "/"))
}

/// Where the cached files of one video live
#[derive(Clone, Debug, PartialEq)]
pub struct VideoCachePaths {
    pub folder: PathBuf,
    pub video_id: String,
}

impl VideoCachePaths {
    /// Output stem handed to the downloader; it appends `.info.json`
    pub fn output_stem(&self) -> PathBuf {
        self.folder.join(&self.video_id)
    }

    pub fn info_json(&self) -> PathBuf {
        self.folder.join(format!("{}.info.json", self.video_id))
    }

    pub fn thumbnail(&self, title: &str) -> PathBuf {
        self.folder.join(format!("{}.thumbnail.jpg", sanitize_filename(title)))
    }

    pub fn description(&self, title: &str) -> PathBuf {
        self.folder.join(format!("{}.description.txt", sanitize_filename(title)))
    }
}

/// Produces fresh metadata for a video
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    /// Write the info document to `<output_stem>.info.json` without downloading media
    async fn fetch_info_json(&self, video_url: &str, output_stem: &Path) -> AppResult<()>;

    /// Fetch the thumbnail image bytes
    async fn fetch_thumbnail(&self, url: &str) -> AppResult<Vec<u8>>;
}

/// Result of consulting the cache
#[derive(Debug)]
pub struct CachedVideo {
    pub info: VideoInfo,
    pub paths: VideoCachePaths,
    pub refreshed: bool,
}

/// Cache rooted at the downloads-data folder
pub struct MetadataCache {
    root: PathBuf,
}

impl MetadataCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn paths(&self, video_id: &str) -> VideoCachePaths {
        VideoCachePaths {
            folder: self.root.join(video_id),
            video_id: video_id.to_string(),
        }
    }

    /// Load the cached document, if any
    pub fn load(&self, video_id: &str) -> AppResult<Option<VideoInfo>> {
        let path = self.paths(video_id).info_json();
        if !path.is_file() {
            return Ok(None);
        }
        read_info(&path).map(Some)
    }

    /// Return usable metadata for `video_id`, fetching it when missing or expired
    pub async fn ensure_fresh<S: MetadataSource>(
        &self,
        source: &S,
        video_id: &str,
        video_url: &str,
        now: DateTime<Utc>,
    ) -> AppResult<CachedVideo> {
        let paths = self.paths(video_id);
        std::fs::create_dir_all(&paths.folder).map_err(|e| AppError::file(&paths.folder, e))?;

        if let Some(info) = self.load(video_id)? {
            if !info.is_stale(now) {
                debug!("Reusing cached metadata for {}", video_id);
                return Ok(CachedVideo { info, paths, refreshed: false });
            }
            info!("Cached metadata for {} expired, refetching", video_id);
        }

        let info = self.refresh(source, &paths, video_url).await?;
        Ok(CachedVideo { info, paths, refreshed: true })
    }

    async fn refresh<S: MetadataSource>(
        &self,
        source: &S,
        paths: &VideoCachePaths,
        video_url: &str,
    ) -> AppResult<VideoInfo> {
        source.fetch_info_json(video_url, &paths.output_stem()).await?;

        let info_path = paths.info_json();
        let mut info = read_info(&info_path)?;
        info.expire_timestamp = info.derive_expiry();
        info.expire_locale_string = info.expire_timestamp.and_then(locale_string);
        if info.expire_timestamp.is_none() {
            warn!("No manifest URL in metadata for {}; it will be refetched next time", paths.video_id);
        }
        let json = serde_json::to_string_pretty(&info)?;
        std::fs::write(&info_path, json).map_err(|e| AppError::file(&info_path, e))?;

        if let Some(thumbnail_url) = info.thumbnail.as_deref() {
            let thumbnail_path = paths.thumbnail(&info.fulltitle);
            match source.fetch_thumbnail(thumbnail_url).await {
                Ok(bytes) => {
                    if let Err(e) = std::fs::write(&thumbnail_path, bytes) {
                        warn!("Failed to write thumbnail {}: {}", thumbnail_path.display(), e);
                    }
                }
                Err(e) => warn!("Failed to download thumbnail: {}", e),
            }
        }

        let description_path = paths.description(&info.fulltitle);
        let description = info.description.as_deref().unwrap_or_default();
        if let Err(e) = std::fs::write(&description_path, description) {
            warn!("Failed to write description {}: {}", description_path.display(), e);
        }

        info!("Fetched metadata for {} ({})", paths.video_id, info.fulltitle);
        Ok(info)
    }
}

fn read_info(path: &Path) -> AppResult<VideoInfo> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::file(path, e))?;
    serde_json::from_str(&content).map_err(|e| AppError::parse(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const VIDEO_ID: &str = "dQw4w9WgXcQ";
    const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    struct FakeSource {
        expire: Option<i64>,
        fetches: Cell<usize>,
        thumbnail_fails: bool,
    }

    impl FakeSource {
        fn new(expire: Option<i64>) -> Self {
            Self { expire, fetches: Cell::new(0), thumbnail_fails: false }
        }
    }

    impl MetadataSource for FakeSource {
        async fn fetch_info_json(&self, video_url: &str, output_stem: &Path) -> AppResult<()> {
            self.fetches.set(self.fetches.get() + 1);
            let mut formats = vec![
                serde_json::json!({"format_id": "sb0", "format": "sb0 - storyboard", "format_note": "storyboard"}),
                serde_json::json!({"format_id": "251", "format": "251 - audio only (medium)", "format_note": "medium", "acodec": "opus", "abr": 130.5}),
                serde_json::json!({"format_id": "136", "format": "136 - 1280x720 (720p)", "format_note": "720p", "resolution": "1280x720"}),
            ];
            if let Some(expire) = self.expire {
                formats.push(serde_json::json!({
                    "format_id": "91",
                    "format": "91 - 256x144",
                    "manifest_url": format!("https://manifest.googlevideo.com/api/manifest/hls_variant/expire/{}/ei/abc/file/index.m3u8", expire),
                }));
            }
            let doc = serde_json::json!({
                "id": VIDEO_ID,
                "fulltitle": "Weird/Name*Test?",
                "webpage_url": video_url,
                "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
                "description": "A description",
                "channel": "Someone",
                "formats": formats,
            });
            let path = PathBuf::from(format!("{}.info.json", output_stem.display()));
            std::fs::write(path, doc.to_string()).unwrap();
            Ok(())
        }

        async fn fetch_thumbnail(&self, _url: &str) -> AppResult<Vec<u8>> {
            if self.thumbnail_fails {
                return Err(AppError::ExternalTool { code: Some(404), stderr: "not found".into() });
            }
            Ok(vec![0xFF, 0xD8, 0xFF])
        }
    }

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    #[test]
    fn sanitize_replaces_each_forbidden_character() {
        assert_eq!(sanitize_filename("Weird/Name*Test?"), "Weird_Name_Test_");
        assert_eq!(sanitize_filename(r#"a\b%c:d|e"f<g>h"#), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_filename("plain title"), "plain title");
    }

    #[test]
    fn sanitize_truncates_to_fifty_characters() {
        let long = "x".repeat(80);
        assert_eq!(sanitize_filename(&long).chars().count(), 50);
        let exact = "y".repeat(50);
        assert_eq!(sanitize_filename(&exact), exact);
    }

    #[test]
    fn sanitize_counts_emoji_as_single_characters() {
        let title = "\u{1F600}".repeat(60);
        let cut = sanitize_filename(&title);
        assert_eq!(cut.chars().count(), 50);
        assert_eq!(cut, "\u{1F600}".repeat(50));
    }

    #[test]
    fn expiry_is_read_from_manifest_path_or_query() {
        assert_eq!(
            expire_from_manifest_url("https://manifest.googlevideo.com/api/manifest/dash/expire/1735689600/ei/x/file/m.mpd"),
            Some(1735689600)
        );
        assert_eq!(expire_from_manifest_url("https://example.com/m3u8?expire=1700000000&sig=abc"), Some(1700000000));
        assert_eq!(expire_from_manifest_url("https://example.com/no/expiry"), None);
        assert_eq!(expire_from_manifest_url("not a url"), None);
    }

    #[test]
    fn legacy_string_timestamps_are_accepted() {
        let info: VideoInfo = serde_json::from_value(serde_json::json!({
            "id": VIDEO_ID,
            "expire_timestamp": "1700000000",
        }))
        .unwrap();
        assert_eq!(info.expire_timestamp, Some(1700000000));
    }

    #[test]
    fn format_groups_drop_storyboards() {
        let info: VideoInfo = serde_json::from_value(serde_json::json!({
            "id": VIDEO_ID,
            "formats": [
                {"format_id": "sb0", "format": "sb0 - storyboard", "format_note": "storyboard"},
                {"format_id": "251", "format": "251 - audio only (medium)", "format_note": "medium"},
                {"format_id": "137", "format": "137 - 1920x1080 (1080p)", "format_note": "1080p"},
            ]
        }))
        .unwrap();
        let groups = info.format_groups();
        assert_eq!(groups.all.len(), 2);
        assert_eq!(groups.audio[0].format_id, "251");
        assert_eq!(groups.video[0].format_id, "137");
        assert_eq!(groups.audio[0].to_format().selector(), "251");
        assert_eq!(groups.video[0].to_format().selector(), "137+ba");
        assert_eq!(groups.video[0].to_format().label(), "1080p");
    }

    #[test]
    fn details_fall_back_to_na() {
        let record: FormatRecord = serde_json::from_value(serde_json::json!({
            "format_id": "251", "format": "251 - audio only", "acodec": "opus", "abr": 130.5, "language": null
        }))
        .unwrap();
        let details = record.details();
        assert!(details.starts_with("Language : N/A"));
        assert!(details.contains("Acodec : opus"));
        assert!(details.contains("ABR : 130.5"));
    }

    #[tokio::test]
    async fn first_use_fetches_and_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        let source = FakeSource::new(Some(2_000_000_000));

        let cached = cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_900_000_000)).await.unwrap();
        assert!(cached.refreshed);
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(cached.info.expire_timestamp, Some(2_000_000_000));
        assert!(cached.info.expire_locale_string.is_some());

        let folder = dir.path().join(VIDEO_ID);
        assert!(folder.join("Weird_Name_Test_.thumbnail.jpg").is_file());
        assert_eq!(
            std::fs::read_to_string(folder.join("Weird_Name_Test_.description.txt")).unwrap(),
            "A description"
        );

        // unknown fields survive the rewrite alongside the injected ones
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(cached.paths.info_json()).unwrap()).unwrap();
        assert_eq!(raw["channel"], "Someone");
        assert_eq!(raw["expire_timestamp"], 2_000_000_000i64);
        assert_eq!(raw["formats"][1]["acodec"], "opus");
    }

    #[tokio::test]
    async fn future_expiry_reuses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        let source = FakeSource::new(Some(2_000_000_000));

        cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_900_000_000)).await.unwrap();
        let again = cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_999_999_999)).await.unwrap();
        assert!(!again.refreshed);
        assert_eq!(source.fetches.get(), 1);
    }

    #[tokio::test]
    async fn past_expiry_triggers_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        let source = FakeSource::new(Some(2_000_000_000));

        cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_900_000_000)).await.unwrap();
        let again = cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(2_000_000_001)).await.unwrap();
        assert!(again.refreshed);
        assert_eq!(source.fetches.get(), 2);
    }

    #[tokio::test]
    async fn missing_manifest_is_always_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        let source = FakeSource::new(None);

        let first = cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_900_000_000)).await.unwrap();
        assert_eq!(first.info.expire_timestamp, None);
        cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_900_000_001)).await.unwrap();
        assert_eq!(source.fetches.get(), 2);
    }

    #[tokio::test]
    async fn thumbnail_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        let mut source = FakeSource::new(Some(2_000_000_000));
        source.thumbnail_fails = true;

        let cached = cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(1_900_000_000)).await.unwrap();
        assert!(!cached.paths.thumbnail(&cached.info.fulltitle).exists());
        assert!(cached.paths.description(&cached.info.fulltitle).is_file());
    }

    #[tokio::test]
    async fn corrupt_cache_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path());
        let paths = cache.paths(VIDEO_ID);
        std::fs::create_dir_all(&paths.folder).unwrap();
        std::fs::write(paths.info_json(), "{").unwrap();

        let source = FakeSource::new(Some(2_000_000_000));
        let err = cache.ensure_fresh(&source, VIDEO_ID, VIDEO_URL, at(0)).await.unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
        assert_eq!(source.fetches.get(), 0);
    }

    #[test]
    fn history_entry_links_local_thumbnail() {
        let cache = MetadataCache::new("/data/downloads-data");
        let paths = cache.paths(VIDEO_ID);
        let info = VideoInfo {
            id: VIDEO_ID.into(),
            fulltitle: "Weird/Name*Test?".into(),
            webpage_url: VIDEO_URL.into(),
            thumbnail: Some("https://i.ytimg.com/x.jpg".into()),
            ..Default::default()
        };
        let entry = info.history_entry(&paths);
        assert_eq!(entry.url, VIDEO_URL);
        assert!(entry.thumbnail_local_uri.starts_with("file://"));
        assert!(entry.thumbnail_local_uri.ends_with("/dQw4w9WgXcQ/Weird_Name_Test_.thumbnail.jpg"));
    }
}
