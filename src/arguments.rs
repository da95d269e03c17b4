//! Argument list assembly for the external downloader
//!
//! One `ArgumentList` is built per interactive cycle. It always starts with
//! the downloader binary and the muxer location, and user choices are then
//! applied in any order. Flags applied with `set_or_replace` occur at most
//! once, holding the most recently applied value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{
    BEST_AUDIO_SUFFIX, DEFAULT_FORMAT_SELECTOR, FLAG_DOWNLOAD_SECTIONS, FLAG_FORCE_KEYFRAMES, FLAG_FORMAT,
    FLAG_LOAD_INFO_JSON, FLAG_MUXER_LOCATION, FLAG_OUTPUT, PLACEHOLDER_CHANNEL, PLACEHOLDER_EXT, PLACEHOLDER_TITLE,
};

/// Flags only ever written through `set_or_replace`
const MANAGED_FLAGS: &[&str] = &[FLAG_FORMAT, FLAG_OUTPUT, FLAG_DOWNLOAD_SECTIONS];

/// Kind of stream a format record carries
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// A format choice: either a raw selector expression or a concrete stream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Format {
    Default(String),
    Explicit { id: String, label: String, media: MediaKind },
}

impl Default for Format {
    fn default() -> Self {
        Format::Default(DEFAULT_FORMAT_SELECTOR.to_string())
    }
}

impl Format {
    /// Text appended to the output file name
    pub fn label(&self) -> &str {
        match self {
            Format::Default(selector) => selector,
            Format::Explicit { label, .. } => label,
        }
    }

    /// Value passed with `-f`.
    ///
    /// Audio streams are requested as-is; video streams are paired with the
    /// best audio stream. Selector expressions are passed through unchanged,
    /// except a bare numeric format id pinned by older settings files, which
    /// is paired with the best audio stream like a video stream.
    pub fn selector(&self) -> String {
        match self {
            Format::Default(selector) if is_bare_format_id(selector) => format!("{}{}", selector, BEST_AUDIO_SUFFIX),
            Format::Default(selector) => selector.clone(),
            Format::Explicit { id, media: MediaKind::Audio, .. } => id.clone(),
            Format::Explicit { id, media: MediaKind::Video, .. } => format!("{}{}", id, BEST_AUDIO_SUFFIX),
        }
    }

    /// Human readable description for prompts
    pub fn describe(&self) -> String {
        match self {
            Format::Default(selector) if selector == DEFAULT_FORMAT_SELECTOR => "Best Video + Best Audio".to_string(),
            Format::Default(selector) => selector.clone(),
            Format::Explicit { id, label, .. } => format!("{} ({})", label, id),
        }
    }
}

fn is_bare_format_id(selector: &str) -> bool {
    !selector.is_empty() && selector.bytes().all(|b| b.is_ascii_digit())
}

/// Portion of the video to download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: Option<String>,
}

impl TimeRange {
    /// Parse `"<start> [end]"`; empty input means the whole video
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let start = parts.next()?.to_string();
        let end = parts.next().map(str::to_string);
        Some(Self { start, end })
    }

    /// Value for `--download-sections`
    pub fn section_spec(&self) -> String {
        format!("*{}-{}", self.start, self.end.as_deref().unwrap_or("inf"))
    }

    /// Suffix appended to the output file name
    pub fn filename_suffix(&self) -> String {
        match &self.end {
            Some(end) => format!(" [{} - {}]", self.start, end),
            None => format!(" [{} -]", self.start),
        }
    }
}

/// Folder layout choices for the output template
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FolderLayout {
    pub save_in_channel_folder: bool,
    pub save_in_video_title_folder: bool,
}

/// Compose the output path template handed to the downloader with `-o`
pub fn build_output_template(
    download_location: &str,
    format: &Format,
    range: Option<&TimeRange>,
    layout: FolderLayout,
) -> String {
    let mut path = Path::new(download_location).to_path_buf();
    if layout.save_in_channel_folder {
        path.push(PLACEHOLDER_CHANNEL);
    }
    if layout.save_in_video_title_folder {
        path.push(PLACEHOLDER_TITLE);
    }

    let mut stem = format!("{}_{}", PLACEHOLDER_TITLE, format.label());
    if let Some(range) = range {
        stem.push_str(&range.filename_suffix());
    }
    path.push(format!("{}.{}", stem, PLACEHOLDER_EXT));
    path.to_string_lossy().to_string()
}

/// Ordered downloader command line, program first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgumentList {
    tokens: Vec<String>,
}

impl ArgumentList {
    /// A list holding the base flags every invocation carries
    pub fn seeded(downloader_path: &str, muxer_path: &str) -> Self {
        let mut list = Self::default();
        list.reset(downloader_path, muxer_path);
        list
    }

    /// Drop everything and re-seed with the base flags
    pub fn reset(&mut self, downloader_path: &str, muxer_path: &str) {
        self.tokens.clear();
        self.push(downloader_path);
        self.push_pair(FLAG_MUXER_LOCATION, muxer_path);
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    pub fn push_pair(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        self.tokens.push(flag.into());
        self.tokens.push(value.into());
    }

    /// Replace the value following `flag`, or append the pair if absent
    pub fn set_or_replace(&mut self, flag: &str, value: impl Into<String>) {
        match self.tokens.iter().position(|t| t == flag) {
            Some(idx) if idx + 1 < self.tokens.len() => self.tokens[idx + 1] = value.into(),
            Some(_) => self.tokens.push(value.into()),
            None => self.push_pair(flag, value),
        }
    }

    /// Value currently set for `flag`
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let idx = self.tokens.iter().position(|t| t == flag)?;
        self.tokens.get(idx + 1).map(String::as_str)
    }

    pub fn count_of(&self, token: &str) -> usize {
        self.tokens.iter().filter(|t| *t == token).count()
    }

    pub fn load_info_json(&mut self, info_json_path: &Path) {
        self.push_pair(FLAG_LOAD_INFO_JSON, info_json_path.to_string_lossy());
    }

    pub fn apply_format(&mut self, format: &Format) {
        self.set_or_replace(FLAG_FORMAT, format.selector());
    }

    pub fn apply_time_range(&mut self, range: &TimeRange) {
        self.set_or_replace(FLAG_DOWNLOAD_SECTIONS, range.section_spec());
        self.push(FLAG_FORCE_KEYFRAMES);
    }

    /// Append whitespace separated flags as typed by the user.
    ///
    /// Flags this list sets itself (`-f`, `-o`, `--download-sections`) are
    /// dropped together with their value so each stays a single occurrence;
    /// the dropped flags are returned for the caller to report.
    pub fn apply_extra_commands(&mut self, extra_commands: &str) -> Vec<String> {
        let mut ignored = Vec::new();
        let mut tokens = extra_commands.split_whitespace();
        while let Some(token) = tokens.next() {
            if MANAGED_FLAGS.contains(&token) {
                tokens.next();
                ignored.push(token.to_string());
                continue;
            }
            self.push(token);
        }
        ignored
    }

    pub fn install_output_template(&mut self, template: &str) {
        self.set_or_replace(FLAG_OUTPUT, template);
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Program to execute
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Arguments following the program
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn video_720p() -> Format {
        Format::Explicit { id: "136".into(), label: "720p".into(), media: MediaKind::Video }
    }

    #[test]
    fn seeded_list_starts_with_tool_paths() {
        let args = ArgumentList::seeded("/usr/bin/yt-dlp", "/usr/bin/ffmpeg");
        assert_eq!(args.tokens(), &["/usr/bin/yt-dlp", "--ffmpeg-location", "/usr/bin/ffmpeg"]);
        assert_eq!(args.program(), Some("/usr/bin/yt-dlp"));
        assert_eq!(args.args().len(), 2);
    }

    #[test]
    fn reset_discards_previous_cycle() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.apply_format(&video_720p());
        args.push("--embed-subs");
        args.reset("yt-dlp", "ffmpeg");
        assert_eq!(args.tokens(), &["yt-dlp", "--ffmpeg-location", "ffmpeg"]);
    }

    #[test]
    fn set_or_replace_is_idempotent() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.set_or_replace("-f", "137+ba");
        let once = args.clone();
        args.set_or_replace("-f", "137+ba");
        assert_eq!(args, once);
        assert_eq!(args.count_of("-f"), 1);
    }

    #[test]
    fn set_or_replace_updates_in_place() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.set_or_replace("-f", "137+ba");
        args.push("--embed-subs");
        args.set_or_replace("-f", "251");
        assert_eq!(
            args.tokens(),
            &["yt-dlp", "--ffmpeg-location", "ffmpeg", "-f", "251", "--embed-subs"]
        );
    }

    #[test]
    fn set_or_replace_completes_a_dangling_flag() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.push("-o");
        args.set_or_replace("-o", "out.%(ext)s");
        assert_eq!(args.value_of("-o"), Some("out.%(ext)s"));
        assert_eq!(args.count_of("-o"), 1);
    }

    #[test]
    fn format_selector_pairs_video_with_best_audio() {
        let audio = Format::Explicit { id: "251".into(), label: "audio only".into(), media: MediaKind::Audio };
        let video = Format::Explicit { id: "137".into(), label: "1080p".into(), media: MediaKind::Video };
        assert_eq!(audio.selector(), "251");
        assert_eq!(video.selector(), "137+ba");
        assert_eq!(Format::default().selector(), "bv+ba");
        assert_eq!(Format::default().describe(), "Best Video + Best Audio");
    }

    #[test]
    fn format_serializes_as_string_or_object() {
        assert_eq!(serde_json::to_value(Format::default()).unwrap(), serde_json::json!("bv+ba"));
        let explicit: Format =
            serde_json::from_value(serde_json::json!({"id": "251", "label": "audio only", "media": "audio"})).unwrap();
        assert_eq!(explicit.selector(), "251");
    }

    #[test]
    fn time_range_parsing() {
        assert_eq!(TimeRange::parse(""), None);
        assert_eq!(TimeRange::parse("   "), None);
        let open = TimeRange::parse("10").unwrap();
        assert_eq!(open.section_spec(), "*10-inf");
        assert_eq!(open.filename_suffix(), " [10 -]");
        let closed = TimeRange::parse("1:00 2:30").unwrap();
        assert_eq!(closed.section_spec(), "*1:00-2:30");
        assert_eq!(closed.filename_suffix(), " [1:00 - 2:30]");
    }

    #[test]
    fn time_range_adds_sections_and_keyframes() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.apply_time_range(&TimeRange::parse("10 20").unwrap());
        assert_eq!(args.value_of("--download-sections"), Some("*10-20"));
        assert_eq!(args.count_of("--force-keyframes-at-cuts"), 1);
    }

    #[test]
    fn extra_commands_are_split_on_whitespace() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.apply_extra_commands("  --embed-subs   --sub-langs en ");
        assert_eq!(&args.tokens()[3..], &["--embed-subs", "--sub-langs", "en"]);
    }

    #[test]
    fn extra_commands_cannot_duplicate_managed_flags() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.apply_format(&video_720p());
        let ignored = args.apply_extra_commands("-f 18 --embed-subs -o mine.mp4 --download-sections *0-5");
        assert_eq!(ignored, vec!["-f", "-o", "--download-sections"]);
        assert_eq!(args.count_of("-f"), 1);
        assert_eq!(args.value_of("-f"), Some("136+ba"));
        assert_eq!(args.count_of("-o"), 0);
        assert_eq!(args.count_of("--embed-subs"), 1);
        assert!(!args.tokens().iter().any(|t| t == "mine.mp4" || t == "18"));
    }

    #[test]
    fn legacy_bare_format_id_is_paired_with_best_audio() {
        let legacy: Format = serde_json::from_value(serde_json::json!("137")).unwrap();
        assert_eq!(legacy, Format::Default("137".into()));
        assert_eq!(legacy.selector(), "137+ba");
        assert_eq!(legacy.label(), "137");
        assert_eq!(Format::Default("bv+ba".into()).selector(), "bv+ba");
        assert_eq!(Format::Default("best".into()).selector(), "best");
    }

    #[test]
    fn output_template_with_channel_folder_and_open_range() {
        let layout = FolderLayout { save_in_channel_folder: true, save_in_video_title_folder: false };
        let template = build_output_template("/downloads", &video_720p(), TimeRange::parse("10").as_ref(), layout);
        let expected: PathBuf = ["/downloads", "%(channel)s", "%(title)s_720p [10 -].%(ext)s"].iter().collect();
        assert_eq!(template, expected.to_string_lossy());
    }

    #[test]
    fn output_template_puts_channel_before_title() {
        let layout = FolderLayout { save_in_channel_folder: true, save_in_video_title_folder: true };
        let template = build_output_template("/downloads", &video_720p(), TimeRange::parse("1 2").as_ref(), layout);
        let expected: PathBuf =
            ["/downloads", "%(channel)s", "%(title)s", "%(title)s_720p [1 - 2].%(ext)s"].iter().collect();
        assert_eq!(template, expected.to_string_lossy());
    }

    #[test]
    fn output_template_title_folder_only() {
        let layout = FolderLayout { save_in_channel_folder: false, save_in_video_title_folder: true };
        let template = build_output_template("/d", &video_720p(), None, layout);
        let expected: PathBuf = ["/d", "%(title)s", "%(title)s_720p.%(ext)s"].iter().collect();
        assert_eq!(template, expected.to_string_lossy());
    }

    #[test]
    fn output_template_plain() {
        let template = build_output_template("/downloads", &Format::default(), None, FolderLayout::default());
        let expected: PathBuf = ["/downloads", "%(title)s_bv+ba.%(ext)s"].iter().collect();
        assert_eq!(template, expected.to_string_lossy());
    }

    #[test]
    fn installing_template_twice_keeps_one_output_flag() {
        let mut args = ArgumentList::seeded("yt-dlp", "ffmpeg");
        args.install_output_template("a.%(ext)s");
        args.install_output_template("b.%(ext)s");
        assert_eq!(args.count_of("-o"), 1);
        assert_eq!(args.value_of("-o"), Some("b.%(ext)s"));
    }
}
