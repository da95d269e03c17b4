//! Interactive driver for the ytdlp-interactive front-end
//!
//! This module contains the startup sequence and the download cycle that
//! repeats until the user cancels.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, Utc};
use console::{style, Color};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::ProgressBar;
use log::{error, info, warn};

use crate::arguments::{build_output_template, ArgumentList, FolderLayout, Format, TimeRange};
use crate::config::{APP_TITLE, DOWNLOADER_BIN, MAX_DOWNLOAD_ATTEMPTS, MUXER_BIN, RELEASES_PAGE_URL, SPINNER_TICK_MS};
use crate::data_structures::{Cycle, CycleState, Session};
use crate::error::{AppError, AppResult};
use crate::helper_functions::Utils;
use crate::history::DownloadRecord;
use crate::metadata_cache::{MetadataCache, VideoInfo};
use crate::network::{ensure_online, http_client, latest_downloader_version, public_ip};
use crate::settings::{user_downloads_folder, AppPaths, SettingsDocument, SettingsStore};
use crate::tooling::{run_download, ToolManager, YtDlp};
use crate::youtube::{self, VideoTarget};

const CHOOSE_CUSTOM_LOCATION: &str = "Enter a custom location...";

fn confirm(prompt: &str, default: bool) -> AppResult<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact_opt()?
        .ok_or(AppError::Cancelled)
}

fn input(prompt: &str, default: Option<&str>) -> AppResult<String> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt).allow_empty(true);
    if let Some(default) = default.filter(|d| !d.is_empty()) {
        input = input.default(default.to_string());
    }
    Ok(input.interact_text()?)
}

fn select(prompt: &str, items: &[String]) -> AppResult<usize> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()?
        .ok_or(AppError::Cancelled)
}

/// Run the program until the user cancels or a fatal error occurs
pub async fn run(initial_url: Option<String>) -> AppResult<()> {
    Utils::print_divider_with_text(APP_TITLE, Color::Green, Color::Yellow);
    let mut session = initialize(initial_url)?;
    startup_checks(&mut session).await?;
    Utils::print_divider(Color::Green);

    loop {
        match run_cycle(&mut session).await {
            Ok(()) => {}
            Err(e @ (AppError::ExternalTool { .. } | AppError::Network(_))) => {
                error!("Cycle aborted: {}", e);
                println!("{}", style(format!("Cycle aborted: {}", e)).red().bright());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Load the settings document, creating it on first run
fn initialize(initial_url: Option<String>) -> AppResult<Session> {
    let paths = AppPaths::resolve()?;
    let store = SettingsStore::new(&paths.settings_path);

    if !store.exists() {
        info!("No settings at {}, running first-time setup", store.path().display());
        let tools = ToolManager::probe()?;
        println!("{} is installed.", DOWNLOADER_BIN);
        println!("{} is installed.", MUXER_BIN);

        std::fs::create_dir_all(&paths.downloads_data_folder)
            .map_err(|e| AppError::file(&paths.downloads_data_folder, e))?;
        println!("Downloads data folder created successfully.");

        let doc = SettingsDocument::initial(tools, &paths, &user_downloads_folder());
        store.create(&doc)?;
        println!("Settings written successfully.");
    }

    let settings = store.load()?;
    let cache_root = if settings.downloads_data_folder.is_empty() {
        paths.downloads_data_folder.clone()
    } else {
        PathBuf::from(&settings.downloads_data_folder)
    };

    Ok(Session {
        cache: MetadataCache::new(cache_root),
        client: http_client()?,
        store,
        settings,
        initial_url,
    })
}

async fn startup_checks(session: &mut Session) -> AppResult<()> {
    ensure_online()?;

    match public_ip(&session.client).await {
        Ok(ip) => println!("Your Public IP: {}", ip),
        Err(e) => {
            warn!("Failed to fetch public IP: {}", e);
            println!("Your Public IP: unknown");
        }
    }

    let now = Local::now();
    let latest = if session.settings.latest_version_is_stale(now) {
        match latest_downloader_version(&session.client).await {
            Ok(version) => {
                session.settings.record_latest_version(&version, now);
                session.save_settings()?;
                Some(version)
            }
            Err(e) => {
                warn!("Failed to fetch latest {} version: {}", DOWNLOADER_BIN, e);
                None
            }
        }
    } else {
        Some(session.settings.downloader_version_latest.clone())
    };

    match latest.filter(|v| !v.is_empty()) {
        Some(latest) => {
            println!("Latest {} version: {}", DOWNLOADER_BIN, latest);
            if Utils::is_update_available(&latest, &session.settings.downloader_version) {
                println!("{}", style("Update available.").yellow().bright());
                println!(
                    "{}",
                    style(format!(
                        "Download latest version from: {} or use {} -U",
                        RELEASES_PAGE_URL, DOWNLOADER_BIN
                    ))
                    .yellow()
                    .bright()
                );
            } else {
                println!("{}", style("You are using the latest version.").green().bright());
            }
        }
        None => println!("Latest {} version: unknown", DOWNLOADER_BIN),
    }
    Ok(())
}

fn print_history_counts(settings: &SettingsDocument) {
    println!();
    for (label, count) in [
        ("URL History", settings.url_history.len()),
        ("Download Location History", settings.download_location_history.len()),
        ("Extra Commands History", settings.extra_commands_history.len()),
        ("Downloads History", settings.downloads_history.len()),
    ] {
        println!("{}", style(format!("{}: {}", label, count)).blue().bright());
    }
}

/// Ask for a URL until a usable video URL is entered
fn prompt_video_target(mut default: Option<String>) -> AppResult<VideoTarget> {
    loop {
        let entered = input("Enter URL", default.take().as_deref())?;
        match youtube::validate(&entered) {
            Ok(target) => return Ok(target),
            Err(rejection) => {
                warn!("Rejected URL {:?}: {}", entered, rejection);
                println!("{}", style(rejection).red().bright());
            }
        }
    }
}

fn select_format(session: &mut Session, info: &VideoInfo) -> AppResult<Format> {
    let default = session.settings.default_format.clone();
    println!("{}", style(format!("Default format: {}", default.describe())).cyan().bright());
    if confirm("Use default format?", true)? {
        return Ok(default);
    }

    let groups = info.format_groups();
    let group_names = ["Formats", "Audio Formats", "Video Formats"].map(String::from);
    let records = match select("Select a format group", &group_names)? {
        0 => &groups.all,
        1 => &groups.audio,
        _ => &groups.video,
    };
    if records.is_empty() {
        println!("{}", style("No formats in this group, keeping the default.").yellow());
        return Ok(default);
    }

    let items: Vec<String> = records.iter().map(|r| r.format.clone()).collect();
    let record = records[select("Select a Format", &items)?];
    println!("{}", style(record.details()).dim());
    let chosen = record.to_format();

    if confirm("Set this format as default?", false)? {
        session.settings.set_default_format(chosen.clone());
        session.save_settings()?;
    }
    Ok(chosen)
}

fn select_download_location(session: &mut Session) -> AppResult<String> {
    let default = session.settings.default_download_location.clone();
    println!("{}", style(format!("\nDefault download location: {}", default)).cyan().bright());
    if confirm("Use default download location?", true)? {
        return Ok(default);
    }

    let mut items = vec![CHOOSE_CUSTOM_LOCATION.to_string()];
    items.extend(session.settings.download_location_history.iter().cloned());
    let location = match select("Select an option", &items)? {
        0 => loop {
            let entered = input("Enter your custom download path", None)?;
            if !entered.trim().is_empty() {
                break entered.trim().to_string();
            }
        },
        idx => items[idx].clone(),
    };

    if confirm("Set this download location as default?", false)? {
        session.settings.set_default_download_location(&location);
        session.save_settings()?;
    }
    Ok(location)
}

/// Run the download, offering a retry when the downloader fails
async fn download_with_retry(args: &ArgumentList) -> AppResult<bool> {
    for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
        match run_download(args).await {
            Ok(()) => return Ok(true),
            Err(AppError::ExternalTool { code, stderr }) => {
                let reason = stderr.lines().last().unwrap_or("no diagnostics");
                println!(
                    "{}",
                    style(format!("Download failed (exit code {:?}): {}", code, reason)).red().bright()
                );
                if attempt == MAX_DOWNLOAD_ATTEMPTS {
                    println!("Giving up after {} attempts.", MAX_DOWNLOAD_ATTEMPTS);
                    return Ok(false);
                }
                if !confirm("Retry download?", true)? {
                    return Ok(false);
                }
                info!("Retrying download, attempt {}", attempt + 1);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(false)
}

/// One pass from URL entry to a finished download
async fn run_cycle(session: &mut Session) -> AppResult<()> {
    print_history_counts(&session.settings);
    let mut cycle = Cycle::start(&session.settings);

    println!();
    let target = prompt_video_target(session.initial_url.take())?;
    let video_url = target.video_url();
    cycle.advance(CycleState::UrlResolved)?;

    Utils::print_divider_with_text("Youtube", Color::Red, Color::Red);
    println!("Video ID: {}", style(&target.video_id).green());
    println!("Playlist ID: {}", style(target.playlist_id.as_deref().unwrap_or("N/A")).green());
    println!("Video URL: {}", style(&video_url).green());
    if let Some(playlist_url) = target.playlist_url() {
        println!("Playlist URL: {}", style(playlist_url).green());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Fetching video metadata...");
    spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    let source = YtDlp::new(&session.settings.downloader_path, session.client.clone());
    let cached = match session.cache.ensure_fresh(&source, &target.video_id, &video_url, Utc::now()).await {
        Ok(cached) => {
            spinner.finish_with_message(if cached.refreshed {
                "Fetched video metadata."
            } else {
                "Using cached video metadata."
            });
            cached
        }
        Err(e) => {
            spinner.abandon_with_message("Failed to fetch video metadata.");
            return Err(e);
        }
    };
    session.settings.record_url(cached.info.history_entry(&cached.paths));
    session.save_settings()?;
    cycle.args.load_info_json(&cached.paths.info_json());
    cycle.choices.video_url = video_url;
    cycle.choices.title = cached.info.fulltitle.clone();
    cycle.advance(CycleState::MetadataReady)?;
    println!("{}", style(format!("\n{}\n", cached.info.fulltitle)).red().bright());

    let format = select_format(session, &cached.info)?;
    println!("{}", style(format!("Selected Format: {}", format.describe())).green().bright());
    cycle.args.apply_format(&format);
    cycle.choices.format = format;
    cycle.advance(CycleState::FormatChosen)?;

    let location = select_download_location(session)?;
    println!("{}", style(format!("Selected Download Location: {}", location)).green().bright());
    cycle.choices.download_location = location;
    cycle.advance(CycleState::LocationChosen)?;

    println!();
    let range = TimeRange::parse(&input("Download section of video? [start end]", None)?);
    match &range {
        Some(range) => {
            println!(
                "{}",
                style(format!("Start and End time : {} - {}", range.start, range.end.as_deref().unwrap_or("inf")))
                    .green()
                    .bright()
            );
            cycle.args.apply_time_range(range);
        }
        None => println!("{}", style("Skipping download sections").green().bright()),
    }
    cycle.choices.time_range = range;
    cycle.advance(CycleState::SectionsApplied)?;

    println!();
    let extra_commands = input("Enter Extra Commands", None)?.trim().to_string();
    if extra_commands.is_empty() {
        println!("{}", style("Extra Commands: No extra commands").green().bright());
    } else {
        let ignored = cycle.args.apply_extra_commands(&extra_commands);
        if !ignored.is_empty() {
            warn!("Ignored extra flags set by the prompts: {}", ignored.join(" "));
            println!(
                "{}",
                style(format!("Ignoring {} (already set by the prompts above)", ignored.join(", "))).yellow().bright()
            );
        }
        println!("{}", style(format!("Extra Commands: {}", extra_commands)).green().bright());
    }
    cycle.choices.extra_commands = extra_commands;
    cycle.advance(CycleState::ExtrasApplied)?;

    let layout = FolderLayout {
        save_in_channel_folder: confirm("Save in a channel folder?", false)?,
        save_in_video_title_folder: confirm("Save in a video title folder?", false)?,
    };
    let template = build_output_template(
        &cycle.choices.download_location,
        &cycle.choices.format,
        cycle.choices.time_range.as_ref(),
        layout,
    );
    cycle.args.install_output_template(&template);
    cycle.choices.layout = layout;
    cycle.choices.output_template = template;
    cycle.advance(CycleState::OutputTemplateInstalled)?;
    println!("{}", style(format!("{:?}", cycle.args.tokens())).dim());

    println!();
    if !confirm("Start Download?", true)? {
        return Err(AppError::Cancelled);
    }
    session.settings.record_download_location(cycle.choices.download_location.trim());
    if !cycle.choices.extra_commands.is_empty() {
        session.settings.record_extra_commands(&cycle.choices.extra_commands);
    }
    session.save_settings()?;
    cycle.advance(CycleState::ReadyToRun)?;

    if download_with_retry(&cycle.args).await? {
        let choices = &cycle.choices;
        session.settings.record_download(DownloadRecord {
            url: choices.video_url.clone(),
            title: choices.title.clone(),
            format: choices.format.selector(),
            location: choices.download_location.clone(),
            output_template: choices.output_template.clone(),
            sections: choices.time_range.as_ref().map(TimeRange::section_spec),
            downloaded_at: Local::now().to_rfc3339(),
        });
        session.save_settings()?;
        println!("{}", style("Download complete.").green().bright());
    }
    Ok(())
}
