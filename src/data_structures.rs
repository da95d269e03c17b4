//! Session context and per-cycle state
//!
//! The `Session` owns everything one run of the program needs and is passed
//! explicitly to each step. `Cycle` tracks progress through a single
//! download cycle and refuses out-of-order steps.

use log::debug;

use crate::arguments::{ArgumentList, FolderLayout, Format, TimeRange};
use crate::error::{AppError, AppResult};
use crate::metadata_cache::MetadataCache;
use crate::settings::{SettingsDocument, SettingsStore};

/// State owned by the top-level driver for the whole run
pub struct Session {
    pub store: SettingsStore,
    pub settings: SettingsDocument,
    pub cache: MetadataCache,
    pub client: reqwest::Client,
    /// URL given on the command line, offered once as the first default
    pub initial_url: Option<String>,
}

impl Session {
    /// Persist the in-memory settings document
    pub fn save_settings(&self) -> AppResult<()> {
        self.store.save(&self.settings)
    }
}

/// Steps of one download cycle, in the only order they may happen
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleState {
    Reset,
    Seeded,
    UrlResolved,
    MetadataReady,
    FormatChosen,
    LocationChosen,
    SectionsApplied,
    ExtrasApplied,
    OutputTemplateInstalled,
    ReadyToRun,
}

impl CycleState {
    pub fn next(self) -> Option<CycleState> {
        use CycleState::*;
        match self {
            Reset => Some(Seeded),
            Seeded => Some(UrlResolved),
            UrlResolved => Some(MetadataReady),
            MetadataReady => Some(FormatChosen),
            FormatChosen => Some(LocationChosen),
            LocationChosen => Some(SectionsApplied),
            SectionsApplied => Some(ExtrasApplied),
            ExtrasApplied => Some(OutputTemplateInstalled),
            OutputTemplateInstalled => Some(ReadyToRun),
            ReadyToRun => None,
        }
    }
}

/// One pass through the prompts, from an empty argument list to a runnable one
pub struct Cycle {
    state: CycleState,
    pub args: ArgumentList,
    pub choices: CycleChoices,
}

/// Decisions collected during a cycle
#[derive(Clone, Debug, Default)]
pub struct CycleChoices {
    pub video_url: String,
    pub title: String,
    pub format: Format,
    pub download_location: String,
    pub time_range: Option<TimeRange>,
    pub extra_commands: String,
    pub layout: FolderLayout,
    pub output_template: String,
}

impl Cycle {
    /// Start a cycle with the base flags already in place
    pub fn start(settings: &SettingsDocument) -> Self {
        let mut cycle = Self {
            state: CycleState::Reset,
            args: ArgumentList::default(),
            choices: CycleChoices::default(),
        };
        cycle.args.reset(&settings.downloader_path, &settings.muxer_path);
        cycle.state = CycleState::Seeded;
        cycle
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Move to `to`, which must be the step directly after the current one
    pub fn advance(&mut self, to: CycleState) -> AppResult<()> {
        if self.state.next() != Some(to) {
            return Err(AppError::Validation(format!(
                "Cannot move from {:?} to {:?}",
                self.state, to
            )));
        }
        debug!("Cycle {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }
}
