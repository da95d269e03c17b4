//! ytdlp-interactive - Interactive yt-dlp front-end library
//!
//! This library provides the persistent settings and history document, the
//! per-video metadata cache and the argument assembly used to drive yt-dlp.

pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod history;
pub mod metadata_cache;
pub mod arguments;
pub mod tooling;
pub mod network;
pub mod youtube;
pub mod data_structures;
pub mod helper_functions;
pub mod app;

// Re-export commonly used items
pub use config::*;
pub use error::*;
pub use logging::*;
pub use settings::*;
pub use history::*;
pub use metadata_cache::*;
pub use arguments::*;
pub use data_structures::*;
pub use helper_functions::*;
