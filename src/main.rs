//! ytdlp-interactive - Interactive YouTube downloader front-end
//!
//! Guides the user through choosing a URL, format, destination and trim
//! range, then hands the assembled command line to yt-dlp.

use clap::Parser;
use console::style;
use log::{error, info};

use ytdlp_interactive::{app, setup_logging, shutdown_logging, AppError, APP_VERSION};

#[derive(Parser, Debug)]
#[command(name = "ytdlp-interactive")]
#[command(version)]
#[command(about = "Interactive front-end for yt-dlp that remembers your choices", long_about = None)]
struct Cli {
    /// Video URL offered as the default for the first prompt
    url: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging();
    info!("Starting ytdlp-interactive {}", APP_VERSION);

    let code = match app::run(cli.url).await {
        Ok(()) => 0,
        Err(AppError::Cancelled) => {
            info!("Closed by user");
            println!("{}", style("\nClosed by user").green().bright());
            0
        }
        Err(e) => {
            error!("Fatal: {}", e);
            eprintln!("{} {}", style("Unexpected error:").red().bright(), e);
            if let Some(hint) = e.recovery_hint() {
                eprintln!("{}", style(hint).yellow());
            }
            e.exit_code()
        }
    };

    shutdown_logging();
    std::process::exit(code);
}
