use clap::Parser;
use std::path::PathBuf;

use ytclip::ytdlp::Browser;

#[derive(Parser, Debug)]
#[command(
    name = "ytclip",
    about = "Download a YouTube video, or just a time range of it",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL (prompts interactively if omitted)
    pub url: Option<String>,

    /// Start time: MM:SS, HH:MM:SS, MMSS or HHMMSS
    #[arg(short, long, conflicts_with = "range")]
    pub start: Option<String>,

    /// End time: MM:SS, HH:MM:SS, MMSS or HHMMSS
    #[arg(short, long, conflicts_with = "range")]
    pub end: Option<String>,

    /// Combined range, e.g. 0430-0600 or 4:30-6:00
    #[arg(short, long)]
    pub range: Option<String>,

    /// Use cookies from this browser (needs allow_browser_cookies in config)
    #[arg(short, long, value_enum)]
    pub browser: Option<Browser>,

    /// Directory to save into (default: current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Use `_v2` instead of `_V2` when a file name is taken
    #[arg(long)]
    pub lower_suffix: bool,

    /// Show status and progress details
    #[arg(short, long)]
    pub verbose: bool,
}
