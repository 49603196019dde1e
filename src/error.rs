use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Everything that can go wrong between reading user input and
/// handing back the finished file
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "not a supported YouTube URL: {0}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID"
    )]
    InvalidUrlShape(String),

    #[error("invalid time '{0}' (expected MM:SS, HH:MM:SS, MMSS or HHMMSS)")]
    InvalidTimeShape(String),

    #[error("start and end must both be given, or both left empty")]
    IncompleteTimeRange,

    #[error("end time {end} is not after start time {start}")]
    InvertedTimeRange { start: String, end: String },

    #[error("{program} not found. Install it with:\n  pip install yt-dlp\n  or: brew install yt-dlp")]
    ExternalToolMissing { program: String },

    #[error("{program} failed ({status})\n{diagnostics}")]
    ExternalToolFailed {
        program: String,
        status: ExitStatus,
        diagnostics: String,
    },

    #[error("download reported success but no .mp4 file was found in {}", .0.display())]
    OutputFileNotFound(PathBuf),

    #[error("could not read video metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("a download is already running in this session")]
    Busy,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Input errors the user can fix by re-entering a value
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrlShape(_)
                | Error::InvalidTimeShape(_)
                | Error::IncompleteTimeRange
                | Error::InvertedTimeRange { .. }
        )
    }

    /// Errors caused by a badly formed start, end or range
    pub fn is_time_input(&self) -> bool {
        self.is_validation() && !matches!(self, Error::InvalidUrlShape(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
