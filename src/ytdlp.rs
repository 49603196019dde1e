use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::DownloadRequest;
use crate::error::{Error, Result};
use crate::naming::{self, VersionSuffix};

pub const YT_DLP: &str = "yt-dlp";

/// Best mp4 video up to 1080p merged with m4a audio, falling back to a
/// single-file mp4
pub const DEFAULT_FORMAT: &str =
    "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best[ext=mp4]";

/// Marks our own progress lines in the downloader's stdout
const PROGRESS_PREFIX: &str = "[ytclip-progress] ";

/// Browser whose cookie store is handed to the downloader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::Edge => "edge",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress report from the downloader. Fields are whatever the tool
/// knew at the time, so any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub status: String,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    pub speed: Option<f64>,
    pub eta: Option<f64>,
    pub error: Option<String>,
}

impl Progress {
    /// Exact total if known, otherwise the estimate
    pub fn total(&self) -> Option<f64> {
        self.total_bytes
            .or(self.total_bytes_estimate)
            .filter(|&t| t > 0.0)
    }

    /// Completed share in `[0, 1]`
    pub fn fraction(&self) -> Option<f64> {
        let done = self.downloaded_bytes?;
        let total = self.total()?;
        Some((done / total).clamp(0.0, 1.0))
    }

    pub fn is_finished(&self) -> bool {
        self.status == "finished"
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// What the downloader reports about a video before fetching it
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub id: String,
    pub title: Option<String>,
    pub duration: Option<f64>,
}

impl VideoInfo {
    /// Length in whole seconds, `None` when the tool did not know it
    pub fn duration_seconds(&self) -> Option<u64> {
        self.duration.filter(|&d| d > 0.0).map(|d| d.round() as u64)
    }
}

/// Parse one stdout line, returning `None` for anything that is not one of
/// our progress lines
pub fn parse_progress_line(line: &str) -> Option<Progress> {
    let json = line.trim().strip_prefix(PROGRESS_PREFIX.trim_end())?;
    serde_json::from_str(json.trim()).ok()
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program
#[derive(Debug, Clone)]
pub struct Downloader {
    program: String,
    leading_args: Vec<String>,
    format: String,
    allow_browser_cookies: bool,
    suffix: VersionSuffix,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(YT_DLP)
    }
}

impl Downloader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            format: DEFAULT_FORMAT.to_string(),
            allow_browser_cookies: false,
            suffix: VersionSuffix::default(),
        }
    }

    /// Build from a full command line such as `["python3", "-m", "yt_dlp"]`.
    /// An empty command falls back to `yt-dlp`.
    pub fn from_command(command: &[String]) -> Self {
        match command.split_first() {
            Some((program, rest)) => Self {
                leading_args: rest.to_vec(),
                ..Self::new(program.clone())
            },
            None => Self::default(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Cookie sourcing is off unless the deployment turns it on
    pub fn with_browser_cookies(mut self, allow: bool) -> Self {
        self.allow_browser_cookies = allow;
        self
    }

    pub fn with_suffix(mut self, suffix: VersionSuffix) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ExternalToolMissing {
                program: self.program.clone(),
            }
        } else {
            e.into()
        }
    }

    fn push_cookie_args(&self, request: &DownloadRequest, args: &mut Vec<String>) {
        match request.browser {
            Some(browser) if self.allow_browser_cookies => {
                args.push("--cookies-from-browser".to_string());
                args.push(browser.to_string());
            }
            Some(browser) => {
                debug!("Browser cookies disabled by configuration, ignoring {browser}");
            }
            None => {}
        }
    }

    /// Arguments for a metadata-only query
    pub fn info_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(["-J".to_string(), "--no-playlist".to_string()]);
        self.push_cookie_args(request, &mut args);
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    /// Fetch title and length without downloading anything
    pub async fn fetch_info(&self, request: &DownloadRequest) -> Result<VideoInfo> {
        let args = self.info_args(request);
        debug!("Executing command: {} {}", self.program, args.join(" "));

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("stderr: {diagnostics}");
            return Err(Error::ExternalToolFailed {
                program: self.program.clone(),
                status: output.status,
                diagnostics,
            });
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)?;
        info!("Video {}: {:?} ({:?}s)", info.id, info.title, info.duration);
        Ok(info)
    }

    /// Arguments for one download into `staging`
    pub fn build_args(&self, request: &DownloadRequest, staging: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();

        args.extend([
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!("download:{PROGRESS_PREFIX}%(progress)j"),
            "-f".to_string(),
            self.format.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-P".to_string(),
            staging.to_string_lossy().to_string(),
            "-o".to_string(),
            naming::output_template(&request.range),
        ]);

        if let Some(clause) = request.range.clause() {
            args.push("--download-sections".to_string());
            args.push(clause);
            args.push("--force-keyframes-at-cuts".to_string());
        }

        self.push_cookie_args(request, &mut args);

        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    /// Run the downloader once, writing into `staging`.
    ///
    /// Every progress line is passed to `on_progress` in the order the tool
    /// emits it. A final 100% report is not guaranteed.
    pub async fn run<F>(&self, request: &DownloadRequest, staging: &Path, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&Progress),
    {
        let args = self.build_args(request, staging);
        debug!("Executing command: {} {}", self.program, args.join(" "));

        let mut child = self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

        // Drain stderr alongside stdout so a chatty tool cannot block on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        // Titles in the tool's own messages are not always UTF-8
        let mut reader = BufReader::new(stdout);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end();
            match parse_progress_line(line) {
                Some(progress) => {
                    trace!("progress: {progress:?}");
                    on_progress(&progress);
                }
                None => debug!("{}: {line}", self.program),
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.map_err(std::io::Error::other)??;
        let diagnostics = String::from_utf8_lossy(&stderr).trim().to_string();

        debug!("status: {status}");
        if !diagnostics.is_empty() {
            debug!("stderr: {diagnostics}");
        }

        if status.success() {
            Ok(())
        } else {
            Err(Error::ExternalToolFailed {
                program: self.program.clone(),
                status,
                diagnostics,
            })
        }
    }

    /// Download into a fresh staging directory under `output_dir`, then move
    /// the result to a non-colliding path in `output_dir`.
    ///
    /// The staging directory is removed on every exit path.
    pub async fn download<F>(&self, request: &DownloadRequest, output_dir: &Path, on_progress: F) -> Result<PathBuf>
    where
        F: FnMut(&Progress),
    {
        let prefix = match request.video_id() {
            Some(id) => format!(".ytclip-{id}-"),
            None => ".ytclip-".to_string(),
        };
        let staging = tempfile::Builder::new().prefix(&prefix).tempdir_in(output_dir)?;
        debug!("Staging directory: {}", staging.path().display());

        info!("Downloading {} ({})", request.url, request.range);
        self.run(request, staging.path(), on_progress).await?;

        let staged = find_staged_file(staging.path())?;
        let file_name = staged
            .file_name()
            .map(|n| naming::sanitize_filename(&n.to_string_lossy()))
            .ok_or_else(|| Error::OutputFileNotFound(staging.path().to_path_buf()))?;

        let final_path = naming::resolve(&output_dir.join(file_name), self.suffix);
        std::fs::rename(&staged, &final_path)?;
        info!("Saved {}", final_path.display());

        Ok(final_path)
    }
}

/// Pick the produced `.mp4` in the staging directory, the largest if the
/// tool left several behind
fn find_staged_file(staging: &Path) -> Result<PathBuf> {
    let mut best: Option<(u64, PathBuf)> = None;

    for entry in std::fs::read_dir(staging)? {
        let entry = entry?;
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
        if !is_mp4 {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let len = metadata.len();
        if best.as_ref().is_none_or(|(best_len, _)| len > *best_len) {
            best = Some((len, path));
        }
    }

    best.map(|(_, path)| path)
        .ok_or_else(|| Error::OutputFileNotFound(staging.to_path_buf()))
}
