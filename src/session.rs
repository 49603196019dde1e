use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::DownloadRequest;
use crate::error::{Error, Result};
use crate::ytdlp::{Browser, Downloader, Progress, VideoInfo};

/// Where a single request is in its lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Validating,
    Invoking,
    Succeeded(PathBuf),
    Failed(String),
}

/// The file produced by the last successful request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl Artifact {
    fn from_path(path: &Path) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size,
        })
    }

    /// Load the file contents for handing to the user
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

/// Per-user state across requests. One request at a time.
#[derive(Debug, Default)]
pub struct Session {
    state: RequestState,
    browser: Option<Browser>,
    video: Option<VideoInfo>,
    artifact: Option<Artifact>,
}

impl Session {
    pub fn new(browser: Option<Browser>) -> Self {
        Self {
            browser,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Metadata of the video behind the current or last request
    pub fn video(&self) -> Option<&VideoInfo> {
        self.video.as_ref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, RequestState::Validating | RequestState::Invoking)
    }

    /// Forget the last artifact and return to idle
    pub fn clear(&mut self) {
        if self.is_busy() {
            warn!("Ignoring clear while a request is running");
            return;
        }
        self.artifact = None;
        self.video = None;
        self.state = RequestState::Idle;
    }

    /// Validate raw input. Fails closed: on any error the session goes back
    /// to idle, nothing is invoked and the previous artifact is kept.
    pub fn submit(&mut self, url: &str, start: &str, end: &str) -> Result<DownloadRequest> {
        if self.is_busy() {
            return Err(Error::Busy);
        }

        self.state = RequestState::Validating;

        match DownloadRequest::from_input(url, start, end, self.browser) {
            Ok(request) => {
                debug!("Request accepted: {request:?}");
                self.artifact = None;
                self.video = None;
                self.state = RequestState::Invoking;
                Ok(request)
            }
            Err(e) => {
                self.state = RequestState::Idle;
                Err(e)
            }
        }
    }

    fn fail(&mut self, e: Error) -> Error {
        self.state = RequestState::Failed(e.to_string());
        e
    }

    /// Look up the accepted request's video before downloading it
    pub async fn fetch_info(&mut self, downloader: &Downloader, request: &DownloadRequest) -> Result<&VideoInfo> {
        match downloader.fetch_info(request).await {
            Ok(info) => Ok(self.video.insert(info)),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Run an accepted request to completion or failure
    pub async fn invoke<F>(
        &mut self,
        downloader: &Downloader,
        request: &DownloadRequest,
        output_dir: &Path,
        on_progress: F,
    ) -> Result<&Artifact>
    where
        F: FnMut(&Progress),
    {
        let outcome = downloader
            .download(request, output_dir, on_progress)
            .await
            .and_then(|path| Artifact::from_path(&path));

        match outcome {
            Ok(artifact) => {
                self.state = RequestState::Succeeded(artifact.path.clone());
                Ok(self.artifact.insert(artifact))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Validate, fetch metadata, then invoke
    pub async fn download<F>(
        &mut self,
        downloader: &Downloader,
        output_dir: &Path,
        url: &str,
        start: &str,
        end: &str,
        on_progress: F,
    ) -> Result<&Artifact>
    where
        F: FnMut(&Progress),
    {
        let request = self.submit(url, start, end)?;
        self.fetch_info(downloader, &request).await?;
        self.invoke(downloader, &request, output_dir, on_progress).await
    }
}
