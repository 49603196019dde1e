#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use ytclip::error::Error;
use ytclip::session::{RequestState, Session};
use ytclip::timespec::TimeRange;
use ytclip::ytdlp::{Browser, Downloader};
use ytclip::DownloadRequest;

const URL: &str = "https://www.youtube.com/watch?v=abc123";

const VIDEO_JSON: &str = r#"{"id": "abc123", "title": "Fake clip", "duration": 754}"#;

/// Write a shell script standing in for yt-dlp and return a downloader that
/// runs it through `sh`. A `-J` call prints `VIDEO_JSON`; any other call
/// records its arguments in `args.txt` and runs `body`.
fn fake_tool(dir: &Path, body: &str) -> Downloader {
    let script = dir.join("fake-yt-dlp.sh");
    let args_file = dir.join("args.txt");
    let text = format!(
        "#!/bin/sh\nfor arg in \"$@\"; do\n  if [ \"$arg\" = '-J' ]; then printf '%s\\n' '{VIDEO_JSON}'; exit 0; fi\ndone\nprintf '%s\\n' \"$@\" > '{}'\nstaging=''\nfor arg in \"$@\"; do\n  if [ \"$prev\" = '-P' ]; then staging=\"$arg\"; fi\n  prev=\"$arg\"\ndone\n{body}\n",
        args_file.display()
    );
    fs::write(&script, text).unwrap();

    Downloader::from_command(&["sh".to_string(), script.to_string_lossy().to_string()])
}

const WRITES_VIDEO: &str = r#"printf '%s\n' '[ytclip-progress] {"status": "downloading", "downloaded_bytes": 5, "total_bytes": 10}'
printf 'fake video' > "$staging/video.mp4""#;

fn recorded_args(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

fn staging_dirs(out: &Path) -> Vec<PathBuf> {
    fs::read_dir(out)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(".ytclip-"))
        })
        .collect()
}

#[tokio::test]
async fn test_section_download_end_to_end() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), WRITES_VIDEO);

    let mut session = Session::default();
    let mut fractions = Vec::new();
    let artifact = session
        .download(&downloader, out.path(), URL, "0130", "0600", |p| {
            fractions.extend(p.fraction());
        })
        .await
        .unwrap()
        .clone();

    assert_eq!(artifact.path, out.path().join("video.mp4"));
    assert_eq!(artifact.file_name, "video.mp4");
    assert_eq!(fs::read(&artifact.path).unwrap(), b"fake video");
    assert_eq!(artifact.read().unwrap(), b"fake video");
    assert_eq!(fractions, vec![0.5]);
    assert_eq!(session.state(), &RequestState::Succeeded(artifact.path.clone()));
    assert_eq!(session.video().and_then(|v| v.title.as_deref()), Some("Fake clip"));

    let args = recorded_args(tool_dir.path());
    let pos = args.iter().position(|a| a == "--download-sections").unwrap();
    assert_eq!(args[pos + 1], "*01:30-06:00");
    assert!(args.contains(&"--force-keyframes-at-cuts".to_string()));
    assert_eq!(args.last().map(String::as_str), Some(URL));

    assert!(staging_dirs(out.path()).is_empty());
}

#[tokio::test]
async fn test_whole_video_collision_gets_version_suffix() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), WRITES_VIDEO);
    fs::write(out.path().join("video.mp4"), b"existing").unwrap();

    let request = DownloadRequest::new(URL, TimeRange::WholeVideo, None).unwrap();
    let path = downloader.download(&request, out.path(), |_| {}).await.unwrap();

    assert_eq!(path, out.path().join("video_V2.mp4"));
    assert_eq!(fs::read(out.path().join("video.mp4")).unwrap(), b"existing");
    assert!(!recorded_args(tool_dir.path()).contains(&"--download-sections".to_string()));
    assert!(staging_dirs(out.path()).is_empty());
}

#[tokio::test]
async fn test_tool_failure_carries_diagnostics() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(
        tool_dir.path(),
        "echo 'ERROR: [youtube] abc123: Video unavailable' >&2\nexit 1",
    );

    let mut session = Session::default();
    let err = session
        .download(&downloader, out.path(), URL, "", "", |_| {})
        .await
        .unwrap_err();

    match err {
        Error::ExternalToolFailed { diagnostics, status, .. } => {
            assert!(diagnostics.contains("Video unavailable"));
            assert_eq!(status.code(), Some(1));
        }
        other => panic!("expected ExternalToolFailed, got {other:?}"),
    }
    assert!(matches!(session.state(), RequestState::Failed(_)));
    assert!(staging_dirs(out.path()).is_empty());
}

#[tokio::test]
async fn test_success_without_output_file() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), "printf 'partial' > \"$staging/video.webm.part\"");

    let request = DownloadRequest::new(URL, TimeRange::WholeVideo, None).unwrap();
    let err = downloader.download(&request, out.path(), |_| {}).await.unwrap_err();

    assert!(matches!(err, Error::OutputFileNotFound(_)));
    assert!(staging_dirs(out.path()).is_empty());
}

#[tokio::test]
async fn test_incomplete_range_never_invokes_tool() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), WRITES_VIDEO);

    let mut session = Session::default();
    let err = session
        .download(&downloader, out.path(), URL, "0130", "", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, Error::IncompleteTimeRange));
    assert_eq!(session.state(), &RequestState::Idle);
    assert!(!tool_dir.path().join("args.txt").exists());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_browser_cookies_reach_tool_when_allowed() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), WRITES_VIDEO).with_browser_cookies(true);

    let mut session = Session::new(Some(Browser::Chrome));
    session
        .download(&downloader, out.path(), URL, "", "", |_| {})
        .await
        .unwrap();

    let args = recorded_args(tool_dir.path());
    let pos = args.iter().position(|a| a == "--cookies-from-browser").unwrap();
    assert_eq!(args[pos + 1], "chrome");
}

#[tokio::test]
async fn test_non_utf8_output_does_not_fail_download() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let body = format!("printf '[download] Destination: caf\\351.mp4\\n'\n{WRITES_VIDEO}");
    let downloader = fake_tool(tool_dir.path(), &body);

    let mut session = Session::default();
    let mut fractions = Vec::new();
    let artifact = session
        .download(&downloader, out.path(), URL, "", "", |p| {
            fractions.extend(p.fraction());
        })
        .await
        .unwrap()
        .clone();

    assert_eq!(artifact.path, out.path().join("video.mp4"));
    assert_eq!(fractions, vec![0.5]);
    assert!(matches!(session.state(), RequestState::Succeeded(_)));
    assert!(staging_dirs(out.path()).is_empty());
}

#[tokio::test]
async fn test_fetch_info_reads_title_and_length() {
    let tool_dir = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), "exit 1");

    let request = DownloadRequest::new(URL, TimeRange::WholeVideo, None).unwrap();
    let info = downloader.fetch_info(&request).await.unwrap();

    assert_eq!(info.id, "abc123");
    assert_eq!(info.title.as_deref(), Some("Fake clip"));
    assert_eq!(info.duration_seconds(), Some(754));
    assert!(!tool_dir.path().join("args.txt").exists());
}

#[tokio::test]
async fn test_rejected_request_keeps_last_artifact() {
    let tool_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let downloader = fake_tool(tool_dir.path(), WRITES_VIDEO);

    let mut session = Session::default();
    session
        .download(&downloader, out.path(), URL, "", "", |_| {})
        .await
        .unwrap();

    let err = session
        .download(&downloader, out.path(), "https://vimeo.com/1", "", "", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidUrlShape(_)));
    assert_eq!(session.artifact().map(|a| a.file_name.as_str()), Some("video.mp4"));
}
