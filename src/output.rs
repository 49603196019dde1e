use crate::session::Artifact;
use crate::timespec::TimeRange;
use crate::ytdlp::{Progress, VideoInfo};

const MIB: f64 = 1024.0 * 1024.0;

/// Render a duration in seconds as `M:SS`
pub fn render_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Render a progress event as a one-line status
pub fn render_progress(progress: &Progress) -> String {
    if progress.is_finished() {
        return "download finished".to_string();
    }
    if progress.is_error() {
        return format!("download error: {}", progress.error.as_deref().unwrap_or("unknown error"));
    }

    let (Some(done), Some(total)) = (progress.downloaded_bytes, progress.total()) else {
        return "downloading... (size unknown)".to_string();
    };

    let percent = progress.fraction().unwrap_or_default() * 100.0;
    let speed = progress
        .speed
        .filter(|&s| s > 0.0)
        .map(|s| format!("{:.1} MB/s", s / MIB))
        .unwrap_or_else(|| "--".to_string());
    let eta = progress
        .eta
        .map(|e| format!("{}s", e.round() as u64))
        .unwrap_or_else(|| "--".to_string());

    format!(
        "downloading: {percent:.1}% | {:.1}/{:.1} MB | speed: {speed} | ETA: {eta}",
        done / MIB,
        total / MIB
    )
}

/// Describe the requested range, with the clip length for sections
pub fn render_range(range: &TimeRange) -> String {
    match range.seconds() {
        Some((start, end)) => format!("{range} ({})", render_duration(end.saturating_sub(start))),
        None => range.to_string(),
    }
}

/// Title and length of the video about to be fetched
pub fn render_video_info(info: &VideoInfo) -> String {
    let length = info
        .duration_seconds()
        .map(render_duration)
        .unwrap_or_else(|| "unknown".to_string());
    format!("Video: {} (length: {length})", info.title.as_deref().unwrap_or("video"))
}

/// Status line shown before the download starts
pub fn render_configuring(range: &TimeRange) -> String {
    format!("Configuring download: {}", render_range(range))
}

/// Summary line for a finished download
pub fn render_artifact(artifact: &Artifact) -> String {
    format!(
        "Saved: {} ({:.1} MB)",
        artifact.path.display(),
        artifact.size as f64 / MIB
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_render_duration() {
        assert_eq!(render_duration(0), "0:00");
        assert_eq!(render_duration(90), "1:30");
        assert_eq!(render_duration(3725), "62:05");
    }

    #[test]
    fn test_render_progress_known_size() {
        let p = Progress {
            status: "downloading".to_string(),
            downloaded_bytes: Some(MIB),
            total_bytes: Some(4.0 * MIB),
            speed: Some(2.0 * MIB),
            eta: Some(1.6),
            ..Progress::default()
        };
        assert_eq!(
            render_progress(&p),
            "downloading: 25.0% | 1.0/4.0 MB | speed: 2.0 MB/s | ETA: 2s"
        );
    }

    #[test]
    fn test_render_progress_unknown_size() {
        let p = Progress {
            status: "downloading".to_string(),
            downloaded_bytes: Some(100.0),
            ..Progress::default()
        };
        assert_eq!(render_progress(&p), "downloading... (size unknown)");
    }

    #[test]
    fn test_render_progress_finished() {
        let p = Progress {
            status: "finished".to_string(),
            ..Progress::default()
        };
        assert_eq!(render_progress(&p), "download finished");
    }

    #[test]
    fn test_render_progress_error() {
        let p = Progress {
            status: "error".to_string(),
            error: Some("HTTP Error 403: Forbidden".to_string()),
            ..Progress::default()
        };
        assert_eq!(render_progress(&p), "download error: HTTP Error 403: Forbidden");

        let p = Progress {
            status: "error".to_string(),
            ..Progress::default()
        };
        assert_eq!(render_progress(&p), "download error: unknown error");
    }

    #[test]
    fn test_render_video_info() {
        let info = VideoInfo {
            id: "abc123".to_string(),
            title: Some("A talk".to_string()),
            duration: Some(754.0),
        };
        assert_eq!(render_video_info(&info), "Video: A talk (length: 12:34)");

        let info = VideoInfo {
            id: "abc123".to_string(),
            ..VideoInfo::default()
        };
        assert_eq!(render_video_info(&info), "Video: video (length: unknown)");
    }

    #[test]
    fn test_render_configuring() {
        assert_eq!(render_configuring(&TimeRange::WholeVideo), "Configuring download: whole video");
        let range = TimeRange::from_parts("0130", "0600").unwrap();
        assert_eq!(render_configuring(&range), "Configuring download: 01:30-06:00 (4:30)");
    }

    #[test]
    fn test_render_range() {
        assert_eq!(render_range(&TimeRange::WholeVideo), "whole video");
        let range = TimeRange::from_parts("0430", "0600").unwrap();
        assert_eq!(render_range(&range), "04:30-06:00 (1:30)");
    }

    #[test]
    fn test_render_artifact() {
        let artifact = Artifact {
            path: PathBuf::from("clip.mp4"),
            file_name: "clip.mp4".to_string(),
            size: 3 * 1024 * 1024,
        };
        assert_eq!(render_artifact(&artifact), "Saved: clip.mp4 (3.0 MB)");
    }
}
