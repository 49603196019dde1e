use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timespec::TimeRange;

/// Spelling of the version marker appended to colliding file names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSuffix {
    /// `name_V2.mp4`
    #[default]
    Upper,
    /// `name_v2.mp4`
    Lower,
}

impl VersionSuffix {
    fn marker(self) -> &'static str {
        match self {
            VersionSuffix::Upper => "_V",
            VersionSuffix::Lower => "_v",
        }
    }
}

/// Return a path that does not collide with an existing file.
///
/// If nothing exists at `path` it is returned as is. Otherwise
/// `<stem>_V<n><ext>` is tried from n = 2 upwards. An existing
/// trailing version tag is not merged, a new one is appended.
///
/// Only existence checks are made: the caller must create the file
/// promptly, and two concurrent resolvers may pick the same name.
pub fn resolve(path: &Path, suffix: VersionSuffix) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().map(OsString::from).unwrap_or_default();
    let extension = path.extension();

    let mut counter: u64 = 2;
    loop {
        let mut name = stem.clone();
        name.push(format!("{}{counter}", suffix.marker()));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Replace characters that are invalid in file names on common platforms
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

/// Output template handed to the downloader. Sections carry their range
/// so clips of the same video do not share a name.
pub fn output_template(range: &TimeRange) -> String {
    const BASE: &str = "%(title)s_%(height)sp_%(fps)sfps_%(vcodec)s_%(id)s";

    match range.file_tag() {
        Some(tag) => format!("{BASE}_{tag}.%(ext)s"),
        None => format!("{BASE}.%(ext)s"),
    }
}
