use std::{fmt::Display, path::PathBuf};

use derive_more::Display as DeriveDisplay;

/// Image file extensions, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Video file extensions, compared case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

#[derive(Debug, DeriveDisplay, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a file name by extension. Returns `None` for anything that
    /// is not on the allowlist.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// A single entry in the media catalog. The kind is fixed when the entry is
/// discovered and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    index: usize,
    path: PathBuf,
    kind: MediaKind,
}

impl MediaEntry {
    pub fn new(index: usize, path: PathBuf, kind: MediaKind) -> Self {
        Self { index, path, kind }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// File name for log lines and the unavailable placeholder.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl Display for MediaEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(#{} {} {})", self.index, self.kind, self.name())
    }
}
