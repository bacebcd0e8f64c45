use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use embedded_graphics::prelude::Size;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::{
    frame::Frame,
    media_entry::{MediaEntry, MediaKind},
};

use super::ports::ImageDecoderPort;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read media directory {path}. Error: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("Found {found} media files but at least {required} are needed.")]
    TooFewEntries { found: usize, required: usize },
}

/// Ordered list of the media files found at startup, plus the decoded
/// frames of every image that could be preloaded. Never changes after
/// startup.
pub struct MediaCatalog {
    entries: Vec<MediaEntry>,
    images: HashMap<usize, Frame>,
}

impl MediaCatalog {
    /// List the allowlisted files of `directory`, sorted by file name.
    /// Subdirectories are not descended into.
    #[tracing::instrument(skip_all)]
    pub fn discover(directory: &Path, min_entries: usize) -> Result<Self, CatalogError> {
        let unreadable = |source| CatalogError::Unreadable {
            path: directory.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for dir_entry in fs::read_dir(directory).map_err(unreadable)? {
            let dir_entry = dir_entry.map_err(unreadable)?;
            let path = dir_entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = dir_entry.file_name();
            match MediaKind::from_file_name(&file_name.to_string_lossy()) {
                Some(kind) => files.push((file_name, path, kind)),
                None => debug!("Skipping {}.", path.display()),
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        if files.len() < min_entries {
            return Err(CatalogError::TooFewEntries {
                found: files.len(),
                required: min_entries,
            });
        }

        let entries: Vec<MediaEntry> = files
            .into_iter()
            .enumerate()
            .map(|(index, (_, path, kind))| MediaEntry::new(index, path, kind))
            .collect();
        for entry in &entries {
            info!("Found {}", entry);
        }

        Ok(Self {
            entries,
            images: HashMap::new(),
        })
    }

    /// Decode every image entry once at the display resolution. An image
    /// that fails to decode stays listed but has no cached frame.
    #[tracing::instrument(skip_all)]
    pub fn preload_images(&mut self, decoder: &impl ImageDecoderPort, resolution: Size) {
        for entry in self.entries.iter().filter(|e| e.kind() == MediaKind::Image) {
            match decoder.decode(entry.path(), resolution) {
                Ok(frame) => {
                    debug!("Preloaded {}", entry);
                    self.images.insert(entry.index(), frame);
                }
                Err(e) => error!("Failed to preload {}. Error: {}", entry, e),
            }
        }
        info!(
            "Preloaded {} of {} entries.",
            self.images.len(),
            self.entries.len()
        );
    }

    pub fn list(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaEntry> {
        self.entries.get(index)
    }

    /// The preloaded frame of an image entry.
    pub fn image(&self, index: usize) -> Option<&Frame> {
        self.images.get(&index)
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<MediaEntry>) -> Self {
        Self {
            entries,
            images: HashMap::new(),
        }
    }
}
