//! Image file storage.
//!
//! Uploaded files land in `{root}/{subdir}/{filename}` and are served back
//! under `{static_url}/{subdir}/{filename}`. Stored names are sanitized and
//! carry a random suffix so uploads never overwrite each other.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::models::ImageSlot;

/// Longest stored file name, extension included.
pub const MAX_FILENAME_CHARS: usize = 40;
const SUFFIX_CHARS: usize = 10;
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error while storing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not find a free file name for '{0}'")]
    NameExhausted(String),
}

/// Which entity an image belongs to; selects the storage subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwner {
    Team,
    Player,
}

impl ImageOwner {
    pub fn subdir(&self, slot: ImageSlot) -> &'static str {
        match (self, slot) {
            (ImageOwner::Team, ImageSlot::Image) => "teams",
            (ImageOwner::Team, ImageSlot::Icon) => "teams_icon",
            (ImageOwner::Team, ImageSlot::Thumb) => "teams_thumb",
            (ImageOwner::Player, ImageSlot::Image) => "players",
            (ImageOwner::Player, ImageSlot::Icon) => "players_icon",
            (ImageOwner::Player, ImageSlot::Thumb) => "players_thumb",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    static_url: String,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>, static_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            static_url: static_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of a stored file, or `""` when there is no file.
    pub fn url(&self, subdir: &str, filename: Option<&str>) -> String {
        match filename {
            Some(name) if !name.is_empty() => {
                if subdir.is_empty() {
                    format!("{}/{}", self.static_url, name)
                } else {
                    format!("{}/{}/{}", self.static_url, subdir, name)
                }
            }
            _ => String::new(),
        }
    }

    pub fn path(&self, subdir: &str, filename: &str) -> PathBuf {
        let mut path = self.root.clone();
        if !subdir.is_empty() {
            path.push(subdir);
        }
        path.push(filename);
        path
    }

    /// Store `bytes` under `subdir` and return the generated file name.
    pub async fn save(
        &self,
        subdir: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let dir = self.path(subdir, "");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = safe_filename(original_name, MAX_FILENAME_CHARS);
            let path = dir.join(&filename);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::Io { path, source }),
            };

            file.write_all(bytes)
                .await
                .map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;
            file.flush()
                .await
                .map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;

            log::debug!("stored {} ({} bytes)", path.display(), bytes.len());
            return Ok(filename);
        }

        Err(StorageError::NameExhausted(original_name.to_string()))
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, subdir: &str, filename: &str) -> Result<(), StorageError> {
        let path = self.path(subdir, filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::debug!("removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// Reduce `name` to `[A-Za-z0-9._-]`, turning whitespace runs into `_`.
fn secure(name: &str) -> String {
    let joined = name
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SUFFIX_CHARS)
        .collect()
}

/// Sanitized file name with a random `_xxxxxxxxxx` suffix before the
/// extension, at most `max_chars` long.
///
/// `"Logo Persija.PNG"` becomes something like `"Logo_Persija_3f9a0c21b7.PNG"`.
pub fn safe_filename(original: &str, max_chars: usize) -> String {
    let original = secure(original);
    let (stem, ext) = match original.rfind('.') {
        Some(idx) if idx > 0 => (&original[..idx], &original[idx..]),
        _ => (original.as_str(), ""),
    };

    let suffix = format!("_{}", random_suffix());
    // Extensions longer than the budget are dropped rather than cut.
    let ext = if ext.len() + suffix.len() < max_chars {
        ext
    } else {
        ""
    };
    let stem_budget = max_chars.saturating_sub(ext.len() + suffix.len());
    let stem: String = stem.chars().take(stem_budget).collect();
    let stem = if stem.is_empty() { "file".chars().take(stem_budget).collect() } else { stem };

    format!("{}{}{}", stem, suffix, ext)
}
