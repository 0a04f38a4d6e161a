//! Reference images: the known targets searched for on a page.
//!
//! A [`ReferenceImageSet`] is loaded once per run from a directory and is read-only
//! afterwards, so it can be shared across any number of match attempts.
//!
//! # Example
//!
//! ```no_run
//! use email_image_match::ReferenceImageSet;
//!
//! # fn example() -> email_image_match::Result<()> {
//! let references = ReferenceImageSet::load("./images")?;
//! for reference in references.iter() {
//!     println!("{} ({}x{})", reference.path().display(), reference.width(), reference.height());
//! }
//! # Ok(())
//! # }
//! ```

use crate::codec::{self, RasterImage};
use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// File extensions accepted as reference images (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A single reference image with its decoded raster cached.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    path: PathBuf,
    raw: Vec<u8>,
    decoded: RasterImage,
}

impl ReferenceImage {
    /// Decodes `raw` and builds a reference image identified by `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not a supported image.
    pub fn from_bytes(path: impl Into<PathBuf>, raw: Vec<u8>) -> Result<Self> {
        let decoded = codec::decode(&raw)?;
        Ok(Self {
            path: path.into(),
            raw,
            decoded,
        })
    }

    /// Source path, used for logging and diagnostics naming.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The original encoded bytes.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The decoded raster.
    #[must_use]
    pub fn decoded(&self) -> &RasterImage {
        &self.decoded
    }

    /// Decoded width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.decoded.width()
    }

    /// Decoded height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.decoded.height()
    }
}

/// Ordered collection of reference images.
#[derive(Debug, Clone, Default)]
pub struct ReferenceImageSet {
    images: Vec<ReferenceImage>,
}

impl ReferenceImageSet {
    /// Loads every supported image file from `dir`.
    ///
    /// Entries are ordered by file name so repeated loads of the same directory
    /// produce identical sets. A directory without qualifying files yields an
    /// empty set. Files that fail to decode are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`Error::ReferenceSourceNotFound`] if `dir` does not exist
    /// - [`Error::ReferenceSourceRead`] if the directory or a file cannot be read
    #[instrument(
        name = "ReferenceImageSet::load",
        skip_all,
        fields(dir = %dir.as_ref().display())
    )]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        match fs::metadata(dir) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ReferenceSourceNotFound {
                    path: dir.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(Error::ReferenceSourceRead {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        }

        let mut paths = Vec::new();
        let entries = fs::read_dir(dir).map_err(|source| Error::ReferenceSourceRead {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::ReferenceSourceRead {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && has_supported_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = fs::read(&path).map_err(|source| Error::ReferenceSourceRead {
                path: path.clone(),
                source,
            })?;

            match ReferenceImage::from_bytes(&path, raw) {
                Ok(image) => {
                    debug!(
                        reference = %path.display(),
                        width = image.width(),
                        height = image.height(),
                        "Loaded reference image"
                    );
                    images.push(image);
                }
                Err(e) => {
                    warn!(
                        reference = %path.display(),
                        error = %e,
                        "Failed to decode reference image, skipping"
                    );
                }
            }
        }

        if images.is_empty() {
            warn!("No reference images found");
        } else {
            info!(count = images.len(), "Reference images loaded");
        }

        Ok(Self { images })
    }

    /// Number of reference images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` if the set holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterates references in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReferenceImage> {
        self.images.iter()
    }
}

impl FromIterator<ReferenceImage> for ReferenceImageSet {
    fn from_iter<I: IntoIterator<Item = ReferenceImage>>(iter: I) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ReferenceImageSet {
    type Item = &'a ReferenceImage;
    type IntoIter = std::slice::Iter<'a, ReferenceImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}
