//! Image references and batches.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Opaque, immutable handle to an image.
///
/// Cloning is cheap; the path is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef {
    path: Arc<Path>,
}

impl ImageRef {
    /// Creates a reference to the image at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::from(path.into()),
        }
    }

    /// Returns the path this reference points to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the final path component, or the whole path if there is none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.to_string_lossy().into_owned(),
            |n| n.to_string_lossy().into_owned(),
        )
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for ImageRef {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path.to_string_lossy())
    }
}

/// Ordered sequence of images submitted for classification together.
///
/// The order is fixed at construction and defines report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    items: Vec<ImageRef>,
}

impl Batch {
    /// Creates a batch from an ordered list of references.
    #[must_use]
    pub const fn new(items: Vec<ImageRef>) -> Self {
        Self { items }
    }

    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        self.items.get(index)
    }

    /// Iterates over the items in batch order.
    pub fn iter(&self) -> std::slice::Iter<'_, ImageRef> {
        self.items.iter()
    }

    /// Borrows the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ImageRef] {
        &self.items
    }
}

impl FromIterator<ImageRef> for Batch {
    fn from_iter<I: IntoIterator<Item = ImageRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a ImageRef;
    type IntoIter = std::slice::Iter<'a, ImageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
