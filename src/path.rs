//! Derives where a [`Post`] lands in the output tree:
//! `{root}/YYYY/MM/DD/{slug}/index.html`.
//!
//! Derivation is pure and deterministic. Two posts with the same date and the
//! same slug map to the same [`OutputPath`]; that collision is detected (and
//! resolved last-write-wins) by [`crate::write`], not here.

use std::path::{Path, PathBuf};

use crate::post::{Metadata, Post};

/// The file name of every generated page.
pub const INDEX_FILE: &str = "index.html";

/// Converts a title into a lowercase, ASCII, hyphen-separated slug. Runs of
/// non-alphanumeric characters collapse into a single `-` and leading or
/// trailing hyphens are dropped. Non-ASCII letters are transliterated.
pub fn slugify(title: &str) -> String {
    slug::slugify(title)
}

/// The location of a post relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputPath {
    /// `YYYY/MM/DD/{slug}`, always `/`-separated.
    segments: String,
}

impl OutputPath {
    /// Derives the output location for a post from its date and title.
    pub fn derive(metadata: &Metadata) -> Result<OutputPath> {
        let slug = slugify(&metadata.title);
        if slug.is_empty() {
            return Err(Error::EmptySlug {
                title: metadata.title.clone(),
            });
        }
        Ok(OutputPath {
            segments: format!("{}/{}", metadata.date.format("%Y/%m/%d"), slug),
        })
    }

    /// The directory holding the page, under `root`.
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(self.segments.split('/').collect::<PathBuf>())
    }

    /// The page file itself, under `root`.
    pub fn file(&self, root: &Path) -> PathBuf {
        self.directory(root).join(INDEX_FILE)
    }

    /// The link to the page, e.g. `/blog/2024/03/05/hello-world/` for the
    /// root link prefix `/blog`.
    pub fn url(&self, root: &str) -> String {
        format!("{}/{}/", root.trim_end_matches('/'), self.segments)
    }
}

/// Derives the full output file path for `post` under `root`.
pub fn output_path(root: &Path, post: &Post) -> Result<PathBuf> {
    Ok(OutputPath::derive(&post.metadata)?.file(root))
}

/// The result of a path derivation.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a title has no characters that survive slugification,
    /// which would otherwise put the page directly in the date directory.
    #[error("title `{title}` produces an empty slug")]
    EmptySlug { title: String },
}
