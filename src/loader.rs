//! Defines the [`Loader`], which discovers source documents in a directory
//! and parses them into a [`Collection`] of [`Post`]s.
//!
//! A document that can't be read or parsed doesn't abort the load; it's
//! logged, recorded in [`Collection::skipped`], and left out of the site.

use std::fs::read_dir;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::frontmatter::{self, DelimiterScan};
use crate::post::Post;

/// The extension of source documents. Other files are ignored.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Parses [`Post`] objects from source files.
pub struct Loader {
    /// How to locate the end of each document's frontmatter block.
    scan: DelimiterScan,
}

/// The outcome of loading a source directory.
#[derive(Debug, Default)]
pub struct Collection {
    /// The posts that parsed, in discovery order.
    pub posts: Vec<Post>,

    /// One [`Error`] per document that was skipped.
    pub skipped: Vec<Error>,
}

impl Loader {
    pub fn new(scan: DelimiterScan) -> Loader {
        Loader { scan }
    }

    /// Searches `source_directory` (non-recursively) for post files
    /// (extension = `.md`) and parses each one. Files are visited in file name
    /// order so that discovery order doesn't depend on the filesystem.
    ///
    /// Returns an error only if the directory itself can't be listed.
    pub fn load_posts(&self, source_directory: &Path) -> Result<Collection> {
        let entries = read_dir(source_directory).map_err(|err| Error::ReadDirectory {
            path: source_directory.to_owned(),
            err,
        })?;
        let paths = markdown_files(
            source_directory,
            entries.map(|entry| entry.map(|entry| entry.path())),
        );

        let mut collection = Collection::default();
        for path in paths {
            match self.load_post(&path) {
                Ok(post) => {
                    for key in &post.metadata.unrecognized {
                        warn!(path = %path.display(), key = %key, "unrecognized frontmatter entry");
                    }
                    debug!(path = %path.display(), title = %post.title(), "loaded post");
                    collection.posts.push(post);
                }
                Err(err) => {
                    warn!(path = %path.display(), "skipping document: {}", err);
                    collection.skipped.push(err);
                }
            }
        }

        Ok(collection)
    }

    /// Reads and parses a single document.
    pub fn load_post(&self, path: &Path) -> Result<Post> {
        let document = std::fs::read(path).map_err(|err| Error::ReadDocument {
            path: path.to_owned(),
            err,
        })?;
        Post::from_document(path, &document, self.scan).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })
    }
}

/// Picks the Markdown files out of a directory listing, sorted by name.
/// Entries that can't be read are logged and left out.
fn markdown_files<I>(dir: &Path, entries: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut paths: Vec<PathBuf> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(dir = %dir.display(), "skipping unreadable directory entry: {}", err);
                None
            }
        })
        .filter(|path| is_markdown(path) && path.is_file())
        .collect();
    paths.sort();
    paths
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == MARKDOWN_EXTENSION)
}

/// Represents the result of a load operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading posts. [`Error::ReadDirectory`] is fatal for
/// the build; the other variants only cost the affected document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the source directory can't be listed.
    #[error("reading posts directory `{}`: {err}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when a document can't be read.
    #[error("reading `{}`: {err}", .path.display())]
    ReadDocument {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when a document's frontmatter can't be parsed.
    #[error("parsing `{}`: {err}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: frontmatter::Error,
    },
}

impl Error {
    /// The file (or directory) the error concerns.
    pub fn path(&self) -> &Path {
        match self {
            Error::ReadDirectory { path, .. }
            | Error::ReadDocument { path, .. }
            | Error::Parse { path, .. } => path,
        }
    }
}
