//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the posts
//! ([`crate::loader`]), loading the theme ([`crate::render`]), and
//! materializing the output tree ([`crate::write`]).
//!
//! Everything that can fail without touching the output directory (listing
//! the posts, parsing the templates) happens before the writer clears it.

use crate::config::Config;
use crate::loader::{Error as LoadError, Loader};
use crate::render::{Error as RenderError, TemplateRenderer, Theme};
use crate::write::{Error as WriteError, PostError, Writer};
use tracing::info;

/// What a build did, for the operator.
#[derive(Debug)]
pub struct BuildReport {
    /// The number of post pages on disk.
    pub posts_written: usize,

    /// Documents that couldn't be read or parsed.
    pub skipped_documents: Vec<LoadError>,

    /// Posts that parsed but couldn't be written.
    pub skipped_posts: Vec<PostError>,

    /// Posts that overwrote an earlier post with the same output path.
    pub collisions: usize,
}

impl BuildReport {
    /// The total number of source documents left out of the site.
    pub fn skipped(&self) -> usize {
        self.skipped_documents.len() + self.skipped_posts.len()
    }
}

/// Builds the site from a [`Config`] object. Per-document problems are
/// collected in the [`BuildReport`]; only structural failures return an
/// [`Error`].
pub fn build_site(config: &Config) -> Result<BuildReport> {
    // collect all posts
    let collection = Loader::new(config.delimiter_scan).load_posts(&config.posts_directory)?;
    info!(
        loaded = collection.posts.len(),
        skipped = collection.skipped.len(),
        "loaded posts"
    );

    let theme = match &config.theme {
        Some(dir) => Theme::from_directory(dir)?,
        None => Theme::builtin()?,
    };
    let renderer = TemplateRenderer::new(theme, &config.root);

    let options = config.site_options();
    let mut writer = Writer::new(&renderer, &options);
    let report = writer.write_site(&collection.posts)?;

    Ok(BuildReport {
        posts_written: report.written.len(),
        skipped_documents: collection.skipped,
        skipped_posts: report.skipped,
        collisions: report.collisions,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Each variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the posts directory can't be listed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Returned when the theme can't be loaded.
    #[error("loading theme: {0}")]
    Theme(#[from] RenderError),

    /// Returned when the output tree can't be materialized.
    #[error(transparent)]
    Write(#[from] WriteError),
}
