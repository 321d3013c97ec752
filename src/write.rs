//! Materializes a collection of [`Post`]s into an output directory:
//!
//! ```text
//! {output}/index.html
//! {output}/static/...
//! {output}/YYYY/MM/DD/{slug}/index.html
//! ```
//!
//! The [`Writer`] owns the output directory for the duration of a run. Every
//! run is a full rebuild: whatever was in the directory before is deleted,
//! including files frontpress didn't create. That is intentional; the output
//! directory is generated state and must not hold anything else.
//!
//! A run moves through the [`Stage`]s in order. Failures of a single post
//! (its path, its rendering, its directory or its file) skip that post and
//! are reported in the [`Report`]. Failures anywhere else are fatal: the run
//! stops in [`Stage::Failed`] and returns an [`Error`]. Nothing is retried.
//!
//! With [`SiteOptions::staged`] set, the tree is built in a sibling staging
//! directory and only swapped into place once it is complete, so a fatal
//! failure leaves the previous output untouched.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::path::{self, OutputPath, INDEX_FILE};
use crate::post::Post;
use crate::render::{self, IndexEntry, IndexPage, PostPage, Render};
use crate::util::{clear_dir, copy_dir, rmdir};

/// The name of the static assets directory inside the output directory.
pub const STATIC_DIRECTORY: &str = "static";

/// Where a [`Writer`] is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Uninitialized,
    /// Creating or clearing the output directory.
    Preparing,
    AssetsCopied,
    PostsWritten,
    IndexWritten,
    /// The run finished; see the returned [`Report`].
    Done,
    /// The run aborted with a fatal [`Error`].
    Failed,
}

/// Everything the [`Writer`] needs to know about the site layout.
#[derive(Clone, Debug)]
pub struct SiteOptions {
    /// The directory to (re)generate.
    pub output_directory: PathBuf,

    /// The directory whose contents are copied to `{output}/static`.
    pub static_directory: PathBuf,

    /// The root link prefix handed to page templates and used for post URLs.
    pub root: String,

    /// The `chrono` format string for the date shown on pages.
    pub date_format: String,

    /// Build into a staging directory and swap it into place at the end.
    pub staged: bool,
}

/// A post that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPost {
    pub title: String,
    pub date: NaiveDate,
    pub date_label: String,
    pub output: OutputPath,
}

/// The outcome of a successful run.
#[derive(Debug, Default)]
pub struct Report {
    /// The pages written, one per distinct output path, in collection order.
    pub written: Vec<WrittenPost>,

    /// The posts that were skipped and why.
    pub skipped: Vec<PostError>,

    /// The number of posts that overwrote an earlier post with the same
    /// date and slug.
    pub collisions: usize,
}

/// Responsible for templating and writing the output tree to disk.
pub struct Writer<'a> {
    /// Renders post bodies and pages.
    renderer: &'a dyn Render,

    options: &'a SiteOptions,

    stage: Stage,
}

impl<'a> Writer<'a> {
    pub fn new(renderer: &'a dyn Render, options: &'a SiteOptions) -> Writer<'a> {
        Writer {
            renderer,
            options,
            stage: Stage::Uninitialized,
        }
    }

    /// The stage the writer has reached.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "materializer stage");
        self.stage = stage;
    }

    /// Regenerates the output directory from `posts`.
    pub fn write_site(&mut self, posts: &[Post]) -> Result<Report> {
        let options = self.options;
        let target = options.output_directory.as_path();
        let result = if options.staged {
            self.write_staged(target, posts)
        } else {
            self.write_tree(target, posts)
        };

        match result {
            Ok(report) => {
                self.advance(Stage::Done);
                Ok(report)
            }
            Err(err) => {
                self.advance(Stage::Failed);
                Err(err)
            }
        }
    }

    fn write_staged(&mut self, target: &Path, posts: &[Post]) -> Result<Report> {
        let staging = sibling(target, "staging")?;
        let result = self
            .write_tree(&staging, posts)
            .and_then(|report| swap(&staging, target).map(|()| report));
        if result.is_err() {
            if let Err(err) = rmdir(&staging) {
                warn!(path = %staging.display(), "removing staging directory: {}", err);
            }
        }
        result
    }

    /// Builds the complete tree under `root`.
    fn write_tree(&mut self, root: &Path, posts: &[Post]) -> Result<Report> {
        self.advance(Stage::Preparing);
        prepare(root)?;

        let assets = root.join(STATIC_DIRECTORY);
        copy_dir(&self.options.static_directory, &assets).map_err(|err| {
            Error::CopyAssets {
                path: self.options.static_directory.clone(),
                err,
            }
        })?;
        self.advance(Stage::AssetsCopied);

        let report = self.write_posts(root, posts);
        self.advance(Stage::PostsWritten);

        self.write_index(root, &report.written)?;
        self.advance(Stage::IndexWritten);

        Ok(report)
    }

    /// Writes each post page in order. Posts that fail are skipped. When two
    /// posts share an output path the later one wins and the earlier one is
    /// dropped from the report.
    fn write_posts(&self, root: &Path, posts: &[Post]) -> Report {
        let mut report = Report::default();
        let mut seen: HashMap<OutputPath, (usize, &Path)> = HashMap::new();

        for post in posts {
            match self.write_post(root, post) {
                Ok(written) => match seen.get(&written.output).copied() {
                    Some((index, earlier)) => {
                        warn!(
                            path = %post.source.display(),
                            earlier = %earlier.display(),
                            "output path collision; overwriting earlier post"
                        );
                        report.collisions += 1;
                        seen.insert(written.output.clone(), (index, post.source.as_path()));
                        report.written[index] = written;
                    }
                    None => {
                        seen.insert(written.output.clone(), (report.written.len(), post.source.as_path()));
                        report.written.push(written);
                    }
                },
                Err(err) => {
                    warn!(path = %post.source.display(), "skipping post: {}", err);
                    report.skipped.push(err);
                }
            }
        }

        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            "wrote posts"
        );
        report
    }

    fn write_post(&self, root: &Path, post: &Post) -> PostResult<WrittenPost> {
        let document = || post.source.clone();

        let output = OutputPath::derive(&post.metadata).map_err(|err| PostError::Path {
            document: document(),
            err,
        })?;
        let date_label = date_label(post.date(), &self.options.date_format).ok_or_else(|| {
            PostError::DateLabel {
                document: document(),
                format: self.options.date_format.clone(),
            }
        })?;

        let render_error = |err| PostError::Render {
            document: document(),
            err,
        };
        let body = self.renderer.render_markdown(&post.body).map_err(render_error)?;
        let html = self
            .renderer
            .render_page(&PostPage {
                title: post.title(),
                date_label: &date_label,
                body: &body,
                root: &self.options.root,
            })
            .map_err(render_error)?;

        let directory = output.directory(root);
        fs::create_dir_all(&directory).map_err(|err| match blocking_file(root, &directory) {
            Some(path) => PostError::DirectoryConflict {
                document: document(),
                path,
            },
            None => PostError::CreateDirectory {
                document: document(),
                path: directory.clone(),
                err,
            },
        })?;

        let file = output.file(root);
        fs::write(&file, html).map_err(|err| PostError::WriteFile {
            document: document(),
            path: file.clone(),
            err,
        })?;
        debug!(path = %file.display(), "wrote post");

        Ok(WrittenPost {
            title: post.title().to_owned(),
            date: post.date(),
            date_label,
            output,
        })
    }

    /// Writes `{root}/index.html` listing `written` newest first.
    fn write_index(&self, root: &Path, written: &[WrittenPost]) -> Result<()> {
        let mut sorted: Vec<&WrittenPost> = written.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));

        let entries: Vec<IndexEntry> = sorted
            .into_iter()
            .map(|w| IndexEntry {
                title: w.title.clone(),
                date_label: w.date_label.clone(),
                url: w.output.url(&self.options.root),
            })
            .collect();

        let html = self
            .renderer
            .render_index(&IndexPage {
                entries: &entries,
                root: &self.options.root,
            })
            .map_err(Error::RenderIndex)?;

        let path = root.join(INDEX_FILE);
        fs::write(&path, html).map_err(|err| Error::WriteIndex { path, err })
    }
}

/// Creates `root`, or clears it if it already exists.
fn prepare(root: &Path) -> Result<()> {
    let prepare_error = |err| Error::Prepare {
        path: root.to_owned(),
        err,
    };

    if let Some(parent) = root.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(prepare_error)?;
    }

    match fs::create_dir(root) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            info!(path = %root.display(), "output directory exists; clearing it");
            clear_dir(root).map_err(prepare_error)
        }
        Err(err) => Err(prepare_error(err)),
    }
}

/// Formats `date`, or returns `None` if `format` is not a valid `chrono`
/// format string.
fn date_label(date: NaiveDate, format: &str) -> Option<String> {
    let mut label = String::new();
    write!(label, "{}", date.format(format)).ok()?;
    Some(label)
}

/// Finds a non-directory standing where a directory between `root` and
/// `directory` should be.
fn blocking_file(root: &Path, directory: &Path) -> Option<PathBuf> {
    directory
        .ancestors()
        .take_while(|p| *p != root)
        .find(|p| p.exists() && !p.is_dir())
        .map(Path::to_owned)
}

/// `{parent}/.{name}.{suffix}` for `dir = {parent}/{name}`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| Error::InvalidOutputDirectory {
        path: dir.to_owned(),
    })?;
    Ok(dir.with_file_name(format!(".{}.{}", name.to_string_lossy(), suffix)))
}

/// Moves `staging` to `target`, replacing whatever was at `target`.
fn swap(staging: &Path, target: &Path) -> Result<()> {
    let swap_error = |err| Error::Swap {
        path: target.to_owned(),
        err,
    };

    if !target.exists() {
        return fs::rename(staging, target).map_err(swap_error);
    }

    let previous = sibling(target, "previous")?;
    rmdir(&previous).map_err(swap_error)?;
    fs::rename(target, &previous).map_err(swap_error)?;
    if let Err(err) = fs::rename(staging, target) {
        // put the old tree back so the output directory isn't left missing
        if let Err(restore) = fs::rename(&previous, target) {
            warn!(path = %previous.display(), "restoring previous output: {}", restore);
        }
        return Err(swap_error(err));
    }
    if let Err(err) = rmdir(&previous) {
        warn!(path = %previous.display(), "removing previous output: {}", err);
    }
    Ok(())
}

/// The result of a fatal-on-error materializer operation.
pub type Result<T> = std::result::Result<T, Error>;

type PostResult<T> = std::result::Result<T, PostError>;

/// Represents a fatal error. The run is aborted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the output directory can't be created or cleared.
    #[error("preparing output directory `{}`: {err}", .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the static assets can't be copied.
    #[error("copying static assets from `{}`: {err}", .path.display())]
    CopyAssets {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the index page can't be rendered.
    #[error("rendering index page: {0}")]
    RenderIndex(#[source] render::Error),

    /// Returned when the index page can't be written.
    #[error("writing index page `{}`: {err}", .path.display())]
    WriteIndex {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned for a staged build when the output directory has no final
    /// path component (e.g. `.` or `/`) to derive a staging name from.
    #[error("output directory `{}` can't be staged", .path.display())]
    InvalidOutputDirectory { path: PathBuf },

    /// Returned when the staged tree can't be moved into place.
    #[error("replacing output directory `{}`: {err}", .path.display())]
    Swap {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

/// Represents a post that couldn't be written. The post is skipped and the
/// run continues. `document` is the post's source file.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("`{}`: {err}", .document.display())]
    Path {
        document: PathBuf,
        #[source]
        err: path::Error,
    },

    #[error("`{}`: invalid date format `{format}`", .document.display())]
    DateLabel { document: PathBuf, format: String },

    #[error("`{}`: {err}", .document.display())]
    Render {
        document: PathBuf,
        #[source]
        err: render::Error,
    },

    /// Returned when a file occupies a path where a directory is needed.
    #[error(
        "`{}`: `{}` is in the way of the output directory",
        .document.display(),
        .path.display()
    )]
    DirectoryConflict { document: PathBuf, path: PathBuf },

    #[error("`{}`: creating `{}`: {err}", .document.display(), .path.display())]
    CreateDirectory {
        document: PathBuf,
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("`{}`: writing `{}`: {err}", .document.display(), .path.display())]
    WriteFile {
        document: PathBuf,
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

impl PostError {
    /// The source file of the skipped post.
    pub fn document(&self) -> &Path {
        match self {
            PostError::Path { document, .. }
            | PostError::DateLabel { document, .. }
            | PostError::Render { document, .. }
            | PostError::DirectoryConflict { document, .. }
            | PostError::CreateDirectory { document, .. }
            | PostError::WriteFile { document, .. } => document,
        }
    }
}
