//! Loads the site [`Config`] from an optional `frontpress.yaml` project file.
//!
//! ```yaml
//! posts: entries        # directory of `*.md` documents
//! static: static        # copied to `{output}/static`
//! output: docs          # regenerated on every build
//! root: /blog           # root link prefix
//! date_format: "%b %d, %Y"
//! delimiter_scan: structural   # or `last`
//! staged: false
//! theme: theme          # directory with `post.html` and `index.html`
//! ```
//!
//! Every key is optional. Relative paths are resolved against the directory
//! holding the project file.

use crate::frontmatter::DelimiterScan;
use crate::util::open;
use crate::write::SiteOptions;
use anyhow::{anyhow, Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// The name of the project file.
pub const PROJECT_FILE: &str = "frontpress.yaml";

const DEFAULT_POSTS_DIRECTORY: &str = "entries";
const DEFAULT_STATIC_DIRECTORY: &str = "static";
const DEFAULT_OUTPUT_DIRECTORY: &str = "docs";
const DEFAULT_DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct Project {
    posts: Option<PathBuf>,
    #[serde(rename = "static")]
    static_directory: Option<PathBuf>,
    output: Option<PathBuf>,
    root: Option<String>,
    date_format: Option<String>,
    delimiter_scan: Option<DelimiterScan>,
    staged: Option<bool>,
    theme: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub posts_directory: PathBuf,
    pub static_directory: PathBuf,
    pub output_directory: PathBuf,
    pub root: String,
    pub date_format: String,
    pub delimiter_scan: DelimiterScan,
    pub staged: bool,
    pub theme: Option<PathBuf>,
}

impl Config {
    /// The configuration used when there is no project file, with every
    /// directory relative to `project_root`.
    pub fn defaults(project_root: &Path) -> Config {
        Config::from_project(project_root, Project::default())
    }

    /// Searches `dir` and then each of its ancestors for `frontpress.yaml`.
    /// Falls back to [`Config::defaults`] for `dir` when none is found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for candidate in dir.ancestors() {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .with_context(|| format!("Loading configuration `{}`", path.display()));
            }
        }
        info!(dir = %dir.display(), "no {} found; using defaults", PROJECT_FILE);
        Config::defaults(dir).validated()
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let mut contents = String::new();
        open(path, "project")?.read_to_string(&mut contents)?;
        // an empty project file just marks the project root
        let project: Project = match contents.trim().is_empty() {
            true => Project::default(),
            false => serde_yaml::from_str(&contents)?,
        };
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Config::from_project(project_root, project).validated(),
        }
    }

    fn from_project(project_root: &Path, project: Project) -> Config {
        let resolve = |dir: Option<PathBuf>, default: &str| {
            project_root.join(dir.unwrap_or_else(|| PathBuf::from(default)))
        };
        Config {
            posts_directory: resolve(project.posts, DEFAULT_POSTS_DIRECTORY),
            static_directory: resolve(project.static_directory, DEFAULT_STATIC_DIRECTORY),
            output_directory: resolve(project.output, DEFAULT_OUTPUT_DIRECTORY),
            root: project.root.unwrap_or_default(),
            date_format: project
                .date_format
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_owned()),
            delimiter_scan: project.delimiter_scan.unwrap_or_default(),
            staged: project.staged.unwrap_or(false),
            theme: project.theme.map(|theme| project_root.join(theme)),
        }
    }

    /// Rejects settings that would only fail later, per post.
    pub fn validated(self) -> Result<Config> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(anyhow!("Invalid date_format `{}`", self.date_format));
        }
        Ok(self)
    }

    /// The parts of the configuration the site writer needs.
    pub fn site_options(&self) -> SiteOptions {
        SiteOptions {
            output_directory: self.output_directory.clone(),
            static_directory: self.static_directory.clone(),
            root: self.root.clone(),
            date_format: self.date_format.clone(),
            staged: self.staged,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_project_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::from_directory(dir.path())?;
        assert_eq!(config, Config::defaults(dir.path()));
        assert_eq!(config.posts_directory, dir.path().join("entries"));
        assert_eq!(config.static_directory, dir.path().join("static"));
        assert_eq!(config.output_directory, dir.path().join("docs"));
        assert_eq!(config.root, "");
        assert_eq!(config.delimiter_scan, DelimiterScan::Structural);
        assert!(!config.staged);
        Ok(())
    }

    #[test]
    fn test_project_file_in_ancestor() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(PROJECT_FILE),
            "posts: content\nroot: /blog\ndelimiter_scan: last\nstaged: true\ntheme: mytheme\n",
        )?;
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested)?;
        assert_eq!(config.posts_directory, dir.path().join("content"));
        assert_eq!(config.output_directory, dir.path().join("docs"));
        assert_eq!(config.root, "/blog");
        assert_eq!(config.delimiter_scan, DelimiterScan::Last);
        assert!(config.staged);
        assert_eq!(config.theme, Some(dir.path().join("mytheme")));
        Ok(())
    }

    #[test]
    fn test_empty_project_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_FILE), "\n")?;
        assert_eq!(Config::from_directory(dir.path())?, Config::defaults(dir.path()));
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_FILE), "outptu: site\n")?;
        assert!(Config::from_directory(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_date_format_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_FILE), "date_format: \"%Q\"\n")?;
        assert!(Config::from_directory(dir.path()).is_err());
        Ok(())
    }
}
