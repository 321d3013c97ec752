//! The library code for the `frontpress` static site generator. A build is
//! two steps:
//!
//! 1. Loading posts from source files on disk ([`crate::loader`]), each a
//!    Markdown document with a small frontmatter block ([`crate::frontmatter`])
//! 2. Materializing the posts into an output directory ([`crate::write`])
//!
//! The second step owns the output directory outright: it is cleared and
//! rebuilt on every run. Each post lands at
//! `{output}/YYYY/MM/DD/{slug}/index.html` ([`crate::path`]), next to a copy of
//! the static assets and an `index.html` listing every post.
//!
//! Problems with a single document are reported and the document is left out;
//! problems with the site as a whole (assets, index, output directory) abort
//! the build.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod frontmatter;
pub mod htmlrenderer;
pub mod loader;
pub mod markdown;
pub mod path;
pub mod post;
pub mod render;
mod util;
pub mod write;
