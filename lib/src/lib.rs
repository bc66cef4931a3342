//! A toolkit for creating static-asset build pipelines.
//!
//! # Overview
//!
//! Bellows is a library for building asset pipelines: programs that take a
//! source tree of stylesheets, markup, images, and fonts and emit a ready
//! to serve output tree. It fixes the plumbing (file discovery, the
//! transformation seam, and stage orchestration) without enjoining any
//! particular site layout.
//!
//! The pieces compose as follows:
//!
//!   * [`fstree::FsTree`] snapshots the source tree once per run; stages
//!     select their inputs from the snapshot instead of globbing.
//!
//!   * The [`pipe`] module is the transformation seam: a [`pipe::Source`]
//!     yields a [`pipe::Blob`], a [`pipe::Mapper`] transforms it, and a
//!     [`pipe::Sink`] lands it in the output tree. Concrete mappers cover
//!     scss compilation ([`style::Scss`]), partial assembly
//!     ([`html::HtmlInclude`]), svg cleanup ([`svg::SvgMin`]), and font
//!     containering ([`font::Woff`], [`font::Woff2`]).
//!
//!   * [`pipeline::Pipeline`] owns the stage graph: clean first, then a
//!     concurrent group of independent stages, then the strictly ordered
//!     font chain (convert/copy, generate the face fragment, compile the
//!     stylesheets that import it).
//!
//!   * [`watch`] keeps a development loop alive: a file watcher that
//!     re-runs the one stage a change invalidates, and a static server
//!     over the output tree with an explicit start/stop lifecycle.
//!
//! Stage failures are surfaced through a [`pipeline::Reporter`] rather
//! than aborting the run; a broken stylesheet during development is a
//! notification, not a crash.

#[macro_use]
pub mod error;
pub mod fstree;
pub mod pipe;
pub mod html;
pub mod svg;
pub mod font;
pub mod pipeline;
pub mod watch;

#[cfg(feature = "sass")]
pub mod style;

#[cfg(feature = "tinify")]
pub mod tinify;

pub use pipeline::*;

pub use rayon;
